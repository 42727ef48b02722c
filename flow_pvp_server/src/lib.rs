// flow_pvp_server — session authority for two-player flow-connect matches.
//
// The authority owns everything the two players share: lobby membership,
// settings, the board sequence of a match, scores, and the match clock. It
// never sees pipes or paths. Clients solve boards locally and report each
// completion with `increment_score`.
//
// Module overview:
// - `config.rs`:     `ServerConfig` (JSON, every field defaulted) and the
//                    `LobbyRules` slice each lobby enforces.
// - `error.rs`:      `LobbyError` (user-facing rejection reasons) and
//                    `ServerError` (startup failures).
// - `lobby.rs`:      `Lobby`, one lobby's state machine
//                    (Open → InRound → Finished), pure and clock-free.
// - `authority.rs`:  `Authority`, the multi-lobby registry. Sans-IO: takes a
//                    request and returns the messages to deliver.
// - `server.rs`:     TCP listener, reader threads (one per client), and the
//                    main loop that drives the `Authority`.
//
// Dependencies: `flow_pvp_protocol` (messages, framing), `flow_pvp_puzzle`
// (board catalog only), `flow_pvp_prng` (ids, codes, colors, board order).
//
// The server runs as a standalone binary (`main.rs`) or embedded in another
// process through `start_server`, which the integration tests use with port 0.

pub mod authority;
pub mod config;
pub mod error;
pub mod lobby;
pub mod server;

pub use authority::{Authority, ConnId, Outbound};
pub use config::{LobbyRules, ServerConfig};
pub use error::{LobbyError, ServerError};
pub use lobby::{Lobby, LobbyPhase, ScoreChange};
pub use server::{ServerHandle, start_server};
