// flow_pvp_protocol — wire protocol between flow-pvp clients and the server.
//
// This crate defines the message catalogue, the id types, the wire form of
// boards, and the framing used over TCP. It is shared by the session server
// (`flow_pvp_server`) and the client (`flow_pvp_client`) and depends on
// neither, nor on the puzzle crate: boards cross the wire as plain nested
// arrays and are turned into puzzle boards on the receiving side.
//
// Module overview:
// - `types.rs`:    `UserId`, `LobbyCode`, `PlayerColor`.
// - `message.rs`:  `ClientMessage` / `ServerMessage` enums and the lobby
//                  structs they carry (`PlayerInfo`, `LobbySnapshot`).
// - `board.rs`:    `CellToken`, `WireBoard`, and token normalization.
// - `framing.rs`:  4-byte big-endian length prefix + JSON payload over any
//                  `Read`/`Write` stream.
//
// Design decisions:
// - **JSON with event names.** Messages serialize as
//   `{"event": "...", "data": {...}}`, so the event names on the wire are the
//   protocol's message names and a capture is readable as-is.
// - **No async runtime.** Framing works on `std::io` streams, matching the
//   thread-per-reader server and client.

pub mod board;
pub mod framing;
pub mod message;
pub mod types;

pub use board::{CellToken, WireBoard, normalize_board, wire_board};
pub use framing::{FramingError, MAX_MESSAGE_SIZE, read_message, recv_json, send_json, write_message};
pub use message::{ClientMessage, GameOverReason, LobbySnapshot, PlayerInfo, ServerMessage};
pub use types::{LobbyCode, PlayerColor, UserId};
