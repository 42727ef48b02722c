// flow_pvp_client — client side of a flow-pvp match.
//
// Everything a front end needs short of drawing: a transport to the
// session server, a replica of the shared lobby state, the local round
// countdown, and the controller that ties them to the puzzle being solved.
// No rendering and no input devices; front ends translate pointer events
// into `press` / `enter` / `release` on the controller and redraw from its
// state.
//
// Module overview:
// - `transport.rs`:   `Transport` trait (the injected session handle) and
//                     `MemoryTransport` for tests and offline play.
// - `net.rs`:         `NetClient`, a TCP `Transport` with a reader thread.
// - `session.rs`:     `SessionState` replica, `SessionChange`, and
//                     `MatchOutcome`.
// - `countdown.rs`:   tick-driven `Countdown`.
// - `controller.rs`:  `MatchController`, the per-client match state machine.
// - `error.rs`:       `TransportError`, `ClientError`.

pub mod controller;
pub mod countdown;
pub mod error;
pub mod net;
pub mod session;
pub mod transport;

pub use controller::{MatchController, MatchPhase};
pub use countdown::{Countdown, CountdownTick};
pub use error::{ClientError, TransportError};
pub use net::NetClient;
pub use session::{MatchOutcome, SessionChange, SessionState};
pub use transport::{MemoryTransport, Transport};
