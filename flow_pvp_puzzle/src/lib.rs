// flow_pvp_puzzle — the single-player puzzle model for flow-pvp.
//
// A board is a square grid of colored endpoint pairs. The player drags
// pipes between matching endpoints; a board is solved when every empty cell
// is covered and every endpoint is joined to a pipe of its own color. This
// crate holds all of that logic and nothing else: no networking, no timers,
// no rendering. The client crate drives it from pointer input and the server
// crate uses the catalog to hand out boards.
//
// Module overview:
// - `types.rs`:        `Cell`, `Direction`, `ColorId`.
// - `board.rs`:        `Board`, the immutable endpoint layout.
// - `pipes.rs`:        `Connections`, `Pipe`, `PipeStore` (the drawn overlay).
// - `connectivity.rs`: Commit, chain trace, removal, and the win check. The
//                      only multi-cell writer of the pipe store.
// - `tracer.rs`:       `PathTracer`, the drag gesture state machine.
// - `game.rs`:         `GameState`, one board plus its pipes and drag, with
//                      a drainable `PuzzleEvent` queue.
// - `catalog.rs`:      `BoardCatalog`, validated boards grouped by size.
// - `error.rs`:        `BoardError`, `CatalogError`.
//
// Design decisions:
// - **Flat grids.** Boards and pipe stores are `Vec`s indexed by
//   `row * size + col`; out-of-bounds access reads as empty.
// - **Work lists instead of recursion.** Chain walks and pipe removal use an
//   explicit stack/queue so board size never threatens the call stack.
// - **Outcomes, not errors, for gestures.** A bad drag is normal input; only
//   malformed board data produces an `Err`.

pub mod board;
pub mod catalog;
pub mod connectivity;
pub mod error;
pub mod game;
pub mod pipes;
pub mod tracer;
pub mod types;

pub use board::Board;
pub use catalog::BoardCatalog;
pub use error::{BoardError, CatalogError};
pub use game::{GameState, PuzzleEvent};
pub use pipes::{Connections, Pipe, PipeStore};
pub use tracer::{CommitOutcome, ExtendOutcome, PathTracer, PressOutcome};
pub use types::{Cell, ColorId, Direction};
