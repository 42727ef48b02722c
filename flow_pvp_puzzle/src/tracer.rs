// Path tracer: turns pointer gestures into a candidate pipe path.
//
// A trace is started by a press, grows or shrinks as the pointer enters
// cells, and is committed or cancelled on release. While active it holds the
// drag color and the ordered path; nothing is written to the `PipeStore`
// until `commit`, with one exception: resuming an unfinished pipe consumes
// that pipe (via `trace_connected_chain`) and seeds the path with it.
//
// `extend` applies its rules in a fixed order, first match wins:
//   1. the cell is the second-to-last path cell: retract one step;
//   2. not adjacent to the last cell (or off the board): ignore;
//   3. the path already holds two endpoints: ignore;
//   4. an endpoint of another color: cancel the trace;
//   5. a committed pipe of another color: cancel the trace;
//   6. already on the path: ignore;
//   7. otherwise append.
//
// Invalid gestures are never errors. Each call reports what it did through
// an outcome enum and callers are free to ignore it.

use rustc_hash::FxHashSet;

use crate::board::Board;
use crate::connectivity::{commit_path, is_edge_pipe, trace_connected_chain};
use crate::pipes::PipeStore;
use crate::types::{Cell, ColorId};

/// Result of pressing on a cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PressOutcome {
    /// A fresh trace began at an endpoint.
    Started { color: ColorId },
    /// An unfinished pipe was picked back up; `len` cells were reclaimed.
    Resumed { color: ColorId, len: usize },
    /// A finished endpoint was tapped and its pipe erased (`GameState::press`).
    Erased { color: ColorId, cells: Vec<Cell> },
    /// Nothing to start here.
    Ignored,
}

/// Result of the pointer entering a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtendOutcome {
    /// No trace is active.
    Idle,
    Appended,
    Retracted,
    Ignored,
    /// The gesture hit another color; the trace was dropped.
    Cancelled,
}

/// Result of releasing the pointer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    /// No trace was active.
    Idle,
    /// The path was too short to become a pipe.
    Cancelled,
    Committed { color: ColorId, path: Vec<Cell> },
}

#[derive(Clone, Debug)]
struct ActiveTrace {
    color: ColorId,
    path: Vec<Cell>,
    on_path: FxHashSet<Cell>,
}

impl ActiveTrace {
    fn new(color: ColorId, path: Vec<Cell>) -> Self {
        let on_path = path.iter().copied().collect();
        Self {
            color,
            path,
            on_path,
        }
    }

    fn push(&mut self, cell: Cell) {
        self.path.push(cell);
        self.on_path.insert(cell);
    }

    fn pop(&mut self) {
        if let Some(cell) = self.path.pop() {
            self.on_path.remove(&cell);
        }
    }
}

/// Drag state for one board. At most one trace is active at a time.
#[derive(Clone, Debug, Default)]
pub struct PathTracer {
    active: Option<ActiveTrace>,
}

impl PathTracer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_tracing(&self) -> bool {
        self.active.is_some()
    }

    /// Color of the active trace.
    pub fn color(&self) -> Option<ColorId> {
        self.active.as_ref().map(|t| t.color)
    }

    /// The in-progress path; empty when idle.
    pub fn path(&self) -> &[Cell] {
        self.active.as_ref().map_or(&[], |t| t.path.as_slice())
    }

    /// Begin a trace at `cell`. Any trace already active is cancelled first.
    ///
    /// Allowed on an endpoint with no pipe, or on any cell whose pipe is a
    /// free end; the latter clears the old pipe and seeds the path with it,
    /// ordered so that `cell` is last and extension continues from there.
    pub fn start(&mut self, board: &Board, pipes: &mut PipeStore, cell: Cell) -> PressOutcome {
        self.cancel();
        if !board.in_bounds(cell) {
            return PressOutcome::Ignored;
        }

        let existing = pipes.get(cell).copied();
        match (board.color_at(cell), existing) {
            (Some(color), None) => {
                self.active = Some(ActiveTrace::new(color, vec![cell]));
                PressOutcome::Started { color }
            }
            (endpoint, Some(pipe)) => {
                let color = pipe.color;
                if endpoint.is_some_and(|c| c != color) || !is_edge_pipe(pipes, cell) {
                    return PressOutcome::Ignored;
                }
                let mut path = trace_connected_chain(pipes, cell, color);
                path.reverse();
                let len = path.len();
                self.active = Some(ActiveTrace::new(color, path));
                PressOutcome::Resumed { color, len }
            }
            (None, None) => PressOutcome::Ignored,
        }
    }

    /// The pointer entered `cell`.
    pub fn extend(&mut self, board: &Board, pipes: &PipeStore, cell: Cell) -> ExtendOutcome {
        let Some(trace) = self.active.as_mut() else {
            return ExtendOutcome::Idle;
        };

        let len = trace.path.len();
        if len >= 2 && trace.path[len - 2] == cell {
            trace.pop();
            return ExtendOutcome::Retracted;
        }

        let Some(&last) = trace.path.last() else {
            return ExtendOutcome::Ignored;
        };
        if !board.in_bounds(cell) || !last.is_adjacent(cell) {
            return ExtendOutcome::Ignored;
        }

        let endpoints = trace.path.iter().filter(|c| board.is_endpoint(**c)).count();
        if endpoints >= 2 {
            return ExtendOutcome::Ignored;
        }

        let color = trace.color;
        let foreign_endpoint = board.color_at(cell).is_some_and(|c| c != color);
        let foreign_pipe = pipes.color_at(cell).is_some_and(|c| c != color);
        if foreign_endpoint || foreign_pipe {
            self.cancel();
            return ExtendOutcome::Cancelled;
        }

        if trace.on_path.contains(&cell) {
            return ExtendOutcome::Ignored;
        }

        trace.push(cell);
        ExtendOutcome::Appended
    }

    /// Finish the trace. Paths shorter than two cells are dropped without
    /// touching the store. Safe to call when idle.
    pub fn commit(&mut self, pipes: &mut PipeStore) -> CommitOutcome {
        let Some(trace) = self.active.take() else {
            return CommitOutcome::Idle;
        };
        if trace.path.len() < 2 {
            return CommitOutcome::Cancelled;
        }
        commit_path(pipes, &trace.path, trace.color);
        CommitOutcome::Committed {
            color: trace.color,
            path: trace.path,
        }
    }

    /// Drop the active trace without touching the store.
    pub fn cancel(&mut self) {
        self.active = None;
    }
}
