// Per-board play state: one board, its pipes, and the drag in progress.
//
// `GameState` is the explicit state container a client renders from. Input
// arrives as three calls mirroring pointer events (`press`, `enter`,
// `release`); each returns an outcome, and anything a view may want to react
// to is also queued as a `PuzzleEvent`. Views call `drain_events` after
// handling input and redraw from what changed. Nothing here is shared with
// other players: only the fact that the board was completed leaves the
// client (see `flow_pvp_client::controller`).
//
// Once the board is complete it is locked: further input is ignored until
// `load` swaps in the next board.

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::connectivity::{is_board_complete, remove_pipe};
use crate::pipes::PipeStore;
use crate::tracer::{CommitOutcome, ExtendOutcome, PathTracer, PressOutcome};
use crate::types::{Cell, ColorId};

/// Something the view should know about.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PuzzleEvent {
    TraceStarted { color: ColorId, from: Cell },
    TraceResumed { color: ColorId, len: usize },
    TraceCancelled,
    PipeErased { color: ColorId, cells: Vec<Cell> },
    PathCommitted { color: ColorId, path: Vec<Cell> },
    BoardCompleted,
}

/// Play state for a single board.
#[derive(Clone, Debug)]
pub struct GameState {
    board: Board,
    pipes: PipeStore,
    tracer: PathTracer,
    completed: bool,
    events: Vec<PuzzleEvent>,
}

impl GameState {
    pub fn new(board: Board) -> Self {
        let pipes = PipeStore::new(board.size());
        Self {
            board,
            pipes,
            tracer: PathTracer::new(),
            completed: false,
            events: Vec::new(),
        }
    }

    /// Replace the board and clear all pipes and drag state.
    pub fn load(&mut self, board: Board) {
        *self = Self::new(board);
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn pipes(&self) -> &PipeStore {
        &self.pipes
    }

    /// Cells of the drag in progress.
    pub fn current_path(&self) -> &[Cell] {
        self.tracer.path()
    }

    pub fn drag_color(&self) -> Option<ColorId> {
        self.tracer.color()
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    /// Pointer down on `cell`.
    ///
    /// Tapping an endpoint that already holds its own color erases that whole
    /// pipe. Otherwise a trace is started or resumed if the cell allows it.
    pub fn press(&mut self, cell: Cell) -> PressOutcome {
        if self.completed {
            return PressOutcome::Ignored;
        }

        let endpoint = self.board.color_at(cell);
        if let Some(color) = endpoint.filter(|&c| self.pipes.color_at(cell) == Some(c)) {
            self.tracer.cancel();
            let cells = remove_pipe(&mut self.pipes, cell, color);
            self.events.push(PuzzleEvent::PipeErased {
                color,
                cells: cells.clone(),
            });
            return PressOutcome::Erased { color, cells };
        }

        let outcome = self.tracer.start(&self.board, &mut self.pipes, cell);
        match &outcome {
            PressOutcome::Started { color } => self.events.push(PuzzleEvent::TraceStarted {
                color: *color,
                from: cell,
            }),
            PressOutcome::Resumed { color, len } => self.events.push(PuzzleEvent::TraceResumed {
                color: *color,
                len: *len,
            }),
            PressOutcome::Erased { .. } | PressOutcome::Ignored => {}
        }
        outcome
    }

    /// Pointer moved into `cell` while held down.
    pub fn enter(&mut self, cell: Cell) -> ExtendOutcome {
        if self.completed {
            return ExtendOutcome::Idle;
        }
        let outcome = self.tracer.extend(&self.board, &self.pipes, cell);
        if outcome == ExtendOutcome::Cancelled {
            self.events.push(PuzzleEvent::TraceCancelled);
        }
        outcome
    }

    /// Pointer released: commit the drag and re-check the win condition.
    pub fn release(&mut self) -> CommitOutcome {
        let outcome = self.tracer.commit(&mut self.pipes);
        match &outcome {
            CommitOutcome::Committed { color, path } => {
                self.events.push(PuzzleEvent::PathCommitted {
                    color: *color,
                    path: path.clone(),
                });
                if !self.completed && is_board_complete(&self.board, &self.pipes) {
                    self.completed = true;
                    self.events.push(PuzzleEvent::BoardCompleted);
                }
            }
            CommitOutcome::Cancelled => self.events.push(PuzzleEvent::TraceCancelled),
            CommitOutcome::Idle => {}
        }
        outcome
    }

    /// Abort the drag in progress (pointer left the board, view torn down).
    pub fn cancel(&mut self) {
        if self.tracer.is_tracing() {
            self.tracer.cancel();
            self.events.push(PuzzleEvent::TraceCancelled);
        }
    }

    /// Take all queued events.
    pub fn drain_events(&mut self) -> Vec<PuzzleEvent> {
        std::mem::take(&mut self.events)
    }
}
