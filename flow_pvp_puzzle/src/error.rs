// Error types for board construction and catalog loading.
//
// Gesture handling never fails: invalid drags are reported through the
// outcome enums in `tracer.rs`. Only data coming from outside the crate
// (board grids, catalog files) can be rejected.

use thiserror::Error;

use crate::types::ColorId;

/// A grid that cannot be used as a board.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("board has no rows")]
    Empty,
    #[error("board is not square: row {row} has {len} cells, expected {expected}")]
    NotSquare {
        row: usize,
        len: usize,
        expected: usize,
    },
    #[error("color {color} appears {count} times, expected exactly 2")]
    UnpairedColor { color: ColorId, count: usize },
}

/// Failure to load or draw from a board catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),
    #[error("catalog board #{index} is invalid: {source}")]
    InvalidBoard {
        index: usize,
        #[source]
        source: BoardError,
    },
    #[error("no boards of size {0} in catalog")]
    NoBoardsForSize(usize),
}
