// Square puzzle board: endpoint layout for one round.
//
// A board is stored as a flat `Vec<u8>` indexed by `row * size + col`.
// Value 0 is an empty cell; any other value is an endpoint of that color.
// Boards are immutable once built; the drawn pipes live in a separate
// `PipeStore` (see `pipes.rs`) so a board can be shared between rounds and
// players untouched.
//
// Out-of-bounds reads return 0, matching an empty cell, so callers probing
// neighbors never need a separate bounds check.
//
// On the wire and in catalog files a board is a plain nested array of rows
// (`[[1,0,2],[...]]`). Serde goes through `Vec<Vec<u8>>` and re-validates on
// the way in, so a deserialized `Board` is always square.

use serde::{Deserialize, Serialize};

use crate::error::BoardError;
use crate::types::{Cell, ColorId};

/// An `n × n` board of endpoint values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<u8>>", into = "Vec<Vec<u8>>")]
pub struct Board {
    size: usize,
    /// Flat storage: index = row * size + col.
    cells: Vec<u8>,
}

impl Board {
    /// Build a board from rows. Rejects empty and non-square grids.
    pub fn new(rows: Vec<Vec<u8>>) -> Result<Board, BoardError> {
        let size = rows.len();
        if size == 0 {
            return Err(BoardError::Empty);
        }
        let mut cells = Vec::with_capacity(size * size);
        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != size {
                return Err(BoardError::NotSquare {
                    row,
                    len: values.len(),
                    expected: size,
                });
            }
            cells.extend(values);
        }
        Ok(Board { size, cells })
    }

    /// Side length.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.row < self.size && cell.col < self.size
    }

    fn index(&self, cell: Cell) -> Option<usize> {
        self.in_bounds(cell).then(|| cell.row * self.size + cell.col)
    }

    /// Raw value at `cell`; 0 for empty or out-of-bounds cells.
    pub fn value(&self, cell: Cell) -> u8 {
        self.index(cell).map_or(0, |i| self.cells[i])
    }

    /// Endpoint color at `cell`, `None` for empty cells.
    pub fn color_at(&self, cell: Cell) -> Option<ColorId> {
        ColorId::from_value(self.value(cell))
    }

    pub fn is_endpoint(&self, cell: Cell) -> bool {
        self.value(cell) != 0
    }

    /// Every cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.size * self.size).map(|i| Cell::new(i / self.size, i % self.size))
    }

    /// Endpoint cells with their colors, row-major.
    pub fn endpoints(&self) -> impl Iterator<Item = (Cell, ColorId)> + '_ {
        self.cells()
            .filter_map(|cell| self.color_at(cell).map(|color| (cell, color)))
    }

    /// Distinct endpoint colors, ascending.
    pub fn colors(&self) -> Vec<ColorId> {
        let mut colors: Vec<ColorId> = self.endpoints().map(|(_, color)| color).collect();
        colors.sort_unstable();
        colors.dedup();
        colors
    }

    /// Check that every color appears on exactly two cells.
    pub fn validate_pairs(&self) -> Result<(), BoardError> {
        let mut counts = [0usize; 256];
        for &value in &self.cells {
            counts[usize::from(value)] += 1;
        }
        for (value, &count) in counts.iter().enumerate().skip(1) {
            if count != 0 && count != 2 {
                return Err(BoardError::UnpairedColor {
                    color: ColorId(value as u8),
                    count,
                });
            }
        }
        Ok(())
    }

    /// Rows as nested vectors, the wire shape.
    pub fn to_rows(&self) -> Vec<Vec<u8>> {
        self.cells.chunks(self.size).map(<[u8]>::to_vec).collect()
    }
}

impl TryFrom<Vec<Vec<u8>>> for Board {
    type Error = BoardError;

    fn try_from(rows: Vec<Vec<u8>>) -> Result<Self, Self::Error> {
        Board::new(rows)
    }
}

impl From<Board> for Vec<Vec<u8>> {
    fn from(board: Board) -> Self {
        board.to_rows()
    }
}
