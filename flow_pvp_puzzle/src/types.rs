// Core value types shared by every puzzle module.
//
// - `Cell`: a `(row, col)` grid coordinate. Cells are unsigned; stepping off
//   the top or left edge yields `None` instead of wrapping.
// - `Direction`: the four cardinal directions a pipe segment can connect in.
//   `Direction::ALL` fixes the iteration order (top, right, bottom, left)
//   everywhere connections are scanned, so walks are reproducible.
// - `ColorId`: an endpoint color, i.e. a non-zero board value. The display
//   names match the palette the game client renders.
//
// See also: `board.rs` for the grid these coordinates index into, `pipes.rs`
// for the per-cell `Connections` keyed by `Direction`.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A grid coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// The neighbor one step in `dir` on an `size × size` board, or `None`
    /// if that would leave the board.
    pub fn step(self, dir: Direction, size: usize) -> Option<Cell> {
        let (row, col) = match dir {
            Direction::Top => (self.row.checked_sub(1)?, self.col),
            Direction::Right => (self.row, self.col + 1),
            Direction::Bottom => (self.row + 1, self.col),
            Direction::Left => (self.row, self.col.checked_sub(1)?),
        };
        (row < size && col < size).then_some(Cell { row, col })
    }

    /// All in-bounds cardinal neighbors, paired with the direction that
    /// reaches them.
    pub fn neighbors(self, size: usize) -> SmallVec<[(Direction, Cell); 4]> {
        Direction::ALL
            .iter()
            .filter_map(|&dir| self.step(dir, size).map(|n| (dir, n)))
            .collect()
    }

    /// The direction from `self` to `other` if they are cardinally adjacent.
    pub fn direction_to(self, other: Cell) -> Option<Direction> {
        if self.row == other.row {
            if other.col == self.col + 1 {
                return Some(Direction::Right);
            }
            if other.col + 1 == self.col {
                return Some(Direction::Left);
            }
        } else if self.col == other.col {
            if other.row == self.row + 1 {
                return Some(Direction::Bottom);
            }
            if other.row + 1 == self.row {
                return Some(Direction::Top);
            }
        }
        None
    }

    pub fn is_adjacent(self, other: Cell) -> bool {
        self.direction_to(other).is_some()
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}

/// Cardinal direction on the grid. Row 0 is the top edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Top,
    Right,
    Bottom,
    Left,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Top,
        Direction::Right,
        Direction::Bottom,
        Direction::Left,
    ];

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Top => Direction::Bottom,
            Direction::Right => Direction::Left,
            Direction::Bottom => Direction::Top,
            Direction::Left => Direction::Right,
        }
    }
}

/// Names of the first twelve endpoint colors, indexed by `id - 1`.
const COLOR_NAMES: [&str; 12] = [
    "green", "yellow", "blue", "red", "purple", "orange", "pink", "brown", "cyan", "magenta",
    "lime", "teal",
];

/// An endpoint color. Wraps the non-zero board value that marks an endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorId(pub u8);

impl ColorId {
    /// The color an endpoint value denotes. `0` is an empty cell, not a color.
    pub fn from_value(value: u8) -> Option<ColorId> {
        (value != 0).then_some(ColorId(value))
    }

    /// Display name. Ids past the named palette get a generic label.
    pub fn name(self) -> String {
        match COLOR_NAMES.get(usize::from(self.0).wrapping_sub(1)) {
            Some(name) => (*name).to_string(),
            None => format!("color-{}", self.0),
        }
    }
}

impl std::fmt::Display for ColorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name())
    }
}
