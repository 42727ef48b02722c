// Pipe overlay: what the player has drawn on top of a board.
//
// `PipeStore` mirrors the board's flat layout with one `Option<Pipe>` per
// cell. A `Pipe` records its color and which of the four neighbors it is
// joined to. Reads and writes outside the board are ignored (reads return
// `None`), the same convention `Board` uses.
//
// The store itself enforces nothing about neighboring cells. Keeping
// `Connections` mutually consistent (A says `right` iff the cell to its right
// says `left` with the same color) is the job of `connectivity.rs`, which is
// the only module that writes whole paths into the store.

use serde::{Deserialize, Serialize};

use crate::types::{Cell, ColorId, Direction};

/// Which neighbors a pipe segment is joined to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connections {
    pub top: bool,
    pub right: bool,
    pub bottom: bool,
    pub left: bool,
}

impl Connections {
    pub const NONE: Connections = Connections {
        top: false,
        right: false,
        bottom: false,
        left: false,
    };

    pub fn get(self, dir: Direction) -> bool {
        match dir {
            Direction::Top => self.top,
            Direction::Right => self.right,
            Direction::Bottom => self.bottom,
            Direction::Left => self.left,
        }
    }

    pub fn set(&mut self, dir: Direction, value: bool) {
        match dir {
            Direction::Top => self.top = value,
            Direction::Right => self.right = value,
            Direction::Bottom => self.bottom = value,
            Direction::Left => self.left = value,
        }
    }

    /// Builder-style `set(dir, true)`.
    pub fn with(mut self, dir: Direction) -> Connections {
        self.set(dir, true);
        self
    }

    /// Directions that are set, in `Direction::ALL` order.
    pub fn directions(self) -> impl Iterator<Item = Direction> {
        Direction::ALL.into_iter().filter(move |&dir| self.get(dir))
    }

    pub fn count(self) -> usize {
        self.directions().count()
    }
}

/// One drawn pipe segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipe {
    pub color: ColorId,
    pub connections: Connections,
}

/// Per-cell pipe overlay for a square board.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipeStore {
    size: usize,
    /// Flat storage: index = row * size + col.
    cells: Vec<Option<Pipe>>,
}

impl PipeStore {
    /// An empty overlay for a `size × size` board.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![None; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    fn index(&self, cell: Cell) -> Option<usize> {
        (cell.row < self.size && cell.col < self.size).then(|| cell.row * self.size + cell.col)
    }

    pub fn get(&self, cell: Cell) -> Option<&Pipe> {
        self.index(cell).and_then(|i| self.cells[i].as_ref())
    }

    pub fn get_mut(&mut self, cell: Cell) -> Option<&mut Pipe> {
        self.index(cell).and_then(|i| self.cells[i].as_mut())
    }

    /// Color of the pipe at `cell`, if any.
    pub fn color_at(&self, cell: Cell) -> Option<ColorId> {
        self.get(cell).map(|pipe| pipe.color)
    }

    pub fn has_pipe(&self, cell: Cell) -> bool {
        self.get(cell).is_some()
    }

    /// Store `pipe` at `cell`, replacing whatever was there.
    pub fn set(&mut self, cell: Cell, pipe: Pipe) {
        if let Some(i) = self.index(cell) {
            self.cells[i] = Some(pipe);
        }
    }

    /// Remove and return the pipe at `cell`.
    pub fn clear(&mut self, cell: Cell) -> Option<Pipe> {
        self.index(cell).and_then(|i| self.cells[i].take())
    }

    /// Remove every pipe.
    pub fn clear_all(&mut self) {
        self.cells.iter_mut().for_each(|slot| *slot = None);
    }

    /// Number of cells holding a pipe.
    pub fn occupied(&self) -> usize {
        self.cells.iter().filter(|slot| slot.is_some()).count()
    }

    /// Occupied cells with their pipes, row-major.
    pub fn iter(&self) -> impl Iterator<Item = (Cell, &Pipe)> + '_ {
        let size = self.size;
        self.cells.iter().enumerate().filter_map(move |(i, slot)| {
            slot.as_ref()
                .map(|pipe| (Cell::new(i / size, i % size), pipe))
        })
    }
}
