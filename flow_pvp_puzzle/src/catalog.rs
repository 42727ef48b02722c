// Board catalog: the fixed pool of puzzles a match draws from.
//
// Boards are authored offline (generation is not part of this crate) and
// shipped as JSON: `{"boards": [[[1,0,...],...], ...]}`. Every board is
// validated on load (square, each color exactly twice) and grouped by size.
// A built-in catalog covering sizes 5 through 8 is compiled in from
// `data/boards.json`; the server can point at a different file instead.
//
// `select` builds the ordered board list for one match: the boards of the
// requested size in a shuffled order, cycling through that order again if
// the match needs more boards than the catalog holds.

use std::collections::BTreeMap;
use std::path::Path;

use flow_pvp_prng::GameRng;
use serde::Deserialize;

use crate::board::Board;
use crate::error::CatalogError;

const BUILTIN_JSON: &str = include_str!("../data/boards.json");

#[derive(Deserialize)]
struct CatalogFile {
    boards: Vec<Vec<Vec<u8>>>,
}

/// Validated boards grouped by side length.
#[derive(Clone, Debug, Default)]
pub struct BoardCatalog {
    by_size: BTreeMap<usize, Vec<Board>>,
}

impl BoardCatalog {
    /// The catalog compiled into the crate.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_JSON)
    }

    /// Parse and validate a catalog document.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::from_rows(file.boards)
    }

    /// Load a catalog file from disk.
    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Build from raw grids, validating each.
    pub fn from_rows(grids: Vec<Vec<Vec<u8>>>) -> Result<Self, CatalogError> {
        let mut catalog = BoardCatalog::default();
        for (index, rows) in grids.into_iter().enumerate() {
            let board = Board::new(rows)
                .and_then(|board| board.validate_pairs().map(|()| board))
                .map_err(|source| CatalogError::InvalidBoard { index, source })?;
            catalog.insert(board);
        }
        Ok(catalog)
    }

    /// Add a board. Callers are trusted to have validated it.
    pub fn insert(&mut self, board: Board) {
        self.by_size.entry(board.size()).or_default().push(board);
    }

    /// Sizes with at least one board, ascending.
    pub fn sizes(&self) -> Vec<usize> {
        self.by_size.keys().copied().collect()
    }

    pub fn boards_of_size(&self, size: usize) -> &[Board] {
        self.by_size.get(&size).map_or(&[], Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.by_size.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_size.is_empty()
    }

    /// Draw `count` boards of `size` in a shuffled order, repeating the
    /// shuffled cycle when `count` exceeds the pool.
    pub fn select(
        &self,
        size: usize,
        count: usize,
        rng: &mut GameRng,
    ) -> Result<Vec<Board>, CatalogError> {
        let pool = self.boards_of_size(size);
        if pool.is_empty() {
            return Err(CatalogError::NoBoardsForSize(size));
        }
        let mut order: Vec<usize> = (0..pool.len()).collect();
        rng.shuffle(&mut order);
        Ok(order
            .iter()
            .cycle()
            .take(count)
            .map(|&i| pool[i].clone())
            .collect())
    }
}
