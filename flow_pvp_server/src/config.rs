// Data-driven server configuration.
//
// Every tunable the session authority reads lives in `ServerConfig`: where to
// listen, lobby capacity, which board sizes and round lengths clients may pick,
// how many boards a round hands out, and how often the authority sweeps for
// expired rounds. The struct is `#[serde(default)]`, so a config file only
// needs the fields it changes; `flow-pvp-server --config <file>` loads one and
// CLI flags override individual fields afterwards (see `main.rs`).
//
// `LobbyRules` is the slice of the config a single `Lobby` needs. It is
// derived once and cloned into each lobby so lobby code never reaches back
// into the server config.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use flow_pvp_puzzle::BoardCatalog;
use serde::{Deserialize, Serialize};

use crate::error::ServerError;

/// Boards handed out per 30 seconds of round time for sizes missing from
/// `boards_per_30s`.
const FALLBACK_BOARDS_PER_30S: u32 = 8;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the TCP listener binds. Port 0 picks a free port.
    pub bind_addr: String,
    /// Members allowed per lobby.
    pub max_players: usize,
    /// Board size a fresh lobby starts with.
    pub default_board_size: u32,
    /// Round length in seconds a fresh lobby starts with.
    pub default_game_time: u32,
    /// Board sizes clients may choose.
    pub board_sizes: Vec<u32>,
    pub min_game_time: u32,
    pub max_game_time: u32,
    /// Boards per 30 seconds of round time, keyed by board size.
    pub boards_per_30s: BTreeMap<u32, u32>,
    /// How often the authority checks round deadlines, in milliseconds.
    pub tick_interval_ms: u64,
    /// Seed for the authority's PRNG. Drawn from the clock when absent.
    pub seed: Option<u64>,
    /// Board catalog file. The built-in catalog is used when absent.
    pub catalog_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let mut boards_per_30s = BTreeMap::new();
        boards_per_30s.insert(5, 20);
        boards_per_30s.insert(6, 16);
        boards_per_30s.insert(7, 12);
        boards_per_30s.insert(8, 8);
        Self {
            bind_addr: "127.0.0.1:5000".into(),
            max_players: 2,
            default_board_size: 5,
            default_game_time: 60,
            board_sizes: vec![5, 6, 7, 8],
            min_game_time: 30,
            max_game_time: 600,
            boards_per_30s,
            tick_interval_ms: 100,
            seed: None,
            catalog_path: None,
        }
    }
}

impl ServerConfig {
    pub fn from_json(json: &str) -> Result<Self, ServerError> {
        let config: ServerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ServerError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Reject configs under which no lobby could ever start a game.
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.max_players == 0 {
            return Err(ServerError::Config("max_players must be at least 1".into()));
        }
        if self.board_sizes.is_empty() {
            return Err(ServerError::Config("board_sizes must not be empty".into()));
        }
        if !self.board_sizes.contains(&self.default_board_size) {
            return Err(ServerError::Config(format!(
                "default_board_size {} is not in board_sizes {:?}",
                self.default_board_size, self.board_sizes
            )));
        }
        if self.min_game_time == 0 || self.min_game_time > self.max_game_time {
            return Err(ServerError::Config(format!(
                "game time bounds {}..={} are empty",
                self.min_game_time, self.max_game_time
            )));
        }
        if !(self.min_game_time..=self.max_game_time).contains(&self.default_game_time) {
            return Err(ServerError::Config(format!(
                "default_game_time {} is outside {}..={}",
                self.default_game_time, self.min_game_time, self.max_game_time
            )));
        }
        if self.tick_interval_ms == 0 {
            return Err(ServerError::Config("tick_interval_ms must be positive".into()));
        }
        Ok(())
    }

    /// The board catalog named by `catalog_path`, or the built-in one.
    pub fn load_catalog(&self) -> Result<BoardCatalog, ServerError> {
        let catalog = match &self.catalog_path {
            Some(path) => BoardCatalog::from_path(path)?,
            None => BoardCatalog::builtin()?,
        };
        Ok(catalog)
    }

    /// Configured board sizes the catalog has no boards for. Starting a
    /// game at one of these sizes is rejected.
    pub fn missing_sizes(&self, catalog: &BoardCatalog) -> Vec<u32> {
        self.board_sizes
            .iter()
            .copied()
            .filter(|&size| catalog.boards_of_size(size as usize).is_empty())
            .collect()
    }

    pub fn lobby_rules(&self) -> LobbyRules {
        LobbyRules {
            max_players: self.max_players,
            board_sizes: self.board_sizes.clone(),
            min_game_time: self.min_game_time,
            max_game_time: self.max_game_time,
            boards_per_30s: self.boards_per_30s.clone(),
        }
    }
}

/// Limits a lobby enforces on its members and settings.
#[derive(Clone, Debug, PartialEq)]
pub struct LobbyRules {
    pub max_players: usize,
    pub board_sizes: Vec<u32>,
    pub min_game_time: u32,
    pub max_game_time: u32,
    pub boards_per_30s: BTreeMap<u32, u32>,
}

impl LobbyRules {
    /// Number of boards a round of `game_time` seconds on `board_size`
    /// boards hands out. Always at least one.
    pub fn boards_for(&self, board_size: u32, game_time: u32) -> usize {
        let per_30s = self
            .boards_per_30s
            .get(&board_size)
            .copied()
            .unwrap_or(FALLBACK_BOARDS_PER_30S);
        ((game_time / 30) * per_30s).max(1) as usize
    }
}

impl Default for LobbyRules {
    fn default() -> Self {
        ServerConfig::default().lobby_rules()
    }
}
