// Error types for the session authority.
//
// `LobbyError` covers every request the authority rejects. Its `Display`
// text is sent verbatim as the `message` of the `error` reply, so the
// wording is user-facing. None of these end the connection.
//
// `ServerError` covers startup: config and catalog loading, binding the
// listener.

use flow_pvp_protocol::LobbyCode;
use flow_pvp_puzzle::CatalogError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LobbyError {
    #[error("Lobby not found")]
    NotFound,
    #[error("Lobby is full")]
    Full,
    #[error("Lobby or user not found")]
    NotMember,
    #[error("Unknown user id; request one with generate_user_id")]
    UnknownUser,
    #[error("User id does not belong to this connection")]
    UserMismatch,
    #[error("User is already in lobby {0}")]
    AlreadyInLobby(LobbyCode),
    #[error("Leave lobby {0} before requesting a new user id")]
    StillInLobby(LobbyCode),
    #[error("A game is already in progress")]
    GameInProgress,
    #[error("Lobby settings can only change before the game starts")]
    SettingsLocked,
    #[error("No game in progress")]
    NoGameInProgress,
    #[error("Time is up")]
    TimeUp,
    #[error("Score report for board {got} does not match current board {expected}")]
    StaleScore { expected: u32, got: u32 },
    #[error("No boards left")]
    NoBoardsLeft,
    #[error("Invalid board size {size}; choose one of {allowed:?}")]
    InvalidBoardSize { size: u32, allowed: Vec<u32> },
    #[error("Invalid game time {time}; must be between {min} and {max} seconds")]
    InvalidGameTime { time: u32, min: u32, max: u32 },
    #[error("Username must be 1 to {max} characters")]
    InvalidUsername { max: usize },
    #[error("No boards available for size {0}")]
    NoBoards(u32),
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config is not valid JSON: {0}")]
    ConfigJson(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Config(String),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
