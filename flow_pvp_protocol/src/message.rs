// Protocol messages between clients and the session server.
//
// Two enums define the whole vocabulary:
// - `ClientMessage`: requests a client sends.
// - `ServerMessage`: replies and broadcasts the server sends.
//
// Both are adjacently tagged, so each message is `{"event": <name>,
// "data": {...}}` with snake_case event names (`join_lobby`,
// `score_updated`, ...). Unit messages omit `data`.
//
// Supporting structs (`PlayerInfo`, `LobbySnapshot`) carry lobby state.
// `players` maps are `BTreeMap`s keyed by `UserId`, so the same lobby always
// serializes the same way.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::board::WireBoard;
use crate::types::{LobbyCode, PlayerColor, UserId};

/// Messages sent by a client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Ask for a fresh user id. Must precede `join_lobby`.
    GenerateUserId,
    /// Allocate a new, empty lobby.
    CreateLobby,
    JoinLobby {
        lobby_id: LobbyCode,
        user_id: UserId,
    },
    LeaveLobby {
        lobby_id: LobbyCode,
        user_id: UserId,
    },
    GetLobbyInfo {
        lobby_id: LobbyCode,
    },
    SetUsername {
        lobby_id: LobbyCode,
        user_id: UserId,
        username: String,
    },
    SetLobbyBoardSize {
        lobby_id: LobbyCode,
        board_size: u32,
    },
    SetLobbyGameTime {
        lobby_id: LobbyCode,
        game_time: u32,
    },
    StartGame {
        lobby_id: LobbyCode,
        board_size: u32,
        game_time: u32,
    },
    /// The sender finished a board. `board_index` names which one; when
    /// present the server only counts it if it is the board the sender is on.
    IncrementScore {
        lobby_id: LobbyCode,
        user_id: UserId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        board_index: Option<u32>,
    },
}

/// Messages sent by the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    UserIdGenerated {
        user_id: UserId,
    },
    LobbyCreated {
        lobby_id: LobbyCode,
    },
    PlayerJoined {
        lobby_id: LobbyCode,
        user_id: UserId,
    },
    PlayerLeft {
        lobby_id: LobbyCode,
        user_id: UserId,
    },
    LobbyInfo {
        lobby_id: LobbyCode,
        players: BTreeMap<UserId, PlayerInfo>,
        board_size: u32,
        game_time: u32,
    },
    UsernameSet {
        lobby_id: LobbyCode,
        user_id: UserId,
        username: String,
    },
    LobbyBoardSizeSet {
        lobby_id: LobbyCode,
        board_size: u32,
    },
    LobbyGameTimeSet {
        lobby_id: LobbyCode,
        game_time: u32,
    },
    /// The match began. Every member receives the same snapshot, boards
    /// included, before any score for this match is broadcast.
    GameStarted {
        lobby: LobbySnapshot,
    },
    ScoreUpdated {
        user_id: UserId,
        score: u32,
    },
    /// The match ended on the server's clock or because a player ran out
    /// of boards.
    GameOver {
        lobby_id: LobbyCode,
        reason: GameOverReason,
        final_scores: BTreeMap<UserId, u32>,
    },
    /// A request was rejected. Informational; the connection stays open.
    Error {
        message: String,
    },
}

/// Public per-player lobby state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub username: String,
    pub color: PlayerColor,
    pub score: u32,
}

/// Full lobby state sent with `game_started`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LobbySnapshot {
    pub lobby_id: LobbyCode,
    pub players: BTreeMap<UserId, PlayerInfo>,
    pub boards: Vec<WireBoard>,
    pub board_size: u32,
    pub game_time: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverReason {
    TimeUp,
    BoardsExhausted,
}
