// Identifier and value types shared by both directions of the protocol.
//
// - `UserId`: opaque token the server hands out on `generate_user_id`. The
//   server draws six lowercase hex characters (a truncated UUID shape), but
//   clients must treat it as an arbitrary string.
// - `LobbyCode`: short code naming a lobby. Always stored uppercase so codes
//   typed by hand in lowercase still match; deserialization normalizes too.
// - `PlayerColor`: the badge color a player is given on joining.

use serde::{Deserialize, Serialize};

/// Server-issued user identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        UserId(s.to_string())
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lobby code, normalized to uppercase with surrounding whitespace removed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct LobbyCode(String);

impl LobbyCode {
    pub fn new(raw: &str) -> Self {
        LobbyCode(raw.trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for LobbyCode {
    fn from(raw: String) -> Self {
        LobbyCode::new(&raw)
    }
}

impl From<&str> for LobbyCode {
    fn from(raw: &str) -> Self {
        LobbyCode::new(raw)
    }
}

impl From<LobbyCode> for String {
    fn from(code: LobbyCode) -> Self {
        code.0
    }
}

impl std::fmt::Display for LobbyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Badge color for a player within a lobby. No two members share one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerColor {
    Red,
    DodgerBlue,
    Green,
    Yellow,
    Cyan,
    Magenta,
    Lime,
    Orange,
}

impl PlayerColor {
    pub const ALL: [PlayerColor; 8] = [
        PlayerColor::Red,
        PlayerColor::DodgerBlue,
        PlayerColor::Green,
        PlayerColor::Yellow,
        PlayerColor::Cyan,
        PlayerColor::Magenta,
        PlayerColor::Lime,
        PlayerColor::Orange,
    ];

    /// CSS color name.
    pub fn name(self) -> &'static str {
        match self {
            PlayerColor::Red => "red",
            PlayerColor::DodgerBlue => "dodgerblue",
            PlayerColor::Green => "green",
            PlayerColor::Yellow => "yellow",
            PlayerColor::Cyan => "cyan",
            PlayerColor::Magenta => "magenta",
            PlayerColor::Lime => "lime",
            PlayerColor::Orange => "orange",
        }
    }
}
