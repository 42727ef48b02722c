// One lobby's state machine: roster, settings, board sequence, scores.
//
// `Lobby` is pure state. It never touches a socket or a clock: callers pass
// `now` in and turn the returned values into broadcasts (see `authority.rs`).
// That keeps every transition unit-testable with synthetic instants.
//
// Phases:
//
//   Open ──start──▶ InRound { deadline } ──deadline / boards exhausted──▶ Finished
//                                                                           │
//                        ◀──────────────────── start (rematch) ─────────────┘
//
// - `Open`: members join and leave, usernames and settings may change.
// - `InRound`: boards are fixed, scores accumulate. Joining is refused and
//   settings are locked. Each player's current board index is their score;
//   the per-player `InRound(i)` / `RoundOver(i)` split lives on the client.
// - `Finished`: scores are final. Members may leave, new players may join,
//   and any member may start a rematch with fresh boards and zeroed scores.
//
// Starting a game is atomic: boards are drawn, scores reset, and the deadline
// set before the snapshot is returned, so the `game_started` broadcast always
// carries the complete board sequence.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use flow_pvp_prng::GameRng;
use flow_pvp_protocol::{
    GameOverReason, LobbyCode, LobbySnapshot, PlayerColor, PlayerInfo, ServerMessage, UserId,
    wire_board,
};

use crate::config::LobbyRules;
use crate::error::LobbyError;

/// Longest username accepted, in characters.
pub const MAX_USERNAME_CHARS: usize = 24;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LobbyPhase {
    Open,
    InRound { deadline: Instant },
    Finished { reason: GameOverReason },
}

/// Result of an accepted score report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScoreChange {
    pub score: u32,
    /// Set when this report used up the reporting player's last board.
    pub game_over: Option<GameOverReason>,
}

pub struct Lobby {
    code: LobbyCode,
    rules: LobbyRules,
    players: BTreeMap<UserId, PlayerInfo>,
    board_size: u32,
    game_time: u32,
    boards: Vec<Vec<Vec<u8>>>,
    phase: LobbyPhase,
    created_at: Instant,
}

impl Lobby {
    pub fn new(
        code: LobbyCode,
        rules: LobbyRules,
        board_size: u32,
        game_time: u32,
        now: Instant,
    ) -> Self {
        Self {
            code,
            rules,
            players: BTreeMap::new(),
            board_size,
            game_time,
            boards: Vec::new(),
            phase: LobbyPhase::Open,
            created_at: now,
        }
    }

    pub fn code(&self) -> &LobbyCode {
        &self.code
    }

    pub fn phase(&self) -> &LobbyPhase {
        &self.phase
    }

    pub fn players(&self) -> &BTreeMap<UserId, PlayerInfo> {
        &self.players
    }

    pub fn player(&self, user: &UserId) -> Option<&PlayerInfo> {
        self.players.get(user)
    }

    pub fn is_member(&self, user: &UserId) -> bool {
        self.players.contains_key(user)
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn board_size(&self) -> u32 {
        self.board_size
    }

    pub fn game_time(&self) -> u32 {
        self.game_time
    }

    pub fn boards(&self) -> &[Vec<Vec<u8>>] {
        &self.boards
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self.phase {
            LobbyPhase::InRound { deadline } => Some(deadline),
            _ => None,
        }
    }

    /// Add `user` with a default username (their id), a color no other
    /// member has, and score 0.
    pub fn join(&mut self, user: UserId, rng: &mut GameRng) -> Result<PlayerInfo, LobbyError> {
        if self.players.contains_key(&user) {
            return Err(LobbyError::AlreadyInLobby(self.code.clone()));
        }
        if matches!(self.phase, LobbyPhase::InRound { .. }) {
            return Err(LobbyError::GameInProgress);
        }
        if self.players.len() >= self.rules.max_players {
            return Err(LobbyError::Full);
        }
        let unused: Vec<PlayerColor> = PlayerColor::ALL
            .iter()
            .copied()
            .filter(|c| self.players.values().all(|p| p.color != *c))
            .collect();
        // Lobbies larger than the palette reuse colors round-robin.
        let color = rng
            .choose(&unused)
            .copied()
            .unwrap_or(PlayerColor::ALL[self.players.len() % PlayerColor::ALL.len()]);
        let info = PlayerInfo {
            username: user.to_string(),
            color,
            score: 0,
        };
        self.players.insert(user, info.clone());
        Ok(info)
    }

    pub fn leave(&mut self, user: &UserId) -> Result<PlayerInfo, LobbyError> {
        self.players.remove(user).ok_or(LobbyError::NotMember)
    }

    /// Rename a member. Surrounding whitespace is dropped; returns the name
    /// as stored.
    pub fn set_username(&mut self, user: &UserId, username: &str) -> Result<String, LobbyError> {
        self.require_open()?;
        let player = self.players.get_mut(user).ok_or(LobbyError::NotMember)?;
        let name = username.trim();
        let chars = name.chars().count();
        if chars == 0 || chars > MAX_USERNAME_CHARS {
            return Err(LobbyError::InvalidUsername {
                max: MAX_USERNAME_CHARS,
            });
        }
        player.username = name.to_string();
        Ok(player.username.clone())
    }

    pub fn set_board_size(&mut self, board_size: u32) -> Result<(), LobbyError> {
        self.require_open()?;
        self.check_board_size(board_size)?;
        self.board_size = board_size;
        Ok(())
    }

    pub fn set_game_time(&mut self, game_time: u32) -> Result<(), LobbyError> {
        self.require_open()?;
        self.check_game_time(game_time)?;
        self.game_time = game_time;
        Ok(())
    }

    /// Start a match (or a rematch from `Finished`).
    ///
    /// `draw(board_size, count)` supplies the board sequence. It runs after
    /// every other check, so a rejected start never consumes randomness.
    pub fn start<F>(
        &mut self,
        user: &UserId,
        board_size: u32,
        game_time: u32,
        now: Instant,
        draw: F,
    ) -> Result<LobbySnapshot, LobbyError>
    where
        F: FnOnce(u32, usize) -> Result<Vec<Vec<Vec<u8>>>, LobbyError>,
    {
        if matches!(self.phase, LobbyPhase::InRound { .. }) {
            return Err(LobbyError::GameInProgress);
        }
        if !self.is_member(user) {
            return Err(LobbyError::NotMember);
        }
        self.check_board_size(board_size)?;
        self.check_game_time(game_time)?;

        let boards = draw(board_size, self.rules.boards_for(board_size, game_time))?;
        if boards.is_empty() {
            return Err(LobbyError::NoBoards(board_size));
        }

        self.board_size = board_size;
        self.game_time = game_time;
        self.boards = boards;
        for player in self.players.values_mut() {
            player.score = 0;
        }
        self.phase = LobbyPhase::InRound {
            deadline: now + Duration::from_secs(u64::from(game_time)),
        };
        Ok(self.snapshot())
    }

    /// Count one completed board for `user`.
    ///
    /// With `board_index` present the report only counts if it names the
    /// board the player is on, which makes a resent report harmless.
    pub fn increment_score(
        &mut self,
        user: &UserId,
        board_index: Option<u32>,
        now: Instant,
    ) -> Result<ScoreChange, LobbyError> {
        let deadline = match self.phase {
            LobbyPhase::InRound { deadline } => deadline,
            LobbyPhase::Open | LobbyPhase::Finished { .. } => {
                return Err(LobbyError::NoGameInProgress);
            }
        };
        if now >= deadline {
            return Err(LobbyError::TimeUp);
        }
        let total = u32::try_from(self.boards.len()).unwrap_or(u32::MAX);
        let player = self.players.get_mut(user).ok_or(LobbyError::NotMember)?;
        if let Some(got) = board_index.filter(|&got| got != player.score) {
            return Err(LobbyError::StaleScore {
                expected: player.score,
                got,
            });
        }
        if player.score >= total {
            return Err(LobbyError::NoBoardsLeft);
        }
        player.score += 1;
        let score = player.score;

        let game_over = (score >= total).then_some(GameOverReason::BoardsExhausted);
        if let Some(reason) = game_over {
            self.phase = LobbyPhase::Finished { reason };
        }
        Ok(ScoreChange { score, game_over })
    }

    /// Finish the round if its deadline has passed. Returns the reason only
    /// on the transition.
    pub fn tick(&mut self, now: Instant) -> Option<GameOverReason> {
        match self.phase {
            LobbyPhase::InRound { deadline } if now >= deadline => {
                self.phase = LobbyPhase::Finished {
                    reason: GameOverReason::TimeUp,
                };
                Some(GameOverReason::TimeUp)
            }
            _ => None,
        }
    }

    pub fn snapshot(&self) -> LobbySnapshot {
        LobbySnapshot {
            lobby_id: self.code.clone(),
            players: self.players.clone(),
            boards: self.boards.iter().map(|b| wire_board(b)).collect(),
            board_size: self.board_size,
            game_time: self.game_time,
        }
    }

    pub fn info_message(&self) -> ServerMessage {
        ServerMessage::LobbyInfo {
            lobby_id: self.code.clone(),
            players: self.players.clone(),
            board_size: self.board_size,
            game_time: self.game_time,
        }
    }

    pub fn final_scores(&self) -> BTreeMap<UserId, u32> {
        self.players
            .iter()
            .map(|(id, p)| (id.clone(), p.score))
            .collect()
    }

    fn require_open(&self) -> Result<(), LobbyError> {
        match self.phase {
            LobbyPhase::Open => Ok(()),
            _ => Err(LobbyError::SettingsLocked),
        }
    }

    fn check_board_size(&self, board_size: u32) -> Result<(), LobbyError> {
        if self.rules.board_sizes.contains(&board_size) {
            Ok(())
        } else {
            Err(LobbyError::InvalidBoardSize {
                size: board_size,
                allowed: self.rules.board_sizes.clone(),
            })
        }
    }

    fn check_game_time(&self, game_time: u32) -> Result<(), LobbyError> {
        if (self.rules.min_game_time..=self.rules.max_game_time).contains(&game_time) {
            Ok(())
        } else {
            Err(LobbyError::InvalidGameTime {
                time: game_time,
                min: self.rules.min_game_time,
                max: self.rules.max_game_time,
            })
        }
    }
}
