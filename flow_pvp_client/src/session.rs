// Client-side replica of the server's lobby and match state.
//
// `SessionState` changes only when an authoritative `ServerMessage` is
// applied. Shared fields (roster, scores, settings, the board sequence) are
// never updated optimistically; a client learns its own score from the
// `score_updated` broadcast like everybody else. `apply` returns the list of
// `SessionChange`s the message caused, which is what views and the
// `MatchController` react to.
//
// Boards arrive as wire tokens inside `game_started` and are normalized and
// turned into puzzle `Board`s here. A start whose boards are not all square
// grids is refused as a whole (`SessionChange::Rejected`), since playing a
// partial sequence would desynchronize board indices from scores.
//
// `MatchOutcome` labels a set of scores at the end of a match.

use std::collections::BTreeMap;

use flow_pvp_protocol::{
    GameOverReason, LobbyCode, PlayerInfo, ServerMessage, UserId, normalize_board,
};
use flow_pvp_puzzle::Board;

/// What an applied server message changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionChange {
    UserIdAssigned(UserId),
    LobbyCreated(LobbyCode),
    /// `is_self` is true when this client's user is the one who joined.
    PlayerJoined { user_id: UserId, is_self: bool },
    PlayerLeft { user_id: UserId, is_self: bool },
    RosterRefreshed,
    UsernameChanged { user_id: UserId, username: String },
    BoardSizeChanged(u32),
    GameTimeChanged(u32),
    GameStarted { boards: usize, game_time: u32 },
    ScoreChanged { user_id: UserId, score: u32 },
    GameOver { reason: GameOverReason },
    Rejected(String),
}

#[derive(Clone, Debug, Default)]
pub struct SessionState {
    user_id: Option<UserId>,
    lobby_id: Option<LobbyCode>,
    /// Last lobby this client created, until it joins one.
    created_lobby: Option<LobbyCode>,
    players: BTreeMap<UserId, PlayerInfo>,
    board_size: u32,
    game_time: u32,
    boards: Vec<Board>,
    game_over: Option<GameOverReason>,
    last_error: Option<String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    pub fn lobby_id(&self) -> Option<&LobbyCode> {
        self.lobby_id.as_ref()
    }

    pub fn created_lobby(&self) -> Option<&LobbyCode> {
        self.created_lobby.as_ref()
    }

    pub fn players(&self) -> &BTreeMap<UserId, PlayerInfo> {
        &self.players
    }

    pub fn board_size(&self) -> u32 {
        self.board_size
    }

    pub fn game_time(&self) -> u32 {
        self.game_time
    }

    pub fn boards(&self) -> &[Board] {
        &self.boards
    }

    pub fn game_over(&self) -> Option<GameOverReason> {
        self.game_over
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// This client's confirmed score.
    pub fn my_score(&self) -> u32 {
        self.user_id
            .as_ref()
            .and_then(|id| self.players.get(id))
            .map_or(0, |p| p.score)
    }

    pub fn scores(&self) -> BTreeMap<UserId, u32> {
        self.players
            .iter()
            .map(|(id, p)| (id.clone(), p.score))
            .collect()
    }

    pub fn outcome(&self) -> Option<MatchOutcome> {
        MatchOutcome::from_scores(&self.scores())
    }

    fn is_self(&self, user: &UserId) -> bool {
        self.user_id.as_ref() == Some(user)
    }

    fn in_lobby(&self, code: &LobbyCode) -> bool {
        self.lobby_id.as_ref() == Some(code)
    }

    /// Apply one authoritative message.
    pub fn apply(&mut self, msg: ServerMessage) -> Vec<SessionChange> {
        let mut changes = Vec::new();
        match msg {
            ServerMessage::UserIdGenerated { user_id } => {
                self.user_id = Some(user_id.clone());
                changes.push(SessionChange::UserIdAssigned(user_id));
            }
            ServerMessage::LobbyCreated { lobby_id } => {
                self.created_lobby = Some(lobby_id.clone());
                changes.push(SessionChange::LobbyCreated(lobby_id));
            }
            ServerMessage::PlayerJoined { lobby_id, user_id } => {
                let is_self = self.is_self(&user_id);
                if is_self {
                    self.enter_lobby(lobby_id);
                } else if !self.in_lobby(&lobby_id) {
                    return changes;
                }
                changes.push(SessionChange::PlayerJoined { user_id, is_self });
            }
            ServerMessage::PlayerLeft { lobby_id, user_id } => {
                if !self.in_lobby(&lobby_id) {
                    return changes;
                }
                let is_self = self.is_self(&user_id);
                if is_self {
                    self.leave_lobby();
                } else {
                    self.players.remove(&user_id);
                }
                changes.push(SessionChange::PlayerLeft { user_id, is_self });
            }
            ServerMessage::LobbyInfo {
                lobby_id,
                players,
                board_size,
                game_time,
            } => {
                if self.lobby_id.is_some() && !self.in_lobby(&lobby_id) {
                    return changes;
                }
                self.players = players;
                self.board_size = board_size;
                self.game_time = game_time;
                changes.push(SessionChange::RosterRefreshed);
            }
            ServerMessage::UsernameSet {
                lobby_id,
                user_id,
                username,
            } => {
                if !self.in_lobby(&lobby_id) {
                    return changes;
                }
                if let Some(player) = self.players.get_mut(&user_id) {
                    player.username = username.clone();
                }
                changes.push(SessionChange::UsernameChanged { user_id, username });
            }
            ServerMessage::LobbyBoardSizeSet {
                lobby_id,
                board_size,
            } => {
                if self.in_lobby(&lobby_id) {
                    self.board_size = board_size;
                    changes.push(SessionChange::BoardSizeChanged(board_size));
                }
            }
            ServerMessage::LobbyGameTimeSet {
                lobby_id,
                game_time,
            } => {
                if self.in_lobby(&lobby_id) {
                    self.game_time = game_time;
                    changes.push(SessionChange::GameTimeChanged(game_time));
                }
            }
            ServerMessage::GameStarted { lobby } => {
                let mut boards = Vec::with_capacity(lobby.boards.len());
                for (index, wire) in lobby.boards.iter().enumerate() {
                    match Board::new(normalize_board(wire)) {
                        Ok(board) => boards.push(board),
                        Err(e) => {
                            let reason = format!("board {index} from the server is invalid: {e}");
                            self.last_error = Some(reason.clone());
                            changes.push(SessionChange::Rejected(reason));
                            return changes;
                        }
                    }
                }
                self.lobby_id = Some(lobby.lobby_id);
                self.players = lobby.players;
                self.board_size = lobby.board_size;
                self.game_time = lobby.game_time;
                self.boards = boards;
                self.game_over = None;
                changes.push(SessionChange::GameStarted {
                    boards: self.boards.len(),
                    game_time: self.game_time,
                });
            }
            ServerMessage::ScoreUpdated { user_id, score } => {
                if let Some(player) = self.players.get_mut(&user_id) {
                    player.score = score;
                    changes.push(SessionChange::ScoreChanged { user_id, score });
                }
            }
            ServerMessage::GameOver {
                lobby_id,
                reason,
                final_scores,
            } => {
                if !self.in_lobby(&lobby_id) {
                    return changes;
                }
                for (user_id, score) in final_scores {
                    if let Some(player) = self.players.get_mut(&user_id) {
                        player.score = score;
                    }
                }
                self.game_over = Some(reason);
                changes.push(SessionChange::GameOver { reason });
            }
            ServerMessage::Error { message } => {
                self.last_error = Some(message.clone());
                changes.push(SessionChange::Rejected(message));
            }
        }
        changes
    }

    fn enter_lobby(&mut self, code: LobbyCode) {
        if !self.in_lobby(&code) {
            self.players.clear();
            self.boards.clear();
            self.game_over = None;
        }
        self.lobby_id = Some(code);
        self.created_lobby = None;
    }

    fn leave_lobby(&mut self) {
        self.lobby_id = None;
        self.players.clear();
        self.boards.clear();
        self.game_over = None;
    }
}

/// How a match ended, from one set of final scores.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Only one player: the score is shown without a win or loss.
    Solo { user_id: UserId, score: u32 },
    Winner { user_id: UserId, score: u32 },
    Tie { score: u32 },
}

impl MatchOutcome {
    /// `None` for an empty score table.
    pub fn from_scores(scores: &BTreeMap<UserId, u32>) -> Option<MatchOutcome> {
        let mut ranked: Vec<(&UserId, u32)> = scores.iter().map(|(id, &s)| (id, s)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        match ranked.as_slice() {
            [] => None,
            [(user_id, score)] => Some(MatchOutcome::Solo {
                user_id: (*user_id).clone(),
                score: *score,
            }),
            [(_, top), (_, second), ..] if top == second => Some(MatchOutcome::Tie { score: *top }),
            [(user_id, score), ..] => Some(MatchOutcome::Winner {
                user_id: (*user_id).clone(),
                score: *score,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use flow_pvp_protocol::{LobbySnapshot, PlayerColor, wire_board};

    use super::*;

    fn code() -> LobbyCode {
        LobbyCode::new("AB12CD")
    }

    fn info(name: &str, color: PlayerColor, score: u32) -> PlayerInfo {
        PlayerInfo {
            username: name.into(),
            color,
            score,
        }
    }

    fn joined_session() -> SessionState {
        let mut s = SessionState::new();
        s.apply(ServerMessage::UserIdGenerated {
            user_id: UserId::from("me"),
        });
        s.apply(ServerMessage::PlayerJoined {
            lobby_id: code(),
            user_id: UserId::from("me"),
        });
        s
    }

    fn started(s: &mut SessionState, boards: Vec<Vec<Vec<u8>>>) -> Vec<SessionChange> {
        let mut players = BTreeMap::new();
        players.insert(UserId::from("me"), info("me", PlayerColor::Red, 7));
        players.insert(UserId::from("them"), info("them", PlayerColor::Cyan, 3));
        s.apply(ServerMessage::GameStarted {
            lobby: LobbySnapshot {
                lobby_id: code(),
                players,
                boards: boards.iter().map(|b| wire_board(b)).collect(),
                board_size: 2,
                game_time: 30,
            },
        })
    }

    #[test]
    fn joining_sets_the_lobby() {
        let s = joined_session();
        assert_eq!(s.lobby_id(), Some(&code()));
        assert_eq!(s.user_id(), Some(&UserId::from("me")));
    }

    #[test]
    fn other_lobbies_are_ignored() {
        let mut s = joined_session();
        let changes = s.apply(ServerMessage::LobbyBoardSizeSet {
            lobby_id: LobbyCode::new("OTHER1"),
            board_size: 8,
        });
        assert!(changes.is_empty());
        let changes = s.apply(ServerMessage::LobbyBoardSizeSet {
            lobby_id: code(),
            board_size: 8,
        });
        assert_eq!(changes, vec![SessionChange::BoardSizeChanged(8)]);
        assert_eq!(s.board_size(), 8);
    }

    #[test]
    fn game_started_normalizes_boards_and_scores() {
        let mut s = joined_session();
        let changes = started(&mut s, vec![vec![vec![1, 0], vec![0, 1]]; 3]);
        assert_eq!(
            changes,
            vec![SessionChange::GameStarted {
                boards: 3,
                game_time: 30
            }]
        );
        assert_eq!(s.boards().len(), 3);
        assert_eq!(s.boards()[0].size(), 2);
        // Scores come from the snapshot as sent.
        assert_eq!(s.my_score(), 7);
    }

    #[test]
    fn non_square_board_refuses_the_start() {
        let mut s = joined_session();
        let changes = started(&mut s, vec![vec![vec![1, 0], vec![0, 1]], vec![vec![1, 1, 0]]]);
        assert!(matches!(changes.as_slice(), [SessionChange::Rejected(_)]));
        assert!(s.boards().is_empty());
        assert!(s.last_error().is_some());
    }

    #[test]
    fn scores_follow_broadcasts_only() {
        let mut s = joined_session();
        started(&mut s, vec![vec![vec![1, 0], vec![0, 1]]]);
        let changes = s.apply(ServerMessage::ScoreUpdated {
            user_id: UserId::from("them"),
            score: 4,
        });
        assert_eq!(
            changes,
            vec![SessionChange::ScoreChanged {
                user_id: UserId::from("them"),
                score: 4
            }]
        );
        // Unknown users are not invented.
        assert!(
            s.apply(ServerMessage::ScoreUpdated {
                user_id: UserId::from("ghost"),
                score: 1,
            })
            .is_empty()
        );
        assert_eq!(s.players().len(), 2);
    }

    #[test]
    fn leaving_clears_lobby_state() {
        let mut s = joined_session();
        started(&mut s, vec![vec![vec![1, 0], vec![0, 1]]]);
        let changes = s.apply(ServerMessage::PlayerLeft {
            lobby_id: code(),
            user_id: UserId::from("them"),
        });
        assert_eq!(
            changes,
            vec![SessionChange::PlayerLeft {
                user_id: UserId::from("them"),
                is_self: false
            }]
        );
        assert_eq!(s.players().len(), 1);

        s.apply(ServerMessage::PlayerLeft {
            lobby_id: code(),
            user_id: UserId::from("me"),
        });
        assert_eq!(s.lobby_id(), None);
        assert!(s.players().is_empty());
        assert!(s.boards().is_empty());
    }

    #[test]
    fn game_over_takes_final_scores() {
        let mut s = joined_session();
        started(&mut s, vec![vec![vec![1, 0], vec![0, 1]]]);
        let mut final_scores = BTreeMap::new();
        final_scores.insert(UserId::from("me"), 5);
        final_scores.insert(UserId::from("them"), 2);
        let changes = s.apply(ServerMessage::GameOver {
            lobby_id: code(),
            reason: GameOverReason::TimeUp,
            final_scores,
        });
        assert_eq!(
            changes,
            vec![SessionChange::GameOver {
                reason: GameOverReason::TimeUp
            }]
        );
        assert_eq!(
            s.outcome(),
            Some(MatchOutcome::Winner {
                user_id: UserId::from("me"),
                score: 5
            })
        );
    }

    #[test]
    fn errors_are_kept_for_display() {
        let mut s = SessionState::new();
        let changes = s.apply(ServerMessage::Error {
            message: "Lobby is full".into(),
        });
        assert_eq!(changes, vec![SessionChange::Rejected("Lobby is full".into())]);
        assert_eq!(s.last_error(), Some("Lobby is full"));
    }

    #[test]
    fn outcome_labels() {
        let mut scores = BTreeMap::new();
        assert_eq!(MatchOutcome::from_scores(&scores), None);
        scores.insert(UserId::from("a"), 3);
        assert_eq!(
            MatchOutcome::from_scores(&scores),
            Some(MatchOutcome::Solo {
                user_id: UserId::from("a"),
                score: 3
            })
        );
        scores.insert(UserId::from("b"), 3);
        assert_eq!(
            MatchOutcome::from_scores(&scores),
            Some(MatchOutcome::Tie { score: 3 })
        );
        scores.insert(UserId::from("b"), 4);
        assert_eq!(
            MatchOutcome::from_scores(&scores),
            Some(MatchOutcome::Winner {
                user_id: UserId::from("b"),
                score: 4
            })
        );
    }
}
