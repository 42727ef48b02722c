// The session authority: every lobby, every user, every connection.
//
// `Authority` is the single owner of shared match state. It is sans-IO: the
// transport hands it `(connection, message, now)` and gets back the list of
// `Outbound` messages to deliver, so the whole protocol runs in unit tests
// without sockets. `server.rs` is the only caller in production.
//
// Identity: `generate_user_id` binds a fresh user id to the connection that
// asked for it. Requests that name a `user_id` must name the id bound to the
// sending connection; requests that don't (config changes, `start_game`) act
// as the connection's bound user. A user is in at most one lobby.
//
// Broadcast rules:
// - `player_joined`, `*_set`, `game_started`, `score_updated`, `game_over`:
//   every member of the lobby, the sender included.
// - `player_left`: the remaining members and the leaver.
// - `user_id_generated`, `lobby_created`, `lobby_info`, `error`: the sender.
//
// Lobbies with no members are removed when the last member leaves. Lobbies
// that were created but never joined are swept by `tick` after
// `UNJOINED_LOBBY_TTL`.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use flow_pvp_prng::GameRng;
use flow_pvp_protocol::{ClientMessage, LobbyCode, ServerMessage, UserId};
use flow_pvp_puzzle::{Board, BoardCatalog};
use tracing::{debug, info};

use crate::config::{LobbyRules, ServerConfig};
use crate::error::LobbyError;
use crate::lobby::Lobby;

/// Length of generated user ids and lobby codes.
const TOKEN_LEN: usize = 6;

/// How long a lobby nobody has joined is kept.
pub const UNJOINED_LOBBY_TTL: Duration = Duration::from_secs(600);

/// Transport-assigned connection handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(pub u64);

impl std::fmt::Display for ConnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// A message the transport must deliver.
#[derive(Clone, Debug, PartialEq)]
pub struct Outbound {
    pub to: ConnId,
    pub message: ServerMessage,
}

struct UserRecord {
    conn: Option<ConnId>,
    lobby: Option<LobbyCode>,
}

pub struct Authority {
    config: ServerConfig,
    rules: LobbyRules,
    catalog: BoardCatalog,
    rng: GameRng,
    lobbies: BTreeMap<LobbyCode, Lobby>,
    users: BTreeMap<UserId, UserRecord>,
    conns: BTreeMap<ConnId, Option<UserId>>,
}

impl Authority {
    pub fn new(config: ServerConfig, catalog: BoardCatalog) -> Self {
        let rng = match config.seed {
            Some(seed) => GameRng::new(seed),
            None => GameRng::from_entropy(),
        };
        Self {
            rules: config.lobby_rules(),
            config,
            catalog,
            rng,
            lobbies: BTreeMap::new(),
            users: BTreeMap::new(),
            conns: BTreeMap::new(),
        }
    }

    pub fn lobby(&self, code: &LobbyCode) -> Option<&Lobby> {
        self.lobbies.get(code)
    }

    pub fn lobby_count(&self) -> usize {
        self.lobbies.len()
    }

    /// The lobby `user` is currently in.
    pub fn lobby_of(&self, user: &UserId) -> Option<&LobbyCode> {
        self.users.get(user).and_then(|r| r.lobby.as_ref())
    }

    pub fn connection_count(&self) -> usize {
        self.conns.len()
    }

    pub fn connect(&mut self, conn: ConnId) {
        self.conns.insert(conn, None);
        debug!(%conn, "connection registered");
    }

    /// Drop a connection. Its user leaves their lobby as if they had sent
    /// `leave_lobby`; the user id itself stays reserved.
    pub fn disconnect(&mut self, conn: ConnId) -> Vec<Outbound> {
        let mut out = Vec::new();
        let Some(bound) = self.conns.remove(&conn) else {
            return out;
        };
        let Some(user) = bound else {
            return out;
        };
        let lobby = self.users.get_mut(&user).and_then(|record| {
            record.conn = None;
            record.lobby.take()
        });
        if let Some(code) = lobby {
            info!(%conn, user = %user, lobby = %code, "disconnected player leaves lobby");
            self.remove_member(&code, &user, None, &mut out);
        }
        out
    }

    /// Handle one request. Rejections become an `error` reply to `conn`.
    pub fn handle(&mut self, conn: ConnId, message: ClientMessage, now: Instant) -> Vec<Outbound> {
        let mut out = Vec::new();
        if let Err(err) = self.dispatch(conn, message, now, &mut out) {
            debug!(%conn, error = %err, "request rejected");
            out.push(Outbound {
                to: conn,
                message: ServerMessage::Error {
                    message: err.to_string(),
                },
            });
        }
        out
    }

    /// Finish rounds whose deadline has passed and sweep lobbies nobody
    /// joined.
    pub fn tick(&mut self, now: Instant) -> Vec<Outbound> {
        let mut out = Vec::new();
        let mut finished = Vec::new();
        for (code, lobby) in self.lobbies.iter_mut() {
            if let Some(reason) = lobby.tick(now) {
                finished.push((code.clone(), reason));
            }
        }
        for (code, reason) in finished {
            if let Some(lobby) = self.lobbies.get(&code) {
                info!(lobby = %code, ?reason, "game over");
                let message = ServerMessage::GameOver {
                    lobby_id: code.clone(),
                    reason,
                    final_scores: lobby.final_scores(),
                };
                self.broadcast(lobby, message, &mut out);
            }
        }

        let before = self.lobbies.len();
        self.lobbies.retain(|_, lobby| {
            !(lobby.is_empty() && now.duration_since(lobby.created_at()) >= UNJOINED_LOBBY_TTL)
        });
        if self.lobbies.len() < before {
            debug!(removed = before - self.lobbies.len(), "swept unjoined lobbies");
        }
        out
    }

    fn dispatch(
        &mut self,
        conn: ConnId,
        message: ClientMessage,
        now: Instant,
        out: &mut Vec<Outbound>,
    ) -> Result<(), LobbyError> {
        match message {
            ClientMessage::GenerateUserId => {
                let user = self.generate_user_id(conn)?;
                reply(out, conn, ServerMessage::UserIdGenerated { user_id: user });
            }
            ClientMessage::CreateLobby => {
                let code = self.create_lobby(now);
                info!(%conn, lobby = %code, "lobby created");
                reply(out, conn, ServerMessage::LobbyCreated { lobby_id: code });
            }
            ClientMessage::JoinLobby { lobby_id, user_id } => {
                self.join_lobby(conn, lobby_id, user_id, out)?;
            }
            ClientMessage::LeaveLobby { lobby_id, user_id } => {
                if !self.lobbies.contains_key(&lobby_id) {
                    return Err(LobbyError::NotFound);
                }
                let user = self.bound_user(conn, Some(&user_id))?;
                if self.lobby_of(&user) != Some(&lobby_id) {
                    return Err(LobbyError::NotMember);
                }
                if let Some(record) = self.users.get_mut(&user) {
                    record.lobby = None;
                }
                info!(%conn, user = %user, lobby = %lobby_id, "player left");
                self.remove_member(&lobby_id, &user, Some(conn), out);
            }
            ClientMessage::GetLobbyInfo { lobby_id } => {
                let lobby = self.lobbies.get(&lobby_id).ok_or(LobbyError::NotFound)?;
                reply(out, conn, lobby.info_message());
            }
            ClientMessage::SetUsername {
                lobby_id,
                user_id,
                username,
            } => {
                let user = self.bound_user(conn, Some(&user_id))?;
                let lobby = self.lobbies.get_mut(&lobby_id).ok_or(LobbyError::NotFound)?;
                let username = lobby.set_username(&user, &username)?;
                let message = ServerMessage::UsernameSet {
                    lobby_id: lobby_id.clone(),
                    user_id: user,
                    username,
                };
                self.broadcast_to(&lobby_id, message, out);
            }
            ClientMessage::SetLobbyBoardSize {
                lobby_id,
                board_size,
            } => {
                let lobby = self.member_lobby(conn, &lobby_id)?;
                lobby.set_board_size(board_size)?;
                let message = ServerMessage::LobbyBoardSizeSet {
                    lobby_id: lobby_id.clone(),
                    board_size,
                };
                self.broadcast_to(&lobby_id, message, out);
            }
            ClientMessage::SetLobbyGameTime {
                lobby_id,
                game_time,
            } => {
                let lobby = self.member_lobby(conn, &lobby_id)?;
                lobby.set_game_time(game_time)?;
                let message = ServerMessage::LobbyGameTimeSet {
                    lobby_id: lobby_id.clone(),
                    game_time,
                };
                self.broadcast_to(&lobby_id, message, out);
            }
            ClientMessage::StartGame {
                lobby_id,
                board_size,
                game_time,
            } => {
                self.start_game(conn, &lobby_id, board_size, game_time, now, out)?;
            }
            ClientMessage::IncrementScore {
                lobby_id,
                user_id,
                board_index,
            } => {
                let user = self.bound_user(conn, Some(&user_id))?;
                let lobby = self.lobbies.get_mut(&lobby_id).ok_or(LobbyError::NotFound)?;
                let change = lobby.increment_score(&user, board_index, now)?;
                debug!(lobby = %lobby_id, user = %user, score = change.score, "score updated");
                let scored = ServerMessage::ScoreUpdated {
                    user_id: user,
                    score: change.score,
                };
                self.broadcast_to(&lobby_id, scored, out);
                if let Some(reason) = change.game_over {
                    info!(lobby = %lobby_id, ?reason, "game over");
                    if let Some(lobby) = self.lobbies.get(&lobby_id) {
                        let over = ServerMessage::GameOver {
                            lobby_id: lobby_id.clone(),
                            reason,
                            final_scores: lobby.final_scores(),
                        };
                        self.broadcast(lobby, over, out);
                    }
                }
            }
        }
        Ok(())
    }

    fn generate_user_id(&mut self, conn: ConnId) -> Result<UserId, LobbyError> {
        let previous = self.conns.get(&conn).cloned().flatten();
        if let Some(code) = previous.as_ref().and_then(|prev| self.lobby_of(prev)) {
            return Err(LobbyError::StillInLobby(code.clone()));
        }
        let user = loop {
            let candidate = UserId(self.rng.hex_token(TOKEN_LEN));
            if !self.users.contains_key(&candidate) {
                break candidate;
            }
        };
        if let Some(prev) = previous {
            self.users.remove(&prev);
        }
        self.users.insert(
            user.clone(),
            UserRecord {
                conn: Some(conn),
                lobby: None,
            },
        );
        self.conns.insert(conn, Some(user.clone()));
        debug!(%conn, user = %user, "user id issued");
        Ok(user)
    }

    fn create_lobby(&mut self, now: Instant) -> LobbyCode {
        let code = loop {
            let candidate = LobbyCode::new(&self.rng.hex_token(TOKEN_LEN));
            if !self.lobbies.contains_key(&candidate) {
                break candidate;
            }
        };
        let lobby = Lobby::new(
            code.clone(),
            self.rules.clone(),
            self.config.default_board_size,
            self.config.default_game_time,
            now,
        );
        self.lobbies.insert(code.clone(), lobby);
        code
    }

    fn join_lobby(
        &mut self,
        conn: ConnId,
        lobby_id: LobbyCode,
        user_id: UserId,
        out: &mut Vec<Outbound>,
    ) -> Result<(), LobbyError> {
        if !self.lobbies.contains_key(&lobby_id) {
            return Err(LobbyError::NotFound);
        }
        let user = self.bound_user(conn, Some(&user_id))?;
        if let Some(current) = self.lobby_of(&user) {
            return Err(LobbyError::AlreadyInLobby(current.clone()));
        }
        let lobby = self.lobbies.get_mut(&lobby_id).ok_or(LobbyError::NotFound)?;
        let player = lobby.join(user.clone(), &mut self.rng)?;
        if let Some(record) = self.users.get_mut(&user) {
            record.lobby = Some(lobby_id.clone());
        }
        info!(%conn, user = %user, lobby = %lobby_id, color = player.color.name(), "player joined");
        let message = ServerMessage::PlayerJoined {
            lobby_id: lobby_id.clone(),
            user_id: user,
        };
        self.broadcast_to(&lobby_id, message, out);
        Ok(())
    }

    fn start_game(
        &mut self,
        conn: ConnId,
        lobby_id: &LobbyCode,
        board_size: u32,
        game_time: u32,
        now: Instant,
        out: &mut Vec<Outbound>,
    ) -> Result<(), LobbyError> {
        let user = self.bound_user(conn, None)?;
        let catalog = &self.catalog;
        let rng = &mut self.rng;
        let lobby = self.lobbies.get_mut(lobby_id).ok_or(LobbyError::NotFound)?;
        let snapshot = lobby.start(&user, board_size, game_time, now, |size, count| {
            let boards = catalog
                .select(size as usize, count, rng)
                .map_err(|_| LobbyError::NoBoards(size))?;
            Ok(boards.iter().map(Board::to_rows).collect())
        })?;
        info!(
            lobby = %lobby_id,
            board_size,
            game_time,
            boards = snapshot.boards.len(),
            players = snapshot.players.len(),
            "game started"
        );
        self.broadcast_to(lobby_id, ServerMessage::GameStarted { lobby: snapshot }, out);
        Ok(())
    }

    /// Remove `user` from the lobby, tell the remaining members and
    /// `leaver_conn`, and drop the lobby once it is empty.
    fn remove_member(
        &mut self,
        code: &LobbyCode,
        user: &UserId,
        leaver_conn: Option<ConnId>,
        out: &mut Vec<Outbound>,
    ) {
        let Some(lobby) = self.lobbies.get_mut(code) else {
            return;
        };
        if lobby.leave(user).is_err() {
            return;
        }
        let message = ServerMessage::PlayerLeft {
            lobby_id: code.clone(),
            user_id: user.clone(),
        };
        if let Some(conn) = leaver_conn {
            reply(out, conn, message.clone());
        }
        if lobby.is_empty() {
            self.lobbies.remove(code);
            info!(lobby = %code, "lobby closed");
        } else {
            self.broadcast_to(code, message, out);
        }
    }

    /// The user bound to `conn`, checked against the id the request names.
    fn bound_user(&self, conn: ConnId, claimed: Option<&UserId>) -> Result<UserId, LobbyError> {
        let user = self
            .conns
            .get(&conn)
            .cloned()
            .flatten()
            .ok_or(LobbyError::UnknownUser)?;
        match claimed {
            Some(claimed) if *claimed != user => Err(LobbyError::UserMismatch),
            _ => Ok(user),
        }
    }

    /// The lobby `lobby_id`, provided the connection's user is a member.
    fn member_lobby(
        &mut self,
        conn: ConnId,
        lobby_id: &LobbyCode,
    ) -> Result<&mut Lobby, LobbyError> {
        if !self.lobbies.contains_key(lobby_id) {
            return Err(LobbyError::NotFound);
        }
        let user = self.bound_user(conn, None)?;
        let lobby = self.lobbies.get_mut(lobby_id).ok_or(LobbyError::NotFound)?;
        if !lobby.is_member(&user) {
            return Err(LobbyError::NotMember);
        }
        Ok(lobby)
    }

    fn broadcast_to(&self, code: &LobbyCode, message: ServerMessage, out: &mut Vec<Outbound>) {
        if let Some(lobby) = self.lobbies.get(code) {
            self.broadcast(lobby, message, out);
        }
    }

    fn broadcast(&self, lobby: &Lobby, message: ServerMessage, out: &mut Vec<Outbound>) {
        for user in lobby.players().keys() {
            if let Some(conn) = self.users.get(user).and_then(|r| r.conn) {
                reply(out, conn, message.clone());
            }
        }
    }
}

fn reply(out: &mut Vec<Outbound>, to: ConnId, message: ServerMessage) {
    out.push(Outbound { to, message });
}

#[cfg(test)]
mod tests {
    use flow_pvp_protocol::{GameOverReason, normalize_board};

    use super::*;

    const A: ConnId = ConnId(1);
    const B: ConnId = ConnId(2);
    const C: ConnId = ConnId(3);

    fn authority() -> Authority {
        let config = ServerConfig {
            seed: Some(2024),
            ..ServerConfig::default()
        };
        let mut auth = Authority::new(config, BoardCatalog::builtin().unwrap());
        for conn in [A, B, C] {
            auth.connect(conn);
        }
        auth
    }

    fn to(out: &[Outbound], conn: ConnId) -> Vec<ServerMessage> {
        out.iter()
            .filter(|o| o.to == conn)
            .map(|o| o.message.clone())
            .collect()
    }

    fn error_text(out: &[Outbound], conn: ConnId) -> String {
        match to(out, conn).as_slice() {
            [ServerMessage::Error { message }] => message.clone(),
            other => panic!("expected a single error, got {other:?}"),
        }
    }

    fn user_id(auth: &mut Authority, conn: ConnId, now: Instant) -> UserId {
        let out = auth.handle(conn, ClientMessage::GenerateUserId, now);
        match to(&out, conn).as_slice() {
            [ServerMessage::UserIdGenerated { user_id }] => user_id.clone(),
            other => panic!("expected user_id_generated, got {other:?}"),
        }
    }

    fn create(auth: &mut Authority, conn: ConnId, now: Instant) -> LobbyCode {
        let out = auth.handle(conn, ClientMessage::CreateLobby, now);
        match to(&out, conn).as_slice() {
            [ServerMessage::LobbyCreated { lobby_id }] => lobby_id.clone(),
            other => panic!("expected lobby_created, got {other:?}"),
        }
    }

    fn join(
        auth: &mut Authority,
        conn: ConnId,
        code: &LobbyCode,
        user: &UserId,
        now: Instant,
    ) -> Vec<Outbound> {
        auth.handle(
            conn,
            ClientMessage::JoinLobby {
                lobby_id: code.clone(),
                user_id: user.clone(),
            },
            now,
        )
    }

    /// Two users in one lobby: (code, user on A, user on B).
    fn two_player_lobby(auth: &mut Authority, now: Instant) -> (LobbyCode, UserId, UserId) {
        let ua = user_id(auth, A, now);
        let ub = user_id(auth, B, now);
        let code = create(auth, A, now);
        join(auth, A, &code, &ua, now);
        join(auth, B, &code, &ub, now);
        (code, ua, ub)
    }

    fn start(
        auth: &mut Authority,
        conn: ConnId,
        code: &LobbyCode,
        size: u32,
        time: u32,
        now: Instant,
    ) -> Vec<Outbound> {
        auth.handle(
            conn,
            ClientMessage::StartGame {
                lobby_id: code.clone(),
                board_size: size,
                game_time: time,
            },
            now,
        )
    }

    fn increment(
        auth: &mut Authority,
        conn: ConnId,
        code: &LobbyCode,
        user: &UserId,
        index: Option<u32>,
        now: Instant,
    ) -> Vec<Outbound> {
        auth.handle(
            conn,
            ClientMessage::IncrementScore {
                lobby_id: code.clone(),
                user_id: user.clone(),
                board_index: index,
            },
            now,
        )
    }

    #[test]
    fn ids_and_codes_have_expected_shape() {
        let now = Instant::now();
        let mut auth = authority();
        let user = user_id(&mut auth, A, now);
        assert_eq!(user.as_str().len(), 6);
        assert!(
            user.as_str()
                .chars()
                .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
        );
        let code = create(&mut auth, A, now);
        assert_eq!(code.as_str().len(), 6);
        assert!(
            code.as_str()
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        );
    }

    #[test]
    fn lobby_scenario_start_and_scores() {
        let now = Instant::now();
        let mut auth = authority();
        let (code, ua, ub) = two_player_lobby(&mut auth, now);

        let out = start(&mut auth, A, &code, 5, 30, now);
        for conn in [A, B] {
            let msgs = to(&out, conn);
            let [ServerMessage::GameStarted { lobby }] = msgs.as_slice() else {
                panic!("expected game_started, got {msgs:?}");
            };
            assert_eq!(lobby.board_size, 5);
            assert_eq!(lobby.boards.len(), 20);
            for board in &lobby.boards {
                let rows = normalize_board(board);
                assert_eq!(rows.len(), 5);
                assert!(rows.iter().all(|r| r.len() == 5));
            }
            assert!(lobby.players.contains_key(&ua));
            assert!(lobby.players.contains_key(&ub));
        }

        for expected in 1..=2 {
            let out = increment(&mut auth, A, &code, &ua, None, now);
            for conn in [A, B] {
                assert_eq!(
                    to(&out, conn),
                    vec![ServerMessage::ScoreUpdated {
                        user_id: ua.clone(),
                        score: expected
                    }]
                );
            }
        }
    }

    #[test]
    fn both_players_receive_identical_boards() {
        let now = Instant::now();
        let mut auth = authority();
        let (code, _, _) = two_player_lobby(&mut auth, now);
        let out = start(&mut auth, B, &code, 6, 60, now);
        let a = to(&out, A);
        let b = to(&out, B);
        assert_eq!(a, b);
        let [ServerMessage::GameStarted { lobby }] = a.as_slice() else {
            panic!("expected game_started");
        };
        assert_eq!(lobby.boards.len(), 32);
    }

    #[test]
    fn join_errors_name_the_problem() {
        let now = Instant::now();
        let mut auth = authority();
        let (code, _, _) = two_player_lobby(&mut auth, now);
        let uc = user_id(&mut auth, C, now);

        let out = join(&mut auth, C, &LobbyCode::new("NOPE00"), &uc, now);
        assert_eq!(error_text(&out, C), "Lobby not found");

        let out = join(&mut auth, C, &code, &uc, now);
        assert_eq!(error_text(&out, C), "Lobby is full");
        assert!(to(&out, A).is_empty());
    }

    #[test]
    fn user_ids_are_bound_to_their_connection() {
        let now = Instant::now();
        let mut auth = authority();
        let ua = user_id(&mut auth, A, now);
        let code = create(&mut auth, A, now);

        let out = join(&mut auth, C, &code, &ua, now);
        assert_eq!(error_text(&out, C), LobbyError::UnknownUser.to_string());

        user_id(&mut auth, C, now);
        let out = join(&mut auth, C, &code, &ua, now);
        assert_eq!(error_text(&out, C), LobbyError::UserMismatch.to_string());
    }

    #[test]
    fn one_lobby_per_user() {
        let now = Instant::now();
        let mut auth = authority();
        let ua = user_id(&mut auth, A, now);
        let first = create(&mut auth, A, now);
        let second = create(&mut auth, A, now);
        join(&mut auth, A, &first, &ua, now);
        let out = join(&mut auth, A, &second, &ua, now);
        assert_eq!(
            error_text(&out, A),
            LobbyError::AlreadyInLobby(first.clone()).to_string()
        );
        let out = auth.handle(A, ClientMessage::GenerateUserId, now);
        assert_eq!(error_text(&out, A), LobbyError::StillInLobby(first).to_string());
    }

    #[test]
    fn lobby_codes_match_case_insensitively() {
        let now = Instant::now();
        let mut auth = authority();
        let ua = user_id(&mut auth, A, now);
        let code = create(&mut auth, A, now);
        let lower = LobbyCode::from(code.as_str().to_ascii_lowercase());
        let out = join(&mut auth, A, &lower, &ua, now);
        assert!(matches!(
            to(&out, A).as_slice(),
            [ServerMessage::PlayerJoined { .. }]
        ));
    }

    #[test]
    fn leave_notifies_everyone_and_closes_empty_lobbies() {
        let now = Instant::now();
        let mut auth = authority();
        let (code, ua, ub) = two_player_lobby(&mut auth, now);

        let out = auth.handle(
            B,
            ClientMessage::LeaveLobby {
                lobby_id: code.clone(),
                user_id: ub.clone(),
            },
            now,
        );
        let left = ServerMessage::PlayerLeft {
            lobby_id: code.clone(),
            user_id: ub.clone(),
        };
        assert_eq!(to(&out, A), vec![left.clone()]);
        assert_eq!(to(&out, B), vec![left]);
        assert_eq!(auth.lobby_of(&ub), None);

        auth.handle(
            A,
            ClientMessage::LeaveLobby {
                lobby_id: code.clone(),
                user_id: ua.clone(),
            },
            now,
        );
        assert!(auth.lobby(&code).is_none());

        let out = auth.handle(A, ClientMessage::GetLobbyInfo { lobby_id: code }, now);
        assert_eq!(error_text(&out, A), "Lobby not found");
    }

    #[test]
    fn leaving_a_lobby_you_are_not_in() {
        let now = Instant::now();
        let mut auth = authority();
        let (code, _, _) = two_player_lobby(&mut auth, now);
        let uc = user_id(&mut auth, C, now);
        let out = auth.handle(
            C,
            ClientMessage::LeaveLobby {
                lobby_id: code,
                user_id: uc,
            },
            now,
        );
        assert_eq!(error_text(&out, C), "Lobby or user not found");
    }

    #[test]
    fn disconnect_detaches_the_user() {
        let now = Instant::now();
        let mut auth = authority();
        let (code, _, ub) = two_player_lobby(&mut auth, now);
        let out = auth.disconnect(B);
        assert_eq!(
            to(&out, A),
            vec![ServerMessage::PlayerLeft {
                lobby_id: code.clone(),
                user_id: ub.clone()
            }]
        );
        assert!(to(&out, B).is_empty());
        assert_eq!(auth.lobby(&code).map(Lobby::len), Some(1));
        assert_eq!(auth.connection_count(), 2);

        // The last member going away closes the lobby.
        auth.disconnect(A);
        assert!(auth.lobby(&code).is_none());
    }

    #[test]
    fn lobby_info_goes_to_the_requester_only() {
        let now = Instant::now();
        let mut auth = authority();
        let (code, ua, ub) = two_player_lobby(&mut auth, now);
        let out = auth.handle(C, ClientMessage::GetLobbyInfo { lobby_id: code }, now);
        assert!(to(&out, A).is_empty());
        let msgs = to(&out, C);
        let [ServerMessage::LobbyInfo {
            players,
            board_size,
            game_time,
            ..
        }] = msgs.as_slice()
        else {
            panic!("expected lobby_info, got {msgs:?}");
        };
        assert_eq!(*board_size, 5);
        assert_eq!(*game_time, 60);
        assert_eq!(players.len(), 2);
        assert_ne!(players[&ua].color, players[&ub].color);
    }

    #[test]
    fn config_changes_broadcast_and_lock_after_start() {
        let now = Instant::now();
        let mut auth = authority();
        let (code, ua, _) = two_player_lobby(&mut auth, now);

        let out = auth.handle(
            A,
            ClientMessage::SetLobbyBoardSize {
                lobby_id: code.clone(),
                board_size: 7,
            },
            now,
        );
        assert_eq!(to(&out, B), to(&out, A));
        assert_eq!(
            to(&out, B),
            vec![ServerMessage::LobbyBoardSizeSet {
                lobby_id: code.clone(),
                board_size: 7
            }]
        );

        let out = auth.handle(
            B,
            ClientMessage::SetLobbyGameTime {
                lobby_id: code.clone(),
                game_time: 5,
            },
            now,
        );
        assert!(error_text(&out, B).starts_with("Invalid game time"));

        let out = auth.handle(
            A,
            ClientMessage::SetUsername {
                lobby_id: code.clone(),
                user_id: ua.clone(),
                username: "Alice".into(),
            },
            now,
        );
        assert_eq!(
            to(&out, B),
            vec![ServerMessage::UsernameSet {
                lobby_id: code.clone(),
                user_id: ua.clone(),
                username: "Alice".into()
            }]
        );

        start(&mut auth, A, &code, 7, 30, now);
        let out = auth.handle(
            A,
            ClientMessage::SetLobbyBoardSize {
                lobby_id: code,
                board_size: 5,
            },
            now,
        );
        assert_eq!(error_text(&out, A), LobbyError::SettingsLocked.to_string());
    }

    #[test]
    fn outsiders_cannot_configure_or_start() {
        let now = Instant::now();
        let mut auth = authority();
        let (code, _, _) = two_player_lobby(&mut auth, now);
        user_id(&mut auth, C, now);
        let out = auth.handle(
            C,
            ClientMessage::SetLobbyGameTime {
                lobby_id: code.clone(),
                game_time: 90,
            },
            now,
        );
        assert_eq!(error_text(&out, C), "Lobby or user not found");
        let out = start(&mut auth, C, &code, 5, 30, now);
        assert_eq!(error_text(&out, C), "Lobby or user not found");
    }

    #[test]
    fn score_before_start_is_rejected() {
        let now = Instant::now();
        let mut auth = authority();
        let (code, ua, _) = two_player_lobby(&mut auth, now);
        let out = increment(&mut auth, A, &code, &ua, None, now);
        assert_eq!(error_text(&out, A), "No game in progress");
    }

    #[test]
    fn duplicate_report_is_not_double_counted() {
        let now = Instant::now();
        let mut auth = authority();
        let (code, ua, _) = two_player_lobby(&mut auth, now);
        start(&mut auth, A, &code, 5, 30, now);
        increment(&mut auth, A, &code, &ua, Some(0), now);
        let out = increment(&mut auth, A, &code, &ua, Some(0), now);
        assert!(to(&out, B).is_empty());
        assert!(error_text(&out, A).contains("does not match"));
        assert_eq!(auth.lobby(&code).unwrap().player(&ua).unwrap().score, 1);
    }

    #[test]
    fn deadline_broadcasts_game_over() {
        let now = Instant::now();
        let mut auth = authority();
        let (code, ua, ub) = two_player_lobby(&mut auth, now);
        start(&mut auth, A, &code, 5, 30, now);
        increment(&mut auth, B, &code, &ub, Some(0), now);

        assert!(auth.tick(now + Duration::from_secs(10)).is_empty());
        let out = auth.tick(now + Duration::from_secs(30));
        for conn in [A, B] {
            let msgs = to(&out, conn);
            let [ServerMessage::GameOver {
                reason,
                final_scores,
                ..
            }] = msgs.as_slice()
            else {
                panic!("expected game_over, got {msgs:?}");
            };
            assert_eq!(*reason, GameOverReason::TimeUp);
            assert_eq!(final_scores[&ua], 0);
            assert_eq!(final_scores[&ub], 1);
        }
        // Only once.
        assert!(auth.tick(now + Duration::from_secs(31)).is_empty());
    }

    #[test]
    fn exhausting_boards_ends_the_game() {
        let now = Instant::now();
        let config = ServerConfig {
            seed: Some(5),
            ..ServerConfig::default()
        };
        let mut rows = BTreeMap::new();
        rows.insert(5u32, 1u32);
        let config = ServerConfig {
            boards_per_30s: rows,
            ..config
        };
        let mut auth = Authority::new(config, BoardCatalog::builtin().unwrap());
        auth.connect(A);
        let ua = user_id(&mut auth, A, now);
        let code = create(&mut auth, A, now);
        join(&mut auth, A, &code, &ua, now);
        start(&mut auth, A, &code, 5, 30, now);

        let out = increment(&mut auth, A, &code, &ua, Some(0), now);
        let msgs = to(&out, A);
        assert_eq!(msgs.len(), 2);
        assert!(matches!(msgs[0], ServerMessage::ScoreUpdated { score: 1, .. }));
        assert!(matches!(
            msgs[1],
            ServerMessage::GameOver {
                reason: GameOverReason::BoardsExhausted,
                ..
            }
        ));

        // Rematch from the finished lobby.
        let out = start(&mut auth, A, &code, 5, 30, now);
        assert!(matches!(
            to(&out, A).as_slice(),
            [ServerMessage::GameStarted { .. }]
        ));
    }

    #[test]
    fn unjoined_lobbies_are_swept() {
        let now = Instant::now();
        let mut auth = authority();
        let ua = user_id(&mut auth, A, now);
        let idle = create(&mut auth, A, now);
        let used = create(&mut auth, A, now);
        join(&mut auth, A, &used, &ua, now);

        auth.tick(now + UNJOINED_LOBBY_TTL);
        assert!(auth.lobby(&idle).is_none());
        assert!(auth.lobby(&used).is_some());
    }

    #[test]
    fn same_seed_same_session() {
        let now = Instant::now();
        let run = || {
            let mut auth = authority();
            let (code, ua, ub) = two_player_lobby(&mut auth, now);
            let out = start(&mut auth, A, &code, 5, 30, now);
            (code, ua, ub, to(&out, A))
        };
        assert_eq!(run(), run());
    }
}
