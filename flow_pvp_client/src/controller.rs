// Match controller: glue between the transport, the session replica, the
// puzzle, and the countdown.
//
// `MatchController` is what a client front end drives. It owns an injected
// `Transport`, the `SessionState` replica, the `GameState` of the board in
// play, and the local `Countdown`. Front ends feed it three kinds of events,
// none of which block:
// - pointer input: `press` / `enter` / `release`,
// - inbound messages: `poll`,
// - time: `tick(elapsed)`.
//
// Phases:
//
//   Lobby ──game_started──▶ InRound(0) ──board complete──▶ RoundOver(0)
//                                ▲                              │
//                                └── own score_updated (= i+1) ─┘ → InRound(1) …
//
//   any round phase ──countdown expired / game_over──▶ Finished
//
// Completing a board sends `increment_score` with the board's index and
// waits in `RoundOver(i)`. The next board is loaded only when the server
// confirms the new score, so the board a player sees always matches the
// score the server holds. After local expiry nothing more is sent.

use std::time::Duration;

use flow_pvp_protocol::{ClientMessage, LobbyCode, UserId};
use flow_pvp_puzzle::{Cell, CommitOutcome, ExtendOutcome, GameState, PressOutcome, PuzzleEvent};
use tracing::{debug, info, warn};

use crate::countdown::{Countdown, CountdownTick};
use crate::error::ClientError;
use crate::session::{MatchOutcome, SessionChange, SessionState};
use crate::transport::Transport;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchPhase {
    /// Not playing: before the first start, or after leaving.
    Lobby,
    /// Solving board `i`.
    InRound(usize),
    /// Board `i` is solved and reported; waiting for the server to confirm.
    RoundOver(usize),
    Finished,
}

pub struct MatchController<T: Transport> {
    transport: T,
    session: SessionState,
    game: Option<GameState>,
    countdown: Countdown,
    phase: MatchPhase,
}

impl<T: Transport> MatchController<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            session: SessionState::new(),
            game: None,
            countdown: Countdown::idle(),
            phase: MatchPhase::Lobby,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    /// The board in play, if any.
    pub fn game(&self) -> Option<&GameState> {
        self.game.as_ref()
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    /// Final result, once the match is over.
    pub fn outcome(&self) -> Option<MatchOutcome> {
        match self.phase {
            MatchPhase::Finished => self.session.outcome(),
            _ => None,
        }
    }

    // -- Requests ---------------------------------------------------------

    pub fn request_user_id(&mut self) -> Result<(), ClientError> {
        self.send(ClientMessage::GenerateUserId)
    }

    pub fn create_lobby(&mut self) -> Result<(), ClientError> {
        self.send(ClientMessage::CreateLobby)
    }

    pub fn join_lobby(&mut self, lobby_id: LobbyCode) -> Result<(), ClientError> {
        let user_id = self.user_id()?;
        self.send(ClientMessage::JoinLobby { lobby_id, user_id })
    }

    pub fn leave_lobby(&mut self) -> Result<(), ClientError> {
        let lobby_id = self.lobby_id()?;
        let user_id = self.user_id()?;
        self.send(ClientMessage::LeaveLobby { lobby_id, user_id })
    }

    pub fn refresh_lobby(&mut self) -> Result<(), ClientError> {
        let lobby_id = self.lobby_id()?;
        self.send(ClientMessage::GetLobbyInfo { lobby_id })
    }

    pub fn set_username(&mut self, username: &str) -> Result<(), ClientError> {
        let lobby_id = self.lobby_id()?;
        let user_id = self.user_id()?;
        self.send(ClientMessage::SetUsername {
            lobby_id,
            user_id,
            username: username.to_string(),
        })
    }

    pub fn set_board_size(&mut self, board_size: u32) -> Result<(), ClientError> {
        let lobby_id = self.lobby_id()?;
        self.send(ClientMessage::SetLobbyBoardSize {
            lobby_id,
            board_size,
        })
    }

    pub fn set_game_time(&mut self, game_time: u32) -> Result<(), ClientError> {
        let lobby_id = self.lobby_id()?;
        self.send(ClientMessage::SetLobbyGameTime {
            lobby_id,
            game_time,
        })
    }

    pub fn start_game(&mut self, board_size: u32, game_time: u32) -> Result<(), ClientError> {
        let lobby_id = self.lobby_id()?;
        self.send(ClientMessage::StartGame {
            lobby_id,
            board_size,
            game_time,
        })
    }

    // -- Input ------------------------------------------------------------

    pub fn press(&mut self, cell: Cell) -> PressOutcome {
        match (self.phase, self.game.as_mut()) {
            (MatchPhase::InRound(_), Some(game)) => game.press(cell),
            _ => PressOutcome::Ignored,
        }
    }

    pub fn enter(&mut self, cell: Cell) -> ExtendOutcome {
        match (self.phase, self.game.as_mut()) {
            (MatchPhase::InRound(_), Some(game)) => game.enter(cell),
            _ => ExtendOutcome::Idle,
        }
    }

    /// Commit the drag. If that completes the board, report it and wait for
    /// the server's confirmation. A failed report can be retried by calling
    /// `release` again.
    pub fn release(&mut self) -> Result<CommitOutcome, ClientError> {
        let MatchPhase::InRound(index) = self.phase else {
            return Ok(CommitOutcome::Idle);
        };
        let Some(game) = self.game.as_mut() else {
            return Ok(CommitOutcome::Idle);
        };
        let outcome = game.release();
        if game.is_complete() {
            self.report_completion(index)?;
        }
        Ok(outcome)
    }

    /// Abort the drag in progress (pointer left the board, view hidden).
    pub fn cancel_drag(&mut self) {
        if let Some(game) = self.game.as_mut() {
            game.cancel();
        }
    }

    pub fn drain_puzzle_events(&mut self) -> Vec<PuzzleEvent> {
        self.game
            .as_mut()
            .map(GameState::drain_events)
            .unwrap_or_default()
    }

    // -- Events -----------------------------------------------------------

    /// Apply everything the server sent since the last poll.
    pub fn poll(&mut self) -> Vec<SessionChange> {
        let mut all = Vec::new();
        for msg in self.transport.poll() {
            for change in self.session.apply(msg) {
                if let Err(e) = self.react(&change) {
                    warn!(error = %e, ?change, "follow-up request failed");
                }
                all.push(change);
            }
        }
        all
    }

    /// Advance the local countdown. On expiry the match is over for this
    /// client.
    pub fn tick(&mut self, elapsed: Duration) -> CountdownTick {
        let tick = self.countdown.tick(elapsed);
        if tick == CountdownTick::Expired
            && matches!(self.phase, MatchPhase::InRound(_) | MatchPhase::RoundOver(_))
        {
            info!(score = self.session.my_score(), "time is up");
            self.finish();
        }
        tick
    }

    fn react(&mut self, change: &SessionChange) -> Result<(), ClientError> {
        match change {
            SessionChange::PlayerJoined { .. } => {
                self.refresh_lobby()?;
            }
            SessionChange::PlayerLeft { is_self: true, .. } => {
                self.countdown.cancel();
                self.game = None;
                self.set_phase(MatchPhase::Lobby);
            }
            SessionChange::GameStarted { game_time, .. } => {
                self.begin_match(*game_time);
            }
            SessionChange::ScoreChanged { user_id, score } => {
                if self.session.user_id() == Some(user_id) {
                    self.on_own_score(*score);
                }
            }
            SessionChange::GameOver { reason } => {
                info!(?reason, score = self.session.my_score(), "match over");
                self.finish();
            }
            _ => {}
        }
        Ok(())
    }

    fn begin_match(&mut self, game_time: u32) {
        let Some(first) = self.session.boards().first().cloned() else {
            return;
        };
        self.game = Some(GameState::new(first));
        self.countdown = Countdown::start(Duration::from_secs(u64::from(game_time)));
        self.set_phase(MatchPhase::InRound(0));
    }

    fn on_own_score(&mut self, score: u32) {
        let MatchPhase::RoundOver(index) = self.phase else {
            return;
        };
        let next = index + 1;
        if score as usize != next {
            return;
        }
        // Past the last board the server ends the match; stay put until then.
        if let Some(board) = self.session.boards().get(next).cloned() {
            if let Some(game) = self.game.as_mut() {
                game.load(board);
            }
            self.set_phase(MatchPhase::InRound(next));
        }
    }

    fn report_completion(&mut self, index: usize) -> Result<(), ClientError> {
        let lobby_id = self.lobby_id()?;
        let user_id = self.user_id()?;
        self.send(ClientMessage::IncrementScore {
            lobby_id,
            user_id,
            board_index: u32::try_from(index).ok(),
        })?;
        self.set_phase(MatchPhase::RoundOver(index));
        Ok(())
    }

    fn finish(&mut self) {
        self.countdown.cancel();
        self.cancel_drag();
        self.set_phase(MatchPhase::Finished);
    }

    fn set_phase(&mut self, phase: MatchPhase) {
        if self.phase != phase {
            debug!(from = ?self.phase, to = ?phase, "match phase");
            self.phase = phase;
        }
    }

    fn send(&mut self, msg: ClientMessage) -> Result<(), ClientError> {
        self.transport.send(&msg)?;
        Ok(())
    }

    fn user_id(&self) -> Result<UserId, ClientError> {
        self.session.user_id().cloned().ok_or(ClientError::NoUserId)
    }

    fn lobby_id(&self) -> Result<LobbyCode, ClientError> {
        self.session
            .lobby_id()
            .cloned()
            .ok_or(ClientError::NotInLobby)
    }
}
