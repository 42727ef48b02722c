// Test-only game client for multiplayer integration tests.
//
// Wraps a real `MatchController` over a real `NetClient` (both from
// `flow_pvp_client`) to give tests a synchronous API for exercising the
// full pipeline: connect → user id → lobby → start → solve → score → game
// over, against a live `flow_pvp_server`.
//
// The only test-specific code here is the blocking polling wrappers (loops
// around `MatchController::poll()`) and `solve`, which replays a known
// solution as pointer drags. Networking, session replication, and puzzle
// logic use the same code paths as a real front end.
//
// See also: `tests/full_pipeline.rs` for the integration test scenarios.

use std::net::SocketAddr;
use std::thread;
use std::time::{Duration, Instant};

use flow_pvp_client::{MatchController, MatchPhase, NetClient, SessionChange};
use flow_pvp_protocol::{LobbyCode, UserId};
use flow_pvp_puzzle::Cell;

/// Default timeout for blocking poll operations.
const POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Sleep duration between poll attempts.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A test game client wrapping a real controller and TCP transport.
pub struct TestGameClient {
    pub controller: MatchController<NetClient>,
    /// Every session change seen so far, oldest first.
    pub history: Vec<SessionChange>,
}

impl TestGameClient {
    /// Connect to a server and wait for a user id.
    pub fn connect(addr: SocketAddr) -> Self {
        let transport = NetClient::connect(addr).expect("TestGameClient::connect failed");
        let mut client = Self {
            controller: MatchController::new(transport),
            history: Vec::new(),
        };
        client
            .controller
            .request_user_id()
            .expect("request_user_id failed");
        client.wait_until("user id", |c| c.session().user_id().is_some());
        client
    }

    pub fn user_id(&self) -> UserId {
        self.controller
            .session()
            .user_id()
            .cloned()
            .expect("no user id")
    }

    /// Create a lobby and return its code (without joining it).
    pub fn create_lobby(&mut self) -> LobbyCode {
        self.controller.create_lobby().expect("create_lobby failed");
        self.wait_until("lobby_created", |c| c.session().created_lobby().is_some());
        self.controller
            .session()
            .created_lobby()
            .cloned()
            .expect("no lobby code")
    }

    /// Join `code` and wait until the join is confirmed.
    pub fn join(&mut self, code: &LobbyCode) {
        self.controller
            .join_lobby(code.clone())
            .expect("join_lobby failed");
        let code = code.clone();
        self.wait_until("own player_joined", move |c| {
            c.session().lobby_id() == Some(&code)
        });
    }

    /// Drain pending messages once, recording the changes.
    pub fn pump(&mut self) -> Vec<SessionChange> {
        let changes = self.controller.poll();
        self.history.extend(changes.iter().cloned());
        changes
    }

    /// Blocking poll until the controller satisfies `done`.
    pub fn wait_until<F>(&mut self, what: &str, mut done: F)
    where
        F: FnMut(&MatchController<NetClient>) -> bool,
    {
        let start = Instant::now();
        loop {
            self.pump();
            if done(&self.controller) {
                return;
            }
            assert!(start.elapsed() < POLL_TIMEOUT, "timed out waiting for {what}");
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Blocking poll until a change matching `wanted` arrives, and return it.
    /// Only changes received during this call are considered.
    pub fn wait_for_change<F>(&mut self, what: &str, mut wanted: F) -> SessionChange
    where
        F: FnMut(&SessionChange) -> bool,
    {
        let start = Instant::now();
        loop {
            if let Some(change) = self.pump().into_iter().find(|c| wanted(c)) {
                return change;
            }
            assert!(start.elapsed() < POLL_TIMEOUT, "timed out waiting for {what}");
            thread::sleep(POLL_INTERVAL);
        }
    }

    pub fn wait_for_phase(&mut self, phase: MatchPhase) {
        self.wait_until(&format!("{phase:?}"), |c| c.phase() == phase);
    }

    /// Drag every path of `solution` onto the current board.
    pub fn solve(&mut self, solution: &[Vec<Cell>]) {
        for path in solution {
            let Some((&first, rest)) = path.split_first() else {
                continue;
            };
            self.controller.press(first);
            for &cell in rest {
                self.controller.enter(cell);
            }
            self.controller.release().expect("release failed");
        }
    }

    /// Close the connection.
    pub fn disconnect(&mut self) {
        self.controller.transport_mut().disconnect();
    }
}
