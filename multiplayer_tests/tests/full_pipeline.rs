// End-to-end integration tests for the multiplayer pipeline.
//
// Each test starts a real session server, connects real clients (via
// TestGameClient), and verifies the full path:
// user id → lobby → join → start → solve → increment_score → game over.
//
// The server runs on a one-board catalog (the 5x5 board below) so that
// clients can solve every board they are dealt by replaying a known
// solution through the same press/enter/release calls a pointer makes.
//
//   1 2 . 3 .        1 2 2 3 3
//   . 4 . 2 .        1 4 2 2 3
//   . . . 4 .        1 4 4 4 3
//   1 . . . .        1 3 3 3 3
//   3 . 5 . 5        3 3 5 5 5

use std::collections::BTreeMap;
use std::net::SocketAddr;

use flow_pvp_client::{MatchOutcome, MatchPhase, SessionChange};
use flow_pvp_protocol::{GameOverReason, LobbyCode};
use flow_pvp_puzzle::{BoardCatalog, Cell};
use flow_pvp_server::{ServerConfig, ServerHandle, start_server};
use multiplayer_tests::TestGameClient;

/// Boards dealt per 30 seconds of a 5x5 round.
const BOARDS_PER_30S: u32 = 2;

fn sample_rows() -> Vec<Vec<u8>> {
    vec![
        vec![1, 2, 0, 3, 0],
        vec![0, 4, 0, 2, 0],
        vec![0, 0, 0, 4, 0],
        vec![1, 0, 0, 0, 0],
        vec![3, 0, 5, 0, 5],
    ]
}

fn path(coords: &[(usize, usize)]) -> Vec<Cell> {
    coords.iter().map(|&(r, c)| Cell::new(r, c)).collect()
}

fn solution() -> Vec<Vec<Cell>> {
    vec![
        path(&[(0, 0), (1, 0), (2, 0), (3, 0)]),
        path(&[(0, 1), (0, 2), (1, 2), (1, 3)]),
        path(&[
            (4, 0),
            (4, 1),
            (3, 1),
            (3, 2),
            (3, 3),
            (3, 4),
            (2, 4),
            (1, 4),
            (0, 4),
            (0, 3),
        ]),
        path(&[(1, 1), (2, 1), (2, 2), (2, 3)]),
        path(&[(4, 2), (4, 3), (4, 4)]),
    ]
}

fn test_config() -> ServerConfig {
    ServerConfig {
        bind_addr: "127.0.0.1:0".into(),
        seed: Some(7),
        tick_interval_ms: 20,
        boards_per_30s: BTreeMap::from([(5, BOARDS_PER_30S)]),
        ..ServerConfig::default()
    }
}

fn start_test_server(config: ServerConfig) -> (ServerHandle, SocketAddr) {
    let catalog = BoardCatalog::from_rows(vec![sample_rows()]).unwrap();
    start_server(config, catalog).unwrap()
}

/// A running server with a host and a guest seated in one lobby.
struct TestSession {
    handle: ServerHandle,
    addr: SocketAddr,
    host: TestGameClient,
    guest: TestGameClient,
    code: LobbyCode,
}

/// Start a server, create a lobby, and seat a host and a guest in it.
fn start_test_session(config: ServerConfig) -> TestSession {
    let (handle, addr) = start_test_server(config);
    let mut host = TestGameClient::connect(addr);
    let mut guest = TestGameClient::connect(addr);

    let code = host.create_lobby();
    host.join(&code);
    guest.join(&code);

    // Each join triggers a roster refresh; wait until both rosters agree.
    host.wait_until("host roster", |c| c.session().players().len() == 2);
    guest.wait_until("guest roster", |c| c.session().players().len() == 2);

    TestSession {
        handle,
        addr,
        host,
        guest,
        code,
    }
}

/// Host starts a 5x5 round; both clients wait until they are solving.
fn start_round(host: &mut TestGameClient, guest: &mut TestGameClient, game_time: u32) {
    host.controller.start_game(5, game_time).unwrap();
    host.wait_for_phase(MatchPhase::InRound(0));
    guest.wait_for_phase(MatchPhase::InRound(0));
}

// ---------------------------------------------------------------------------
// Test scenarios
// ---------------------------------------------------------------------------

/// Two players share a lobby, start a round, and see identical boards.
#[test]
fn two_player_lifecycle() {
    let TestSession {
        handle,
        mut host,
        mut guest,
        code,
        ..
    } = start_test_session(test_config());
    assert_eq!(host.controller.session().lobby_id(), Some(&code));
    assert_eq!(guest.controller.session().lobby_id(), Some(&code));

    start_round(&mut host, &mut guest, 30);

    let host_boards = host.controller.session().boards().to_vec();
    assert_eq!(host_boards.len(), BOARDS_PER_30S as usize);
    assert_eq!(host_boards, guest.controller.session().boards());
    assert_eq!(host.controller.session().game_time(), 30);
    assert!(host.controller.countdown().is_running());
    assert_eq!(host.controller.countdown().seconds_left(), 30);

    handle.stop();
}

/// Usernames and lobby settings propagate to every member.
#[test]
fn settings_reach_both_players() {
    let TestSession {
        handle,
        mut host,
        mut guest,
        ..
    } = start_test_session(test_config());
    let host_id = host.user_id();

    host.controller.set_username("Ada").unwrap();
    guest.wait_for_change("username", |c| {
        matches!(c, SessionChange::UsernameChanged { username, .. } if username == "Ada")
    });
    assert_eq!(guest.controller.session().players()[&host_id].username, "Ada");

    host.controller.set_game_time(60).unwrap();
    guest.wait_for_change("game time", |c| *c == SessionChange::GameTimeChanged(60));
    assert_eq!(guest.controller.session().game_time(), 60);

    handle.stop();
}

/// Solving a board scores a point for that player on both clients and
/// loads the next board only after the server confirms it.
#[test]
fn solved_board_scores_for_everyone() {
    let TestSession {
        handle,
        mut host,
        mut guest,
        ..
    } = start_test_session(test_config());
    let host_id = host.user_id();
    start_round(&mut host, &mut guest, 30);

    host.solve(&solution());
    assert!(matches!(
        host.controller.phase(),
        MatchPhase::RoundOver(0) | MatchPhase::InRound(1)
    ));
    host.wait_for_phase(MatchPhase::InRound(1));
    let game = host.controller.game().unwrap();
    assert!(!game.is_complete());

    guest.wait_for_change("host score", |c| {
        *c == SessionChange::ScoreChanged {
            user_id: host_id.clone(),
            score: 1,
        }
    });
    assert_eq!(guest.controller.phase(), MatchPhase::InRound(0));
    assert_eq!(guest.controller.session().scores()[&host_id], 1);

    handle.stop();
}

/// Clearing every dealt board ends the match for both players, and the
/// host can start a rematch from the finished lobby.
#[test]
fn boards_exhausted_then_rematch() {
    let TestSession {
        handle,
        mut host,
        mut guest,
        ..
    } = start_test_session(test_config());
    let host_id = host.user_id();
    let guest_id = guest.user_id();
    start_round(&mut host, &mut guest, 30);

    host.solve(&solution());
    host.wait_for_phase(MatchPhase::InRound(1));
    host.solve(&solution());

    host.wait_for_phase(MatchPhase::Finished);
    guest.wait_for_phase(MatchPhase::Finished);
    for client in [&host, &guest] {
        let session = client.controller.session();
        assert_eq!(session.game_over(), Some(GameOverReason::BoardsExhausted));
        assert_eq!(session.scores()[&host_id], 2);
        assert_eq!(session.scores()[&guest_id], 0);
        assert_eq!(
            client.controller.outcome(),
            Some(MatchOutcome::Winner {
                user_id: host_id.clone(),
                score: 2,
            })
        );
    }

    // Rematch: scores reset and the guest gets to play again.
    start_round(&mut host, &mut guest, 30);
    assert_eq!(guest.controller.session().my_score(), 0);
    assert_eq!(guest.controller.session().game_over(), None);
    guest.solve(&solution());
    guest.wait_for_phase(MatchPhase::InRound(1));

    handle.stop();
}

/// The server clock ends a round nobody finishes.
#[test]
fn round_ends_when_time_is_up() {
    let config = ServerConfig {
        min_game_time: 1,
        ..test_config()
    };
    let TestSession {
        handle,
        mut host,
        mut guest,
        ..
    } = start_test_session(config);

    // The round may already be over by the time a client polls, so only
    // the final phase is awaited.
    host.controller.start_game(5, 1).unwrap();
    host.wait_for_phase(MatchPhase::Finished);
    guest.wait_for_phase(MatchPhase::Finished);
    assert_eq!(
        host.controller.session().game_over(),
        Some(GameOverReason::TimeUp)
    );
    assert_eq!(host.controller.session().boards().len(), 1);
    assert!(guest.history.iter().any(|c| matches!(c, SessionChange::GameStarted { .. })));
    assert_eq!(
        host.controller.outcome(),
        Some(MatchOutcome::Tie { score: 0 })
    );

    handle.stop();
}

/// Requests the server refuses come back as errors for the sender only.
#[test]
fn rejected_requests() {
    let TestSession {
        handle,
        addr,
        mut host,
        mut guest,
        code,
    } = start_test_session(test_config());

    // A third player does not fit in a two-player lobby.
    let mut third = TestGameClient::connect(addr);
    third.controller.join_lobby(code.clone()).unwrap();
    let change = third.wait_for_change("full lobby", |c| matches!(c, SessionChange::Rejected(_)));
    assert_eq!(change, SessionChange::Rejected("Lobby is full".into()));
    assert_eq!(third.controller.session().lobby_id(), None);

    third
        .controller
        .join_lobby(LobbyCode::new("NOSUCH"))
        .unwrap();
    let change = third.wait_for_change("unknown lobby", |c| {
        matches!(c, SessionChange::Rejected(_))
    });
    assert_eq!(change, SessionChange::Rejected("Lobby not found".into()));

    // Settings are locked once the round is running.
    start_round(&mut host, &mut guest, 30);
    host.controller.set_game_time(90).unwrap();
    let change = host.wait_for_change("locked settings", |c| {
        matches!(c, SessionChange::Rejected(_))
    });
    assert_eq!(
        change,
        SessionChange::Rejected("Lobby settings can only change before the game starts".into())
    );
    assert_eq!(guest.controller.session().game_time(), 30);

    handle.stop();
}

/// A player who drops mid-round is reported to the one who stays.
#[test]
fn disconnect_mid_game() {
    let TestSession {
        handle,
        mut host,
        mut guest,
        ..
    } = start_test_session(test_config());
    let guest_id = guest.user_id();
    start_round(&mut host, &mut guest, 30);

    guest.disconnect();
    let change = host.wait_for_change("player_left", |c| {
        matches!(c, SessionChange::PlayerLeft { .. })
    });
    assert_eq!(
        change,
        SessionChange::PlayerLeft {
            user_id: guest_id.clone(),
            is_self: false,
        }
    );
    assert!(!host.controller.session().players().contains_key(&guest_id));
    assert_eq!(host.controller.phase(), MatchPhase::InRound(0));

    handle.stop();
}
