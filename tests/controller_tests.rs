#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! End-to-end controller tests.
//!
//! Each test drives a `GameController` over the shared `MockTransport`,
//! scripting the server side frame by frame and checking both the
//! `UiCommand`s produced and the frames the client wrote.

mod common;

use std::time::Duration;

use bunnyhop_client::protocol::GamePhase;
use bunnyhop_client::screen::Screen;
use bunnyhop_client::{
    ClientConfig, ConnectionEvent, ConnectionId, GameController, GameSnapshot, JoinRequest,
    UiCommand,
};
use serde_json::json;

use common::{
    ack_json, action, error_frame_json, finished_json, hop, join_failed_json, join_result_json,
    player, special, started_json, waiting_json, MockServer, MockTransport,
};

// ════════════════════════════════════════════════════════════════════
// Helpers
// ════════════════════════════════════════════════════════════════════

fn controller() -> GameController {
    GameController::new(ClientConfig::new("http://localhost:8080"))
}

/// Join game `g1` as Alice over a fresh mock connection.
async fn join(controller: &mut GameController) -> (ConnectionId, MockServer) {
    let (transport, server) = MockTransport::new();
    let request = JoinRequest::new("g1", "Alice").unwrap();
    let (id, _commands) = controller.join(request, transport).await;
    (id, server)
}

/// Wait for the next connection event and apply it.
async fn step(controller: &mut GameController) -> Vec<UiCommand> {
    let (from, event) = tokio::time::timeout(Duration::from_secs(2), controller.next_event())
        .await
        .expect("timed out waiting for a connection event");
    controller.handle_event(from, event)
}

/// Wait until the client has written `count` frames.
async fn wait_for_sent(server: &MockServer, count: usize) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while server.sent().len() < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("client did not send the expected frames");
}

/// Join, receive `Connected`, and get `p1` assigned.
async fn joined(controller: &mut GameController) -> (ConnectionId, MockServer) {
    let (id, server) = join(controller).await;
    assert_eq!(
        step(controller).await,
        vec![UiCommand::Log("Connected to server".into())]
    );
    server.push(join_result_json("p1"));
    step(controller).await;
    (id, server)
}

fn alice_and_bob(alice_hand: Vec<serde_json::Value>) -> Vec<serde_json::Value> {
    vec![
        player("p1", "Alice", 0, alice_hand),
        player("p2", "Bob", 0, vec![]),
    ]
}

// ════════════════════════════════════════════════════════════════════
// Join handshake
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn join_is_the_first_frame_and_sent_once() {
    let mut controller = controller();
    let (_id, server) = join(&mut controller).await;

    assert_eq!(
        step(&mut controller).await,
        vec![UiCommand::Log("Connected to server".into())]
    );
    wait_for_sent(&server, 1).await;

    let sent = server.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0],
        json!({"type": "join_game", "data": {"gameId": "g1", "playerName": "Alice"}})
    );
}

#[tokio::test]
async fn successful_join_moves_to_waiting_room() {
    let mut controller = controller();
    let (_id, server) = join(&mut controller).await;
    step(&mut controller).await;

    server.push(join_result_json("p1"));
    assert_eq!(
        step(&mut controller).await,
        vec![
            UiCommand::ShowScreen(Screen::WaitingRoom),
            UiCommand::Log("Joined game as p1".into()),
        ]
    );
    assert_eq!(controller.screen(), Screen::WaitingRoom);
    assert_eq!(controller.local_player_id(), Some("p1"));
}

#[tokio::test]
async fn failed_join_alerts_and_stays_in_lobby() {
    let mut controller = controller();
    let (_id, server) = join(&mut controller).await;
    step(&mut controller).await;

    server.push(join_failed_json("Game is full"));
    assert_eq!(
        step(&mut controller).await,
        vec![UiCommand::Alert("Failed to join game: Game is full".into())]
    );
    assert_eq!(controller.screen(), Screen::Lobby);
    assert_eq!(controller.local_player_id(), None);
    assert!(controller.session().is_none());

    // The server still broadcasts the refused game's state.
    server.push(waiting_json(&alice_and_bob(vec![])));
    let next = tokio::time::timeout(Duration::from_millis(50), controller.next_event()).await;
    assert!(next.is_err(), "rejected connection delivered {next:?}");
    assert_eq!(controller.screen(), Screen::Lobby);
    assert!(controller.snapshot().is_none());

    assert_eq!(
        controller.start_game(),
        vec![UiCommand::Alert("Not connected to server".into())]
    );
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(server.sent_kinds(), vec!["join_game"]);
}

// ════════════════════════════════════════════════════════════════════
// Screen sequence
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn waiting_started_finished_sequence() {
    let mut controller = controller();
    let (_id, server) = joined(&mut controller).await;

    server.push(waiting_json(&alice_and_bob(vec![])));
    let commands = step(&mut controller).await;
    let [UiCommand::RenderWaitingRoom(room)] = commands.as_slice() else {
        panic!("expected a waiting room render, got {commands:?}");
    };
    assert_eq!(room.game_id.as_deref(), Some("g1"));
    assert_eq!(room.max_players, None);
    assert_eq!(
        room.players,
        vec![("Alice".to_owned(), true), ("Bob".to_owned(), false)]
    );

    assert!(controller.start_game().is_empty());
    wait_for_sent(&server, 2).await;
    assert_eq!(server.sent_kinds(), vec!["join_game", "start_game"]);

    server.push(ack_json("start_result", true, None));
    assert_eq!(
        step(&mut controller).await,
        vec![UiCommand::Log("Game started!".into())]
    );

    server.push(started_json(
        0,
        &alice_and_bob(vec![hop("c1", "red", 3), action("c2", "blue", "skip")]),
        hop("c0", "green", 2),
    ));
    let commands = step(&mut controller).await;
    assert_eq!(commands[0], UiCommand::ShowScreen(Screen::Active));
    let UiCommand::RenderGame(view) = &commands[1] else {
        panic!("expected a game render, got {commands:?}");
    };
    assert!(view.view_model.is_my_turn);
    assert_eq!(view.view_model.turn_label, "Alice");
    assert_eq!(view.hand.len(), 2);
    assert!(view.hand.iter().all(|card| card.clickable));
    assert_eq!(view.top_card.as_ref().unwrap().card_id, "c0");

    server.push(finished_json(&alice_and_bob(vec![]), "p2"));
    assert_eq!(
        step(&mut controller).await,
        vec![
            UiCommand::ShowScreen(Screen::Finished),
            UiCommand::ShowWinner {
                name: "Bob".into()
            },
        ]
    );
    assert_eq!(controller.snapshot().unwrap().phase, GamePhase::Finished);
}

#[tokio::test]
async fn other_players_turn_has_nothing_playable() {
    let mut controller = controller();
    let (_id, server) = joined(&mut controller).await;

    server.push(started_json(1, &alice_and_bob(vec![hop("c1", "red", 3)]), hop("c0", "red", 1)));
    step(&mut controller).await;

    let view_model = controller.view_model().unwrap();
    assert!(!view_model.is_my_turn);
    assert!(view_model.playable_card_ids.is_empty());
    assert_eq!(view_model.turn_label, "Bob");
}

#[tokio::test]
async fn start_is_refused_once_the_game_runs() {
    let mut controller = controller();
    let (_id, server) = joined(&mut controller).await;

    server.push(started_json(0, &alice_and_bob(vec![]), hop("c0", "red", 1)));
    step(&mut controller).await;

    assert_eq!(
        controller.start_game(),
        vec![UiCommand::Alert("The game has already started".into())]
    );
}

// ════════════════════════════════════════════════════════════════════
// Playing cards
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn plain_card_is_sent_with_empty_wild_fields() {
    let mut controller = controller();
    let (_id, server) = joined(&mut controller).await;
    server.push(started_json(0, &alice_and_bob(vec![hop("c1", "red", 3)]), hop("c0", "red", 1)));
    step(&mut controller).await;

    assert!(controller.play_card("c1").is_empty());
    wait_for_sent(&server, 2).await;
    assert_eq!(
        server.sent()[1],
        json!({"type": "play_card", "data": {"cardId": "c1", "wildColor": "", "wildValue": 0}})
    );

    server.push(ack_json("play_result", true, None));
    assert_eq!(
        step(&mut controller).await,
        vec![UiCommand::Log("Card played successfully".into())]
    );
}

#[tokio::test]
async fn wild_hop_sends_only_a_valid_value() {
    let mut controller = controller();
    let (_id, server) = joined(&mut controller).await;
    server.push(started_json(
        0,
        &alice_and_bob(vec![special("w1", "wild_hop")]),
        hop("c0", "red", 1),
    ));
    step(&mut controller).await;

    let prompt = UiCommand::PromptWildValue {
        card_id: "w1".into(),
        min: 1,
        max: 10,
        suggested: 5,
    };

    for bad in ["0", "11", "abc"] {
        assert_eq!(controller.play_card("w1"), vec![prompt.clone()]);
        assert!(controller.is_awaiting_wild_value());
        assert!(controller.submit_wild_value(bad).is_empty());
        assert!(!controller.is_awaiting_wild_value());
    }

    assert_eq!(controller.play_card("w1"), vec![prompt]);
    assert_eq!(controller.pending_wild_card().unwrap().card_id, "w1");
    assert!(controller.submit_wild_value("5").is_empty());

    wait_for_sent(&server, 2).await;
    let sent = server.sent();
    assert_eq!(sent.len(), 2, "only the valid value may be sent: {sent:?}");
    assert_eq!(
        sent[1],
        json!({"type": "play_card", "data": {"cardId": "w1", "wildColor": "", "wildValue": 5}})
    );
}

#[tokio::test]
async fn cancelled_prompt_sends_nothing() {
    let mut controller = controller();
    let (_id, server) = joined(&mut controller).await;
    server.push(started_json(
        0,
        &alice_and_bob(vec![special("w1", "wild_hop")]),
        hop("c0", "red", 1),
    ));
    step(&mut controller).await;

    controller.play_card("w1");
    assert!(controller.cancel_wild_value().is_empty());
    assert!(!controller.is_awaiting_wild_value());

    controller.refresh_state();
    wait_for_sent(&server, 2).await;
    assert_eq!(server.sent_kinds(), vec!["join_game", "get_state"]);
}

#[tokio::test]
async fn targeted_card_carries_the_victim() {
    let mut controller = controller();
    let (_id, server) = joined(&mut controller).await;
    server.push(started_json(
        0,
        &alice_and_bob(vec![action("b1", "yellow", "block")]),
        hop("c0", "red", 1),
    ));
    step(&mut controller).await;

    assert!(controller.play_card_targeting("b1", "p2".into()).is_empty());
    wait_for_sent(&server, 2).await;
    assert_eq!(server.sent()[1]["data"]["targetPlayerId"], "p2");
}

#[tokio::test]
async fn rejected_play_and_server_error_become_alerts() {
    let mut controller = controller();
    let (_id, server) = joined(&mut controller).await;

    server.push(ack_json("play_result", false, Some("Not your turn")));
    assert_eq!(
        step(&mut controller).await,
        vec![UiCommand::Alert("Failed to play card: Not your turn".into())]
    );

    server.push(ack_json("start_result", false, Some("Need at least 2 players")));
    assert_eq!(
        step(&mut controller).await,
        vec![UiCommand::Alert(
            "Failed to start game: Need at least 2 players".into()
        )]
    );

    server.push(error_frame_json("Invalid message format"));
    assert_eq!(
        step(&mut controller).await,
        vec![UiCommand::Alert("Server error: Invalid message format".into())]
    );
}

#[tokio::test]
async fn unknown_frames_are_skipped() {
    let mut controller = controller();
    let (_id, server) = joined(&mut controller).await;

    server.push(r#"{"type":"chat","data":{"text":"hi"}}"#);
    server.push(waiting_json(&alice_and_bob(vec![])));

    let commands = step(&mut controller).await;
    assert!(matches!(
        commands.as_slice(),
        [UiCommand::RenderWaitingRoom(_)]
    ));
}

// ════════════════════════════════════════════════════════════════════
// Connection loss and leaving
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn actions_need_a_connection() {
    let mut controller = controller();
    let notice = vec![UiCommand::Alert("Not connected to server".into())];

    assert_eq!(controller.start_game(), notice);
    assert_eq!(controller.play_card("c1"), notice);
    assert_eq!(controller.refresh_state(), notice);
}

#[tokio::test]
async fn disconnect_keeps_session_but_blocks_actions() {
    let mut controller = controller();
    let (_id, server) = joined(&mut controller).await;

    server.hang_up();
    assert_eq!(
        step(&mut controller).await,
        vec![UiCommand::Log("Disconnected from server".into())]
    );
    assert!(!controller.is_connected());
    assert!(controller.session().is_some());
    assert_eq!(
        controller.start_game(),
        vec![UiCommand::Alert("Not connected to server".into())]
    );
}

#[tokio::test]
async fn transport_error_is_logged_as_disconnect() {
    let mut controller = controller();
    let (_id, server) = joined(&mut controller).await;

    server.fail("connection reset");
    assert_eq!(
        step(&mut controller).await,
        vec![UiCommand::Log("Disconnected from server".into())]
    );
}

#[tokio::test]
async fn leave_clears_state_and_discards_stale_frames() {
    let mut controller = controller();
    let (old_id, old_server) = joined(&mut controller).await;
    old_server.push(waiting_json(&alice_and_bob(vec![])));
    step(&mut controller).await;

    assert_eq!(
        controller.leave().await,
        vec![UiCommand::ShowScreen(Screen::Lobby), UiCommand::ClearLog]
    );
    assert!(old_server.is_closed());
    assert!(controller.session().is_none());
    assert!(controller.snapshot().is_none());
    assert_eq!(controller.screen(), Screen::Lobby);

    let (new_id, _new_server) = join(&mut controller).await;
    assert_ne!(old_id, new_id);

    let stale: GameSnapshot = serde_json::from_value(json!({
        "state": "started",
        "currentPlayer": 0,
        "players": {"p1": {"name": "Alice", "position": 3}},
        "direction": 1,
        "topCard": {"id": "", "type": ""},
        "winner": ""
    }))
    .unwrap();
    let commands =
        controller.handle_event(old_id, ConnectionEvent::GameState(Box::new(stale)));
    assert!(commands.is_empty());
    assert!(controller.snapshot().is_none());
    assert_eq!(controller.screen(), Screen::Lobby);
    assert_eq!(controller.session().unwrap().connection_id, new_id);
}

#[tokio::test]
async fn joining_again_replaces_the_session() {
    let mut controller = controller();
    let (_old_id, old_server) = joined(&mut controller).await;

    assert_eq!(controller.screen(), Screen::WaitingRoom);

    let (transport, _server) = MockTransport::new();
    let request = JoinRequest::new("g2", "Alice").unwrap();
    let (_new_id, commands) = controller.join(request, transport).await;

    assert_eq!(
        commands,
        vec![UiCommand::ShowScreen(Screen::Lobby), UiCommand::ClearLog]
    );
    assert_eq!(controller.screen(), Screen::Lobby);
    assert!(old_server.is_closed());
    let session = controller.session().unwrap();
    assert_eq!(session.game_id, "g2");
    assert_eq!(session.local_player_id, None);
}

#[tokio::test]
async fn first_join_needs_no_teardown_commands() {
    let mut controller = controller();
    let (transport, _server) = MockTransport::new();
    let request = JoinRequest::new("g1", "Alice").unwrap();
    let (_id, commands) = controller.join(request, transport).await;
    assert!(commands.is_empty());
}

#[tokio::test]
async fn lobby_seat_count_reaches_the_waiting_room() {
    let mut controller = controller();
    let (transport, server) = MockTransport::new();
    let request = JoinRequest::new("g1", "Alice").unwrap().with_max_players(4);
    controller.join(request, transport).await;
    step(&mut controller).await;
    server.push(join_result_json("p1"));
    step(&mut controller).await;

    server.push(waiting_json(&alice_and_bob(vec![])));
    let commands = step(&mut controller).await;
    let [UiCommand::RenderWaitingRoom(room)] = commands.as_slice() else {
        panic!("expected a waiting room render, got {commands:?}");
    };
    assert_eq!(room.max_players, Some(4));
}
