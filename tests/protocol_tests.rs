#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Protocol tests for the BunnyHop client.
//!
//! Fixtures are frames in the exact shape the game server writes them,
//! including its quirks: placeholder top card, empty `winner`, top-level
//! `gameId`, and players keyed by id.

use bunnyhop_client::protocol::{
    AckPayload, ActionType, Card, CardColor, ClientMessage, GamePhase, GameSnapshot, InboundFrame,
    JoinGamePayload, PlayCardPayload, PlayerView, Roster, ServerMessage, TurnDirection,
};
use bunnyhop_client::HopError;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

// ════════════════════════════════════════════════════════════════════
// Client → server
// ════════════════════════════════════════════════════════════════════

#[test]
fn join_game_wire_shape() {
    let msg = ClientMessage::JoinGame(JoinGamePayload {
        game_id: "3f2a".into(),
        player_name: "Alice".into(),
    });
    assert_eq!(
        serde_json::to_value(&msg).unwrap(),
        json!({"type": "join_game", "data": {"gameId": "3f2a", "playerName": "Alice"}})
    );
}

#[test]
fn start_game_and_get_state_have_no_data() {
    assert_eq!(
        serde_json::to_value(ClientMessage::StartGame).unwrap(),
        json!({"type": "start_game"})
    );
    assert_eq!(
        serde_json::to_value(ClientMessage::GetState).unwrap(),
        json!({"type": "get_state"})
    );
}

#[test]
fn play_card_omits_absent_target() {
    let msg = ClientMessage::PlayCard(PlayCardPayload {
        card_id: "c7".into(),
        wild_color: String::new(),
        wild_value: 0,
        target_player_id: None,
    });
    assert_eq!(
        serde_json::to_value(&msg).unwrap(),
        json!({"type": "play_card", "data": {"cardId": "c7", "wildColor": "", "wildValue": 0}})
    );
}

// ════════════════════════════════════════════════════════════════════
// Server → client: acks and errors
// ════════════════════════════════════════════════════════════════════

#[test]
fn failed_join_has_empty_player_id() {
    let frame = r#"{"type":"join_result","data":{"success":false,"playerId":"","error":"Game not found"}}"#;
    let ServerMessage::JoinResult(result) = serde_json::from_str(frame).unwrap() else {
        panic!("expected join_result");
    };
    assert!(!result.success);
    assert_eq!(result.player_id, None);
    assert_eq!(result.error.as_deref(), Some("Game not found"));
}

#[test]
fn ack_into_result_names_the_action() {
    let ack = AckPayload {
        success: false,
        error: Some("Not your turn".into()),
    };
    let err = ack.into_result("play card").unwrap_err();
    assert_eq!(err.to_string(), "failed to play card: Not your turn");

    let ok = AckPayload {
        success: true,
        error: None,
    };
    assert!(ok.into_result("start game").is_ok());
}

#[test]
fn top_level_game_id_is_ignored() {
    let frame = r#"{"type":"start_result","gameId":"g1","data":{"success":true}}"#;
    assert_eq!(
        serde_json::from_str::<ServerMessage>(frame).unwrap(),
        ServerMessage::StartResult(AckPayload {
            success: true,
            error: None
        })
    );
}

#[test]
fn error_frame_parses() {
    let frame = r#"{"type":"error","data":{"error":"Unknown message type"}}"#;
    let ServerMessage::Error(payload) = serde_json::from_str(frame).unwrap() else {
        panic!("expected error frame");
    };
    assert_eq!(payload.error, "Unknown message type");
}

// ════════════════════════════════════════════════════════════════════
// Frame classification
// ════════════════════════════════════════════════════════════════════

#[test]
fn unknown_type_is_classified_not_rejected() {
    let frame = InboundFrame::parse(r#"{"type":"player_joined","data":{"id":"p3"}}"#).unwrap();
    assert_eq!(
        frame,
        InboundFrame::Unknown {
            kind: "player_joined".into()
        }
    );
}

#[test]
fn known_type_with_broken_payload_is_an_error() {
    let err =
        InboundFrame::parse(r#"{"type":"play_result","data":{"success":"yes"}}"#).unwrap_err();
    assert!(matches!(err, HopError::Serialization(_)));
}

#[test]
fn frame_without_type_is_an_error() {
    assert_err!(InboundFrame::parse(r#"{"data":{}}"#));
    assert_err!(InboundFrame::parse("not json"));
    assert_ok!(InboundFrame::parse(r#"{"type":"get_state"}"#));
}

// ════════════════════════════════════════════════════════════════════
// Snapshots
// ════════════════════════════════════════════════════════════════════

const WAITING_FRAME: &str = r#"{
    "type": "game_state",
    "gameId": "g1",
    "data": {
        "id": "g1",
        "state": "waiting",
        "players": {
            "zed": {
                "id": "zed", "name": "Zed", "position": 0,
                "hand": null, "isBlocked": false, "hasDouble": false
            },
            "amy": {
                "id": "amy", "name": "Amy", "position": 0,
                "hand": null, "isBlocked": false, "hasDouble": false
            }
        },
        "currentPlayer": 0,
        "direction": 1,
        "topCard": {"id": "", "type": ""},
        "winner": ""
    }
}"#;

fn snapshot_of(frame: &str) -> GameSnapshot {
    match InboundFrame::parse(frame).unwrap() {
        InboundFrame::Message(ServerMessage::GameState(snapshot)) => *snapshot,
        other => panic!("expected game_state, got {other:?}"),
    }
}

#[test]
fn waiting_snapshot_absorbs_server_placeholders() {
    let snapshot = snapshot_of(WAITING_FRAME);
    assert_eq!(snapshot.id.as_deref(), Some("g1"));
    assert_eq!(snapshot.phase, GamePhase::Waiting);
    assert_eq!(snapshot.max_players, None);
    assert_eq!(snapshot.top_card, None);
    assert_eq!(snapshot.winner, None);
    assert_eq!(snapshot.direction, TurnDirection::Forward);
    assert!(snapshot.players.iter().all(|p| p.hand.is_empty()));
}

#[test]
fn player_order_follows_the_document_not_the_keys() {
    let snapshot = snapshot_of(WAITING_FRAME);
    let names: Vec<&str> = snapshot.players.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["Zed", "Amy"]);
    assert_eq!(snapshot.current_player().unwrap().id, "zed");
}

#[test]
fn explicit_player_order_wins() {
    let snapshot: GameSnapshot = serde_json::from_value(json!({
        "state": "started",
        "players": {
            "a": {"name": "A"},
            "b": {"name": "B"},
            "c": {"name": "C"}
        },
        "playerOrder": ["c", "a", "b"],
        "currentPlayer": 1,
        "direction": -1
    }))
    .unwrap();

    let ids: Vec<&str> = snapshot.players.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["c", "a", "b"]);
    assert_eq!(snapshot.current_player().unwrap().name, "A");
    assert_eq!(snapshot.direction, TurnDirection::Backward);
}

#[test]
fn players_may_also_arrive_as_a_list() {
    let snapshot: GameSnapshot = serde_json::from_value(json!({
        "state": "started",
        "players": [
            {"id": "p1", "name": "Alice", "handCount": 4},
            {
                "id": "p2",
                "name": "Bob",
                "hand": [{"id": "c1", "type": "hop", "color": "red", "value": 2}]
            }
        ],
        "currentPlayer": 0
    }))
    .unwrap();

    assert_eq!(snapshot.players.len(), 2);
    assert_eq!(snapshot.player("p1").unwrap().card_count(), 4);
    assert_eq!(snapshot.player("p2").unwrap().card_count(), 1);
}

#[test]
fn duplicate_player_ids_are_rejected() {
    let result = serde_json::from_value::<GameSnapshot>(json!({
        "state": "started",
        "players": [
            {"id": "p1", "name": "Alice"},
            {"id": "p1", "name": "Alice again"}
        ]
    }));
    assert!(result.is_err());
}

#[test]
fn roster_from_vec_checks_ids() {
    let players: Vec<PlayerView> = ["p1", "p2", "p1"]
        .iter()
        .map(|id| serde_json::from_value(json!({"id": id, "name": id})).unwrap())
        .collect();
    let err = Roster::try_from(players).unwrap_err();
    assert!(matches!(err, HopError::InvalidInput(_)));
}

#[test]
fn finished_snapshot_resolves_winner() {
    let snapshot: GameSnapshot = serde_json::from_value(json!({
        "state": "finished",
        "players": {
            "p1": {"name": "Alice", "position": 12},
            "p2": {"name": "Bob", "position": 20}
        },
        "currentPlayer": 0,
        "direction": 1,
        "topCard": {"id": "c9", "type": "hop", "color": "blue", "value": 5},
        "winner": "p2"
    }))
    .unwrap();

    assert_eq!(snapshot.winner_player().unwrap().name, "Bob");
    assert_eq!(snapshot.top_card.as_ref().unwrap().id(), "c9");
}

// ════════════════════════════════════════════════════════════════════
// Cards
// ════════════════════════════════════════════════════════════════════

#[test]
fn card_kinds_parse() {
    let hop: Card =
        serde_json::from_value(json!({"id": "h1", "type": "hop", "color": "green", "value": 3}))
            .unwrap();
    assert_eq!(hop.color(), Some(CardColor::Green));
    assert_eq!(hop.action_type(), None);

    let action: Card = serde_json::from_value(
        json!({"id": "a1", "type": "action", "color": "red", "actionType": "draw_two"}),
    )
    .unwrap();
    assert_eq!(action.action_type(), Some(&ActionType::DrawTwo));

    let special: Card = serde_json::from_value(
        json!({"id": "s1", "type": "special", "color": "wild", "actionType": "wild_hop"}),
    )
    .unwrap();
    assert_eq!(special.color(), Some(CardColor::Wild));
    assert!(special.needs_wild_value());
}

#[test]
fn unknown_action_is_kept_verbatim() {
    let card: Card = serde_json::from_value(
        json!({"id": "a9", "type": "action", "color": "blue", "actionType": "teleport"}),
    )
    .unwrap();
    let action = card.action_type().unwrap();
    assert_eq!(action, &ActionType::Other("teleport".into()));
    assert_eq!(action.as_str(), "teleport");
    assert!(!card.needs_wild_value());
}

#[test]
fn unparseable_top_card_is_treated_as_absent() {
    let snapshot: GameSnapshot = serde_json::from_value(json!({
        "state": "started",
        "players": {"p1": {"name": "Alice"}},
        "topCard": {"id": "x1", "type": "mystery"}
    }))
    .unwrap();
    assert_eq!(snapshot.top_card, None);
}
