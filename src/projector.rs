//! State projection: derive render-ready data from a [`GameSnapshot`].
//!
//! Everything here is a pure function of the snapshot and the local player
//! id. Nothing is cached; the controller re-projects on every snapshot.

use std::collections::BTreeSet;

use crate::card::{render_card, CardContext, RenderDescriptor};
use crate::protocol::{CardId, GamePhase, GameSnapshot, PlayerId, TurnDirection};

/// Label used when a player id cannot be resolved to a name.
pub const UNKNOWN_PLAYER: &str = "Unknown";

/// Per-snapshot turn information for the local player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewModel {
    pub is_my_turn: bool,
    /// Ids of cards the UI lets the player click. Empty unless `is_my_turn`.
    pub playable_card_ids: BTreeSet<CardId>,
    /// Id of the turn holder, if it resolves.
    pub current_player_id: Option<PlayerId>,
    pub turn_label: String,
    pub direction_glyph: &'static str,
}

/// Glyph shown for the turn direction.
pub fn direction_glyph(direction: TurnDirection) -> &'static str {
    match direction {
        TurnDirection::Forward => "→",
        TurnDirection::Backward => "←",
    }
}

/// Project `snapshot` for the player `local_player_id`.
///
/// A missing or unknown local id yields a neutral view (not my turn, nothing
/// playable).
pub fn project(snapshot: &GameSnapshot, local_player_id: Option<&str>) -> ViewModel {
    let current = snapshot.current_player();
    let is_my_turn = snapshot.phase == GamePhase::Started
        && matches!(
            (current, local_player_id),
            (Some(player), Some(local)) if player.id == local
        );

    let playable_card_ids = if is_my_turn {
        current
            .map(|player| player.hand.iter().map(|card| card.id().to_owned()).collect())
            .unwrap_or_default()
    } else {
        BTreeSet::new()
    };

    ViewModel {
        is_my_turn,
        playable_card_ids,
        current_player_id: current.map(|player| player.id.clone()),
        turn_label: current
            .map(|player| player.name.clone())
            .unwrap_or_else(|| UNKNOWN_PLAYER.to_owned()),
        direction_glyph: direction_glyph(snapshot.direction),
    }
}

/// One player box on the game screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRow {
    pub id: PlayerId,
    pub name: String,
    pub position: u32,
    pub card_count: usize,
    pub is_current: bool,
    pub is_you: bool,
    pub is_blocked: bool,
    pub has_double: bool,
}

/// Content of the waiting room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitingRoomView {
    pub game_id: Option<String>,
    /// Seat count, when either the server or the lobby reported one.
    pub max_players: Option<u32>,
    /// `(name, is_you)` in join order.
    pub players: Vec<(String, bool)>,
}

/// Content of the game screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameView {
    pub view_model: ViewModel,
    pub players: Vec<PlayerRow>,
    pub top_card: Option<RenderDescriptor>,
    /// The local hand; empty before joining.
    pub hand: Vec<RenderDescriptor>,
}

/// Waiting-room content. `seats` is the seat count known from the lobby; the
/// snapshot's own count wins when the server sends one.
pub fn waiting_room(
    snapshot: &GameSnapshot,
    game_id: Option<&str>,
    seats: Option<u32>,
    local_player_id: Option<&str>,
) -> WaitingRoomView {
    WaitingRoomView {
        game_id: game_id.map(str::to_owned).or_else(|| snapshot.id.clone()),
        max_players: snapshot.max_players.or(seats),
        players: snapshot
            .players
            .iter()
            .map(|player| (player.name.clone(), Some(player.id.as_str()) == local_player_id))
            .collect(),
    }
}

pub fn game_view(snapshot: &GameSnapshot, local_player_id: Option<&str>) -> GameView {
    let view_model = project(snapshot, local_player_id);

    let players = snapshot
        .players
        .iter()
        .map(|player| PlayerRow {
            id: player.id.clone(),
            name: player.name.clone(),
            position: player.position,
            card_count: player.card_count(),
            is_current: view_model.current_player_id.as_deref() == Some(player.id.as_str()),
            is_you: Some(player.id.as_str()) == local_player_id,
            is_blocked: player.is_blocked,
            has_double: player.has_double,
        })
        .collect();

    let hand = local_player_id
        .and_then(|id| snapshot.player(id))
        .map(|me| {
            me.hand
                .iter()
                .map(|card| render_card(card, CardContext::hand(view_model.is_my_turn)))
                .collect()
        })
        .unwrap_or_default();

    GameView {
        top_card: snapshot
            .top_card
            .as_ref()
            .map(|card| render_card(card, CardContext::TABLE)),
        players,
        hand,
        view_model,
    }
}

/// Name of the winner, or [`UNKNOWN_PLAYER`].
pub fn winner_label(snapshot: &GameSnapshot) -> String {
    snapshot
        .winner_player()
        .map(|player| player.name.clone())
        .unwrap_or_else(|| UNKNOWN_PLAYER.to_owned())
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::protocol::{Card, CardColor, PlayerView, Roster};

    fn player(id: &str, name: &str, hand: Vec<Card>) -> PlayerView {
        PlayerView {
            id: id.into(),
            name: name.into(),
            position: 0,
            hand,
            hand_count: None,
            is_blocked: false,
            has_double: false,
        }
    }

    fn hop(id: &str) -> Card {
        Card::Hop {
            id: id.into(),
            color: CardColor::Blue,
            value: 3,
        }
    }

    fn started(current: usize) -> GameSnapshot {
        GameSnapshot {
            phase: GamePhase::Started,
            max_players: Some(4),
            players: Roster::try_from(vec![
                player("p1", "Alice", vec![hop("c1"), hop("c2")]),
                player("p2", "Bob", vec![hop("c3")]),
            ])
            .unwrap(),
            current_player_index: current,
            ..GameSnapshot::default()
        }
    }

    #[test]
    fn my_turn_when_current_index_resolves_to_me() {
        let vm = project(&started(0), Some("p1"));
        assert!(vm.is_my_turn);
        assert_eq!(vm.turn_label, "Alice");
        assert_eq!(vm.current_player_id.as_deref(), Some("p1"));
        let ids: Vec<_> = vm.playable_card_ids.iter().cloned().collect();
        assert_eq!(ids, vec!["c1".to_string(), "c2".to_string()]);
    }

    #[test]
    fn not_my_turn_means_nothing_playable() {
        let vm = project(&started(1), Some("p1"));
        assert!(!vm.is_my_turn);
        assert!(vm.playable_card_ids.is_empty());
        assert_eq!(vm.turn_label, "Bob");
    }

    #[test]
    fn never_my_turn_outside_started_phase() {
        let mut snapshot = started(0);
        snapshot.phase = GamePhase::Waiting;
        assert!(!project(&snapshot, Some("p1")).is_my_turn);
        snapshot.phase = GamePhase::Finished;
        assert!(!project(&snapshot, Some("p1")).is_my_turn);
    }

    #[test]
    fn absent_local_player_gives_neutral_view() {
        let snapshot = started(0);
        for local in [None, Some("ghost")] {
            let vm = project(&snapshot, local);
            assert!(!vm.is_my_turn);
            assert!(vm.playable_card_ids.is_empty());
        }
    }

    #[test]
    fn unresolvable_index_falls_back_to_unknown_label() {
        let vm = project(&started(7), Some("p1"));
        assert!(!vm.is_my_turn);
        assert_eq!(vm.turn_label, UNKNOWN_PLAYER);
        assert!(vm.current_player_id.is_none());
    }

    #[test]
    fn projection_is_idempotent() {
        let snapshot = started(0);
        assert_eq!(project(&snapshot, Some("p1")), project(&snapshot, Some("p1")));
    }

    #[test]
    fn direction_glyph_follows_sign() {
        let mut snapshot = started(0);
        assert_eq!(project(&snapshot, None).direction_glyph, "→");
        snapshot.direction = TurnDirection::Backward;
        assert_eq!(project(&snapshot, None).direction_glyph, "←");
    }

    #[test]
    fn game_view_marks_rows_and_hand() {
        let view = game_view(&started(1), Some("p2"));
        assert!(view.view_model.is_my_turn);
        assert!(!view.players[0].is_current);
        assert!(view.players[1].is_current);
        assert!(view.players[1].is_you);
        assert_eq!(view.players[0].card_count, 2);
        assert_eq!(view.hand.len(), 1);
        assert!(view.hand[0].clickable);
        assert!(view.top_card.is_none());
    }

    #[test]
    fn waiting_room_lists_players_in_join_order() {
        let room = waiting_room(&started(0), Some("game-1"), None, Some("p2"));
        assert_eq!(room.game_id.as_deref(), Some("game-1"));
        assert_eq!(room.max_players, Some(4));
        assert_eq!(
            room.players,
            vec![("Alice".to_string(), false), ("Bob".to_string(), true)]
        );
    }

    #[test]
    fn seat_count_falls_back_to_the_lobby_and_may_stay_unknown() {
        let mut snapshot = started(0);
        snapshot.max_players = None;
        assert_eq!(waiting_room(&snapshot, None, Some(6), None).max_players, Some(6));
        assert_eq!(waiting_room(&snapshot, None, None, None).max_players, None);
    }

    #[test]
    fn winner_label_resolves_name() {
        let mut snapshot = started(0);
        snapshot.phase = GamePhase::Finished;
        snapshot.winner = Some("p2".into());
        assert_eq!(winner_label(&snapshot), "Bob");
        snapshot.winner = Some("nobody".into());
        assert_eq!(winner_label(&snapshot), UNKNOWN_PLAYER);
    }
}
