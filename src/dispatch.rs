//! Action dispatch: turn player intents into outbound requests.
//!
//! Playing a `wild_hop` card needs a hop value from the player. Rather than
//! blocking, the dispatcher parks the play in an "awaiting wild value" state
//! and hands control back; only [`ActionDispatcher::complete_wild_value`] or
//! [`ActionDispatcher::cancel_wild_value`] resume it. At most one such prompt
//! is outstanding.

use crate::connection::ConnectionManager;
use crate::error::{HopError, Result};
use crate::protocol::{CardId, ClientMessage, GamePhase, GameSnapshot, PlayCardPayload, PlayerId};

/// Smallest hop value accepted for a wild hop.
pub const WILD_VALUE_MIN: u8 = 1;
/// Largest hop value accepted for a wild hop.
pub const WILD_VALUE_MAX: u8 = 10;
/// Value suggested to the player when prompting.
pub const WILD_VALUE_SUGGESTED: u8 = 5;

/// Where dispatched requests go.
pub trait Outbound {
    fn is_open(&self) -> bool;

    /// # Errors
    ///
    /// Returns [`HopError::NotConnected`] if the message cannot be queued.
    fn send(&self, message: ClientMessage) -> Result<()>;
}

impl Outbound for ConnectionManager {
    fn is_open(&self) -> bool {
        ConnectionManager::is_open(self)
    }

    fn send(&self, message: ClientMessage) -> Result<()> {
        ConnectionManager::send(self, message)
    }
}

/// Why a request was refused locally, before reaching the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    NotConnected,
    AlreadyStarted,
    UnknownCard,
    PromptPending,
}

impl Notice {
    /// Text shown to the player.
    pub fn message(self) -> &'static str {
        match self {
            Self::NotConnected => "Not connected to server",
            Self::AlreadyStarted => "The game has already started",
            Self::UnknownCard => "That card is not in your hand",
            Self::PromptPending => "Choose a hop value for your wild card first",
        }
    }
}

/// Result of a dispatch call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A frame was queued for the server.
    Sent,
    /// The play is parked until a hop value is supplied.
    AwaitingWildValue { card_id: CardId },
    /// Dropped without a frame or a notice.
    Aborted,
    /// Refused locally; show the notice.
    Refused(Notice),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingPlay {
    card_id: CardId,
    target_player_id: Option<PlayerId>,
}

#[derive(Debug, Default)]
pub struct ActionDispatcher {
    pending: Option<PendingPlay>,
}

impl ActionDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_awaiting_wild_value(&self) -> bool {
        self.pending.is_some()
    }

    /// Card whose play is parked, if any.
    pub fn pending_card(&self) -> Option<&str> {
        self.pending.as_ref().map(|pending| pending.card_id.as_str())
    }

    /// Drop any parked play.
    pub fn reset(&mut self) {
        self.pending = None;
    }

    /// Ask the server to start the game. Refused once the game is running.
    pub fn request_start_game(
        &mut self,
        outbound: Option<&dyn Outbound>,
        snapshot: Option<&GameSnapshot>,
    ) -> DispatchOutcome {
        let Some(outbound) = open(outbound) else {
            return DispatchOutcome::Refused(Notice::NotConnected);
        };
        if snapshot.is_some_and(|s| s.phase != GamePhase::Waiting) {
            return DispatchOutcome::Refused(Notice::AlreadyStarted);
        }
        send(outbound, ClientMessage::StartGame)
    }

    /// Play `card_id` from the local hand.
    ///
    /// A `wild_hop` card parks the play and returns
    /// [`DispatchOutcome::AwaitingWildValue`]. Legality is left to the server.
    pub fn request_play_card(
        &mut self,
        outbound: Option<&dyn Outbound>,
        snapshot: Option<&GameSnapshot>,
        local_player_id: Option<&str>,
        card_id: &str,
        target_player_id: Option<PlayerId>,
    ) -> DispatchOutcome {
        let Some(outbound) = open(outbound) else {
            return DispatchOutcome::Refused(Notice::NotConnected);
        };
        if self.pending.is_some() {
            return DispatchOutcome::Refused(Notice::PromptPending);
        }

        let card = snapshot
            .zip(local_player_id)
            .and_then(|(snapshot, id)| snapshot.player(id))
            .and_then(|me| me.find_card(card_id));
        let Some(card) = card else {
            return DispatchOutcome::Refused(Notice::UnknownCard);
        };

        if card.needs_wild_value() {
            self.pending = Some(PendingPlay {
                card_id: card_id.to_owned(),
                target_player_id,
            });
            return DispatchOutcome::AwaitingWildValue {
                card_id: card_id.to_owned(),
            };
        }

        send(outbound, play_card(card_id.to_owned(), 0, target_player_id))
    }

    /// Resume a parked play with the player's `input`.
    ///
    /// Input that is not an integer in `[1, 10]` aborts the play silently.
    pub fn complete_wild_value(
        &mut self,
        outbound: Option<&dyn Outbound>,
        input: &str,
    ) -> DispatchOutcome {
        let Some(pending) = self.pending.take() else {
            return DispatchOutcome::Aborted;
        };
        let Some(value) = parse_wild_value(input) else {
            return DispatchOutcome::Aborted;
        };
        let Some(outbound) = open(outbound) else {
            return DispatchOutcome::Refused(Notice::NotConnected);
        };
        send(
            outbound,
            play_card(pending.card_id, value, pending.target_player_id),
        )
    }

    /// The player dismissed the prompt.
    pub fn cancel_wild_value(&mut self) -> DispatchOutcome {
        self.pending = None;
        DispatchOutcome::Aborted
    }

    /// Ask the server to re-send the current snapshot.
    pub fn request_state(&self, outbound: Option<&dyn Outbound>) -> DispatchOutcome {
        match open(outbound) {
            Some(outbound) => send(outbound, ClientMessage::GetState),
            None => DispatchOutcome::Refused(Notice::NotConnected),
        }
    }
}

/// Parse a wild hop value: a trimmed integer in `[1, 10]`.
pub fn parse_wild_value(input: &str) -> Option<u8> {
    input
        .trim()
        .parse::<u8>()
        .ok()
        .filter(|value| (WILD_VALUE_MIN..=WILD_VALUE_MAX).contains(value))
}

fn open(outbound: Option<&dyn Outbound>) -> Option<&dyn Outbound> {
    outbound.filter(|outbound| outbound.is_open())
}

fn play_card(card_id: CardId, wild_value: u8, target_player_id: Option<PlayerId>) -> ClientMessage {
    ClientMessage::PlayCard(PlayCardPayload {
        card_id,
        wild_color: String::new(),
        wild_value,
        target_player_id,
    })
}

fn send(outbound: &dyn Outbound, message: ClientMessage) -> DispatchOutcome {
    match outbound.send(message) {
        Ok(()) => DispatchOutcome::Sent,
        Err(HopError::NotConnected) => DispatchOutcome::Refused(Notice::NotConnected),
        Err(e) => {
            tracing::warn!("dispatch failed: {e}");
            DispatchOutcome::Refused(Notice::NotConnected)
        }
    }
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
    use crate::protocol::{ActionType, Card, CardColor, PlayerView, Roster};
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingOutbound {
        closed: bool,
        sent: RefCell<Vec<ClientMessage>>,
    }

    impl Outbound for RecordingOutbound {
        fn is_open(&self) -> bool {
            !self.closed
        }

        fn send(&self, message: ClientMessage) -> Result<()> {
            self.sent.borrow_mut().push(message);
            Ok(())
        }
    }

    fn snapshot(phase: GamePhase) -> GameSnapshot {
        let me = PlayerView {
            id: "p1".into(),
            name: "Alice".into(),
            position: 4,
            hand: vec![
                Card::Hop {
                    id: "c-hop".into(),
                    color: CardColor::Red,
                    value: 3,
                },
                Card::Special {
                    id: "c-wild".into(),
                    color: Some(CardColor::Wild),
                    action_type: ActionType::WildHop,
                },
            ],
            hand_count: None,
            is_blocked: false,
            has_double: false,
        };
        GameSnapshot {
            phase,
            players: Roster::try_from(vec![me]).unwrap(),
            ..GameSnapshot::default()
        }
    }

    fn play(id: &str, value: u8) -> ClientMessage {
        play_card(id.into(), value, None)
    }

    #[test]
    fn parse_wild_value_accepts_only_one_to_ten() {
        assert_eq!(parse_wild_value("5"), Some(5));
        assert_eq!(parse_wild_value(" 10 "), Some(10));
        assert_eq!(parse_wild_value("1"), Some(1));
        for bad in ["0", "11", "abc", "", "-3", "2.5", "300"] {
            assert_eq!(parse_wild_value(bad), None, "{bad:?}");
        }
    }

    #[test]
    fn plain_card_is_sent_with_empty_wild_fields() {
        let out = RecordingOutbound::default();
        let snap = snapshot(GamePhase::Started);
        let mut dispatcher = ActionDispatcher::new();

        let outcome =
            dispatcher.request_play_card(Some(&out), Some(&snap), Some("p1"), "c-hop", None);

        assert_eq!(outcome, DispatchOutcome::Sent);
        assert_eq!(*out.sent.borrow(), vec![play("c-hop", 0)]);
    }

    #[test]
    fn wild_hop_waits_for_value_then_sends_it() {
        let out = RecordingOutbound::default();
        let snap = snapshot(GamePhase::Started);
        let mut dispatcher = ActionDispatcher::new();

        let outcome =
            dispatcher.request_play_card(Some(&out), Some(&snap), Some("p1"), "c-wild", None);
        assert_eq!(
            outcome,
            DispatchOutcome::AwaitingWildValue {
                card_id: "c-wild".into()
            }
        );
        assert!(out.sent.borrow().is_empty());
        assert_eq!(dispatcher.pending_card(), Some("c-wild"));

        assert_eq!(dispatcher.complete_wild_value(Some(&out), "5"), DispatchOutcome::Sent);
        assert_eq!(*out.sent.borrow(), vec![play("c-wild", 5)]);
        assert!(!dispatcher.is_awaiting_wild_value());
    }

    #[test]
    fn bad_wild_value_aborts_silently() {
        for input in ["0", "11", "five"] {
            let out = RecordingOutbound::default();
            let snap = snapshot(GamePhase::Started);
            let mut dispatcher = ActionDispatcher::new();
            dispatcher.request_play_card(Some(&out), Some(&snap), Some("p1"), "c-wild", None);

            assert_eq!(
                dispatcher.complete_wild_value(Some(&out), input),
                DispatchOutcome::Aborted
            );
            assert!(out.sent.borrow().is_empty(), "{input:?} must not send");
            assert!(!dispatcher.is_awaiting_wild_value());
        }
    }

    #[test]
    fn second_play_is_refused_while_prompt_is_open() {
        let out = RecordingOutbound::default();
        let snap = snapshot(GamePhase::Started);
        let mut dispatcher = ActionDispatcher::new();
        dispatcher.request_play_card(Some(&out), Some(&snap), Some("p1"), "c-wild", None);

        let outcome =
            dispatcher.request_play_card(Some(&out), Some(&snap), Some("p1"), "c-hop", None);
        assert_eq!(outcome, DispatchOutcome::Refused(Notice::PromptPending));

        assert_eq!(dispatcher.cancel_wild_value(), DispatchOutcome::Aborted);
        let outcome =
            dispatcher.request_play_card(Some(&out), Some(&snap), Some("p1"), "c-hop", None);
        assert_eq!(outcome, DispatchOutcome::Sent);
    }

    #[test]
    fn closed_connection_refuses_everything() {
        let out = RecordingOutbound {
            closed: true,
            ..RecordingOutbound::default()
        };
        let snap = snapshot(GamePhase::Waiting);
        let mut dispatcher = ActionDispatcher::new();

        assert_eq!(
            dispatcher.request_start_game(Some(&out), Some(&snap)),
            DispatchOutcome::Refused(Notice::NotConnected)
        );
        assert_eq!(
            dispatcher.request_play_card(Some(&out), Some(&snap), Some("p1"), "c-hop", None),
            DispatchOutcome::Refused(Notice::NotConnected)
        );
        assert_eq!(
            dispatcher.request_start_game(None, None),
            DispatchOutcome::Refused(Notice::NotConnected)
        );
        assert!(out.sent.borrow().is_empty());
    }

    #[test]
    fn start_is_refused_after_the_game_started() {
        let out = RecordingOutbound::default();
        let mut dispatcher = ActionDispatcher::new();

        let snap = snapshot(GamePhase::Started);
        assert_eq!(
            dispatcher.request_start_game(Some(&out), Some(&snap)),
            DispatchOutcome::Refused(Notice::AlreadyStarted)
        );

        let snap = snapshot(GamePhase::Waiting);
        assert_eq!(
            dispatcher.request_start_game(Some(&out), Some(&snap)),
            DispatchOutcome::Sent
        );
        assert_eq!(*out.sent.borrow(), vec![ClientMessage::StartGame]);
    }

    #[test]
    fn card_outside_the_hand_is_refused() {
        let out = RecordingOutbound::default();
        let snap = snapshot(GamePhase::Started);
        let mut dispatcher = ActionDispatcher::new();

        let outcome =
            dispatcher.request_play_card(Some(&out), Some(&snap), Some("p1"), "c-other", None);
        assert_eq!(outcome, DispatchOutcome::Refused(Notice::UnknownCard));
        let outcome = dispatcher.request_play_card(Some(&out), Some(&snap), None, "c-hop", None);
        assert_eq!(outcome, DispatchOutcome::Refused(Notice::UnknownCard));
    }

    #[test]
    fn target_is_forwarded() {
        let out = RecordingOutbound::default();
        let snap = snapshot(GamePhase::Started);
        let mut dispatcher = ActionDispatcher::new();

        dispatcher.request_play_card(
            Some(&out),
            Some(&snap),
            Some("p1"),
            "c-hop",
            Some("p2".into()),
        );
        assert_eq!(
            *out.sent.borrow(),
            vec![play_card("c-hop".into(), 0, Some("p2".into()))]
        );
    }
}
