//! Card rendering: a pure mapping from a [`Card`] to what the UI draws.

use crate::protocol::{ActionType, Card, CardColor};

/// Glyph used for hop cards.
pub const HOP_GLYPH: &str = "🐰";

/// Glyph used for action names missing from the table.
pub const FALLBACK_ACTION_GLYPH: &str = "⚡";

/// Where a card is being drawn, as far as interaction is concerned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CardContext {
    /// The card sits in the local player's hand.
    pub in_local_hand: bool,
    /// It is the local player's turn.
    pub is_my_turn: bool,
}

impl CardContext {
    /// A card shown on the table (the top card), never clickable.
    pub const TABLE: Self = Self {
        in_local_hand: false,
        is_my_turn: false,
    };

    pub fn hand(is_my_turn: bool) -> Self {
        Self {
            in_local_hand: true,
            is_my_turn,
        }
    }
}

/// Visual and interaction descriptor for one card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderDescriptor {
    pub card_id: String,
    /// Styling class: a colour name, `action`, `special` or `wild`.
    pub visual_class: &'static str,
    pub glyph: &'static str,
    pub label: String,
    /// Clicking the card plays it.
    pub clickable: bool,
}

/// Glyph for an action, falling back to [`FALLBACK_ACTION_GLYPH`].
pub fn action_glyph(action: &ActionType) -> &'static str {
    match action {
        ActionType::Skip => "⏭️",
        ActionType::Reverse => "🔄",
        ActionType::Block => "🚫",
        ActionType::Double => "✖️2",
        ActionType::WildHop => "🌈🐰",
        ActionType::WildAction => "🌈⚡",
        ActionType::DrawTwo => "+2",
        ActionType::FinishLine => "🏁",
        ActionType::Other(_) => FALLBACK_ACTION_GLYPH,
    }
}

/// Render `card`. Never mutates state or touches the network.
pub fn render_card(card: &Card, context: CardContext) -> RenderDescriptor {
    let clickable = context.in_local_hand && context.is_my_turn;
    match card {
        Card::Hop { id, color, value } => RenderDescriptor {
            card_id: id.clone(),
            visual_class: color.as_str(),
            glyph: HOP_GLYPH,
            label: value.to_string(),
            clickable,
        },
        Card::Action {
            id,
            color,
            action_type,
        }
        | Card::Special {
            id,
            color,
            action_type,
        } => {
            let visual_class = if *color == Some(CardColor::Wild) {
                "wild"
            } else if matches!(card, Card::Action { .. }) {
                "action"
            } else {
                "special"
            };
            RenderDescriptor {
                card_id: id.clone(),
                visual_class,
                glyph: action_glyph(action_type),
                label: action_type.as_str().replace('_', " "),
                clickable,
            }
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

    fn hop(id: &str, color: CardColor, value: u8) -> Card {
        Card::Hop {
            id: id.into(),
            color,
            value,
        }
    }

    fn special(id: &str, action_type: ActionType) -> Card {
        Card::Special {
            id: id.into(),
            color: Some(CardColor::Wild),
            action_type,
        }
    }

    #[test]
    fn hop_card_shows_value_and_color_class() {
        let desc = render_card(&hop("card-3", CardColor::Green, 7), CardContext::TABLE);
        assert_eq!(desc.card_id, "card-3");
        assert_eq!(desc.visual_class, "green");
        assert_eq!(desc.glyph, HOP_GLYPH);
        assert_eq!(desc.label, "7");
        assert!(!desc.clickable);
    }

    #[test]
    fn uncoloured_action_card_uses_action_class() {
        let card = Card::Action {
            id: "card-41".into(),
            color: None,
            action_type: ActionType::Reverse,
        };
        let desc = render_card(&card, CardContext::TABLE);
        assert_eq!(desc.visual_class, "action");
        assert_eq!(desc.glyph, "🔄");
        assert_eq!(desc.label, "reverse");
    }

    #[test]
    fn wild_special_card_uses_wild_class_and_spaced_label() {
        let desc = render_card(&special("card-48", ActionType::WildHop), CardContext::TABLE);
        assert_eq!(desc.visual_class, "wild");
        assert_eq!(desc.glyph, "🌈🐰");
        assert_eq!(desc.label, "wild hop");
    }

    #[test]
    fn special_without_wild_colour_uses_special_class() {
        let card = Card::Special {
            id: "card-50".into(),
            color: None,
            action_type: ActionType::FinishLine,
        };
        let desc = render_card(&card, CardContext::TABLE);
        assert_eq!(desc.visual_class, "special");
        assert_eq!(desc.glyph, "🏁");
        assert_eq!(desc.label, "finish line");
    }

    #[test]
    fn unmapped_action_falls_back_to_generic_glyph() {
        let desc = render_card(
            &special("card-99", ActionType::Other("teleport".into())),
            CardContext::TABLE,
        );
        assert_eq!(desc.glyph, FALLBACK_ACTION_GLYPH);
        assert_eq!(desc.label, "teleport");
    }

    #[test]
    fn clickable_only_in_hand_on_my_turn() {
        let card = hop("card-1", CardColor::Red, 2);
        assert!(render_card(&card, CardContext::hand(true)).clickable);
        assert!(!render_card(&card, CardContext::hand(false)).clickable);
        let on_table_my_turn = CardContext {
            in_local_hand: false,
            is_my_turn: true,
        };
        assert!(!render_card(&card, on_table_my_turn).clickable);
    }

    #[test]
    fn every_known_action_has_its_own_glyph() {
        let actions = [
            ActionType::Skip,
            ActionType::Reverse,
            ActionType::Block,
            ActionType::Double,
            ActionType::DrawTwo,
            ActionType::FinishLine,
            ActionType::WildHop,
            ActionType::WildAction,
        ];
        for action in &actions {
            assert_ne!(action_glyph(action), FALLBACK_ACTION_GLYPH, "{action:?}");
        }
    }
}
