//! Wire-compatible protocol types for the BunnyHop game server.
//!
//! Every frame is a JSON object `{"type": <kind>, "data": <payload>}`. Field
//! names inside payloads are `camelCase`, matching the server. A few server
//! quirks are absorbed here so the rest of the crate never sees them:
//!
//! - the top card is sent as an empty placeholder card before anything is
//!   played; it parses as `None`
//! - `winner` and `playerId` are sent as empty strings when absent
//! - players arrive as an object keyed by id; its document order is the turn
//!   order unless an explicit `playerOrder` list is present

use std::collections::HashSet;
use std::fmt;

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::HopError;

// ── Type aliases ────────────────────────────────────────────────────

/// Server-assigned player identifier.
pub type PlayerId = String;

/// Server-assigned card identifier (unique within one game).
pub type CardId = String;

/// Server-assigned game identifier.
pub type GameId = String;

// ── Cards ───────────────────────────────────────────────────────────

/// Card colour.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CardColor {
    Red,
    Blue,
    Green,
    Yellow,
    /// Colourless special cards.
    Wild,
}

impl CardColor {
    /// Wire name of the colour, also used as its visual class.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Blue => "blue",
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Wild => "wild",
        }
    }
}

/// Effect of an action or special card.
///
/// Unrecognised action names are kept verbatim in [`ActionType::Other`] so a
/// newer server never breaks snapshot parsing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Skip,
    Reverse,
    Block,
    Double,
    DrawTwo,
    FinishLine,
    /// Hop distance chosen by the player when the card is played.
    WildHop,
    WildAction,
    #[serde(untagged)]
    Other(String),
}

impl ActionType {
    /// Wire name of the action.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Skip => "skip",
            Self::Reverse => "reverse",
            Self::Block => "block",
            Self::Double => "double",
            Self::DrawTwo => "draw_two",
            Self::FinishLine => "finish_line",
            Self::WildHop => "wild_hop",
            Self::WildAction => "wild_action",
            Self::Other(name) => name,
        }
    }
}

/// A card as described by the server, tagged on `type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Card {
    /// Moves the player `value` steps along the track.
    Hop {
        id: CardId,
        color: CardColor,
        value: u8,
    },
    /// Coloured action card.
    Action {
        id: CardId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color: Option<CardColor>,
        #[serde(rename = "actionType")]
        action_type: ActionType,
    },
    /// Special card, normally wild.
    Special {
        id: CardId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color: Option<CardColor>,
        #[serde(rename = "actionType")]
        action_type: ActionType,
    },
}

impl Card {
    pub fn id(&self) -> &str {
        match self {
            Self::Hop { id, .. } | Self::Action { id, .. } | Self::Special { id, .. } => id,
        }
    }

    pub fn color(&self) -> Option<CardColor> {
        match self {
            Self::Hop { color, .. } => Some(*color),
            Self::Action { color, .. } | Self::Special { color, .. } => *color,
        }
    }

    /// The action of an action or special card; `None` for hop cards.
    pub fn action_type(&self) -> Option<&ActionType> {
        match self {
            Self::Hop { .. } => None,
            Self::Action { action_type, .. } | Self::Special { action_type, .. } => {
                Some(action_type)
            }
        }
    }

    /// Whether playing this card needs a player-chosen hop value.
    pub fn needs_wild_value(&self) -> bool {
        matches!(self.action_type(), Some(ActionType::WildHop))
    }
}

// ── Players ─────────────────────────────────────────────────────────

/// One player as seen in a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    #[serde(default)]
    pub id: PlayerId,
    pub name: String,
    /// Track progress, 0 to 20.
    #[serde(default)]
    pub position: u32,
    /// Cards in hand. Only populated for the receiving player.
    #[serde(default, deserialize_with = "null_as_default")]
    pub hand: Vec<Card>,
    /// Hand size for players whose cards are hidden.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hand_count: Option<usize>,
    #[serde(default)]
    pub is_blocked: bool,
    /// The next hop effect of this player is doubled.
    #[serde(default)]
    pub has_double: bool,
}

impl PlayerView {
    /// Number of cards held, whether or not they are visible.
    pub fn card_count(&self) -> usize {
        if self.hand.is_empty() {
            self.hand_count.unwrap_or(0)
        } else {
            self.hand.len()
        }
    }

    pub fn find_card(&self, card_id: &str) -> Option<&Card> {
        self.hand.iter().find(|card| card.id() == card_id)
    }
}

/// Players in turn order.
///
/// Ids are unique. On the wire the roster is an object keyed by player id
/// (entries kept in document order) or a plain array.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    players: Vec<PlayerView>,
}

impl Roster {
    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PlayerView> {
        self.players.iter()
    }

    /// Player at `index` in turn order.
    pub fn at(&self, index: usize) -> Option<&PlayerView> {
        self.players.get(index)
    }

    pub fn get(&self, id: &str) -> Option<&PlayerView> {
        self.players.iter().find(|player| player.id == id)
    }

    /// Move the listed ids to the front, in the given order. Players missing
    /// from `order` keep their relative order after them; unknown ids are
    /// skipped.
    pub fn reorder(&mut self, order: &[PlayerId]) {
        let mut remaining = std::mem::take(&mut self.players);
        let mut ordered = Vec::with_capacity(remaining.len());
        for id in order {
            if let Some(index) = remaining.iter().position(|player| &player.id == id) {
                ordered.push(remaining.remove(index));
            }
        }
        ordered.append(&mut remaining);
        self.players = ordered;
    }
}

impl TryFrom<Vec<PlayerView>> for Roster {
    type Error = HopError;

    fn try_from(players: Vec<PlayerView>) -> Result<Self, Self::Error> {
        let mut seen = HashSet::with_capacity(players.len());
        for player in &players {
            if !seen.insert(player.id.as_str()) {
                return Err(HopError::InvalidInput(format!(
                    "duplicate player id in roster: {}",
                    player.id
                )));
            }
        }
        Ok(Self { players })
    }
}

impl<'a> IntoIterator for &'a Roster {
    type Item = &'a PlayerView;
    type IntoIter = std::slice::Iter<'a, PlayerView>;

    fn into_iter(self) -> Self::IntoIter {
        self.players.iter()
    }
}

impl Serialize for Roster {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.players.len()))?;
        for player in &self.players {
            map.serialize_entry(&player.id, player)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Roster {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RosterVisitor;

        impl<'de> Visitor<'de> for RosterVisitor {
            type Value = Vec<PlayerView>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of player id to player, or a list of players")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut players = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, mut player)) = map.next_entry::<String, PlayerView>()? {
                    if player.id.is_empty() {
                        player.id = key;
                    }
                    players.push(player);
                }
                Ok(players)
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut players = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(player) = seq.next_element::<PlayerView>()? {
                    players.push(player);
                }
                Ok(players)
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(Vec::new())
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(Vec::new())
            }
        }

        let players = deserializer.deserialize_any(RosterVisitor)?;
        Self::try_from(players).map_err(de::Error::custom)
    }
}

// ── Snapshot ────────────────────────────────────────────────────────

/// Coarse game phase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    #[default]
    Waiting,
    Started,
    Finished,
}

/// Turn order direction, `1` or `-1` on the wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(from = "i32", into = "i32")]
pub enum TurnDirection {
    #[default]
    Forward,
    Backward,
}

impl From<i32> for TurnDirection {
    fn from(sign: i32) -> Self {
        if sign < 0 {
            Self::Backward
        } else {
            Self::Forward
        }
    }
}

impl From<TurnDirection> for i32 {
    fn from(direction: TurnDirection) -> Self {
        match direction {
            TurnDirection::Forward => 1,
            TurnDirection::Backward => -1,
        }
    }
}

/// Authoritative, total game state. Each snapshot supersedes the previous one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "WireSnapshot")]
pub struct GameSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<GameId>,
    #[serde(rename = "state")]
    pub phase: GamePhase,
    /// Absent from the server's own `game_state` frames.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_players: Option<u32>,
    pub players: Roster,
    /// Index into [`players`](Self::players); meaningful while started.
    #[serde(rename = "currentPlayer")]
    pub current_player_index: usize,
    pub direction: TurnDirection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_card: Option<Card>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<PlayerId>,
}

impl GameSnapshot {
    /// The player whose turn it is, resolved by turn order.
    pub fn current_player(&self) -> Option<&PlayerView> {
        self.players.at(self.current_player_index)
    }

    pub fn player(&self, id: &str) -> Option<&PlayerView> {
        self.players.get(id)
    }

    pub fn winner_player(&self) -> Option<&PlayerView> {
        self.winner.as_deref().and_then(|id| self.players.get(id))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSnapshot {
    #[serde(default, deserialize_with = "empty_as_none")]
    id: Option<GameId>,
    #[serde(rename = "state", alias = "phase", default)]
    phase: GamePhase,
    #[serde(default)]
    max_players: u32,
    #[serde(default)]
    players: Roster,
    #[serde(default)]
    player_order: Vec<PlayerId>,
    #[serde(rename = "currentPlayer", alias = "currentPlayerIndex", default)]
    current_player_index: usize,
    #[serde(default)]
    direction: TurnDirection,
    #[serde(default, deserialize_with = "lenient_card")]
    top_card: Option<Card>,
    #[serde(default, deserialize_with = "empty_as_none")]
    winner: Option<PlayerId>,
}

impl TryFrom<WireSnapshot> for GameSnapshot {
    type Error = HopError;

    fn try_from(wire: WireSnapshot) -> Result<Self, Self::Error> {
        let mut players = wire.players;
        if !wire.player_order.is_empty() {
            players.reorder(&wire.player_order);
        }
        Ok(Self {
            id: wire.id,
            phase: wire.phase,
            max_players: (wire.max_players > 0).then_some(wire.max_players),
            players,
            current_player_index: wire.current_player_index,
            direction: wire.direction,
            top_card: wire.top_card,
            winner: wire.winner,
        })
    }
}

// ── Serde helpers ───────────────────────────────────────────────────

fn empty_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The top card is a placeholder `{"id":"","type":""}` until the first play.
fn lenient_card<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Card>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|value| serde_json::from_value::<Card>(value).ok())
        .filter(|card| !card.id().is_empty()))
}

// ── Payload structs ─────────────────────────────────────────────────

/// Payload of `join_game`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JoinGamePayload {
    pub game_id: GameId,
    pub player_name: String,
}

/// Payload of `play_card`. Wild fields are empty/zero for non-wild cards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlayCardPayload {
    pub card_id: CardId,
    /// Reserved; always empty in this client.
    #[serde(default)]
    pub wild_color: String,
    #[serde(default)]
    pub wild_value: u8,
    /// Victim of a targeted card such as `block`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_player_id: Option<PlayerId>,
}

/// Payload of `join_result`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JoinResultPayload {
    pub success: bool,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub player_id: Option<PlayerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Payload of `start_result` and `play_result`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AckPayload {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AckPayload {
    /// Convert into a `Result`, naming the rejected `action`.
    ///
    /// # Errors
    ///
    /// Returns [`HopError::Rejected`] when `success` is false.
    pub fn into_result(self, action: &'static str) -> crate::error::Result<()> {
        if self.success {
            Ok(())
        } else {
            Err(HopError::Rejected {
                action,
                message: self.error.unwrap_or_else(|| "unknown error".into()),
            })
        }
    }
}

/// Payload of the server's generic `error` frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorPayload {
    pub error: String,
}

// ── Messages ────────────────────────────────────────────────────────

/// Message types sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join an existing game.
    JoinGame(JoinGamePayload),
    /// Ask the server to start the game. The server decides who may.
    StartGame,
    /// Play a card from the local hand.
    PlayCard(PlayCardPayload),
    /// Ask the server to re-send the current snapshot.
    GetState,
}

/// Message types sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Answer to `join_game`; on success assigns the local player id.
    JoinResult(JoinResultPayload),
    /// Answer to `start_game`.
    StartResult(AckPayload),
    /// Answer to `play_card`.
    PlayResult(AckPayload),
    /// Full authoritative state (boxed to reduce enum size).
    GameState(Box<GameSnapshot>),
    /// Request rejected before it reached the game.
    Error(ErrorPayload),
}

impl ServerMessage {
    /// Every `type` tag this client understands.
    pub const KINDS: [&'static str; 5] = [
        "join_result",
        "start_result",
        "play_result",
        "game_state",
        "error",
    ];
}

/// One inbound frame, classified at the dispatch boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    Message(ServerMessage),
    /// A well-formed frame whose `type` this client does not know. Ignored.
    Unknown { kind: String },
}

#[derive(Deserialize)]
struct FrameEnvelope {
    #[serde(rename = "type")]
    kind: String,
}

impl InboundFrame {
    /// Parse a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`HopError::Serialization`] if the frame is not a JSON object
    /// with a string `type`, or if a known kind carries a malformed payload.
    pub fn parse(text: &str) -> crate::error::Result<Self> {
        match serde_json::from_str::<ServerMessage>(text) {
            Ok(message) => Ok(Self::Message(message)),
            Err(err) => {
                let envelope: FrameEnvelope = serde_json::from_str(text)?;
                if ServerMessage::KINDS.contains(&envelope.kind.as_str()) {
                    Err(err.into())
                } else {
                    Ok(Self::Unknown {
                        kind: envelope.kind,
                    })
                }
            }
        }
    }
}
