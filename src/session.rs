//! Session identity and join validation.

use crate::connection::ConnectionId;
use crate::error::{HopError, Result};
use crate::protocol::{ClientMessage, GameId, JoinGamePayload, PlayerId};

/// One local player in one game over one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub game_id: GameId,
    pub player_name: String,
    /// Assigned by a successful `join_result`.
    pub local_player_id: Option<PlayerId>,
    /// The connection this session is bound to.
    pub connection_id: ConnectionId,
    /// Seat count known from the lobby, if any.
    pub max_players: Option<u32>,
}

/// A validated request to join `game_id` as `player_name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    game_id: GameId,
    player_name: String,
    max_players: Option<u32>,
}

impl JoinRequest {
    /// Validate and build a join request. Both fields are trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`HopError::InvalidInput`] if either field is blank.
    pub fn new(game_id: &str, player_name: &str) -> Result<Self> {
        let player_name = validate_player_name(player_name)?;
        let game_id = game_id.trim();
        if game_id.is_empty() {
            return Err(HopError::InvalidInput("Please enter a game ID".into()));
        }
        Ok(Self {
            game_id: game_id.to_owned(),
            player_name,
            max_players: None,
        })
    }

    /// Remember the game's seat count for the waiting room. It is not sent.
    #[must_use]
    pub fn with_max_players(mut self, max_players: u32) -> Self {
        self.max_players = Some(max_players);
        self
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    pub fn max_players(&self) -> Option<u32> {
        self.max_players
    }

    pub fn to_message(&self) -> ClientMessage {
        ClientMessage::JoinGame(JoinGamePayload {
            game_id: self.game_id.clone(),
            player_name: self.player_name.clone(),
        })
    }
}

/// Trim `name` and reject it if blank.
///
/// # Errors
///
/// Returns [`HopError::InvalidInput`] for an empty or whitespace-only name.
pub fn validate_player_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(HopError::InvalidInput("Please enter your name".into()));
    }
    Ok(name.to_owned())
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

    #[test]
    fn join_request_trims_fields() {
        let request = JoinRequest::new("  game-1 ", " Alice ").unwrap();
        assert_eq!(request.game_id(), "game-1");
        assert_eq!(request.player_name(), "Alice");
        assert_eq!(
            request.to_message(),
            ClientMessage::JoinGame(JoinGamePayload {
                game_id: "game-1".into(),
                player_name: "Alice".into(),
            })
        );
    }

    #[test]
    fn seat_count_stays_off_the_wire() {
        let request = JoinRequest::new("game-1", "Alice").unwrap().with_max_players(4);
        assert_eq!(request.max_players(), Some(4));
        assert_eq!(
            serde_json::to_value(request.to_message()).unwrap(),
            serde_json::json!({
                "type": "join_game",
                "data": {"gameId": "game-1", "playerName": "Alice"}
            })
        );
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = JoinRequest::new("game-1", "   ").unwrap_err();
        assert!(matches!(err, HopError::InvalidInput(ref m) if m == "Please enter your name"));
    }

    #[test]
    fn blank_game_id_is_rejected() {
        let err = JoinRequest::new("", "Alice").unwrap_err();
        assert!(matches!(err, HopError::InvalidInput(ref m) if m == "Please enter a game ID"));
    }
}
