//! Events emitted by a [`ConnectionManager`](crate::connection::ConnectionManager).

use crate::protocol::{AckPayload, GameSnapshot, JoinResultPayload, ServerMessage};

/// Lifecycle and inbound-message events of one connection.
///
/// `Connected` is always first and `Disconnected` always last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The connection is open and the join request has been flushed.
    Connected,
    /// Answer to the join request.
    JoinResult(JoinResultPayload),
    /// Answer to a start request.
    StartResult(AckPayload),
    /// Answer to a play request.
    PlayResult(AckPayload),
    /// A new authoritative snapshot.
    GameState(Box<GameSnapshot>),
    /// The server rejected a request outright.
    ServerError { error: String },
    /// The connection closed. No further events follow.
    Disconnected {
        /// `None` when the server closed cleanly.
        reason: Option<String>,
    },
}

impl From<ServerMessage> for ConnectionEvent {
    fn from(message: ServerMessage) -> Self {
        match message {
            ServerMessage::JoinResult(payload) => Self::JoinResult(payload),
            ServerMessage::StartResult(payload) => Self::StartResult(payload),
            ServerMessage::PlayResult(payload) => Self::PlayResult(payload),
            ServerMessage::GameState(snapshot) => Self::GameState(snapshot),
            ServerMessage::Error(payload) => Self::ServerError {
                error: payload.error,
            },
        }
    }
}
