//! Error types for the BunnyHop client.

use thiserror::Error;

/// Errors that can occur when using the BunnyHop client.
#[derive(Debug, Error)]
pub enum HopError {
    /// Failed to send a message through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a message from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection was closed.
    #[error("transport connection closed")]
    TransportClosed,

    /// Failed to serialize or deserialize a protocol message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Attempted an operation that requires an open connection.
    #[error("not connected to server")]
    NotConnected,

    /// The server answered a request with `success: false` or an `error` frame.
    #[error("failed to {action}: {message}")]
    Rejected {
        /// What the client asked for (e.g. `"join game"`).
        action: &'static str,
        /// Error string supplied by the server.
        message: String,
    },

    /// Local input was rejected before anything reached the network.
    #[error("{0}")]
    InvalidInput(String),

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The lobby HTTP request failed.
    #[cfg(feature = "lobby-http")]
    #[error("lobby request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The lobby answered with a non-success status.
    #[error("lobby returned {status}: {body}")]
    Lobby {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },
}

/// A specialized [`Result`] type for BunnyHop client operations.
pub type Result<T> = std::result::Result<T, HopError>;
