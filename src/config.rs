//! Client configuration.

use std::time::Duration;

/// Default server origin when none is configured.
pub const DEFAULT_SERVER: &str = "http://localhost:8080";

/// Environment variable read by [`ClientConfig::from_env`].
pub const SERVER_ENV_VAR: &str = "BUNNYHOP_SERVER";

/// Default capacity of the bounded event channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 64;

/// Default timeout for the graceful shutdown.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Default delay before an unanswered join is reported.
const DEFAULT_JOIN_ACK_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for a BunnyHop client.
///
/// # Example
///
/// ```
/// use bunnyhop_client::config::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::new("https://hop.example.com")
///     .with_event_channel_capacity(128)
///     .with_join_ack_timeout(Duration::from_secs(2));
/// assert_eq!(config.websocket_url(), "wss://hop.example.com/ws");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// HTTP origin of the server, e.g. `http://localhost:8080`. The lobby API
    /// and the WebSocket endpoint both live under it.
    pub server: String,
    /// Capacity of the bounded event channel.
    ///
    /// When the consumer falls behind, events are dropped with a warning.
    /// `Disconnected` is always delivered. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// Time the connection loop gets to close the transport on shutdown
    /// before it is aborted. Zero aborts immediately.
    pub shutdown_timeout: Duration,
    /// How long to wait for `join_result` before logging a warning. This is
    /// a diagnostic only; the join is never resent.
    pub join_ack_timeout: Duration,
}

impl ClientConfig {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into().trim_end_matches('/').to_owned(),
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            join_ack_timeout: DEFAULT_JOIN_ACK_TIMEOUT,
        }
    }

    /// Read the server origin from `BUNNYHOP_SERVER`, falling back to
    /// [`DEFAULT_SERVER`].
    pub fn from_env() -> Self {
        let server = std::env::var(SERVER_ENV_VAR).unwrap_or_else(|_| DEFAULT_SERVER.to_owned());
        Self::new(server)
    }

    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_join_ack_timeout(mut self, timeout: Duration) -> Self {
        self.join_ack_timeout = timeout;
        self
    }

    /// WebSocket endpoint for [`server`](Self::server).
    pub fn websocket_url(&self) -> String {
        websocket_url(&self.server)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER)
    }
}

/// Derive the game WebSocket endpoint from an HTTP origin.
///
/// The scheme follows the page: `https` becomes `wss`, anything else `ws`.
/// A bare `host:port` is treated as plain HTTP.
pub fn websocket_url(origin: &str) -> String {
    let origin = origin.trim_end_matches('/');
    let (scheme, host) = if let Some(host) = origin.strip_prefix("https://") {
        ("wss", host)
    } else if let Some(host) = origin.strip_prefix("http://") {
        ("ws", host)
    } else if let Some(host) = origin.strip_prefix("wss://") {
        ("wss", host)
    } else if let Some(host) = origin.strip_prefix("ws://") {
        ("ws", host)
    } else {
        ("ws", origin)
    };
    let host = host.split('/').next().unwrap_or(host);
    format!("{scheme}://{host}/ws")
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
    fn websocket_scheme_matches_page_scheme() {
        assert_eq!(websocket_url("http://localhost:8080"), "ws://localhost:8080/ws");
        assert_eq!(websocket_url("https://hop.example.com/"), "wss://hop.example.com/ws");
        assert_eq!(websocket_url("localhost:9000"), "ws://localhost:9000/ws");
    }

    #[test]
    fn websocket_url_drops_page_path() {
        assert_eq!(
            websocket_url("https://hop.example.com/index.html"),
            "wss://hop.example.com/ws"
        );
    }

    #[test]
    fn capacity_is_clamped() {
        let config = ClientConfig::default().with_event_channel_capacity(0);
        assert_eq!(config.event_channel_capacity, 1);
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        assert_eq!(ClientConfig::new("http://a:1/").server, "http://a:1");
    }
}
