//! WebSocket transport over `tokio-tungstenite`.
//!
//! The BunnyHop server serves its game socket at `/ws` next to the HTTP lobby;
//! [`ClientConfig::websocket_url`](crate::config::ClientConfig::websocket_url)
//! builds that URL from the server origin. `ws://` and `wss://` both work, TLS
//! being handled by [`MaybeTlsStream`](tokio_tungstenite::MaybeTlsStream).
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), bunnyhop_client::HopError> {
//! use bunnyhop_client::{Transport, WebSocketTransport};
//!
//! let mut transport = WebSocketTransport::connect("ws://localhost:8080/ws").await?;
//! transport.send(r#"{"type":"get_state"}"#.to_string()).await?;
//!
//! if let Some(Ok(frame)) = transport.recv().await {
//!     println!("server said: {frame}");
//! }
//!
//! transport.close().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::error::HopError;
use crate::transport::Transport;

/// The underlying WebSocket stream, public so callers can build one with
/// custom TLS or headers and hand it to [`WebSocketTransport::from_stream`].
pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// A [`Transport`] backed by one WebSocket connection.
///
/// Text frames carry the JSON messages. Binary frames are skipped, pings are
/// answered by tungstenite and a close frame ends the stream.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) is cancel-safe: the underlying stream keeps any
/// partially read frame, so dropping the future loses nothing.
#[derive(Debug)]
pub struct WebSocketTransport {
    stream: WsStream,
    closed: bool,
}

impl WebSocketTransport {
    /// Open a WebSocket to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`HopError::Io`] if the URL is invalid or the server cannot be
    /// reached. An underlying I/O error keeps its
    /// [`ErrorKind`](std::io::ErrorKind); anything else maps to
    /// [`ErrorKind::Other`](std::io::ErrorKind::Other).
    pub async fn connect(url: &str) -> Result<Self, HopError> {
        tracing::debug!(url = %url, "opening game socket");

        let (stream, _response) = tokio_tungstenite::connect_async(url).await.map_err(|e| {
            let kind = match &e {
                tokio_tungstenite::tungstenite::Error::Io(io) => io.kind(),
                _ => std::io::ErrorKind::Other,
            };
            HopError::Io(std::io::Error::new(kind, e))
        })?;

        tracing::info!(url = %url, "game socket open");

        Ok(Self::from_stream(stream))
    }

    /// Like [`connect`](Self::connect), failing with [`HopError::Timeout`]
    /// when the socket is not open within `timeout`.
    ///
    /// # Errors
    ///
    /// [`HopError::Timeout`] or anything [`connect`](Self::connect) returns.
    pub async fn connect_with_timeout(url: &str, timeout: Duration) -> Result<Self, HopError> {
        tokio::time::timeout(timeout, Self::connect(url))
            .await
            .map_err(|_| HopError::Timeout)?
    }

    pub fn from_stream(stream: WsStream) -> Self {
        Self {
            stream,
            closed: false,
        }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, message: String) -> Result<(), HopError> {
        if self.closed {
            return Err(HopError::TransportClosed);
        }
        self.stream
            .send(Message::Text(message.into()))
            .await
            .map_err(|e| HopError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, HopError>> {
        loop {
            let msg = match self.stream.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => return Some(Err(HopError::TransportReceive(e.to_string()))),
                None => return None,
            };

            match msg {
                Message::Text(text) => return Some(Ok(text.to_string())),
                Message::Close(frame) => {
                    tracing::debug!(?frame, "server closed the game socket");
                    return None;
                }
                // tungstenite queues the pong itself.
                Message::Ping(_) | Message::Pong(_) => {}
                Message::Binary(bytes) => {
                    tracing::warn!(len = bytes.len(), "skipping binary frame");
                }
                Message::Frame(_) => {
                    tracing::debug!("skipping raw frame");
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), HopError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream
            .close(None)
            .await
            .map_err(|e| HopError::TransportSend(e.to_string()))
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
    use crate::protocol::{InboundFrame, ServerMessage};
    use tokio::net::TcpListener;

    #[test]
    fn websocket_transport_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<WebSocketTransport>();
    }

    #[tokio::test]
    async fn connect_fails_with_invalid_url() {
        let err = WebSocketTransport::connect("not-a-url").await.unwrap_err();
        assert!(matches!(err, HopError::Io(_)));
    }

    #[tokio::test]
    async fn connect_fails_with_unreachable_host() {
        let err = WebSocketTransport::connect("ws://127.0.0.1:1/ws")
            .await
            .unwrap_err();
        assert!(matches!(err, HopError::Io(_)));
    }

    #[tokio::test]
    async fn connect_with_timeout_times_out() {
        let err = WebSocketTransport::connect_with_timeout(
            "ws://192.0.2.1:1/ws",
            Duration::from_millis(50),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, HopError::Timeout));
    }

    /// Accept one WebSocket connection and run `handler` on it.
    async fn start_game_server<F, Fut>(handler: F) -> String
    where
        F: FnOnce(tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>) -> Fut
            + Send
            + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            handler(ws).await;
        });

        format!("ws://{addr}/ws")
    }

    #[tokio::test]
    async fn join_frame_reaches_server_and_reply_parses() {
        let url = start_game_server(|mut ws| async move {
            let Some(Ok(Message::Text(text))) = ws.next().await else {
                panic!("expected a text frame");
            };
            let frame: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
            assert_eq!(frame["type"], "join_game");
            assert_eq!(frame["data"]["playerName"], "Alice");

            let reply = r#"{"type":"join_result","data":{"success":true,"playerId":"p1"}}"#;
            ws.send(Message::Text(reply.into())).await.unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport
            .send(r#"{"type":"join_game","data":{"gameId":"g1","playerName":"Alice"}}"#.into())
            .await
            .unwrap();

        let text = transport.recv().await.unwrap().unwrap();
        match InboundFrame::parse(&text).unwrap() {
            InboundFrame::Message(ServerMessage::JoinResult(result)) => {
                assert!(result.success);
                assert_eq!(result.player_id.as_deref(), Some("p1"));
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[tokio::test]
    async fn recv_skips_binary_frames() {
        let url = start_game_server(|mut ws| async move {
            ws.send(Message::Binary(vec![0xB0, 0x0B].into()))
                .await
                .unwrap();
            ws.send(Message::Text(r#"{"type":"get_state"}"#.into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        let msg = transport.recv().await.unwrap().unwrap();
        assert_eq!(msg, r#"{"type":"get_state"}"#);
    }

    #[tokio::test]
    async fn recv_returns_none_on_close_frame() {
        let url = start_game_server(|mut ws| async move {
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        assert!(transport.recv().await.is_none());
    }

    #[tokio::test]
    async fn send_after_close_is_refused_and_close_is_idempotent() {
        let url =
            start_game_server(|mut ws| async move { while let Some(Ok(_)) = ws.next().await {} })
                .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport.close().await.unwrap();
        transport.close().await.unwrap();

        let err = transport.send("{}".to_string()).await.unwrap_err();
        assert!(matches!(err, HopError::TransportClosed));
    }
}
