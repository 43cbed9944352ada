//! Transport abstraction for the BunnyHop game connection.
//!
//! The [`Transport`] trait is a bidirectional text message channel between
//! the client and the game server. Every frame on the wire is one JSON
//! document, so implementations handle message framing themselves.
//!
//! # Connection Setup
//!
//! Opening the connection is not part of this trait. A transport handed to
//! [`ConnectionManager::start`](crate::connection::ConnectionManager::start)
//! is expected to be open already; the built-in
//! [`WebSocketTransport`](crate::transports::WebSocketTransport) is opened
//! with [`WebSocketTransport::connect`](crate::transports::WebSocketTransport::connect).
//!
//! # Implementing a Custom Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use bunnyhop_client::error::HopError;
//! use bunnyhop_client::transport::Transport;
//!
//! struct LoopbackTransport {
//!     inbox: tokio::sync::mpsc::Receiver<String>,
//! }
//!
//! #[async_trait]
//! impl Transport for LoopbackTransport {
//!     async fn send(&mut self, _message: String) -> Result<(), HopError> {
//!         Ok(())
//!     }
//!
//!     async fn recv(&mut self) -> Option<Result<String, HopError>> {
//!         self.inbox.recv().await.map(Ok)
//!     }
//!
//!     async fn close(&mut self) -> Result<(), HopError> {
//!         self.inbox.close();
//!         Ok(())
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::HopError;

/// A bidirectional text message transport for the BunnyHop protocol.
///
/// Each call to [`send`](Transport::send) transmits one complete JSON frame and
/// each call to [`recv`](Transport::recv) returns one.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) **MUST** be cancel-safe: the connection loop
/// polls it inside `tokio::select!`, and a cancelled call must not lose a
/// frame.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send a JSON text frame to the server.
    ///
    /// # Errors
    ///
    /// Returns [`HopError::TransportSend`] if the frame could not be written,
    /// or [`HopError::TransportClosed`] after [`close`](Transport::close).
    async fn send(&mut self, message: String) -> Result<(), HopError>;

    /// Receive the next JSON text frame from the server.
    ///
    /// Returns:
    /// - `Some(Ok(text))`: a complete frame was received
    /// - `Some(Err(e))`: a transport error occurred
    /// - `None`: the server closed the connection cleanly
    async fn recv(&mut self) -> Option<Result<String, HopError>>;

    /// Close the connection gracefully.
    ///
    /// # Errors
    ///
    /// Returns an error if the close handshake fails. Resources are released
    /// either way.
    async fn close(&mut self) -> Result<(), HopError>;
}
