//! Connection manager: the one persistent connection of a game session.
//!
//! [`ConnectionManager`] is a thin handle over a background loop task. The
//! handle queues [`ClientMessage`]s on an unbounded channel; the loop writes
//! them to the [`Transport`], parses inbound frames and emits
//! [`ConnectionEvent`]s on a bounded channel returned from
//! [`ConnectionManager::start`].
//!
//! The join request is handed to `start` rather than sent by the caller. The
//! loop writes it exactly once, right after the connection reports open, so
//! no join can race the socket handshake.
//!
//! # Example
//!
//! ```rust,ignore
//! let transport = WebSocketTransport::connect(&config.websocket_url()).await?;
//! let join = JoinRequest::new("game-17", "Alice")?;
//! let (connection, mut events) = ConnectionManager::start(transport, join, &config);
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         ConnectionEvent::GameState(snapshot) => { /* … */ }
//!         ConnectionEvent::Disconnected { .. } => break,
//!         _ => {}
//!     }
//! }
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::{HopError, Result};
use crate::event::ConnectionEvent;
use crate::protocol::{ClientMessage, InboundFrame, ServerMessage};
use crate::session::JoinRequest;
use crate::transport::Transport;

// ── Identity ────────────────────────────────────────────────────────

/// Identifies one connection for its whole lifetime.
///
/// Events are only applied while their connection is the live one, so frames
/// from a torn-down connection can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ── Shared state ────────────────────────────────────────────────────

/// Lifecycle of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// Handed to the loop, not yet reported open.
    Connecting = 0,
    Open = 1,
    /// Closed by either side. Terminal.
    Closed = 2,
}

impl ConnectionState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Connecting,
            1 => Self::Open,
            _ => Self::Closed,
        }
    }
}

/// State shared between the handle and the connection loop.
struct SharedState {
    connection: AtomicU8,
}

impl SharedState {
    fn new() -> Self {
        Self {
            connection: AtomicU8::new(ConnectionState::Connecting as u8),
        }
    }

    fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.connection.load(Ordering::Acquire))
    }

    fn set(&self, state: ConnectionState) {
        self.connection.store(state as u8, Ordering::Release);
    }
}

// ── Handle ──────────────────────────────────────────────────────────

/// Handle to the live connection of a session.
///
/// There is no automatic reconnect: after `Disconnected`, a fresh
/// connection must be started by the caller.
pub struct ConnectionManager {
    id: ConnectionId,
    cmd_tx: mpsc::UnboundedSender<ClientMessage>,
    state: Arc<SharedState>,
    task: Option<tokio::task::JoinHandle<()>>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    shutdown_timeout: Duration,
}

impl ConnectionManager {
    /// Start the connection loop over an open `transport`.
    ///
    /// `join` is written as the first outgoing frame once the loop reports
    /// the connection open.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use = "the event receiver must be used to receive events"]
    pub fn start(
        transport: impl Transport,
        join: JoinRequest,
        config: &ClientConfig,
    ) -> (Self, mpsc::Receiver<ConnectionEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<ClientMessage>();
        let capacity = config.event_channel_capacity.max(1);
        let (event_tx, event_rx) = mpsc::channel::<ConnectionEvent>(capacity);
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let id = ConnectionId::new();
        let state = Arc::new(SharedState::new());

        debug!(connection = %id, game = join.game_id(), "starting connection loop");
        let task = tokio::spawn(connection_loop(LoopContext {
            id,
            transport,
            cmd_rx,
            event_tx,
            state: Arc::clone(&state),
            shutdown_rx,
            join: join.to_message(),
            join_ack_timeout: config.join_ack_timeout,
        }));

        let manager = Self {
            id,
            cmd_tx,
            state,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout: config.shutdown_timeout,
        };
        (manager, event_rx)
    }

    /// Open a WebSocket to [`ClientConfig::websocket_url`] and start the loop.
    ///
    /// # Errors
    ///
    /// Returns [`HopError::Io`] if the WebSocket cannot be opened.
    #[cfg(feature = "transport-websocket")]
    pub async fn connect(
        join: JoinRequest,
        config: &ClientConfig,
    ) -> Result<(Self, mpsc::Receiver<ConnectionEvent>)> {
        let transport =
            crate::transports::WebSocketTransport::connect(&config.websocket_url()).await?;
        Ok(Self::start(transport, join, config))
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Queue `message` for the server.
    ///
    /// # Errors
    ///
    /// Returns [`HopError::NotConnected`] unless the connection is open.
    pub fn send(&self, message: ClientMessage) -> Result<()> {
        if !self.is_open() {
            return Err(HopError::NotConnected);
        }
        self.cmd_tx
            .send(message)
            .map_err(|_| HopError::NotConnected)
    }

    /// Close the connection and stop the loop.
    ///
    /// The loop gets `shutdown_timeout` to close the transport and emit its
    /// final `Disconnected` event; after that it is aborted.
    pub async fn shutdown(&mut self) {
        debug!(connection = %self.id, "shutdown requested");

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("connection loop terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("connection loop did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("connection loop aborted: {join_err}");
                    }
                }
            }
        }

        self.state.set(ConnectionState::Closed);
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        // No executor to drive a graceful close here; abort the loop.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Connection loop ─────────────────────────────────────────────────

struct LoopContext<T> {
    id: ConnectionId,
    transport: T,
    cmd_rx: mpsc::UnboundedReceiver<ClientMessage>,
    event_tx: mpsc::Sender<ConnectionEvent>,
    state: Arc<SharedState>,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
    join: ClientMessage,
    join_ack_timeout: Duration,
}

/// Background loop multiplexing outgoing commands, inbound frames and
/// shutdown via `tokio::select!`.
///
/// Exits when the handle shuts down or is dropped, when the server closes the
/// connection, or on a transport error.
async fn connection_loop<T: Transport>(ctx: LoopContext<T>) {
    let LoopContext {
        id,
        mut transport,
        mut cmd_rx,
        event_tx,
        state,
        mut shutdown_rx,
        join,
        join_ack_timeout,
    } = ctx;

    debug!(connection = %id, "connection loop started");

    state.set(ConnectionState::Open);
    emit_event(&event_tx, ConnectionEvent::Connected).await;
    info!(connection = %id, "connected to server");

    // Flush the join exactly once, now that the connection is open.
    if let Err(e) = send_message(&mut transport, &join).await {
        error!("failed to send join request: {e}");
        emit_disconnected(&event_tx, &state, Some(format!("transport send error: {e}"))).await;
        return;
    }

    let join_watch = tokio::time::sleep(join_ack_timeout);
    tokio::pin!(join_watch);
    let mut awaiting_join_ack = true;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(msg) => {
                        debug!("sending client message: {:?}", std::mem::discriminant(&msg));
                        if let Err(e) = send_message(&mut transport, &msg).await {
                            error!("transport send error: {e}");
                            emit_disconnected(
                                &event_tx,
                                &state,
                                Some(format!("transport send error: {e}")),
                            ).await;
                            break;
                        }
                    }
                    None => {
                        debug!("command channel closed, shutting down connection loop");
                        let _ = transport.close().await;
                        emit_disconnected(&event_tx, &state, Some("client shut down".into())).await;
                        break;
                    }
                }
            }

            _ = &mut shutdown_rx => {
                debug!("shutdown signal received");
                let _ = transport.close().await;
                emit_disconnected(&event_tx, &state, Some("client shut down".into())).await;
                break;
            }

            () = &mut join_watch, if awaiting_join_ack => {
                warn!(
                    connection = %id,
                    "no join_result within {:?}; still waiting",
                    join_ack_timeout
                );
                awaiting_join_ack = false;
            }

            incoming = transport.recv() => {
                match incoming {
                    Some(Ok(text)) => match InboundFrame::parse(&text) {
                        Ok(InboundFrame::Message(server_msg)) => {
                            if matches!(server_msg, ServerMessage::JoinResult(_)) {
                                awaiting_join_ack = false;
                            }
                            emit_event(&event_tx, ConnectionEvent::from(server_msg)).await;
                        }
                        Ok(InboundFrame::Unknown { kind }) => {
                            debug!(kind = %kind, "ignoring frame of unknown type");
                        }
                        Err(e) => {
                            warn!("failed to parse server frame: {e}; raw: {text}");
                        }
                    },
                    Some(Err(e)) => {
                        error!("transport receive error: {e}");
                        emit_disconnected(
                            &event_tx,
                            &state,
                            Some(format!("transport receive error: {e}")),
                        ).await;
                        break;
                    }
                    None => {
                        debug!("transport closed by server");
                        emit_disconnected(&event_tx, &state, None).await;
                        break;
                    }
                }
            }
        }
    }

    debug!(connection = %id, "connection loop exited");
}

async fn send_message<T: Transport>(transport: &mut T, msg: &ClientMessage) -> Result<()> {
    let json = serde_json::to_string(msg)?;
    transport.send(json).await
}

/// Emit an event. If the channel is full, log a warning and drop the event
/// rather than block the loop.
async fn emit_event(event_tx: &mpsc::Sender<ConnectionEvent>, event: ConnectionEvent) {
    match event_tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(dropped)) => {
            warn!(
                "event channel full, dropping event: {:?}",
                std::mem::discriminant(&dropped)
            );
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!("event channel closed, receiver dropped");
        }
    }
}

/// Mark the connection closed and emit the final `Disconnected` event.
///
/// Uses `send().await` since `Disconnected` must never be dropped.
async fn emit_disconnected(
    event_tx: &mpsc::Sender<ConnectionEvent>,
    state: &SharedState,
    reason: Option<String>,
) {
    state.set(ConnectionState::Closed);
    info!("disconnected from server: {}", reason.as_deref().unwrap_or("closed by server"));
    let event = ConnectionEvent::Disconnected { reason };
    if event_tx.send(event).await.is_err() {
        debug!("event channel closed, receiver dropped");
    }
}

// ── Tests ───────────────────────────────────────────────────────────

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
    use crate::protocol::{AckPayload, JoinGamePayload, JoinResultPayload};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicBool;
    use std::sync::Mutex as StdMutex;

    // ── Mock transport ──────────────────────────────────────────────

    /// Records sent frames and replays scripted responses.
    struct MockTransport {
        incoming: VecDeque<Option<std::result::Result<String, HopError>>>,
        sent: Arc<StdMutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
    }

    impl MockTransport {
        fn new(
            incoming: Vec<Option<std::result::Result<String, HopError>>>,
        ) -> (Self, Arc<StdMutex<Vec<String>>>, Arc<AtomicBool>) {
            let sent = Arc::new(StdMutex::new(Vec::new()));
            let closed = Arc::new(AtomicBool::new(false));
            let transport = Self {
                incoming: VecDeque::from(incoming),
                sent: Arc::clone(&sent),
                closed: Arc::clone(&closed),
            };
            (transport, sent, closed)
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&mut self, message: String) -> std::result::Result<(), HopError> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }

        async fn recv(&mut self) -> Option<std::result::Result<String, HopError>> {
            if let Some(item) = self.incoming.pop_front() {
                // `None` scripts a clean close.
                item
            } else {
                // Out of script: stay open until shutdown.
                std::future::pending().await
            }
        }

        async fn close(&mut self) -> std::result::Result<(), HopError> {
            self.closed.store(true, Ordering::Relaxed);
            Ok(())
        }
    }

    fn join() -> JoinRequest {
        JoinRequest::new("game-1", "Alice").unwrap()
    }

    fn join_ok_json() -> String {
        serde_json::to_string(&ServerMessage::JoinResult(JoinResultPayload {
            success: true,
            player_id: Some("Alice-120000".into()),
            error: None,
        }))
        .unwrap()
    }

    // ── Tests ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn join_is_first_frame_after_connected() {
        let (transport, sent, _closed) = MockTransport::new(vec![Some(Ok(join_ok_json()))]);
        let (mut conn, mut events) =
            ConnectionManager::start(transport, join(), &ClientConfig::default());

        assert_eq!(events.recv().await.unwrap(), ConnectionEvent::Connected);
        assert!(matches!(events.recv().await.unwrap(), ConnectionEvent::JoinResult(_)));

        {
            let messages = sent.lock().unwrap();
            assert_eq!(messages.len(), 1);
            let first: ClientMessage = serde_json::from_str(&messages[0]).unwrap();
            assert_eq!(
                first,
                ClientMessage::JoinGame(JoinGamePayload {
                    game_id: "game-1".into(),
                    player_name: "Alice".into(),
                })
            );
        }

        conn.shutdown().await;
    }

    #[tokio::test]
    async fn join_result_carries_the_assigned_player_id() {
        let (transport, _sent, _closed) = MockTransport::new(vec![Some(Ok(join_ok_json()))]);
        let (mut conn, mut events) =
            ConnectionManager::start(transport, join(), &ClientConfig::default());

        let _ = events.recv().await; // Connected
        let ConnectionEvent::JoinResult(result) = events.recv().await.unwrap() else {
            panic!("expected join_result");
        };

        assert!(conn.is_open());
        assert!(result.success);
        assert_eq!(result.player_id.as_deref(), Some("Alice-120000"));

        conn.shutdown().await;
    }

    #[tokio::test]
    async fn send_is_refused_before_open_and_after_close() {
        let (transport, _sent, _closed) = MockTransport::new(vec![None]);
        let (conn, mut events) =
            ConnectionManager::start(transport, join(), &ClientConfig::default());

        // The loop has not run yet on the current-thread runtime.
        assert_eq!(conn.state(), ConnectionState::Connecting);
        assert!(matches!(conn.send(ClientMessage::StartGame), Err(HopError::NotConnected)));

        let _ = events.recv().await; // Connected
        let ev = events.recv().await.unwrap();
        assert_eq!(ev, ConnectionEvent::Disconnected { reason: None });

        assert_eq!(conn.state(), ConnectionState::Closed);
        assert!(matches!(conn.send(ClientMessage::StartGame), Err(HopError::NotConnected)));
    }

    #[tokio::test]
    async fn queued_commands_follow_the_join() {
        let (transport, sent, _closed) = MockTransport::new(vec![]);
        let (mut conn, mut events) =
            ConnectionManager::start(transport, join(), &ClientConfig::default());

        let _ = events.recv().await; // Connected
        conn.send(ClientMessage::StartGame).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        {
            let messages = sent.lock().unwrap();
            assert_eq!(messages.len(), 2);
            let second: ClientMessage = serde_json::from_str(&messages[1]).unwrap();
            assert_eq!(second, ClientMessage::StartGame);
        }

        conn.shutdown().await;
    }

    #[tokio::test]
    async fn unknown_frames_are_ignored() {
        let ack = serde_json::to_string(&ServerMessage::StartResult(AckPayload {
            success: true,
            error: None,
        }))
        .unwrap();
        let (transport, _sent, _closed) = MockTransport::new(vec![
            Some(Ok(r#"{"type":"chat","data":{"text":"hi"}}"#.into())),
            Some(Ok("not json".into())),
            Some(Ok(ack)),
        ]);
        let (mut conn, mut events) =
            ConnectionManager::start(transport, join(), &ClientConfig::default());

        let _ = events.recv().await; // Connected
        let ev = events.recv().await.unwrap();
        assert!(matches!(ev, ConnectionEvent::StartResult(AckPayload { success: true, .. })));

        conn.shutdown().await;
    }

    #[tokio::test]
    async fn receive_error_emits_disconnected() {
        let (transport, _sent, _closed) = MockTransport::new(vec![Some(Err(
            HopError::TransportReceive("reset".into()),
        ))]);
        let (_conn, mut events) =
            ConnectionManager::start(transport, join(), &ClientConfig::default());

        let _ = events.recv().await; // Connected
        match events.recv().await.unwrap() {
            ConnectionEvent::Disconnected { reason } => {
                assert!(reason.unwrap().contains("reset"));
            }
            other => panic!("expected Disconnected, got {other:?}"),
        }
        assert!(events.recv().await.is_none());
    }

    #[tokio::test]
    async fn shutdown_closes_transport() {
        let (transport, _sent, closed) = MockTransport::new(vec![]);
        let (mut conn, mut events) =
            ConnectionManager::start(transport, join(), &ClientConfig::default());

        let _ = events.recv().await; // Connected
        conn.shutdown().await;

        assert!(closed.load(Ordering::Relaxed));
        assert!(!conn.is_open());
        let ev = events.recv().await.unwrap();
        assert!(matches!(ev, ConnectionEvent::Disconnected { .. }));
    }

    #[tokio::test]
    async fn missing_join_ack_only_warns() {
        let (transport, sent, _closed) = MockTransport::new(vec![]);
        let config = ClientConfig::default().with_join_ack_timeout(Duration::from_millis(10));
        let (mut conn, mut events) = ConnectionManager::start(transport, join(), &config);

        let _ = events.recv().await; // Connected
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(conn.is_open());
        assert_eq!(sent.lock().unwrap().len(), 1, "join must not be resent");

        conn.shutdown().await;
    }

    #[test]
    fn connection_ids_are_unique() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }
}
