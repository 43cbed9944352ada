#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for the BunnyHop client integration tests.
//!
//! Provides a channel-driven [`MockTransport`] whose server side is scripted
//! through a [`MockServer`] handle, plus builders for server frames in the
//! exact shape the game server sends them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use bunnyhop_client::{HopError, Transport};
use serde_json::{json, Value};
use tokio::sync::mpsc;

// ── MockTransport ───────────────────────────────────────────────────

type Incoming = Option<Result<String, HopError>>;

/// Client half of a scripted connection.
pub struct MockTransport {
    incoming: mpsc::UnboundedReceiver<Incoming>,
    sent: Arc<StdMutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

/// Server half: push frames, inspect what the client sent.
#[derive(Clone)]
pub struct MockServer {
    tx: mpsc::UnboundedSender<Incoming>,
    sent: Arc<StdMutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl MockTransport {
    pub fn new() -> (Self, MockServer) {
        let (tx, incoming) = mpsc::unbounded_channel();
        let sent = Arc::new(StdMutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let transport = Self {
            incoming,
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
        };
        (transport, MockServer { tx, sent, closed })
    }
}

impl MockServer {
    pub fn push(&self, frame: impl Into<String>) {
        let _ = self.tx.send(Some(Ok(frame.into())));
    }

    /// Make the next `recv` fail.
    pub fn fail(&self, reason: &str) {
        let _ = self
            .tx
            .send(Some(Err(HopError::TransportReceive(reason.into()))));
    }

    /// End the stream as a clean close would.
    pub fn hang_up(&self) {
        let _ = self.tx.send(None);
    }

    /// Every frame the client sent so far, parsed.
    pub fn sent(&self) -> Vec<Value> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|text| serde_json::from_str(text).unwrap())
            .collect()
    }

    /// `type` tags of the frames sent so far.
    pub fn sent_kinds(&self) -> Vec<String> {
        self.sent()
            .iter()
            .map(|frame| frame["type"].as_str().unwrap().to_owned())
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, message: String) -> Result<(), HopError> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(HopError::TransportClosed);
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, HopError>> {
        match self.incoming.recv().await {
            Some(item) => item,
            // Server handle dropped: stay open until shutdown.
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) -> Result<(), HopError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

// ── Cards ───────────────────────────────────────────────────────────

pub fn hop(id: &str, color: &str, value: u8) -> Value {
    json!({"id": id, "type": "hop", "color": color, "value": value})
}

pub fn action(id: &str, color: &str, action_type: &str) -> Value {
    json!({"id": id, "type": "action", "color": color, "actionType": action_type})
}

pub fn special(id: &str, action_type: &str) -> Value {
    json!({"id": id, "type": "special", "color": "wild", "actionType": action_type})
}

/// The placeholder top card the server sends before the first play.
pub fn no_card() -> Value {
    json!({"id": "", "type": ""})
}

// ── Players ─────────────────────────────────────────────────────────

pub fn player(id: &str, name: &str, position: u32, hand: Vec<Value>) -> Value {
    json!({
        "id": id,
        "name": name,
        "position": position,
        "hand": hand,
        "isBlocked": false,
        "hasDouble": false,
    })
}

/// Players object keyed by id, written in the given order.
///
/// Built by hand since `serde_json::Map` sorts its keys.
pub fn players_object(players: &[Value]) -> String {
    let entries: Vec<String> = players
        .iter()
        .map(|p| format!("{}:{}", p["id"], p))
        .collect();
    format!("{{{}}}", entries.join(","))
}

// ── Server frames ───────────────────────────────────────────────────

/// A `game_state` frame as the server writes it.
pub fn game_state_json(
    state: &str,
    current_player: usize,
    players: &[Value],
    top_card: Value,
    winner: &str,
) -> String {
    format!(
        r#"{{"type":"game_state","gameId":"g1","data":{{"id":"g1","state":"{state}","currentPlayer":{current_player},"players":{},"direction":1,"topCard":{top_card},"winner":"{winner}"}}}}"#,
        players_object(players)
    )
}

pub fn waiting_json(players: &[Value]) -> String {
    game_state_json("waiting", 0, players, no_card(), "")
}

pub fn started_json(current_player: usize, players: &[Value], top_card: Value) -> String {
    game_state_json("started", current_player, players, top_card, "")
}

pub fn finished_json(players: &[Value], winner: &str) -> String {
    game_state_json("finished", 0, players, no_card(), winner)
}

pub fn join_result_json(player_id: &str) -> String {
    json!({"type": "join_result", "data": {"success": true, "playerId": player_id}}).to_string()
}

pub fn join_failed_json(error: &str) -> String {
    json!({"type": "join_result", "data": {"success": false, "playerId": "", "error": error}})
        .to_string()
}

/// `start_result` or `play_result`.
pub fn ack_json(kind: &str, success: bool, error: Option<&str>) -> String {
    let mut data = json!({"success": success});
    if let Some(error) = error {
        data["error"] = json!(error);
    }
    json!({"type": kind, "data": data}).to_string()
}

pub fn error_frame_json(error: &str) -> String {
    json!({"type": "error", "data": {"error": error}}).to_string()
}
