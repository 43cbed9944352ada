//! HTTP client for the game lobby.
//!
//! The lobby lives on the same origin as the game socket:
//!
//! | Method | Path                | Body                       | Reply                      |
//! |--------|---------------------|----------------------------|----------------------------|
//! | GET    | `/api/games`        |                            | `[GameSummary]`            |
//! | POST   | `/api/games/create` | `{playerName, maxPlayers}` | `{gameId, message}`        |

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{HopError, Result};
use crate::protocol::{GameId, GamePhase};
use crate::session::validate_player_name;

/// Seats requested when the player does not choose.
pub const DEFAULT_MAX_PLAYERS: u32 = 4;

/// One row of the lobby listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub id: GameId,
    pub state: GamePhase,
    pub player_count: usize,
    pub max_players: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl GameSummary {
    /// Whether a new player could still take a seat.
    pub fn is_joinable(&self) -> bool {
        self.state == GamePhase::Waiting && self.player_count < self.max_players as usize
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateGameRequest<'a> {
    player_name: &'a str,
    max_players: u32,
}

/// Reply to a successful create.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedGame {
    pub game_id: GameId,
    #[serde(default)]
    pub message: Option<String>,
}

/// Client for the lobby endpoints of one server.
#[derive(Debug, Clone)]
pub struct LobbyClient {
    base_url: String,
    client: reqwest::Client,
}

impl LobbyClient {
    /// `base_url` is the server origin, e.g. `http://localhost:8080`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the open games.
    ///
    /// # Errors
    ///
    /// [`HopError::Http`] if the request fails or the body is not a game
    /// list, [`HopError::Lobby`] for a non-2xx status.
    pub async fn list_games(&self) -> Result<Vec<GameSummary>> {
        let response = self
            .client
            .get(format!("{}/api/games", self.base_url))
            .send()
            .await?;
        let games: Vec<GameSummary> = check_status(response).await?.json().await?;
        debug!(count = games.len(), "fetched lobby listing");
        Ok(games)
    }

    /// Create a game with `max_players` seats.
    ///
    /// The server seats the creator in the new game, but the seat is not
    /// bound to any socket; the caller still joins over the game socket.
    ///
    /// # Errors
    ///
    /// [`HopError::InvalidInput`] for a blank name (nothing is sent),
    /// [`HopError::Http`] or [`HopError::Lobby`] as for
    /// [`list_games`](Self::list_games).
    pub async fn create_game(&self, player_name: &str, max_players: u32) -> Result<CreatedGame> {
        let player_name = validate_player_name(player_name)?;
        let response = self
            .client
            .post(format!("{}/api/games/create", self.base_url))
            .json(&CreateGameRequest {
                player_name: &player_name,
                max_players,
            })
            .send()
            .await?;
        let created: CreatedGame = check_status(response).await?.json().await?;
        debug!(game = %created.game_id, "created game");
        Ok(created)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|e| format!("failed to read error body: {e}"));
    warn!(status = status.as_u16(), "lobby request failed");
    Err(HopError::Lobby {
        status: status.as_u16(),
        body,
    })
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
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serve one HTTP response and hand back the raw request.
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status}\r\n\
                 content-type: application/json\r\n\
                 content-length: {}\r\n\
                 connection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            let _ = tx.send(request);
        });

        (format!("http://{addr}"), rx)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test]
    async fn list_games_parses_listing() {
        let (url, request) = serve_once(
            "200 OK",
            r#"[{"id":"g1","state":"waiting","playerCount":1,"maxPlayers":4,"createdAt":"2024-05-01T10:00:00Z"},
                {"id":"g2","state":"started","playerCount":3,"maxPlayers":3}]"#,
        )
        .await;

        let games = LobbyClient::new(url).list_games().await.unwrap();
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].id, "g1");
        assert!(games[0].is_joinable());
        assert_eq!(games[1].state, GamePhase::Started);
        assert_eq!(games[1].created_at, None);
        assert!(!games[1].is_joinable());

        let request = request.await.unwrap();
        assert!(request.starts_with("GET /api/games "));
    }

    #[tokio::test]
    async fn create_game_posts_name_and_seats() {
        let (url, request) = serve_once(
            "200 OK",
            r#"{"gameId":"abc-123","message":"Game created successfully"}"#,
        )
        .await;

        let created = LobbyClient::new(format!("{url}/"))
            .create_game("  Alice ", DEFAULT_MAX_PLAYERS)
            .await
            .unwrap();
        assert_eq!(created.game_id, "abc-123");
        assert_eq!(created.message.as_deref(), Some("Game created successfully"));

        let request = request.await.unwrap();
        assert!(request.starts_with("POST /api/games/create "));
        let body = &request[request.find("\r\n\r\n").unwrap() + 4..];
        let body: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(body, serde_json::json!({"playerName": "Alice", "maxPlayers": 4}));
    }

    #[tokio::test]
    async fn non_success_status_becomes_lobby_error() {
        let (url, _request) = serve_once("400 Bad Request", "Invalid request").await;

        let err = LobbyClient::new(url)
            .create_game("Alice", 4)
            .await
            .unwrap_err();
        match err {
            HopError::Lobby { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, "Invalid request");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn blank_name_is_rejected_before_any_request() {
        // Nothing listens here; a request would fail with an Http error.
        let lobby = LobbyClient::new("http://127.0.0.1:1");
        let err = lobby.create_game("   ", 4).await.unwrap_err();
        assert!(matches!(err, HopError::InvalidInput(_)));
    }
}
