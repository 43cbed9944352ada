//! # BunnyHop Client
//!
//! Client core for the BunnyHop multiplayer card game.
//!
//! The server is authoritative: it owns the deck, validates every move and
//! broadcasts a full [`GameSnapshot`](protocol::GameSnapshot) after each
//! change. This crate keeps one game session, talks to the server over any
//! [`Transport`], projects snapshots into what the local player sees and
//! turns player intents into protocol messages.
//!
//! ## Layout
//!
//! - [`protocol`]: wire types for both directions and the snapshot model
//! - [`connection`]: background loop owning the transport; queues the join
//!   until the socket is open
//! - [`projector`] and [`card`]: pure snapshot → view functions
//! - [`screen`]: which screen is showing
//! - [`dispatch`]: start / play / wild hop prompt
//! - [`controller`]: the single owner tying the above together and emitting
//!   [`UiCommand`]s
//! - [`lobby`]: HTTP game listing and creation (feature `lobby-http`)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), bunnyhop_client::HopError> {
//! use bunnyhop_client::{ClientConfig, GameController, JoinRequest, UiCommand};
//!
//! let mut controller = GameController::new(ClientConfig::new("http://localhost:8080"));
//! controller
//!     .connect_and_join(JoinRequest::new("3f2a9c", "Alice")?)
//!     .await?;
//!
//! loop {
//!     let (from, event) = controller.next_event().await;
//!     for command in controller.handle_event(from, event) {
//!         if let UiCommand::Log(line) = command {
//!             println!("{line}");
//!         }
//!     }
//! }
//! # }
//! ```

pub mod card;
pub mod config;
pub mod connection;
pub mod controller;
pub mod dispatch;
pub mod error;
pub mod event;
#[cfg(feature = "lobby-http")]
pub mod lobby;
pub mod projector;
pub mod protocol;
pub mod screen;
pub mod session;
pub mod transport;
pub mod transports;

pub use config::ClientConfig;
pub use connection::{ConnectionId, ConnectionManager, ConnectionState};
pub use controller::{GameController, UiCommand};
pub use error::HopError;
pub use event::ConnectionEvent;
#[cfg(feature = "lobby-http")]
pub use lobby::LobbyClient;
pub use protocol::{ClientMessage, GameSnapshot, ServerMessage};
pub use screen::Screen;
pub use session::{JoinRequest, Session};
pub use transport::Transport;

#[cfg(feature = "transport-websocket")]
pub use transports::WebSocketTransport;
