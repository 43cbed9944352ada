//! The game controller: one owned object holding everything a game session
//! needs, with an explicit lifecycle.
//!
//! [`GameController`] owns the [`Session`], the last [`GameSnapshot`], the
//! live [`ConnectionManager`] and its event receiver, the [`ScreenMachine`]
//! and the [`ActionDispatcher`]. It never draws anything itself: every input
//! returns the [`UiCommand`]s the host UI should carry out.
//!
//! ```rust,ignore
//! let mut controller = GameController::new(ClientConfig::from_env());
//! let (_, commands) = controller.connect_and_join(JoinRequest::new(&game_id, &name)?).await?;
//! ui.apply(commands);
//!
//! loop {
//!     let commands = tokio::select! {
//!         (from, event) = controller.next_event() => controller.handle_event(from, event),
//!         Some(line) = input.recv() => handle_input(&mut controller, line).await,
//!     };
//!     ui.apply(commands);
//! }
//! ```

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::card::{render_card, CardContext, RenderDescriptor};
use crate::config::ClientConfig;
use crate::connection::{ConnectionId, ConnectionManager};
use crate::dispatch::{
    ActionDispatcher, DispatchOutcome, Outbound, WILD_VALUE_MAX, WILD_VALUE_MIN,
    WILD_VALUE_SUGGESTED,
};
use crate::error::HopError;
use crate::event::ConnectionEvent;
use crate::projector::{self, GameView, ViewModel, WaitingRoomView};
use crate::protocol::{CardId, GameSnapshot, JoinResultPayload, PlayerId};
use crate::screen::{Screen, ScreenMachine};
use crate::session::{JoinRequest, Session};
use crate::transport::Transport;

/// Something the host UI should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    ShowScreen(Screen),
    RenderWaitingRoom(WaitingRoomView),
    RenderGame(Box<GameView>),
    ShowWinner { name: String },
    /// Ask the player for a wild hop value, then call
    /// [`GameController::submit_wild_value`] or
    /// [`GameController::cancel_wild_value`].
    PromptWildValue {
        card_id: CardId,
        min: u8,
        max: u8,
        suggested: u8,
    },
    /// Blocking, user-visible notice.
    Alert(String),
    /// One line in the on-screen activity log.
    Log(String),
    ClearLog,
}

struct LiveConnection {
    manager: ConnectionManager,
    events: mpsc::Receiver<ConnectionEvent>,
}

pub struct GameController {
    config: ClientConfig,
    screen: ScreenMachine,
    session: Option<Session>,
    snapshot: Option<GameSnapshot>,
    connection: Option<LiveConnection>,
    dispatcher: ActionDispatcher,
}

impl GameController {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            screen: ScreenMachine::new(),
            session: None,
            snapshot: None,
            connection: None,
            dispatcher: ActionDispatcher::new(),
        }
    }

    // ── State accessors ─────────────────────────────────────────────

    pub fn screen(&self) -> Screen {
        self.screen.current()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn snapshot(&self) -> Option<&GameSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn local_player_id(&self) -> Option<&str> {
        self.session
            .as_ref()
            .and_then(|session| session.local_player_id.as_deref())
    }

    /// Projection of the cached snapshot for the local player.
    pub fn view_model(&self) -> Option<ViewModel> {
        self.snapshot
            .as_ref()
            .map(|snapshot| projector::project(snapshot, self.local_player_id()))
    }

    pub fn is_connected(&self) -> bool {
        self.connection
            .as_ref()
            .is_some_and(|live| live.manager.is_open())
    }

    pub fn is_awaiting_wild_value(&self) -> bool {
        self.dispatcher.is_awaiting_wild_value()
    }

    /// The card a wild prompt is about, rendered as on the table.
    pub fn pending_wild_card(&self) -> Option<RenderDescriptor> {
        let card_id = self.dispatcher.pending_card()?;
        let me = self.snapshot.as_ref()?.player(self.local_player_id()?)?;
        me.find_card(card_id)
            .map(|card| render_card(card, CardContext::TABLE))
    }

    // ── Session lifecycle ───────────────────────────────────────────

    /// Begin a session over an already open `transport`.
    ///
    /// Any previous session is torn down first; the returned commands take
    /// the UI back to the lobby when one was shown. The join request is sent
    /// as soon as the connection reports open.
    pub async fn join(
        &mut self,
        request: JoinRequest,
        transport: impl Transport,
    ) -> (ConnectionId, Vec<UiCommand>) {
        let commands = self.reset().await;
        let (manager, events) = ConnectionManager::start(transport, request.clone(), &self.config);
        (self.install(request, manager, events), commands)
    }

    /// Open a WebSocket to the configured server and begin a session.
    ///
    /// On success the previous session, if any, is replaced as in
    /// [`join`](Self::join).
    ///
    /// # Errors
    ///
    /// Returns [`HopError::Io`] if the WebSocket cannot be opened. The
    /// previous session is left untouched in that case.
    #[cfg(feature = "transport-websocket")]
    pub async fn connect_and_join(
        &mut self,
        request: JoinRequest,
    ) -> crate::error::Result<(ConnectionId, Vec<UiCommand>)> {
        let (manager, events) = ConnectionManager::connect(request.clone(), &self.config).await?;
        let commands = self.reset().await;
        Ok((self.install(request, manager, events), commands))
    }

    /// Create a game through the lobby, then join it as `player_name`.
    ///
    /// # Errors
    ///
    /// Returns [`HopError::InvalidInput`] for a blank name (before any
    /// request is made), or the lobby / connection error.
    #[cfg(all(feature = "transport-websocket", feature = "lobby-http"))]
    pub async fn create_and_join(
        &mut self,
        lobby: &crate::lobby::LobbyClient,
        player_name: &str,
    ) -> crate::error::Result<(ConnectionId, Vec<UiCommand>)> {
        let seats = crate::lobby::DEFAULT_MAX_PLAYERS;
        let player_name = crate::session::validate_player_name(player_name)?;
        let created = lobby.create_game(&player_name, seats).await?;
        let request = JoinRequest::new(&created.game_id, &player_name)?.with_max_players(seats);
        self.connect_and_join(request).await
    }

    /// Leave the game: close the connection, forget the session and snapshot
    /// and return to the lobby.
    pub async fn leave(&mut self) -> Vec<UiCommand> {
        self.teardown().await;
        let mut commands = Vec::new();
        let transition = self.screen.leave();
        if transition.changed() {
            commands.push(UiCommand::ShowScreen(Screen::Lobby));
        }
        commands.push(UiCommand::ClearLog);
        commands
    }

    fn install(
        &mut self,
        request: JoinRequest,
        manager: ConnectionManager,
        events: mpsc::Receiver<ConnectionEvent>,
    ) -> ConnectionId {
        let connection_id = manager.id();
        info!(
            connection = %connection_id,
            game = request.game_id(),
            "session started"
        );
        self.session = Some(Session {
            game_id: request.game_id().to_owned(),
            player_name: request.player_name().to_owned(),
            local_player_id: None,
            connection_id,
            max_players: request.max_players(),
        });
        self.connection = Some(LiveConnection { manager, events });
        connection_id
    }

    /// Tear down any session before a new join. Returns what brings the UI
    /// back to an empty lobby.
    async fn reset(&mut self) -> Vec<UiCommand> {
        let had_session = self.session.is_some();
        self.teardown().await;
        let mut commands = Vec::new();
        if self.screen.leave().changed() {
            commands.push(UiCommand::ShowScreen(Screen::Lobby));
        }
        if had_session {
            commands.push(UiCommand::ClearLog);
        }
        commands
    }

    async fn teardown(&mut self) {
        if let Some(mut live) = self.forget_session() {
            live.manager.shutdown().await;
            debug!(connection = %live.manager.id(), "connection torn down");
        }
    }

    /// Clear session, snapshot and prompt, handing back the live connection.
    fn forget_session(&mut self) -> Option<LiveConnection> {
        self.session = None;
        self.snapshot = None;
        self.dispatcher.reset();
        self.connection.take()
    }

    // ── Inbound ─────────────────────────────────────────────────────

    /// Wait for the next event of the live connection.
    ///
    /// Pends forever while there is no connection or after it has delivered
    /// its final event. Cancel-safe.
    pub async fn next_event(&mut self) -> (ConnectionId, ConnectionEvent) {
        if let Some(live) = self.connection.as_mut() {
            if let Some(event) = live.events.recv().await {
                return (live.manager.id(), event);
            }
        }
        std::future::pending().await
    }

    /// Apply an event from connection `from`.
    ///
    /// Events from anything but the live connection are discarded without
    /// touching any state.
    pub fn handle_event(&mut self, from: ConnectionId, event: ConnectionEvent) -> Vec<UiCommand> {
        let live = self.connection.as_ref().map(|live| live.manager.id());
        if live != Some(from) {
            debug!(connection = %from, "discarding event from stale connection");
            return Vec::new();
        }

        match event {
            ConnectionEvent::Connected => vec![UiCommand::Log("Connected to server".into())],
            ConnectionEvent::JoinResult(result) => self.on_join_result(result),
            ConnectionEvent::StartResult(ack) => match ack.into_result("start game") {
                Ok(()) => vec![UiCommand::Log("Game started!".into())],
                Err(e) => vec![rejection_alert(&e)],
            },
            ConnectionEvent::PlayResult(ack) => match ack.into_result("play card") {
                Ok(()) => vec![UiCommand::Log("Card played successfully".into())],
                Err(e) => vec![rejection_alert(&e)],
            },
            ConnectionEvent::ServerError { error } => {
                vec![UiCommand::Alert(format!("Server error: {error}"))]
            }
            ConnectionEvent::GameState(snapshot) => self.apply_snapshot(*snapshot),
            ConnectionEvent::Disconnected { reason } => {
                warn!(
                    "connection lost: {}",
                    reason.as_deref().unwrap_or("closed by server")
                );
                self.dispatcher.reset();
                vec![UiCommand::Log("Disconnected from server".into())]
            }
        }
    }

    fn on_join_result(&mut self, result: JoinResultPayload) -> Vec<UiCommand> {
        if !result.success {
            let message = result.error.unwrap_or_else(|| "unknown error".into());
            warn!("join rejected: {message}");
            // The server keeps broadcasting state for the game it refused us.
            // Dropping the handle aborts the loop, so none of it gets through.
            if let Some(live) = self.forget_session() {
                debug!(connection = %live.manager.id(), "rejected connection dropped");
            }
            let mut commands = Vec::with_capacity(2);
            if self.screen.leave().changed() {
                commands.push(UiCommand::ShowScreen(Screen::Lobby));
            }
            commands.push(UiCommand::Alert(format!("Failed to join game: {message}")));
            return commands;
        }

        let mut commands = Vec::new();
        if self.screen.joined().changed() {
            commands.push(UiCommand::ShowScreen(Screen::WaitingRoom));
        }
        let who = result.player_id.clone().unwrap_or_default();
        if let Some(session) = self.session.as_mut() {
            session.local_player_id = result.player_id;
        }
        commands.push(UiCommand::Log(format!("Joined game as {who}")));
        commands
    }

    /// Replace the cached snapshot and re-render.
    fn apply_snapshot(&mut self, snapshot: GameSnapshot) -> Vec<UiCommand> {
        let transition = self.screen.apply_phase(snapshot.phase);
        let local = self.local_player_id();

        let mut commands = Vec::with_capacity(2);
        if transition.changed() {
            commands.push(UiCommand::ShowScreen(transition.to));
        }
        match transition.to {
            Screen::WaitingRoom => {
                let game_id = self.session.as_ref().map(|s| s.game_id.as_str());
                let seats = self.session.as_ref().and_then(|s| s.max_players);
                commands.push(UiCommand::RenderWaitingRoom(projector::waiting_room(
                    &snapshot, game_id, seats, local,
                )));
            }
            Screen::Active => {
                commands.push(UiCommand::RenderGame(Box::new(projector::game_view(
                    &snapshot, local,
                ))));
            }
            Screen::Finished => commands.push(UiCommand::ShowWinner {
                name: projector::winner_label(&snapshot),
            }),
            Screen::Lobby => {}
        }

        self.snapshot = Some(snapshot);
        commands
    }

    // ── Outbound ────────────────────────────────────────────────────

    pub fn start_game(&mut self) -> Vec<UiCommand> {
        let outcome = self
            .dispatcher
            .request_start_game(outbound(&self.connection), self.snapshot.as_ref());
        outcome_commands(outcome)
    }

    /// Play a card from the local hand.
    pub fn play_card(&mut self, card_id: &str) -> Vec<UiCommand> {
        self.play(card_id, None)
    }

    /// Play a targeted card (e.g. `block`) against `target`.
    pub fn play_card_targeting(&mut self, card_id: &str, target: PlayerId) -> Vec<UiCommand> {
        self.play(card_id, Some(target))
    }

    fn play(&mut self, card_id: &str, target: Option<PlayerId>) -> Vec<UiCommand> {
        let local = self
            .session
            .as_ref()
            .and_then(|session| session.local_player_id.as_deref());
        let outcome = self.dispatcher.request_play_card(
            outbound(&self.connection),
            self.snapshot.as_ref(),
            local,
            card_id,
            target,
        );
        outcome_commands(outcome)
    }

    /// Resume a wild hop play with the player's answer.
    pub fn submit_wild_value(&mut self, input: &str) -> Vec<UiCommand> {
        outcome_commands(
            self.dispatcher
                .complete_wild_value(outbound(&self.connection), input),
        )
    }

    pub fn cancel_wild_value(&mut self) -> Vec<UiCommand> {
        outcome_commands(self.dispatcher.cancel_wild_value())
    }

    /// Ask the server to re-send the snapshot.
    pub fn refresh_state(&mut self) -> Vec<UiCommand> {
        outcome_commands(self.dispatcher.request_state(outbound(&self.connection)))
    }
}

impl std::fmt::Debug for GameController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameController")
            .field("screen", &self.screen())
            .field("session", &self.session)
            .field("connected", &self.is_connected())
            .field("has_snapshot", &self.snapshot.is_some())
            .finish()
    }
}

fn outbound(connection: &Option<LiveConnection>) -> Option<&dyn Outbound> {
    connection
        .as_ref()
        .map(|live| &live.manager as &dyn Outbound)
}

fn outcome_commands(outcome: DispatchOutcome) -> Vec<UiCommand> {
    match outcome {
        DispatchOutcome::Sent | DispatchOutcome::Aborted => Vec::new(),
        DispatchOutcome::AwaitingWildValue { card_id } => vec![UiCommand::PromptWildValue {
            card_id,
            min: WILD_VALUE_MIN,
            max: WILD_VALUE_MAX,
            suggested: WILD_VALUE_SUGGESTED,
        }],
        DispatchOutcome::Refused(notice) => vec![UiCommand::Alert(notice.message().into())],
    }
}

fn rejection_alert(err: &HopError) -> UiCommand {
    match err {
        HopError::Rejected { action, message } => {
            UiCommand::Alert(format!("Failed to {action}: {message}"))
        }
        other => UiCommand::Alert(other.to_string()),
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
    use crate::dispatch::Notice;

    #[test]
    fn fresh_controller_is_idle_in_lobby() {
        let controller = GameController::new(ClientConfig::default());
        assert_eq!(controller.screen(), Screen::Lobby);
        assert!(controller.session().is_none());
        assert!(controller.view_model().is_none());
        assert!(!controller.is_connected());
    }

    #[test]
    fn wild_prompt_carries_the_value_range() {
        let commands = outcome_commands(DispatchOutcome::AwaitingWildValue {
            card_id: "w1".into(),
        });
        assert_eq!(
            commands,
            vec![UiCommand::PromptWildValue {
                card_id: "w1".into(),
                min: 1,
                max: 10,
                suggested: 5,
            }]
        );
    }

    #[test]
    fn refusals_become_alerts_and_aborts_are_silent() {
        assert_eq!(
            outcome_commands(DispatchOutcome::Refused(Notice::NotConnected)),
            vec![UiCommand::Alert("Not connected to server".into())]
        );
        assert!(outcome_commands(DispatchOutcome::Aborted).is_empty());
        assert!(outcome_commands(DispatchOutcome::Sent).is_empty());
    }

    #[test]
    fn rejection_alert_is_capitalised() {
        let err = HopError::Rejected {
            action: "start game",
            message: "Need at least 2 players".into(),
        };
        assert_eq!(
            rejection_alert(&err),
            UiCommand::Alert("Failed to start game: Need at least 2 players".into())
        );
    }

    #[test]
    fn events_without_a_connection_are_ignored() {
        let mut controller = GameController::new(ClientConfig::default());
        let commands = controller.handle_event(ConnectionId::new(), ConnectionEvent::Connected);
        assert!(commands.is_empty());
        assert_eq!(controller.screen(), Screen::Lobby);
    }
}
