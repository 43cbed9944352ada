//! # Terminal Client
//!
//! A line-oriented BunnyHop front-end driving [`GameController`].
//!
//! ```text
//! list                      show open games
//! create <name>             create a game and join it
//! join <game-id> <name>     join an existing game
//! start                     start the game
//! play <card-id> [target]   play a card, optionally against a player
//! state                     ask the server for a fresh snapshot
//! leave                     leave the game
//! quit
//! ```
//!
//! While a wild hop card waits for its value, the next line is the value
//! (`cancel` drops the play).
//!
//! ## Running
//!
//! ```sh
//! cargo run --example terminal_client
//! BUNNYHOP_SERVER=https://hop.example.com RUST_LOG=debug cargo run --example terminal_client
//! ```

use bunnyhop_client::card::RenderDescriptor;
use bunnyhop_client::{ClientConfig, GameController, JoinRequest, LobbyClient, UiCommand};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Logging ─────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    // ── Configuration ───────────────────────────────────────────────
    let config = ClientConfig::from_env();
    let lobby = LobbyClient::new(config.server.clone());
    let mut controller = GameController::new(config);
    println!(
        "BunnyHop @ {}  (type `list`, `create <name>` or `join <id> <name>`)",
        lobby.base_url()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    // ── Event loop ──────────────────────────────────────────────────
    loop {
        let commands = tokio::select! {
            (from, event) = controller.next_event() => controller.handle_event(from, event),

            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match handle_line(&mut controller, &lobby, line.trim()).await {
                    Some(commands) => commands,
                    None => break,
                }
            }

            _ = tokio::signal::ctrl_c() => break,
        };
        for command in commands {
            render(command);
        }
    }

    controller.leave().await;
    Ok(())
}

/// Returns `None` to quit.
async fn handle_line(
    controller: &mut GameController,
    lobby: &LobbyClient,
    line: &str,
) -> Option<Vec<UiCommand>> {
    if controller.is_awaiting_wild_value() {
        return Some(if line == "cancel" {
            controller.cancel_wild_value()
        } else {
            controller.submit_wild_value(line)
        });
    }

    let mut words = line.split_whitespace();
    let commands = match (words.next(), words.next(), words.next()) {
        (Some("list"), _, _) => match lobby.list_games().await {
            Ok(games) if games.is_empty() => vec![UiCommand::Log("No open games".into())],
            Ok(games) => games
                .into_iter()
                .map(|game| {
                    UiCommand::Log(format!(
                        "{}  {:?}  {}/{}{}",
                        game.id,
                        game.state,
                        game.player_count,
                        game.max_players,
                        if game.is_joinable() { "" } else { "  (closed)" }
                    ))
                })
                .collect(),
            Err(e) => vec![UiCommand::Alert(e.to_string())],
        },
        (Some("create"), name, _) => {
            match controller.create_and_join(lobby, name.unwrap_or_default()).await {
                Ok((_, commands)) => commands,
                Err(e) => vec![UiCommand::Alert(e.to_string())],
            }
        }
        (Some("join"), game_id, name) => {
            let request = JoinRequest::new(game_id.unwrap_or_default(), name.unwrap_or_default());
            let joined = match request {
                Ok(request) => controller.connect_and_join(request).await,
                Err(e) => Err(e),
            };
            match joined {
                Ok((_, commands)) => commands,
                Err(e) => vec![UiCommand::Alert(e.to_string())],
            }
        }
        (Some("start"), _, _) => controller.start_game(),
        (Some("play"), Some(card_id), None) => controller.play_card(card_id),
        (Some("play"), Some(card_id), Some(target)) => {
            controller.play_card_targeting(card_id, target.to_owned())
        }
        (Some("state"), _, _) => controller.refresh_state(),
        (Some("leave"), _, _) => controller.leave().await,
        (Some("quit"), _, _) => return None,
        (None, _, _) => Vec::new(),
        (Some(other), _, _) => vec![UiCommand::Alert(format!("Unknown command: {other}"))],
    };
    Some(commands)
}

fn render(command: UiCommand) {
    match command {
        UiCommand::ShowScreen(screen) => println!("\n== {screen:?} =="),
        UiCommand::RenderWaitingRoom(room) => {
            let seats = room.max_players.map_or_else(|| "?".to_owned(), |n| n.to_string());
            println!(
                "Game {}  ({}/{seats} players)",
                room.game_id.as_deref().unwrap_or("?"),
                room.players.len(),
            );
            for (name, is_you) in room.players {
                println!("  {name}{}", if is_you { " (you)" } else { "" });
            }
        }
        UiCommand::RenderGame(view) => {
            let vm = &view.view_model;
            println!("Turn: {} {}", vm.turn_label, vm.direction_glyph);
            for row in &view.players {
                println!(
                    "  {}{} {:>2}/20  {} cards{}{}{}",
                    if row.is_current { "> " } else { "  " },
                    row.name,
                    row.position,
                    row.card_count,
                    if row.is_you { "  (you)" } else { "" },
                    if row.is_blocked { "  [blocked]" } else { "" },
                    if row.has_double { "  [x2]" } else { "" },
                );
            }
            if let Some(top) = &view.top_card {
                println!("Top card: {}", describe(top));
            }
            let hand: Vec<String> = view.hand.iter().map(describe).collect();
            println!("Your hand: {}", hand.join("  "));
        }
        UiCommand::ShowWinner { name } => println!("Winner: {name}"),
        UiCommand::PromptWildValue {
            card_id,
            min,
            max,
            suggested,
        } => println!("Hop value for {card_id} ({min}-{max}, e.g. {suggested}), or `cancel`:"),
        UiCommand::Alert(text) => println!("!! {text}"),
        UiCommand::Log(text) => println!("-- {text}"),
        UiCommand::ClearLog => {}
    }
}

fn describe(card: &RenderDescriptor) -> String {
    format!(
        "[{}{} {} {}]",
        if card.clickable { "*" } else { "" },
        card.card_id,
        card.glyph,
        card.label
    )
}
