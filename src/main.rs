//! Reversi Client - Unified CLI
//!
//! Join or create a room and play in the terminal, or list the server's rooms.

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use reversi_client::{ClientConfig, RoomRequest, list_rooms, tui};
use std::time::Duration;
use tracing::{info, instrument};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = ClientConfig::load(cli.config.as_deref())?.with_server_url(cli.server_url);

    match cli.command {
        Command::Join { room, name } => {
            let config = config.with_username(name);
            let request = RoomRequest::join(room, config.username().clone())?;
            tui::run_tui(config, request).await
        }
        Command::Create { room, name, color } => {
            let config = config.with_username(name);
            let request = RoomRequest::create(room, config.username().clone(), color)?;
            tui::run_tui(config, request).await
        }
        Command::Rooms => run_rooms(config).await,
    }
}

/// Print the room list to stdout
#[instrument(skip(config), fields(server_url = %config.server_url()))]
async fn run_rooms(config: ClientConfig) -> Result<()> {
    initialize_cli_tracing();

    let endpoint = config.endpoint()?;
    let wait = Duration::from_secs(*config.room_list_timeout_secs());
    let rooms = list_rooms(&endpoint, wait).await?;
    info!(count = rooms.len(), "Printing rooms");

    if rooms.is_empty() {
        println!("No rooms");
        return Ok(());
    }
    for room in rooms {
        let players: Vec<String> = room
            .players
            .iter()
            .map(|p| match p.color {
                Some(color) => format!("{} ({})", p.name, color),
                None => p.name.clone(),
            })
            .collect();
        let status = if room.is_open() { "open" } else { "full" };
        println!("{:<20} {:<5} {}", room.name, status, players.join(", "));
    }
    Ok(())
}

fn initialize_cli_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
