//! Command-line interface for reversi_client.

use clap::{Parser, Subcommand};
use reversi_board::Color;
use std::path::PathBuf;

/// Reversi Client - play networked Reversi from the terminal
#[derive(Parser, Debug)]
#[command(name = "reversi_client")]
#[command(about = "Terminal client for a networked Reversi server", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Server origin (http:// or https://), overrides the config file
    #[arg(long, global = true)]
    pub server_url: Option<String>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Join an existing room and play
    Join {
        /// Room to join
        #[arg(short, long)]
        room: String,

        /// Player name, overrides the config file
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Create a room and play
    Create {
        /// Room to create
        #[arg(short, long)]
        room: String,

        /// Player name, overrides the config file
        #[arg(short, long)]
        name: Option<String>,

        /// Color to play (black or white); the server picks if omitted
        #[arg(long, value_parser = parse_color)]
        color: Option<Color>,
    },

    /// Print the server's room list and exit
    Rooms,
}

fn parse_color(s: &str) -> Result<Color, String> {
    Color::parse(s).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_parses_color_case_insensitively() {
        let cli = Cli::try_parse_from([
            "reversi_client",
            "--server-url",
            "http://localhost:9000",
            "create",
            "--room",
            "r1",
            "--color",
            "WHITE",
        ])
        .unwrap();
        assert_eq!(cli.server_url.as_deref(), Some("http://localhost:9000"));
        match cli.command {
            Command::Create { room, name, color } => {
                assert_eq!(room, "r1");
                assert_eq!(name, None);
                assert_eq!(color, Some(Color::White));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn bad_color_is_rejected() {
        let result =
            Cli::try_parse_from(["reversi_client", "create", "-r", "r1", "--color", "red"]);
        assert!(result.is_err());
    }

    #[test]
    fn global_config_after_subcommand() {
        let cli =
            Cli::try_parse_from(["reversi_client", "rooms", "--config", "client.toml"]).unwrap();
        assert!(matches!(cli.command, Command::Rooms));
        assert_eq!(cli.config, Some(PathBuf::from("client.toml")));
    }
}
