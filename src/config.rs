//! Client configuration.

use crate::transport::endpoint_from_origin;
use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};
use url::Url;

/// Config file read when no path is given, if it exists.
pub const DEFAULT_CONFIG_FILE: &str = "reversi_client.toml";

/// Settings for the Reversi client.
///
/// Every field has a default, so an empty or missing file is valid.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server origin; the WebSocket endpoint is derived from it.
    #[serde(default = "default_server_url")]
    server_url: String,

    /// Player name sent with join/create.
    #[serde(default = "default_username")]
    username: String,

    /// Log file used while the terminal UI owns the screen.
    #[serde(default = "default_log_file")]
    log_file: PathBuf,

    /// How long `rooms` waits for the server's list.
    #[serde(default = "default_room_list_timeout_secs")]
    room_list_timeout_secs: u64,
}

fn default_server_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_username() -> String {
    "player".to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from("reversi_client.log")
}

fn default_room_list_timeout_secs() -> u64 {
    5
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            username: default_username(),
            log_file: default_log_file(),
            room_list_timeout_secs: default_room_list_timeout_secs(),
        }
    }
}

impl ClientConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        info!(server_url = %config.server_url, "Config loaded");
        Ok(config)
    }

    /// Loads `path` if given, else [`DEFAULT_CONFIG_FILE`] if it exists,
    /// else the defaults.
    ///
    /// An explicitly named file must exist.
    #[instrument]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(DEFAULT_CONFIG_FILE),
            None => {
                debug!("No config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Overrides the server origin when `server_url` is set.
    pub fn with_server_url(mut self, server_url: Option<String>) -> Self {
        if let Some(url) = server_url {
            self.server_url = url;
        }
        self
    }

    /// Overrides the player name when `username` is set.
    pub fn with_username(mut self, username: Option<String>) -> Self {
        if let Some(name) = username {
            self.username = name;
        }
        self
    }

    /// WebSocket endpoint derived from [`ClientConfig::server_url`].
    pub fn endpoint(&self) -> Result<Url, ConfigError> {
        endpoint_from_origin(&self.server_url).map_err(|e| ConfigError::new(e.to_string()))
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
