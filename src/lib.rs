//! Reversi Client library - networked Reversi over WebSocket
//!
//! A client for a Reversi server that speaks slash commands up and JSON
//! messages down. The server is authoritative; the client mirrors its board,
//! tracks the session lifecycle and only sends moves that are legal.
//!
//! # Architecture
//!
//! - **Board**: rules, legality and hints live in the `reversi_board` crate
//! - **Protocol**: typed commands and decoded server messages
//! - **Transport**: one WebSocket connection at a time, events stamped with
//!   a connection id
//! - **Session**: the state machine that ties them together
//! - **Driver**: a single task feeding transport events and user intents to
//!   the session
//! - **TUI**: a ratatui front end over the driver
//!
//! # Example
//!
//! ```no_run
//! use reversi_client::{
//!     ClientConfig, Intent, RoomRequest, SessionController, SessionDriver, WsConnector,
//! };
//! use tokio::sync::mpsc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ClientConfig::default();
//! let (connector, events) = WsConnector::channel();
//! let controller = SessionController::new(connector, config.endpoint()?);
//! let mut views = controller.subscribe();
//!
//! let (intents, intent_rx) = mpsc::unbounded_channel();
//! let driver = tokio::spawn(SessionDriver::new(controller, events, intent_rx).run());
//! intents.send(Intent::Connect(RoomRequest::join("room1", "alice")?))?;
//!
//! views.changed().await?;
//! println!("{}", views.borrow().phase);
//!
//! intents.send(Intent::Quit)?;
//! driver.await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod config;
mod driver;
mod lobby;
mod protocol;
mod session;
mod transport;

pub mod tui;

// Crate-level exports - Board engine
pub use reversi_board::{Board, BoardError, Cell, Color, DiscCount, Pos};

// Crate-level exports - Configuration
pub use config::{ClientConfig, ConfigError, DEFAULT_CONFIG_FILE};

// Crate-level exports - Protocol
pub use protocol::{
    Command, ProtocolError, RoomPlayer, RoomRequest, RoomSummary, ServerMessage, Snapshot, decode,
};

// Crate-level exports - Transport
pub use transport::{
    Connection, ConnectionId, Connector, TransportError, TransportEvent, TransportEventKind,
    WS_PATH, WsConnection, WsConnector, endpoint_from_origin,
};

// Crate-level exports - Session
pub use session::{MoveRejection, Outcome, Phase, SessionController, SessionView};

// Crate-level exports - Driver and lobby
pub use driver::{Intent, SessionDriver};
pub use lobby::list_rooms;
