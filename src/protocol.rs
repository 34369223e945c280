//! Wire protocol spoken with the Reversi server.
//!
//! Outbound traffic is a line of space-separated tokens starting with a slash
//! command (`/join room1 alice`). Inbound traffic is mostly JSON objects of
//! the form `{"kind": ..., "body": ...}`; the server also answers
//! `/listRooms` with a bare JSON array and acknowledges some commands with
//! plain text. Strings exist only at this boundary: everything past
//! [`decode`] and before [`Command`]'s `Display` is typed.

use reversi_board::{Board, BoardError, Cell, Color, Pos};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, instrument, trace};

/// Protocol encode/decode failure.
#[derive(Debug, derive_more::Display)]
pub enum ProtocolError {
    /// Frame looked like JSON but did not parse, or a payload had the wrong shape.
    #[display("Malformed message: {}", _0)]
    Json(serde_json::Error),

    /// `kind` is not one this client knows.
    #[display("Unknown message kind: {:?}", _0)]
    UnknownKind(String),

    /// A message kind that needs a payload arrived without one.
    #[display("Message {} has no body", _0)]
    MissingBody(String),

    /// Board data in a payload was invalid.
    #[display("Invalid board data: {}", _0)]
    Board(BoardError),

    /// A command token was empty or contained whitespace.
    #[display("Invalid token {:?}: must be non-empty and contain no whitespace", _0)]
    InvalidToken(String),
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProtocolError::Json(err) => Some(err),
            ProtocolError::Board(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        ProtocolError::Json(err)
    }
}

impl From<BoardError> for ProtocolError {
    fn from(err: BoardError) -> Self {
        ProtocolError::Board(err)
    }
}

fn token(raw: impl Into<String>) -> Result<String, ProtocolError> {
    let raw = raw.into();
    if raw.is_empty() || raw.chars().any(char::is_whitespace) {
        return Err(ProtocolError::InvalidToken(raw));
    }
    Ok(raw)
}

// ─────────────────────────────────────────────────────────────
//  Outbound
// ─────────────────────────────────────────────────────────────

/// The join-or-create request queued when connecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomRequest {
    /// Join an existing room.
    Join {
        /// Room name.
        channel: String,
        /// Player name.
        username: String,
    },
    /// Create a room, optionally choosing a color.
    Create {
        /// Room name.
        channel: String,
        /// Player name.
        username: String,
        /// Requested color; the server picks when absent.
        color: Option<Color>,
    },
}

impl RoomRequest {
    /// Builds a join request.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidToken`] if either name is empty or
    /// contains whitespace.
    pub fn join(
        channel: impl Into<String>,
        username: impl Into<String>,
    ) -> Result<Self, ProtocolError> {
        Ok(Self::Join {
            channel: token(channel)?,
            username: token(username)?,
        })
    }

    /// Builds a create request.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidToken`] if either name is empty or
    /// contains whitespace.
    pub fn create(
        channel: impl Into<String>,
        username: impl Into<String>,
        color: Option<Color>,
    ) -> Result<Self, ProtocolError> {
        Ok(Self::Create {
            channel: token(channel)?,
            username: token(username)?,
            color,
        })
    }

    /// Room name.
    pub fn channel(&self) -> &str {
        match self {
            RoomRequest::Join { channel, .. } | RoomRequest::Create { channel, .. } => channel,
        }
    }
}

/// Outbound command.
///
/// `Display` produces the exact wire text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/join <channel> <username>`
    Join {
        /// Room name.
        channel: String,
        /// Player name.
        username: String,
    },
    /// `/makeRoom <channel> <username> [<color>]`
    MakeRoom {
        /// Room name.
        channel: String,
        /// Player name.
        username: String,
        /// Requested color.
        color: Option<Color>,
    },
    /// `/move <color> <x> <y>`
    Move {
        /// Color placing the disc.
        color: Color,
        /// Target cell.
        pos: Pos,
    },
    /// `/listRooms`
    ListRooms,
    /// `/standByList`
    StandByList,
}

impl From<RoomRequest> for Command {
    fn from(request: RoomRequest) -> Self {
        match request {
            RoomRequest::Join { channel, username } => Command::Join { channel, username },
            RoomRequest::Create {
                channel,
                username,
                color,
            } => Command::MakeRoom {
                channel,
                username,
                color,
            },
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Join { channel, username } => write!(f, "/join {} {}", channel, username),
            Command::MakeRoom {
                channel,
                username,
                color: None,
            } => write!(f, "/makeRoom {} {}", channel, username),
            Command::MakeRoom {
                channel,
                username,
                color: Some(color),
            } => write!(f, "/makeRoom {} {} {}", channel, username, color),
            Command::Move { color, pos } => write!(f, "/move {} {} {}", color, pos.x(), pos.y()),
            Command::ListRooms => write!(f, "/listRooms"),
            Command::StandByList => write!(f, "/standByList"),
        }
    }
}

// ─────────────────────────────────────────────────────────────
//  Inbound
// ─────────────────────────────────────────────────────────────

/// An authoritative board state plus the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    /// Full grid. Never contains `Available`.
    pub board: Board,
    /// Side to move.
    pub turn: Color,
}

/// A player listed in a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomPlayer {
    /// Display name.
    pub name: String,
    /// Color, once assigned.
    pub color: Option<Color>,
}

/// One room in a room listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSummary {
    /// Room name.
    pub name: String,
    /// Players present (zero to two).
    pub players: Vec<RoomPlayer>,
}

impl RoomSummary {
    /// True when a second player can still join.
    pub fn is_open(&self) -> bool {
        self.players.len() < 2
    }
}

/// Decoded inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Game begins; carries the local player's color.
    GameStart(Color),
    /// Board update after a move.
    Game(Snapshot),
    /// Final board and winner (`None` on a draw).
    GameOver {
        /// Final board.
        snapshot: Snapshot,
        /// Winning color.
        winner: Option<Color>,
    },
    /// Answer to `/listRooms`.
    RoomList(Vec<RoomSummary>),
    /// Plain-text acknowledgement or complaint from the server.
    Notice(String),
    /// A kind the server defines but the client has no use for.
    Ignored(String),
}

#[derive(Debug, Deserialize)]
struct WireGame {
    board: Vec<String>,
    turn: Color,
}

impl TryFrom<WireGame> for Snapshot {
    type Error = ProtocolError;

    fn try_from(wire: WireGame) -> Result<Self, Self::Error> {
        let cells = wire
            .board
            .iter()
            .map(|raw| {
                // Hints are recomputed locally; the server's are discarded.
                Cell::parse(raw).map(|cell| match cell {
                    Cell::Available => Cell::Empty,
                    other => other,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let mut board = Board::empty();
        board.apply_snapshot_slice(&cells)?;
        Ok(Snapshot {
            board,
            turn: wire.turn,
        })
    }
}

#[derive(Debug, Deserialize)]
struct WirePlayer {
    name: String,
    #[serde(default)]
    color: Option<Color>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireRoom {
    player1: Option<WirePlayer>,
    player2: Option<WirePlayer>,
    #[serde(rename = "standByPlayer")]
    stand_by_player: Option<String>,
    black: Option<bool>,
    white: Option<bool>,
}

impl WireRoom {
    fn into_summary(self, name: String) -> RoomSummary {
        let mut players: Vec<RoomPlayer> = [self.player1, self.player2]
            .into_iter()
            .flatten()
            .map(|p| RoomPlayer {
                name: p.name,
                color: p.color,
            })
            .collect();
        if let Some(waiting) = self.stand_by_player {
            let color = match (self.black, self.white) {
                (Some(true), _) => Some(Color::Black),
                (_, Some(true)) => Some(Color::White),
                _ => None,
            };
            players.push(RoomPlayer {
                name: waiting,
                color,
            });
        }
        RoomSummary { name, players }
    }
}

fn decode_room_list(value: Value) -> Result<Vec<RoomSummary>, ProtocolError> {
    let rooms = match value {
        Value::Array(_) => serde_json::from_value::<Vec<(String, WireRoom)>>(value)?,
        other => serde_json::from_value::<BTreeMap<String, WireRoom>>(other)?
            .into_iter()
            .collect(),
    };
    Ok(rooms
        .into_iter()
        .map(|(name, room)| room.into_summary(name))
        .collect())
}

/// Strips the `{"<Kind>": payload}` envelope some servers wrap bodies in.
fn unwrap_body(kind: &str, body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.len() == 1 && map.contains_key(kind) => {
            map.remove(kind).unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn body_for<T: serde::de::DeserializeOwned>(kind: &str, body: Value) -> Result<T, ProtocolError> {
    if body.is_null() {
        return Err(ProtocolError::MissingBody(kind.to_string()));
    }
    Ok(serde_json::from_value(body)?)
}

/// Decodes one inbound text frame.
///
/// # Errors
///
/// Returns [`ProtocolError::UnknownKind`] for kinds the server never sends
/// and [`ProtocolError::Json`] / [`ProtocolError::Board`] for payloads of
/// the wrong shape. Frames that are not JSON at all decode as
/// [`ServerMessage::Notice`].
#[instrument(level = "debug", skip(frame), fields(len = frame.len()))]
pub fn decode(frame: &str) -> Result<ServerMessage, ProtocolError> {
    let trimmed = frame.trim();
    if !trimmed.starts_with('{') && !trimmed.starts_with('[') {
        trace!(notice = %trimmed, "Plain-text frame");
        return Ok(ServerMessage::Notice(trimmed.to_string()));
    }

    let value: Value = serde_json::from_str(trimmed)?;
    let (kind, body) = match value {
        Value::Object(mut object) => match object.remove("kind") {
            Some(Value::String(kind)) => {
                let body = object.remove("body").unwrap_or(Value::Null);
                (kind, body)
            }
            Some(other) => return Err(ProtocolError::UnknownKind(other.to_string())),
            None => {
                debug!("Object without kind, decoding as room map");
                return Ok(ServerMessage::RoomList(decode_room_list(Value::Object(
                    object,
                ))?));
            }
        },
        other => {
            debug!("Bare array, decoding as room list");
            return Ok(ServerMessage::RoomList(decode_room_list(other)?));
        }
    };
    let body = unwrap_body(&kind, body);

    match kind.as_str() {
        "GameStart" => Ok(ServerMessage::GameStart(body_for(&kind, body)?)),
        "Game" => {
            let wire: WireGame = body_for(&kind, body)?;
            Ok(ServerMessage::Game(wire.try_into()?))
        }
        "GameOver" => {
            let (wire, winner): (WireGame, Option<Color>) = body_for(&kind, body)?;
            Ok(ServerMessage::GameOver {
                snapshot: wire.try_into()?,
                winner,
            })
        }
        "RoomList" | "Rooms" => Ok(ServerMessage::RoomList(decode_room_list(body)?)),
        "Turn" | "Move" | "ReversiError" => Ok(ServerMessage::Ignored(kind)),
        _ => Err(ProtocolError::UnknownKind(kind)),
    }
}
