//! Session controller.
//!
//! Owns the connection, turns inbound server messages into board and state
//! updates, and decides whether a local move attempt may be sent. The board
//! mirror only ever changes when the server says so: a move is sent and the
//! resulting position arrives later as a snapshot.
//!
//! Observers never poke the controller. They hold a
//! [`watch::Receiver<SessionView>`] from [`SessionController::subscribe`]
//! and get a fresh immutable view after every change.

use crate::protocol::{self, Command, RoomRequest, RoomSummary, ServerMessage, Snapshot};
use crate::transport::{
    Connection, ConnectionId, Connector, TransportError, TransportEvent, TransportEventKind,
};
use reversi_board::{Board, Color, Pos};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum Phase {
    /// No connection.
    Disconnected,
    /// Connection requested, not yet open.
    Connecting,
    /// Join/create sent, waiting for a color.
    AwaitingAssignment,
    /// Game running; whose turn it is lives in [`SessionView::turn`].
    Playing,
    /// Game finished; see [`SessionView::outcome`].
    GameOver,
}

/// How a finished game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum Outcome {
    /// One side has more discs.
    #[display("{} wins", _0)]
    Won(Color),
    /// Equal disc count.
    #[display("Draw")]
    Draw,
}

impl From<Option<Color>> for Outcome {
    fn from(winner: Option<Color>) -> Self {
        winner.map_or(Outcome::Draw, Outcome::Won)
    }
}

/// Why a move attempt was not sent.
///
/// Purely informational: a rejected attempt changes nothing.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum MoveRejection {
    /// No connection.
    #[display("Not connected")]
    NotConnected,
    /// Not in a running game.
    #[display("No game in progress ({})", _0)]
    NotPlaying(Phase),
    /// The other side is to move.
    #[display("Not your turn")]
    NotYourTurn,
    /// The target already holds a disc.
    #[display("{} is occupied", _0)]
    Occupied(Pos),
    /// No disc would be flipped.
    #[display("{} is not a legal move", _0)]
    Illegal(Pos),
    /// The connection refused the frame.
    #[display("Could not send move: {}", _0)]
    Transport(TransportError),
}

/// Everything the presentation layer needs, as one immutable value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    /// Lifecycle phase.
    pub phase: Phase,
    /// Local board mirror, with `Available` hints for the side to move.
    pub board: Board,
    /// Side to move, once known.
    pub turn: Option<Color>,
    /// Color assigned to the local player.
    pub own_color: Option<Color>,
    /// Result of a finished game.
    pub outcome: Option<Outcome>,
    /// Room joined or created.
    pub room: Option<String>,
    /// Most recent room listing.
    pub rooms: Vec<RoomSummary>,
    /// Last plain-text notice from the server.
    pub notice: Option<String>,
    /// Last transport failure.
    pub last_error: Option<String>,
}

impl Default for SessionView {
    fn default() -> Self {
        Self {
            phase: Phase::Disconnected,
            board: Board::opening(),
            turn: None,
            own_color: None,
            outcome: None,
            room: None,
            rooms: Vec::new(),
            notice: None,
            last_error: None,
        }
    }
}

impl SessionView {
    /// True while playing and the local color is the side to move.
    pub fn is_my_turn(&self) -> bool {
        self.phase == Phase::Playing && self.turn.is_some() && self.turn == self.own_color
    }

    /// True on the local player's turn when no destination is legal; the
    /// server decides the pass.
    pub fn must_pass(&self) -> bool {
        match self.own_color {
            Some(own) if self.is_my_turn() => !self.board.has_legal_move(own),
            _ => false,
        }
    }

    /// Checks a move against this view and returns the color that would
    /// play it.
    ///
    /// Connection presence is approximated by the phase; the controller
    /// checks the real handle.
    ///
    /// # Errors
    ///
    /// The first unmet condition, in order: connected, playing, own turn,
    /// vacant target, legal target.
    pub fn check_move(&self, pos: Pos) -> Result<Color, MoveRejection> {
        match self.phase {
            Phase::Playing => {}
            Phase::Disconnected => return Err(MoveRejection::NotConnected),
            other => return Err(MoveRejection::NotPlaying(other)),
        }
        let color = match (self.turn, self.own_color) {
            (Some(turn), Some(own)) if turn == own => own,
            _ => return Err(MoveRejection::NotYourTurn),
        };
        if !self.board.get(pos).is_vacant() {
            return Err(MoveRejection::Occupied(pos));
        }
        if !self.board.is_legal_move(pos, color) {
            return Err(MoveRejection::Illegal(pos));
        }
        Ok(color)
    }
}

/// Drives one game session over one connection at a time.
///
/// All methods are synchronous and never block: connecting and sending
/// are fire-and-forget, and their outcomes come back through
/// [`SessionController::handle_event`].
#[derive(Debug)]
pub struct SessionController<C: Connector> {
    connector: C,
    endpoint: Url,
    connection: Option<C::Conn>,
    last_id: ConnectionId,
    pending: Option<Command>,
    view: SessionView,
    publisher: watch::Sender<SessionView>,
}

impl<C: Connector> SessionController<C> {
    /// Creates a disconnected controller for the server at `endpoint`.
    #[instrument(skip(connector), fields(endpoint = %endpoint))]
    pub fn new(connector: C, endpoint: Url) -> Self {
        let view = SessionView::default();
        let (publisher, _) = watch::channel(view.clone());
        Self {
            connector,
            endpoint,
            connection: None,
            last_id: ConnectionId::new(0),
            pending: None,
            view,
            publisher,
        }
    }

    /// Subscribes to view updates.
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.publisher.subscribe()
    }

    /// Current view.
    pub fn view(&self) -> &SessionView {
        &self.view
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.view.phase
    }

    /// Whether a connection handle is held.
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Id of the current connection, if any.
    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.connection.as_ref().map(Connection::id)
    }

    /// Opens a connection and queues `request` to be sent once it is up.
    ///
    /// Any existing connection is closed first.
    ///
    /// # Errors
    ///
    /// When the attempt cannot be started the session stays
    /// `Disconnected`, the error is recorded in the view and returned.
    #[instrument(skip(self), fields(room = %request.channel()))]
    pub fn connect(&mut self, request: RoomRequest) -> Result<ConnectionId, TransportError> {
        if self.connection.is_some() {
            debug!("Replacing existing connection");
            self.disconnect();
        }

        let id = self.last_id.next();
        self.last_id = id;

        let connection = match self.connector.connect(id, &self.endpoint) {
            Ok(connection) => connection,
            Err(err) => {
                warn!(error = %err, "Could not start connection");
                self.view.last_error = Some(err.to_string());
                self.publish();
                return Err(err);
            }
        };

        info!(connection = %id, "Connecting");
        self.connection = Some(connection);
        self.view.room = Some(request.channel().to_string());
        self.view.last_error = None;
        self.pending = Some(request.into());
        self.view.phase = Phase::Connecting;
        self.publish();
        Ok(id)
    }

    /// Closes the connection, if any, and resets to `Disconnected`.
    #[instrument(skip(self))]
    pub fn disconnect(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            info!(connection = %connection.id(), "Disconnecting");
            connection.close();
        }
        self.reset(None);
    }

    /// Attempts a move for the local player.
    ///
    /// The move is sent only if connected, playing, the local color is to
    /// move and the target is legal. Nothing else changes either way: the
    /// board waits for the server's snapshot.
    ///
    /// # Errors
    ///
    /// The reason the move was not sent.
    #[instrument(skip(self), fields(pos = %pos))]
    pub fn attempt_move(&mut self, pos: Pos) -> Result<(), MoveRejection> {
        if self.connection.is_none() {
            debug!("Move rejected: not connected");
            return Err(MoveRejection::NotConnected);
        }
        let color = self.view.check_move(pos).inspect_err(|rejection| {
            debug!(%rejection, "Move rejected");
        })?;

        info!(%color, "Sending move");
        self.send(Command::Move { color, pos })
            .map_err(MoveRejection::Transport)
    }

    /// Asks the server for its room list.
    ///
    /// # Errors
    ///
    /// [`TransportError::NotConnected`] without a connection.
    pub fn request_rooms(&mut self) -> Result<(), TransportError> {
        self.send(Command::ListRooms)
    }

    /// Asks the server for its stand-by list.
    ///
    /// # Errors
    ///
    /// [`TransportError::NotConnected`] without a connection.
    pub fn request_stand_by_list(&mut self) -> Result<(), TransportError> {
        self.send(Command::StandByList)
    }

    /// Feeds one transport event into the state machine.
    ///
    /// Events from any connection other than the current one are dropped.
    #[instrument(skip(self, event), fields(connection = %event.connection))]
    pub fn handle_event(&mut self, event: TransportEvent) {
        if self.connection_id() != Some(event.connection) {
            debug!(kind = ?event.kind, "Ignoring event from stale connection");
            return;
        }

        match event.kind {
            TransportEventKind::Opened => self.on_open(),
            TransportEventKind::Frame(frame) => match protocol::decode(&frame) {
                Ok(message) => self.apply(message),
                Err(err) => warn!(error = %err, %frame, "Ignoring undecodable frame"),
            },
            TransportEventKind::Closed { reason } => {
                info!(?reason, "Connection closed");
                self.connection = None;
                self.reset(reason);
            }
        }
    }

    fn on_open(&mut self) {
        if self.view.phase != Phase::Connecting {
            warn!(phase = %self.view.phase, "Open event outside Connecting");
            return;
        }
        if let Some(command) = self.pending.take() {
            info!(%command, "Connected, sending queued command");
            if let Err(err) = self.send(command) {
                // The matching Closed event resets the session.
                warn!(error = %err, "Queued command not sent");
            }
        }
        self.view.phase = Phase::AwaitingAssignment;
        self.publish();
    }

    fn apply(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::GameStart(color) => {
                if self.view.phase != Phase::AwaitingAssignment {
                    warn!(phase = %self.view.phase, %color, "Ignoring unexpected game start");
                    return;
                }
                self.start_game(color);
            }
            ServerMessage::Game(snapshot) => {
                if self.view.phase != Phase::Playing {
                    warn!(phase = %self.view.phase, "Ignoring board update outside a game");
                    return;
                }
                self.apply_snapshot(snapshot);
                debug!(turn = %snapshot.turn, "Board updated");
            }
            ServerMessage::GameOver { snapshot, winner } => {
                if self.view.phase != Phase::Playing {
                    warn!(phase = %self.view.phase, "Ignoring game over outside a game");
                    return;
                }
                self.apply_snapshot(snapshot);
                self.view.board.clear_available();
                let outcome = Outcome::from(winner);
                info!(%outcome, "Game over");
                self.view.outcome = Some(outcome);
                self.view.phase = Phase::GameOver;
            }
            ServerMessage::RoomList(rooms) => {
                debug!(count = rooms.len(), "Room list received");
                self.view.rooms = rooms;
            }
            ServerMessage::Notice(text) => {
                if text.starts_with("!!!") {
                    warn!(notice = %text, "Server complaint");
                } else {
                    debug!(notice = %text, "Server notice");
                }
                self.view.notice = Some(text);
            }
            ServerMessage::Ignored(kind) => {
                debug!(%kind, "Ignoring unused message kind");
                return;
            }
        }
        self.publish();
    }

    fn start_game(&mut self, color: Color) {
        info!(%color, "Game started");
        self.view.own_color = Some(color);
        self.view.turn = Some(Color::Black);
        self.view.board = Board::opening();
        self.view.outcome = None;
        self.view.phase = Phase::Playing;
    }

    fn apply_snapshot(&mut self, snapshot: Snapshot) {
        let before = self.view.board.count().occupied();
        let after = snapshot.board.count().occupied();
        if after < before {
            warn!(before, after, "Snapshot has fewer discs than the mirror");
        }
        self.view.board.apply_snapshot(*snapshot.board.cells());
        self.view.board.mark_available(snapshot.turn);
        self.view.turn = Some(snapshot.turn);
    }

    fn reset(&mut self, error: Option<String>) {
        self.pending = None;
        self.view = SessionView {
            rooms: std::mem::take(&mut self.view.rooms),
            last_error: error,
            ..SessionView::default()
        };
        self.publish();
    }

    fn send(&mut self, command: Command) -> Result<(), TransportError> {
        let connection = self
            .connection
            .as_mut()
            .ok_or(TransportError::NotConnected)?;
        connection.send(command.to_string())
    }

    fn publish(&self) {
        self.publisher.send_replace(self.view.clone());
    }
}
