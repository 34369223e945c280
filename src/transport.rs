//! The single full-duplex text connection to the server.
//!
//! A [`Connector`] opens connections; a [`Connection`] is the handle the
//! session controller owns and writes through. Opening is fire-and-forget:
//! `connect` returns a handle immediately and the outcome arrives later as
//! a [`TransportEvent`] (`Opened`, or `Closed` with a reason). Every event is
//! stamped with the [`ConnectionId`] it belongs to so events from an
//! abandoned connection can be told apart.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, instrument, trace, warn};
use url::Url;

/// Path of the WebSocket endpoint on the server origin.
pub const WS_PATH: &str = "/ws/";

/// Identifies one connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
#[display("#{}", _0)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wraps a raw id.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The id after this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// What happened on a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEventKind {
    /// The connection is up and can carry frames.
    Opened,
    /// A text frame arrived.
    Frame(String),
    /// The connection is gone; `reason` is set when it failed rather than
    /// closed cleanly.
    Closed {
        /// Failure description.
        reason: Option<String>,
    },
}

/// A transport event stamped with its connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEvent {
    /// Connection the event belongs to.
    pub connection: ConnectionId,
    /// The event.
    pub kind: TransportEventKind,
}

impl TransportEvent {
    /// Creates an event.
    pub fn new(connection: ConnectionId, kind: TransportEventKind) -> Self {
        Self { connection, kind }
    }
}

/// Transport failure.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum TransportError {
    /// The server origin could not be turned into a WebSocket endpoint.
    #[display("Invalid endpoint {:?}: {}", url, reason)]
    InvalidEndpoint {
        /// The rejected URL.
        url: String,
        /// Why.
        reason: String,
    },

    /// No tokio runtime to drive the connection.
    #[display("No async runtime available to drive the connection")]
    NoRuntime,

    /// Tried to send without a connection.
    #[display("Not connected")]
    NotConnected,

    /// The connection's I/O task has already finished.
    #[display("Connection {} is closed", _0)]
    Closed(ConnectionId),
}

impl std::error::Error for TransportError {}

/// An open (or opening) connection.
pub trait Connection: std::fmt::Debug {
    /// This connection's id.
    fn id(&self) -> ConnectionId;

    /// Queues a text frame for sending.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] once the connection is gone.
    fn send(&mut self, frame: String) -> Result<(), TransportError>;

    /// Starts closing the connection. Idempotent.
    fn close(&mut self);
}

/// Opens connections.
pub trait Connector {
    /// Handle type produced.
    type Conn: Connection;

    /// Starts opening a connection to `endpoint`.
    ///
    /// # Errors
    ///
    /// Fails only when the attempt cannot even be started. Refused or
    /// dropped connections are reported later as
    /// [`TransportEventKind::Closed`].
    fn connect(&mut self, id: ConnectionId, endpoint: &Url) -> Result<Self::Conn, TransportError>;
}

/// Derives the WebSocket endpoint from a server origin.
///
/// The scheme is upgraded from the origin's own (`https` becomes `wss`,
/// `http` becomes `ws`) and the path is replaced with [`WS_PATH`].
#[instrument]
pub fn endpoint_from_origin(origin: &str) -> Result<Url, TransportError> {
    let invalid = |reason: String| TransportError::InvalidEndpoint {
        url: origin.to_string(),
        reason,
    };

    let origin_url = Url::parse(origin).map_err(|e| invalid(e.to_string()))?;
    let scheme = match origin_url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(invalid(format!("unsupported scheme {:?}", other))),
    };

    let mut endpoint = origin_url
        .join(WS_PATH)
        .map_err(|e| invalid(e.to_string()))?;
    endpoint
        .set_scheme(scheme)
        .map_err(|()| invalid(format!("cannot switch to {}", scheme)))?;
    debug!(%endpoint, "Derived WebSocket endpoint");
    Ok(endpoint)
}

#[derive(Debug)]
enum Outbound {
    Frame(String),
    Close,
}

/// Opens WebSocket connections with `tokio-tungstenite`.
///
/// Each connection runs in its own task; all of them report into the one
/// event channel handed to [`WsConnector::new`].
#[derive(Debug, Clone)]
pub struct WsConnector {
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl WsConnector {
    /// Creates a connector reporting into `events`.
    pub fn new(events: mpsc::UnboundedSender<TransportEvent>) -> Self {
        Self { events }
    }

    /// Creates a connector together with its event receiver.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl Connector for WsConnector {
    type Conn = WsConnection;

    #[instrument(skip(self), fields(endpoint = %endpoint))]
    fn connect(
        &mut self,
        id: ConnectionId,
        endpoint: &Url,
    ) -> Result<WsConnection, TransportError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| TransportError::NoRuntime)?;
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        runtime.spawn(run_connection(
            id,
            endpoint.clone(),
            outbound_rx,
            self.events.clone(),
        ));
        info!(connection = %id, "Connecting");
        Ok(WsConnection {
            id,
            outbound: outbound_tx,
        })
    }
}

/// Handle to a WebSocket connection task.
///
/// Dropping the handle closes the connection.
#[derive(Debug)]
pub struct WsConnection {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl Connection for WsConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn send(&mut self, frame: String) -> Result<(), TransportError> {
        self.outbound
            .send(Outbound::Frame(frame))
            .map_err(|_| TransportError::Closed(self.id))
    }

    fn close(&mut self) {
        // The task may already be gone; nothing left to close then.
        let _ = self.outbound.send(Outbound::Close);
    }
}

#[instrument(skip(outbound, events), fields(connection = %id, endpoint = %endpoint))]
async fn run_connection(
    id: ConnectionId,
    endpoint: Url,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let emit = |kind: TransportEventKind| {
        if events.send(TransportEvent::new(id, kind)).is_err() {
            debug!("Event receiver dropped");
        }
    };

    let stream = match tokio_tungstenite::connect_async(endpoint.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(err) => {
            warn!(error = %err, "Connection failed");
            emit(TransportEventKind::Closed {
                reason: Some(err.to_string()),
            });
            return;
        }
    };
    info!("Connected");
    emit(TransportEventKind::Opened);

    let (mut write, mut read) = stream.split();
    let reason = loop {
        tokio::select! {
            out = outbound.recv() => match out {
                Some(Outbound::Frame(text)) => {
                    trace!(frame = %text, "Sending frame");
                    if let Err(err) = write.send(Message::Text(text.into())).await {
                        break Some(err.to_string());
                    }
                }
                Some(Outbound::Close) | None => {
                    debug!("Closing on request");
                    if let Err(err) = write.close().await {
                        debug!(error = %err, "Close handshake failed");
                    }
                    break None;
                }
            },
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    trace!(frame = %text.as_str(), "Received frame");
                    emit(TransportEventKind::Frame(text.as_str().to_owned()));
                }
                Some(Ok(Message::Binary(bytes))) => {
                    warn!(len = bytes.len(), "Ignoring unexpected binary frame");
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "Server closed the connection");
                    break None;
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => break Some(err.to_string()),
                None => break None,
            },
        }
    };

    match &reason {
        Some(reason) => warn!(%reason, "Connection lost"),
        None => info!("Disconnected"),
    }
    emit(TransportEventKind::Closed { reason });
}
