//! One-shot room listing, outside any game session.

use crate::protocol::{self, Command, RoomSummary, ServerMessage};
use crate::transport::{
    Connection, ConnectionId, Connector, TransportEvent, TransportEventKind, WsConnection,
    WsConnector,
};
use anyhow::{Context, Result, bail};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, instrument};
use url::Url;

/// Connects to `endpoint`, sends `/listRooms` and returns the first room
/// list received.
///
/// Gives up after `wait` without a list, or if the server closes first.
#[instrument(skip(wait), fields(endpoint = %endpoint))]
pub async fn list_rooms(endpoint: &Url, wait: Duration) -> Result<Vec<RoomSummary>> {
    let (mut connector, mut events) = WsConnector::channel();
    let mut connection = connector.connect(ConnectionId::new(1), endpoint)?;

    let rooms = timeout(wait, wait_for_rooms(&mut connection, &mut events))
        .await
        .with_context(|| format!("No room list within {:?}", wait))??;

    connection.close();
    info!(count = rooms.len(), "Rooms listed");
    Ok(rooms)
}

async fn wait_for_rooms(
    connection: &mut WsConnection,
    events: &mut mpsc::UnboundedReceiver<TransportEvent>,
) -> Result<Vec<RoomSummary>> {
    while let Some(event) = events.recv().await {
        match event.kind {
            TransportEventKind::Opened => {
                connection.send(Command::ListRooms.to_string())?;
            }
            TransportEventKind::Frame(frame) => match protocol::decode(&frame) {
                Ok(ServerMessage::RoomList(rooms)) => return Ok(rooms),
                Ok(other) => debug!(message = ?other, "Skipping while waiting for rooms"),
                Err(err) => debug!(error = %err, "Skipping undecodable frame"),
            },
            TransportEventKind::Closed { reason } => {
                bail!(
                    "Server closed the connection: {}",
                    reason.as_deref().unwrap_or("no reason given")
                );
            }
        }
    }
    bail!("Transport event channel closed")
}
