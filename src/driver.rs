//! Single-task event loop joining transport events and user intents.
//!
//! The controller is touched by exactly one task: this one. The UI sends
//! [`Intent`]s in and watches [`crate::SessionView`]s come out.

use crate::protocol::RoomRequest;
use crate::session::SessionController;
use crate::transport::{Connector, TransportEvent};
use reversi_board::Pos;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// Something the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Connect and join or create a room.
    Connect(RoomRequest),
    /// Place a disc.
    Move(Pos),
    /// Ask for the room list.
    ListRooms,
    /// Ask for the stand-by list.
    StandByList,
    /// Close the connection, keep the loop running.
    Disconnect,
    /// Close the connection and stop the loop.
    Quit,
}

/// Owns a [`SessionController`] and feeds it until told to quit.
#[derive(Debug)]
pub struct SessionDriver<C: Connector> {
    controller: SessionController<C>,
    events: mpsc::UnboundedReceiver<TransportEvent>,
    intents: mpsc::UnboundedReceiver<Intent>,
}

impl<C: Connector> SessionDriver<C> {
    /// Creates a driver.
    pub fn new(
        controller: SessionController<C>,
        events: mpsc::UnboundedReceiver<TransportEvent>,
        intents: mpsc::UnboundedReceiver<Intent>,
    ) -> Self {
        Self {
            controller,
            events,
            intents,
        }
    }

    /// Runs until [`Intent::Quit`] arrives or every intent sender is
    /// dropped, then disconnects and hands the controller back.
    #[instrument(skip(self))]
    pub async fn run(mut self) -> SessionController<C> {
        info!("Session loop started");
        loop {
            tokio::select! {
                Some(event) = self.events.recv() => self.controller.handle_event(event),
                intent = self.intents.recv() => match intent {
                    Some(Intent::Quit) | None => break,
                    Some(intent) => self.dispatch(intent),
                },
            }
        }
        self.controller.disconnect();
        info!("Session loop stopped");
        self.controller
    }

    fn dispatch(&mut self, intent: Intent) {
        debug!(?intent, "Handling intent");
        match intent {
            Intent::Connect(request) => {
                if let Err(err) = self.controller.connect(request) {
                    warn!(error = %err, "Connect failed");
                }
            }
            Intent::Move(pos) => {
                if let Err(rejection) = self.controller.attempt_move(pos) {
                    debug!(%rejection, "Move not sent");
                }
            }
            Intent::ListRooms => {
                if let Err(err) = self.controller.request_rooms() {
                    debug!(error = %err, "Room list not requested");
                }
            }
            Intent::StandByList => {
                if let Err(err) = self.controller.request_stand_by_list() {
                    debug!(error = %err, "Stand-by list not requested");
                }
            }
            Intent::Disconnect => self.controller.disconnect(),
            Intent::Quit => {}
        }
    }
}
