//! Session controller tests over an in-memory connection.

use reversi_client::{
    Board, Cell, Color, Connection, ConnectionId, Connector, Intent, MoveRejection, Outcome, Phase,
    Pos, RoomRequest, SessionController, SessionDriver, TransportError, TransportEvent,
    TransportEventKind,
};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use url::Url;

#[derive(Debug, Clone, Default)]
struct Wire {
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<Mutex<Vec<ConnectionId>>>,
}

impl Wire {
    fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    fn closed(&self) -> Vec<ConnectionId> {
        self.closed.lock().unwrap().clone()
    }
}

#[derive(Debug)]
struct FakeConnection {
    id: ConnectionId,
    wire: Wire,
    open: bool,
}

impl Connection for FakeConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn send(&mut self, frame: String) -> Result<(), TransportError> {
        if !self.open {
            return Err(TransportError::Closed(self.id));
        }
        self.wire.sent.lock().unwrap().push(frame);
        Ok(())
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.wire.closed.lock().unwrap().push(self.id);
        }
    }
}

#[derive(Debug, Default)]
struct FakeConnector {
    wire: Wire,
    refuse: bool,
}

impl Connector for FakeConnector {
    type Conn = FakeConnection;

    fn connect(
        &mut self,
        id: ConnectionId,
        _endpoint: &Url,
    ) -> Result<FakeConnection, TransportError> {
        if self.refuse {
            return Err(TransportError::NoRuntime);
        }
        Ok(FakeConnection {
            id,
            wire: self.wire.clone(),
            open: true,
        })
    }
}

fn endpoint() -> Url {
    Url::parse("ws://127.0.0.1:8080/ws/").unwrap()
}

fn controller() -> (SessionController<FakeConnector>, Wire) {
    let connector = FakeConnector::default();
    let wire = connector.wire.clone();
    (SessionController::new(connector, endpoint()), wire)
}

fn pos(x: usize, y: usize) -> Pos {
    Pos::new(x, y).unwrap()
}

fn frame(id: ConnectionId, value: Value) -> TransportEvent {
    TransportEvent::new(id, TransportEventKind::Frame(value.to_string()))
}

fn opened(id: ConnectionId) -> TransportEvent {
    TransportEvent::new(id, TransportEventKind::Opened)
}

fn wire_board(black: &[(usize, usize)], white: &[(usize, usize)]) -> Value {
    let mut cells = vec!["empty"; 64];
    for &(x, y) in black {
        cells[y * 8 + x] = "black";
    }
    for &(x, y) in white {
        cells[y * 8 + x] = "white";
    }
    json!(cells)
}

/// Board after Black opens at (2,3).
fn after_first_move() -> Value {
    wire_board(&[(2, 3), (3, 3), (4, 3), (3, 4)], &[(4, 4)])
}

fn game_over(board: Value, turn: &str, winner: Value) -> Value {
    json!({"kind": "GameOver", "body": [{"board": board, "turn": turn}, winner]})
}

/// Connects, opens and starts a game as `color`.
fn playing_as(color: Color) -> (SessionController<FakeConnector>, Wire, ConnectionId) {
    let (mut controller, wire) = controller();
    let id = controller
        .connect(RoomRequest::join("room1", "alice").unwrap())
        .unwrap();
    controller.handle_event(opened(id));
    controller.handle_event(frame(id, json!({"kind": "GameStart", "body": color.to_string()})));
    (controller, wire, id)
}

#[test]
fn full_game_flow() {
    let (mut controller, wire) = controller();
    assert_eq!(controller.phase(), Phase::Disconnected);

    let id = controller
        .connect(RoomRequest::join("room1", "alice").unwrap())
        .unwrap();
    assert_eq!(controller.phase(), Phase::Connecting);
    assert!(wire.sent().is_empty(), "nothing is sent before the socket opens");

    controller.handle_event(opened(id));
    assert_eq!(controller.phase(), Phase::AwaitingAssignment);
    assert_eq!(wire.sent(), vec!["/join room1 alice"]);

    controller.handle_event(frame(id, json!({"kind": "GameStart", "body": "Black"})));
    let view = controller.view();
    assert_eq!(view.phase, Phase::Playing);
    assert_eq!(view.own_color, Some(Color::Black));
    assert_eq!(view.turn, Some(Color::Black));
    assert!(view.is_my_turn());
    assert_eq!(view.board, Board::opening());

    controller.attempt_move(pos(2, 3)).unwrap();
    assert_eq!(wire.sent().last().unwrap(), "/move Black 2 3");
    assert_eq!(
        controller.view().board,
        Board::opening(),
        "board waits for the server's snapshot"
    );

    controller.handle_event(frame(
        id,
        json!({"kind": "Game", "body": {"board": after_first_move(), "turn": "white"}}),
    ));
    let view = controller.view();
    assert_eq!(view.turn, Some(Color::White));
    assert_eq!(view.board.get(pos(3, 3)), Cell::Black);
    assert!(!view.is_my_turn());
    assert_eq!(view.board.count().black, 4);
    assert_eq!(view.board.count().white, 1);
    for hint in view.board.legal_moves(Color::White) {
        assert_eq!(view.board.get(hint), Cell::Available);
    }

    let sent_before = wire.sent().len();
    assert_eq!(
        controller.attempt_move(pos(2, 2)),
        Err(MoveRejection::NotYourTurn)
    );
    assert_eq!(wire.sent().len(), sent_before);

    controller.handle_event(frame(id, game_over(after_first_move(), "white", json!("White"))));
    let view = controller.view();
    assert_eq!(view.phase, Phase::GameOver);
    assert_eq!(view.outcome, Some(Outcome::Won(Color::White)));
    assert_eq!(view.board.count().available, 0);
}

#[test]
fn rejected_moves_send_nothing_and_change_nothing() {
    let (mut controller, wire) = controller();
    assert_eq!(
        controller.attempt_move(pos(2, 3)),
        Err(MoveRejection::NotConnected)
    );

    let id = controller
        .connect(RoomRequest::join("room1", "alice").unwrap())
        .unwrap();
    controller.handle_event(opened(id));
    assert_eq!(
        controller.attempt_move(pos(2, 3)),
        Err(MoveRejection::NotPlaying(Phase::AwaitingAssignment))
    );

    controller.handle_event(frame(id, json!({"kind": "GameStart", "body": "Black"})));
    let before = controller.view().clone();
    let sent_before = wire.sent();

    assert_eq!(
        controller.attempt_move(pos(3, 3)),
        Err(MoveRejection::Occupied(pos(3, 3)))
    );
    assert_eq!(
        controller.attempt_move(pos(0, 0)),
        Err(MoveRejection::Illegal(pos(0, 0)))
    );

    assert_eq!(controller.view(), &before);
    assert_eq!(wire.sent(), sent_before);
}

#[test]
fn white_waits_for_black() {
    let (mut controller, wire, _) = playing_as(Color::White);
    assert_eq!(controller.view().own_color, Some(Color::White));
    assert_eq!(controller.view().turn, Some(Color::Black));
    assert_eq!(
        controller.attempt_move(pos(4, 2)),
        Err(MoveRejection::NotYourTurn)
    );
    assert_eq!(wire.sent(), vec!["/join room1 alice"]);
}

#[test]
fn moves_after_game_over_are_rejected() {
    let (mut controller, wire, id) = playing_as(Color::Black);
    controller.handle_event(frame(id, game_over(after_first_move(), "black", json!(null))));
    assert_eq!(controller.view().outcome, Some(Outcome::Draw));

    // (5,5) brackets (4,4) against (3,3), so only the phase stops it.
    let target = pos(5, 5);
    assert!(controller.view().board.is_legal_move(target, Color::Black));
    let sent_before = wire.sent();
    assert_eq!(
        controller.attempt_move(target),
        Err(MoveRejection::NotPlaying(Phase::GameOver))
    );
    assert_eq!(wire.sent(), sent_before);
}

#[test]
fn game_start_after_game_over_is_ignored() {
    let (mut controller, wire, id) = playing_as(Color::Black);
    controller.handle_event(frame(id, game_over(after_first_move(), "black", json!("Black"))));
    let finished = controller.view().clone();

    controller.handle_event(frame(id, json!({"kind": "GameStart", "body": "Black"})));
    assert_eq!(controller.view(), &finished);
    assert_eq!(controller.phase(), Phase::GameOver);
    assert_eq!(controller.view().outcome, Some(Outcome::Won(Color::Black)));

    let sent_before = wire.sent();
    assert_eq!(
        controller.attempt_move(pos(5, 5)),
        Err(MoveRejection::NotPlaying(Phase::GameOver))
    );
    assert_eq!(wire.sent(), sent_before);
}

#[test]
fn game_start_mid_game_keeps_board_and_color() {
    let (mut controller, _wire, id) = playing_as(Color::Black);
    controller.handle_event(frame(
        id,
        json!({"kind": "Game", "body": {"board": after_first_move(), "turn": "white"}}),
    ));
    let mid_game = controller.view().clone();

    controller.handle_event(frame(id, json!({"kind": "GameStart", "body": "White"})));
    let view = controller.view();
    assert_eq!(view, &mid_game);
    assert_eq!(view.own_color, Some(Color::Black));
    assert_eq!(view.turn, Some(Color::White));
    assert_eq!(view.board.count().occupied(), 5);
}

#[test]
fn blocked_side_must_pass() {
    let (mut controller, _wire, id) = playing_as(Color::Black);
    assert!(!controller.view().must_pass());

    let blocked = wire_board(&[(0, 0)], &[(7, 7)]);
    controller.handle_event(frame(
        id,
        json!({"kind": "Game", "body": {"board": blocked, "turn": "black"}}),
    ));
    let view = controller.view();
    assert!(view.is_my_turn());
    assert!(view.must_pass());
    assert_eq!(view.board.count().available, 0);
}

#[test]
fn game_start_before_assignment_is_ignored() {
    let (mut controller, _wire) = controller();
    let id = controller
        .connect(RoomRequest::join("room1", "alice").unwrap())
        .unwrap();
    controller.handle_event(frame(id, json!({"kind": "GameStart", "body": "Black"})));
    assert_eq!(controller.phase(), Phase::Connecting);
    assert_eq!(controller.view().own_color, None);
}

#[test]
fn events_from_replaced_connection_are_ignored() {
    let (mut controller, wire) = controller();
    let first = controller
        .connect(RoomRequest::join("room1", "alice").unwrap())
        .unwrap();
    let second = controller
        .connect(RoomRequest::create("room2", "alice", Some(Color::White)).unwrap())
        .unwrap();
    assert_ne!(first, second);
    assert_eq!(wire.closed(), vec![first]);
    assert_eq!(controller.view().room.as_deref(), Some("room2"));

    controller.handle_event(opened(first));
    assert_eq!(controller.phase(), Phase::Connecting);
    controller.handle_event(TransportEvent::new(
        first,
        TransportEventKind::Closed { reason: None },
    ));
    assert_eq!(controller.phase(), Phase::Connecting);

    controller.handle_event(opened(second));
    assert_eq!(controller.phase(), Phase::AwaitingAssignment);
    assert_eq!(wire.sent(), vec!["/makeRoom room2 alice White"]);
}

#[test]
fn close_resets_to_disconnected() {
    let (mut controller, _wire, id) = playing_as(Color::Black);
    controller.handle_event(frame(id, json!([["lobby", {"player1": {"name": "bob"}}]])));
    assert_eq!(controller.view().rooms.len(), 1);

    controller.handle_event(TransportEvent::new(
        id,
        TransportEventKind::Closed {
            reason: Some("connection reset".to_string()),
        },
    ));
    let view = controller.view();
    assert_eq!(view.phase, Phase::Disconnected);
    assert_eq!(view.own_color, None);
    assert_eq!(view.turn, None);
    assert_eq!(view.room, None);
    assert_eq!(view.last_error.as_deref(), Some("connection reset"));
    assert_eq!(view.rooms.len(), 1, "room list survives a reset");
    assert!(!controller.is_connected());
    assert_eq!(
        controller.attempt_move(pos(2, 3)),
        Err(MoveRejection::NotConnected)
    );
}

#[test]
fn board_updates_outside_a_game_are_ignored() {
    let (mut controller, _wire) = controller();
    let id = controller
        .connect(RoomRequest::join("room1", "alice").unwrap())
        .unwrap();
    controller.handle_event(opened(id));
    controller.handle_event(frame(
        id,
        json!({"kind": "Game", "body": {"board": after_first_move(), "turn": "white"}}),
    ));
    assert_eq!(controller.phase(), Phase::AwaitingAssignment);
    assert_eq!(controller.view().board, Board::opening());
}

#[test]
fn notices_and_bad_frames() {
    let (mut controller, _wire, id) = playing_as(Color::Black);
    let before = controller.view().board;

    controller.handle_event(TransportEvent::new(
        id,
        TransportEventKind::Frame("!!! room is full".to_string()),
    ));
    assert_eq!(controller.view().notice.as_deref(), Some("!!! room is full"));

    controller.handle_event(TransportEvent::new(
        id,
        TransportEventKind::Frame("{not json".to_string()),
    ));
    controller.handle_event(frame(id, json!({"kind": "Mystery", "body": 1})));
    controller.handle_event(frame(id, json!({"kind": "Turn", "body": "White"})));
    assert_eq!(controller.phase(), Phase::Playing);
    assert_eq!(controller.view().turn, Some(Color::Black));
    assert_eq!(controller.view().board, before);
}

#[test]
fn refused_connect_records_error() {
    let connector = FakeConnector {
        refuse: true,
        ..FakeConnector::default()
    };
    let mut controller = SessionController::new(connector, endpoint());
    let result = controller.connect(RoomRequest::join("room1", "alice").unwrap());
    assert_eq!(result, Err(TransportError::NoRuntime));
    assert_eq!(controller.phase(), Phase::Disconnected);
    assert!(controller.view().last_error.is_some());
}

#[test]
fn subscribers_see_every_published_view() {
    let (mut controller, _wire) = controller();
    let mut views = controller.subscribe();
    assert_eq!(views.borrow_and_update().phase, Phase::Disconnected);

    let id = controller
        .connect(RoomRequest::join("room1", "alice").unwrap())
        .unwrap();
    assert!(views.has_changed().unwrap());
    assert_eq!(views.borrow_and_update().phase, Phase::Connecting);

    controller.handle_event(opened(id));
    assert_eq!(views.borrow_and_update().phase, Phase::AwaitingAssignment);
}

#[tokio::test]
async fn driver_feeds_intents_and_events() {
    let connector = FakeConnector::default();
    let wire = connector.wire.clone();
    let controller = SessionController::new(connector, endpoint());
    let mut views = controller.subscribe();

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (intents, intent_rx) = mpsc::unbounded_channel();
    let driver = tokio::spawn(SessionDriver::new(controller, events_rx, intent_rx).run());

    let wait = Duration::from_secs(5);

    intents
        .send(Intent::Connect(RoomRequest::join("room1", "alice").unwrap()))
        .unwrap();
    tokio::time::timeout(wait, views.changed()).await.unwrap().unwrap();
    assert_eq!(views.borrow_and_update().phase, Phase::Connecting);

    let id = ConnectionId::new(1);
    events_tx.send(opened(id)).unwrap();
    tokio::time::timeout(wait, views.changed()).await.unwrap().unwrap();
    assert_eq!(views.borrow_and_update().phase, Phase::AwaitingAssignment);

    events_tx
        .send(frame(id, json!({"kind": "GameStart", "body": "Black"})))
        .unwrap();
    tokio::time::timeout(wait, views.changed()).await.unwrap().unwrap();
    assert!(views.borrow_and_update().is_my_turn());

    intents.send(Intent::Move(pos(5, 4))).unwrap();
    intents.send(Intent::Quit).unwrap();
    let controller = tokio::time::timeout(wait, driver).await.unwrap().unwrap();

    assert_eq!(controller.phase(), Phase::Disconnected);
    assert_eq!(wire.sent(), vec!["/join room1 alice", "/move Black 5 4"]);
    assert_eq!(wire.closed(), vec![id]);
}
