//! WebSocket transport tests against a local server.

use futures_util::{SinkExt, StreamExt};
use reversi_client::{
    Color, Connection, ConnectionId, Connector, ServerMessage, TransportEvent, TransportEventKind,
    WsConnector, decode, endpoint_from_origin, list_rooms,
};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

const WAIT: Duration = Duration::from_secs(5);

async fn next_event(events: &mut mpsc::UnboundedReceiver<TransportEvent>) -> TransportEvent {
    tokio::time::timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for a transport event")
        .expect("event channel closed")
}

async fn local_endpoint(listener: &TcpListener) -> Url {
    let addr = listener.local_addr().unwrap();
    endpoint_from_origin(&format!("http://{}", addr)).unwrap()
}

/// Accepts one client, records the first frame, replies with `reply` and
/// waits for the client to close.
fn serve_once(listener: TcpListener, reply: &'static str) -> tokio::task::JoinHandle<String> {
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let first = ws.next().await.unwrap().unwrap();
        let first = first.into_text().unwrap().as_str().to_owned();
        ws.send(Message::Text(reply.into())).await.unwrap();
        while let Some(Ok(msg)) = ws.next().await {
            if msg.is_close() {
                break;
            }
        }
        first
    })
}

#[tokio::test]
async fn connector_exchanges_frames() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = local_endpoint(&listener).await;
    let server = serve_once(listener, r#"{"kind":"GameStart","body":"White"}"#);

    let (mut connector, mut events) = WsConnector::channel();
    let id = ConnectionId::new(7);
    let mut connection = connector.connect(id, &endpoint).unwrap();

    let opened = next_event(&mut events).await;
    assert_eq!(opened, TransportEvent::new(id, TransportEventKind::Opened));

    connection.send("/join room1 alice".to_string()).unwrap();
    let event = next_event(&mut events).await;
    assert_eq!(event.connection, id);
    let TransportEventKind::Frame(text) = event.kind else {
        panic!("expected a frame, got {:?}", event.kind);
    };
    assert_eq!(decode(&text).unwrap(), ServerMessage::GameStart(Color::White));

    connection.close();
    let closed = next_event(&mut events).await;
    assert_eq!(
        closed,
        TransportEvent::new(id, TransportEventKind::Closed { reason: None })
    );

    let received = tokio::time::timeout(WAIT, server).await.unwrap().unwrap();
    assert_eq!(received, "/join room1 alice");
}

#[tokio::test]
async fn refused_connection_reports_closed_with_reason() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = local_endpoint(&listener).await;
    drop(listener);

    let (mut connector, mut events) = WsConnector::channel();
    let id = ConnectionId::new(1);
    let _connection = connector.connect(id, &endpoint).unwrap();

    let event = next_event(&mut events).await;
    assert_eq!(event.connection, id);
    assert!(matches!(
        event.kind,
        TransportEventKind::Closed { reason: Some(_) }
    ));
}

#[tokio::test]
async fn list_rooms_reads_the_first_room_list() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = local_endpoint(&listener).await;
    let server = serve_once(
        listener,
        concat!(
            r#"[["lobby",{"player1":{"name":"bob","color":"Black"}}],"#,
            r#"["duel",{"player1":{"name":"a"},"player2":{"name":"b"}}]]"#,
        ),
    );

    let rooms = list_rooms(&endpoint, WAIT).await.unwrap();
    assert_eq!(rooms.len(), 2);
    assert_eq!(rooms[0].name, "lobby");
    assert_eq!(rooms[0].players[0].color, Some(Color::Black));
    assert!(rooms[0].is_open());
    assert!(!rooms[1].is_open());

    let received = tokio::time::timeout(WAIT, server).await.unwrap().unwrap();
    assert_eq!(received, "/listRooms");
}

#[cfg(feature = "tls")]
#[tokio::test]
async fn secure_origin_attempts_a_tls_handshake() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let endpoint = endpoint_from_origin(&format!("https://{}", addr)).unwrap();
    assert_eq!(endpoint.scheme(), "wss");

    // Plain TCP peer: the handshake must be attempted and then fail.
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        drop(stream);
    });

    let (mut connector, mut events) = WsConnector::channel();
    let _connection = connector.connect(ConnectionId::new(1), &endpoint).unwrap();

    let event = next_event(&mut events).await;
    let TransportEventKind::Closed { reason: Some(reason) } = event.kind else {
        panic!("expected a failed connection, got {:?}", event.kind);
    };
    assert!(
        !reason.contains("TLS support not compiled in"),
        "unexpected reason: {}",
        reason
    );
    tokio::time::timeout(WAIT, server).await.unwrap().unwrap();
}
