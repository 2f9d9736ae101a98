//! Relay integration tests over real sockets.
//!
//! Each test binds the relay to an ephemeral localhost port and talks to it
//! with plain WebSocket connections or [`RelayClient`].

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use flowboard::rules::GameEngine;
use flowboard::sync::{
    self, ClientEvent, ClientMessage, ReconnectPolicy, RelayClient, ServerMessage, SyncError,
};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

async fn start_relay() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(sync::serve(listener));
    addr
}

async fn open(addr: SocketAddr) -> Socket {
    let (ws, _) = connect_async(format!("ws://{addr}")).await.unwrap();
    ws
}

async fn send(ws: &mut Socket, message: &ClientMessage) {
    ws.send(Message::Text(message.to_json().unwrap())).await.unwrap();
}

async fn recv(ws: &mut Socket) -> ServerMessage {
    loop {
        let frame = timeout(WAIT, ws.next()).await.unwrap().unwrap().unwrap();
        if let Message::Text(text) = frame {
            return ServerMessage::parse(&text).unwrap();
        }
    }
}

fn join(room: &str, password: &str, name: &str) -> ClientMessage {
    ClientMessage::Join {
        room: room.into(),
        password: password.into(),
        name: name.into(),
    }
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<ClientEvent>) -> ClientEvent {
    timeout(WAIT, events.recv()).await.unwrap().unwrap()
}

// =============================================================================
// Join Protocol
// =============================================================================

/// Test the join scenario: creator, wrong password, late joiner.
#[tokio::test]
async fn test_join_protocol() {
    let addr = start_relay().await;

    let mut a = open(addr).await;
    send(&mut a, &join("r1", "p", "A")).await;
    assert_eq!(recv(&mut a).await, ServerMessage::Joined { state: Value::Null });
    assert_eq!(recv(&mut a).await, ServerMessage::Players { count: 1 });

    let snapshot = json!({"round": 4, "session": 1});
    send(&mut a, &ClientMessage::Update { state: snapshot.clone() }).await;
    assert_eq!(recv(&mut a).await, ServerMessage::State { state: snapshot.clone() });

    let mut b = open(addr).await;
    send(&mut b, &join("r1", "wrong", "B")).await;
    assert_eq!(
        recv(&mut b).await,
        ServerMessage::Error { message: "Wrong password".into() }
    );

    let mut c = open(addr).await;
    send(&mut c, &join("r1", "p", "C")).await;
    assert_eq!(recv(&mut c).await, ServerMessage::Joined { state: snapshot });
    // B was never admitted, so the room holds A and C
    assert_eq!(recv(&mut c).await, ServerMessage::Players { count: 2 });
    assert_eq!(recv(&mut a).await, ServerMessage::Players { count: 2 });
}

/// Test that updates fan out to everyone in the room and nowhere else.
#[tokio::test]
async fn test_update_broadcast_scoped_to_room() {
    let addr = start_relay().await;

    let mut a = open(addr).await;
    send(&mut a, &join("alpha", "x", "A")).await;
    recv(&mut a).await;
    recv(&mut a).await;

    let mut b = open(addr).await;
    send(&mut b, &join("alpha", "x", "B")).await;
    recv(&mut b).await;
    recv(&mut b).await;
    assert_eq!(recv(&mut a).await, ServerMessage::Players { count: 2 });

    let mut other = open(addr).await;
    send(&mut other, &join("beta", "y", "O")).await;
    recv(&mut other).await;
    recv(&mut other).await;

    let snapshot = json!({"round": 2});
    send(&mut b, &ClientMessage::Update { state: snapshot.clone() }).await;

    assert_eq!(recv(&mut a).await, ServerMessage::State { state: snapshot.clone() });
    assert_eq!(recv(&mut b).await, ServerMessage::State { state: snapshot });
    assert!(timeout(Duration::from_millis(200), other.next()).await.is_err());
}

/// Test that malformed frames are dropped and the connection survives.
#[tokio::test]
async fn test_malformed_message_dropped() {
    let addr = start_relay().await;
    let mut a = open(addr).await;

    a.send(Message::Text("{not json".into())).await.unwrap();
    send(&mut a, &ClientMessage::Update { state: json!({"ignored": true}) }).await;
    send(&mut a, &join("r1", "p", "A")).await;

    assert_eq!(recv(&mut a).await, ServerMessage::Joined { state: Value::Null });
}

/// Test that a disconnect lowers the count for the remaining members.
#[tokio::test]
async fn test_disconnect_updates_count() {
    let addr = start_relay().await;

    let mut a = open(addr).await;
    send(&mut a, &join("r1", "p", "A")).await;
    recv(&mut a).await;
    recv(&mut a).await;

    let mut b = open(addr).await;
    send(&mut b, &join("r1", "p", "B")).await;
    recv(&mut b).await;
    recv(&mut b).await;
    assert_eq!(recv(&mut a).await, ServerMessage::Players { count: 2 });

    b.close(None).await.unwrap();

    assert_eq!(recv(&mut a).await, ServerMessage::Players { count: 1 });
}

/// Test the plain HTTP status page.
#[tokio::test]
async fn test_http_status_page() {
    let addr = start_relay().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    timeout(WAIT, stream.read_to_string(&mut response))
        .await
        .unwrap()
        .unwrap();

    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert!(response.ends_with(sync::STATUS_BANNER));
}

/// Test that a handshake with a long head split over two writes still
/// upgrades.
#[tokio::test]
async fn test_split_handshake_with_large_head() {
    let addr = start_relay().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    let cookie = "c".repeat(4000);
    let first = format!("GET / HTTP/1.1\r\nHost: localhost\r\nCookie: session={cookie}\r\n");
    stream.write_all(first.as_bytes()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    stream
        .write_all(
            b"Connection: Upgrade\r\nUpgrade: websocket\r\nSec-WebSocket-Version: 13\r\nSec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\r\n",
        )
        .await
        .unwrap();

    let mut response = vec![0u8; 1024];
    let n = timeout(WAIT, stream.read(&mut response)).await.unwrap().unwrap();
    let response = String::from_utf8_lossy(&response[..n]);

    assert!(response.starts_with("HTTP/1.1 101"), "{response}");
}

// =============================================================================
// Relay Client
// =============================================================================

/// Test two engines staying in step through the relay.
#[tokio::test]
async fn test_engines_sync_through_client() {
    let addr = start_relay().await;
    let url = format!("ws://{addr}");
    let policy = ReconnectPolicy::default();

    let (host, mut host_events) = RelayClient::connect(&url, "game", "pw", "Host", policy)
        .await
        .unwrap();
    assert_eq!(next_event(&mut host_events).await, ClientEvent::Connected);
    assert_eq!(
        next_event(&mut host_events).await,
        ClientEvent::Message(ServerMessage::Joined { state: Value::Null })
    );
    next_event(&mut host_events).await;

    let mut engine = GameEngine::with_seed(1);
    engine.add_player("Host");
    engine.add_player("Guest");
    engine.start_game();
    engine.next_round();
    host.push_state(engine.sync_snapshot().unwrap()).unwrap();
    let ClientEvent::Message(ServerMessage::State { .. }) = next_event(&mut host_events).await else {
        panic!("expected the state echo");
    };

    let (guest, mut guest_events) = RelayClient::connect(&url, "game", "pw", "Guest", policy)
        .await
        .unwrap();
    assert_eq!(next_event(&mut guest_events).await, ClientEvent::Connected);
    let ClientEvent::Message(ServerMessage::Joined { state }) = next_event(&mut guest_events).await
    else {
        panic!("expected joined");
    };

    let mut mirror = GameEngine::with_seed(2);
    assert!(mirror.apply_remote(state).unwrap());
    assert_eq!(mirror.state().round, 2);
    assert_eq!(mirror.state().players, engine.state().players);
    assert!(mirror.state().is_game_started);

    guest.disconnect().await;
    host.disconnect().await;
}

/// Test that the client reconnects, gives up, and then refuses to send.
#[tokio::test]
async fn test_client_gives_up_after_retries() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        drop(listener);
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let first = ws.next().await.unwrap().unwrap();
        ws.close(None).await.unwrap();
        first
    });

    let policy = ReconnectPolicy::default()
        .with_base_delay(Duration::from_millis(10))
        .with_max_attempts(2);
    let (client, mut events) = RelayClient::connect(&format!("ws://{addr}"), "r1", "p", "A", policy)
        .await
        .unwrap();

    let first = server.await.unwrap();
    let Message::Text(text) = first else {
        panic!("expected a text frame");
    };
    let sent: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(sent["type"], "join");
    assert_eq!(sent["room"], "r1");

    assert_eq!(next_event(&mut events).await, ClientEvent::Connected);
    assert_eq!(next_event(&mut events).await, ClientEvent::Disconnected);
    assert_eq!(
        next_event(&mut events).await,
        ClientEvent::Reconnecting { attempt: 1, delay: Duration::from_millis(10) }
    );
    assert_eq!(
        next_event(&mut events).await,
        ClientEvent::Reconnecting { attempt: 2, delay: Duration::from_millis(20) }
    );
    assert_eq!(
        next_event(&mut events).await,
        ClientEvent::Failed("Connection lost. Please refresh the page.".into())
    );

    assert!(!client.is_connected());
    assert!(matches!(
        client.push_state(json!({})),
        Err(SyncError::ConnectionLost)
    ));
}

/// Test that disconnecting during backoff returns at once and stops the
/// reconnect loop without a terminal failure.
#[tokio::test]
async fn test_disconnect_cancels_backoff() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.next().await.unwrap().unwrap();
        ws.close(None).await.unwrap();
        // Count any connection attempted after the first one
        timeout(Duration::from_millis(500), listener.accept()).await.is_ok()
    });

    let policy = ReconnectPolicy::default()
        .with_base_delay(Duration::from_secs(30))
        .with_max_attempts(5);
    let (client, mut events) = RelayClient::connect(&format!("ws://{addr}"), "r1", "p", "A", policy)
        .await
        .unwrap();

    assert_eq!(next_event(&mut events).await, ClientEvent::Connected);
    assert_eq!(next_event(&mut events).await, ClientEvent::Disconnected);
    assert_eq!(
        next_event(&mut events).await,
        ClientEvent::Reconnecting { attempt: 1, delay: Duration::from_secs(30) }
    );

    timeout(Duration::from_secs(1), client.disconnect())
        .await
        .expect("disconnect should not wait out the backoff");

    assert_eq!(timeout(WAIT, events.recv()).await.unwrap(), None);
    assert!(!server.await.unwrap(), "no reconnect after disconnect");
}
