//! The room relay server.
//!
//! One TCP listener serves both WebSocket clients and plain HTTP. For each
//! incoming connection we peek at the request head (waiting for the blank
//! line that ends it, up to [`MAX_HEAD`] bytes): an `Upgrade: websocket`
//! header gets the relay protocol, anything else gets a one-line status
//! page.
//!
//! A failed `accept` is logged and retried. Room state lives as long as the
//! process, so the listener loop never gives up on its own.
//!
//! ## Per-connection tasks
//!
//! Each socket has a reader loop feeding [`RoomRegistry`] and a writer
//! task draining an unbounded outbox, so a slow client never blocks the
//! registry. The registry and the outbox table sit behind one mutex, which
//! keeps every broadcast in processing order.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use rustc_hash::FxHashMap;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::error::SyncError;
use super::protocol::{ClientMessage, ServerMessage};
use super::room::{ConnectionId, Delivery, RoomRegistry};

/// Body served to plain HTTP `GET /`.
pub const STATUS_BANNER: &str = "Agile Game Server is running!";

pub const DEFAULT_PORT: u16 = 8080;

/// Largest request head inspected when routing a connection.
pub const MAX_HEAD: usize = 16 * 1024;

/// How long a client may take to send its request head.
const HEAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Listener settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayConfig {
    pub bind_addr: String,
    pub port: u16,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_owned(),
            port: DEFAULT_PORT,
        }
    }
}

impl RelayConfig {
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

#[derive(Default)]
struct HubInner {
    rooms: RoomRegistry,
    outboxes: FxHashMap<ConnectionId, mpsc::UnboundedSender<ServerMessage>>,
}

impl HubInner {
    fn dispatch(&self, deliveries: Vec<Delivery>) {
        for Delivery { to, message } in deliveries {
            if let Some(outbox) = self.outboxes.get(&to) {
                // A closed outbox means the writer already exited; the reader
                // will unregister shortly.
                let _ = outbox.send(message);
            }
        }
    }
}

/// Shared relay state.
#[derive(Default)]
struct Hub {
    inner: Mutex<HubInner>,
    next_id: AtomicU64,
}

impl Hub {
    async fn register(&self, outbox: mpsc::UnboundedSender<ServerMessage>) -> ConnectionId {
        let conn = ConnectionId::new(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.inner.lock().await.outboxes.insert(conn, outbox);
        conn
    }

    async fn handle(&self, conn: ConnectionId, message: ClientMessage) {
        let mut inner = self.inner.lock().await;
        let deliveries = inner.rooms.handle(conn, message);
        inner.dispatch(deliveries);
    }

    async fn unregister(&self, conn: ConnectionId) {
        let mut inner = self.inner.lock().await;
        let deliveries = inner.rooms.leave(conn);
        inner.outboxes.remove(&conn);
        inner.dispatch(deliveries);
    }
}

/// Bind according to `config` and serve forever. Only binding can fail.
pub async fn run(config: RelayConfig) -> Result<(), SyncError> {
    let listener = TcpListener::bind(config.addr()).await?;
    info!(addr = %listener.local_addr()?, "relay listening");
    serve(listener).await;
    Ok(())
}

/// Serve connections from an already bound listener. Never returns.
pub async fn serve(listener: TcpListener) {
    let hub = Arc::new(Hub::default());
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                let pause = accept_backoff(&err);
                warn!(error = %err, ?pause, "accept failed");
                tokio::time::sleep(pause).await;
                continue;
            }
        };
        let hub = Arc::clone(&hub);
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, peer, hub).await {
                warn!(%peer, error = %err, "connection error");
            }
        });
    }
}

/// Pause before accepting again. Errors tied to one aborted handshake are
/// retried at once; anything else (typically running out of descriptors)
/// gives in-flight connections a moment to close.
fn accept_backoff(err: &io::Error) -> Duration {
    match err.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::Interrupted => Duration::ZERO,
        _ => Duration::from_millis(100),
    }
}

/// Peek until the request head is complete, the peer stops sending, or
/// [`MAX_HEAD`] bytes are buffered.
async fn peek_head(stream: &TcpStream) -> io::Result<String> {
    let mut buf = vec![0u8; MAX_HEAD];
    let mut seen = 0;
    loop {
        let n = stream.peek(&mut buf).await?;
        let complete = n == 0 || n == buf.len() || buf[..n].windows(4).any(|w| w == b"\r\n\r\n");
        if complete {
            return Ok(String::from_utf8_lossy(&buf[..n]).into_owned());
        }
        if n == seen {
            // peek returns at once while old bytes are buffered
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        seen = n;
    }
}

fn is_websocket_upgrade(head: &str) -> bool {
    head.lines().any(|line| {
        let lower = line.to_ascii_lowercase();
        lower.starts_with("upgrade:") && lower.contains("websocket")
    })
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, hub: Arc<Hub>) -> Result<(), SyncError> {
    let Ok(head) = tokio::time::timeout(HEAD_TIMEOUT, peek_head(&stream)).await else {
        debug!(%peer, "request head timed out");
        return Ok(());
    };
    let is_websocket = is_websocket_upgrade(&head?);

    if is_websocket {
        handle_ws(stream, peer, hub).await
    } else {
        handle_http(stream, peer).await
    }
}

async fn handle_ws(stream: TcpStream, peer: SocketAddr, hub: Arc<Hub>) -> Result<(), SyncError> {
    let ws = tokio_tungstenite::accept_async(stream).await?;
    let (mut sink, mut source) = ws.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let conn = hub.register(tx).await;
    info!(%peer, %conn, "client connected");

    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let text = match message.to_json() {
                Ok(text) => text,
                Err(err) => {
                    warn!(error = %err, "failed to encode message");
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(frame) = source.next().await {
        match frame {
            Ok(Message::Text(text)) => match ClientMessage::parse(&text) {
                Some(message) => hub.handle(conn, message).await,
                None => warn!(%conn, "dropped malformed message"),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                debug!(%conn, error = %err, "read failed");
                break;
            }
        }
    }

    hub.unregister(conn).await;
    let _ = writer.await;
    info!(%peer, %conn, "client disconnected");
    Ok(())
}

fn http_response(status: u16, status_text: &str, body: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 {status} {status_text}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\nAccess-Control-Allow-Origin: *\r\n\r\n{body}",
        body.len()
    )
    .into_bytes()
}

async fn handle_http(mut stream: TcpStream, peer: SocketAddr) -> Result<(), SyncError> {
    let mut buf = vec![0u8; 8192];
    let n = stream.read(&mut buf).await?;
    let request = String::from_utf8_lossy(&buf[..n]);

    let mut parts = request.lines().next().unwrap_or("").split_whitespace();
    let method = parts.next().unwrap_or("");
    let path = parts.next().unwrap_or("");
    debug!(%peer, method, path, "http request");

    let response = match (method, path) {
        ("GET", "/") => http_response(200, "OK", STATUS_BANNER),
        ("OPTIONS", _) => b"HTTP/1.1 204 No Content\r\nAccess-Control-Allow-Origin: *\r\nAccess-Control-Allow-Methods: GET, OPTIONS\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_vec(),
        _ => http_response(404, "Not Found", "Not Found"),
    };
    stream.write_all(&response).await?;
    stream.shutdown().await?;
    Ok(())
}
