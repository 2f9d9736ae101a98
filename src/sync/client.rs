//! Relay client with automatic reconnect.
//!
//! [`RelayClient::connect`] opens the socket, sends `join`, and hands back
//! a receiver of [`ClientEvent`]s. A background task owns the socket. When
//! the connection drops it retries after `base_delay × attempt`, re-sending
//! `join` on every fresh connection, and gives up after `max_attempts`.
//! A successful reconnect resets the attempt counter.
//!
//! Dropping the outbox (via [`RelayClient::disconnect`]) stops the task at
//! any point, including mid-backoff and mid-handshake.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::error::SyncError;
use super::protocol::{ClientMessage, ServerMessage};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Backoff schedule for reconnecting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
            max_attempts: 5,
        }
    }
}

impl ReconnectPolicy {
    #[must_use]
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Delay before reconnect attempt `attempt` (1-based), or `None` once
    /// attempts are exhausted.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }
        Some(self.base_delay * attempt)
    }
}

/// What the client observed.
#[derive(Clone, Debug, PartialEq)]
pub enum ClientEvent {
    /// Socket open and `join` sent.
    Connected,
    Message(ServerMessage),
    Disconnected,
    Reconnecting { attempt: u32, delay: Duration },
    /// Terminal: attempts exhausted. Carries the text to show the player.
    Failed(String),
}

/// Handle to a relay connection.
pub struct RelayClient {
    outbox: mpsc::UnboundedSender<ClientMessage>,
    connected: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl RelayClient {
    /// Connect to `url` and join `room`.
    ///
    /// Fails if the first connection cannot be established; later drops are
    /// handled by the reconnect loop.
    pub async fn connect(
        url: &str,
        room: &str,
        password: &str,
        name: &str,
        policy: ReconnectPolicy,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ClientEvent>), SyncError> {
        let (ws, _) = connect_async(url).await?;
        info!(url, room, "connected to relay");

        let join = ClientMessage::Join {
            room: room.to_owned(),
            password: password.to_owned(),
            name: name.to_owned(),
        };
        let (outbox, outbox_rx) = mpsc::unbounded_channel();
        let (events, events_rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(true));

        let task = tokio::spawn(run(
            url.to_owned(),
            join,
            policy,
            ws,
            outbox_rx,
            events,
            Arc::clone(&connected),
        ));

        Ok((
            Self {
                outbox,
                connected,
                task,
            },
            events_rx,
        ))
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Queue a message. Fails with [`SyncError::ConnectionLost`] while the
    /// socket is down.
    pub fn send(&self, message: ClientMessage) -> Result<(), SyncError> {
        if !self.is_connected() {
            warn!("send while disconnected");
            return Err(SyncError::ConnectionLost);
        }
        self.outbox.send(message).map_err(|_| SyncError::ConnectionLost)
    }

    /// Push a full state snapshot to the room.
    pub fn push_state(&self, state: Value) -> Result<(), SyncError> {
        self.send(ClientMessage::Update { state })
    }

    /// Close the socket and stop reconnecting. Returns promptly even while
    /// a reconnect is pending; no further events are emitted.
    pub async fn disconnect(self) {
        drop(self.outbox);
        let _ = self.task.await;
    }
}

enum PumpExit {
    /// The owning handle was dropped.
    Shutdown,
    Lost,
}

async fn run(
    url: String,
    join: ClientMessage,
    policy: ReconnectPolicy,
    first: WsStream,
    mut outbox: mpsc::UnboundedReceiver<ClientMessage>,
    events: mpsc::UnboundedSender<ClientEvent>,
    connected: Arc<AtomicBool>,
) {
    let mut socket = Some(first);
    let mut attempt = 0;

    loop {
        if let Some(ws) = socket.take() {
            connected.store(true, Ordering::Release);
            attempt = 0;
            let _ = events.send(ClientEvent::Connected);

            let exit = pump(ws, &join, &mut outbox, &events).await;
            connected.store(false, Ordering::Release);
            if let PumpExit::Shutdown = exit {
                debug!("relay client shut down");
                return;
            }
            let _ = events.send(ClientEvent::Disconnected);
        }

        attempt += 1;
        let Some(delay) = policy.delay_for(attempt) else {
            warn!(attempts = policy.max_attempts, "giving up on relay");
            let _ = events.send(ClientEvent::Failed(SyncError::ConnectionLost.to_string()));
            return;
        };
        info!(attempt, max = policy.max_attempts, ?delay, "reconnecting");
        let _ = events.send(ClientEvent::Reconnecting { attempt, delay });
        if until_shutdown(tokio::time::sleep(delay), &mut outbox).await.is_none() {
            debug!("relay client shut down during backoff");
            return;
        }

        match until_shutdown(connect_async(url.as_str()), &mut outbox).await {
            None => {
                debug!("relay client shut down while reconnecting");
                return;
            }
            Some(Ok((ws, _))) => socket = Some(ws),
            Some(Err(err)) => warn!(attempt, error = %err, "reconnect failed"),
        }
    }
}

/// Drive `fut` to completion unless the owning handle goes away first, in
/// which case `None` is returned. Messages queued while offline are dropped.
async fn until_shutdown<F: Future>(
    fut: F,
    outbox: &mut mpsc::UnboundedReceiver<ClientMessage>,
) -> Option<F::Output> {
    tokio::pin!(fut);
    loop {
        tokio::select! {
            output = &mut fut => return Some(output),
            queued = outbox.recv() => match queued {
                Some(_) => debug!("dropped message queued while disconnected"),
                None => return None,
            },
        }
    }
}

async fn pump(
    ws: WsStream,
    join: &ClientMessage,
    outbox: &mut mpsc::UnboundedReceiver<ClientMessage>,
    events: &mpsc::UnboundedSender<ClientEvent>,
) -> PumpExit {
    let (mut sink, mut source) = ws.split();

    match join.to_json() {
        Ok(text) => {
            if sink.send(Message::Text(text)).await.is_err() {
                return PumpExit::Lost;
            }
        }
        Err(err) => warn!(error = %err, "failed to encode join"),
    }

    loop {
        tokio::select! {
            frame = source.next() => match frame {
                Some(Ok(Message::Text(text))) => match ServerMessage::parse(&text) {
                    Some(message) => {
                        let _ = events.send(ClientEvent::Message(message));
                    }
                    None => warn!("failed to parse relay message"),
                },
                Some(Ok(Message::Ping(data))) => {
                    let _ = sink.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return PumpExit::Lost,
                Some(Ok(_)) => {}
            },
            outgoing = outbox.recv() => match outgoing {
                Some(message) => {
                    let text = match message.to_json() {
                        Ok(text) => text,
                        Err(err) => {
                            warn!(error = %err, "failed to encode message");
                            continue;
                        }
                    };
                    if sink.send(Message::Text(text)).await.is_err() {
                        return PumpExit::Lost;
                    }
                }
                None => {
                    let _ = sink.close().await;
                    return PumpExit::Shutdown;
                }
            },
        }
    }
}
