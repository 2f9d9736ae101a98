//! Errors raised by the relay and the relay client.

/// Transport-level failures. Game rule rejections are
/// [`EngineError`](crate::core::EngineError)s and never travel over the wire.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("invalid message: {0}")]
    Json(#[from] serde_json::Error),

    /// Not connected, or reconnect attempts are exhausted. The text is shown
    /// to players verbatim.
    #[error("Connection lost. Please refresh the page.")]
    ConnectionLost,
}
