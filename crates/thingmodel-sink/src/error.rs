//! Error types for sink notification and delivery.

/// Errors raised by a [`Sink`](crate::Sink) or its writer task.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The bounded notification queue is full; the notification was dropped.
    #[error("sink {0:?} queue is full")]
    QueueFull(String),

    /// The writer task has stopped; the notification was dropped.
    #[error("sink {0:?} is closed")]
    Closed(String),

    /// The frame could not be encoded.
    #[error("failed to encode sink frame: {0}")]
    Encode(#[from] serde_json::Error),

    /// The WebSocket connection could not be established or used.
    #[error("sink connection error: {0}")]
    Connection(#[from] tokio_tungstenite::tungstenite::Error),

    /// Connecting took longer than the connect timeout.
    #[error("timed out connecting to {0}")]
    ConnectTimeout(String),
}
