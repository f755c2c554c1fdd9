//! Downstream notification for registered things.
//!
//! A [`Sink`] is told about every thing the adapter registers. Notifying must
//! never block the caller: [`SinkHandle`] enqueues into a bounded queue and
//! drops (and counts) notifications once the queue is full.
//!
//! [`WebSocketSink`] drains that queue from a single writer task that owns a
//! persistent WebSocket connection to the configured endpoint. Each
//! notification becomes one JSON text frame:
//!
//! ```json
//! {"type": "thing_registered", "sender": "TweeterAdapter", "thing": {"id": "tweet:42", ...}}
//! ```

mod error;
mod frame;
mod handle;
mod websocket;

use std::sync::Arc;

use thingmodel_schema::Thing;

pub use error::SinkError;
pub use frame::OutgoingFrame;
pub use handle::{SinkHandle, SinkStats, SinkStatsSnapshot};
pub use websocket::WebSocketSink;

/// A named consumer notified after each registration.
pub trait Sink: Send + Sync {
    /// Name this sink identifies itself with downstream.
    fn name(&self) -> &str;

    /// Hands `thing` to the sink without blocking.
    ///
    /// # Errors
    ///
    /// [`SinkError::QueueFull`] or [`SinkError::Closed`] when the notification
    /// was dropped.
    fn notify(&self, thing: &Arc<Thing>) -> Result<(), SinkError>;
}
