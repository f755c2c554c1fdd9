use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use thingmodel_schema::Thing;
use tokio::sync::mpsc;

use crate::error::SinkError;
use crate::Sink;

/// Delivery counters shared by every handle of one sink and its writer.
#[derive(Debug, Default)]
pub struct SinkStats {
    dropped: AtomicU64,
    delivered: AtomicU64,
    undelivered: AtomicU64,
}

impl SinkStats {
    pub(crate) fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_undelivered(&self) {
        self.undelivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SinkStatsSnapshot {
        SinkStatsSnapshot {
            dropped: self.dropped.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            undelivered: self.undelivered.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`SinkStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SinkStatsSnapshot {
    /// Notifications rejected because the queue was full or closed.
    pub dropped: u64,
    /// Frames written to the endpoint.
    pub delivered: u64,
    /// Queued notifications the writer could not send.
    pub undelivered: u64,
}

/// Non-blocking producer side of a sink.
///
/// `notify` enqueues into a bounded queue and returns immediately. When the
/// queue is full or the consumer is gone the notification is dropped and
/// counted. Cloning a handle shares the queue and the counters; the consumer
/// sees end-of-queue once every handle is dropped.
#[derive(Debug, Clone)]
pub struct SinkHandle {
    name: Arc<str>,
    tx: mpsc::Sender<Arc<Thing>>,
    stats: Arc<SinkStats>,
}

impl SinkHandle {
    /// Creates a handle and the receiving end of its queue.
    ///
    /// A `capacity` of zero is raised to one.
    pub fn channel(name: impl Into<String>, capacity: usize) -> (Self, mpsc::Receiver<Arc<Thing>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = Self {
            name: Arc::from(name.into()),
            tx,
            stats: Arc::new(SinkStats::default()),
        };
        (handle, rx)
    }

    /// Counters shared with the consumer.
    pub fn stats(&self) -> &Arc<SinkStats> {
        &self.stats
    }

    /// Number of notifications dropped at enqueue time.
    pub fn dropped(&self) -> u64 {
        self.stats.dropped.load(Ordering::Relaxed)
    }

    /// Maximum number of queued notifications.
    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl Sink for SinkHandle {
    fn name(&self) -> &str {
        &self.name
    }

    fn notify(&self, thing: &Arc<Thing>) -> Result<(), SinkError> {
        match self.tx.try_send(Arc::clone(thing)) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    sink = %self.name,
                    thing_id = %thing.id(),
                    "dropping notification for slow sink"
                );
                Err(SinkError::QueueFull(self.name.to_string()))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                Err(SinkError::Closed(self.name.to_string()))
            }
        }
    }
}
