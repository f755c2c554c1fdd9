//! Conversion of feed events into registered tweet things.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use thingmodel_schema::{LatLng, SchemaError, Thing, ThingType};
use thingmodel_sink::Sink;
use thingmodel_warehouse::{RegisterOutcome, Warehouse};
use tokio::sync::watch;

use crate::error::{EventError, IngestError};
use crate::feed::{FeedLine, FeedSource};
use crate::tweet::{ControlKind, FeedEvent, Status};

/// Name of the thing type every tweet is built against.
pub const TWEET_TYPE: &str = "tweet";

/// Prefix of every tweet thing id.
pub const TWEET_ID_PREFIX: &str = "tweet:";

/// Builds the `tweet` type: `location`, `author`, `date`, `content`.
pub fn tweet_type() -> Result<ThingType, SchemaError> {
    ThingType::builder(TWEET_TYPE)
        .location()
        .string("author")
        .date_time("date")
        .string("content")
        .build()
}

/// Running counters for one adapter.
#[derive(Debug, Default)]
pub struct IngestStats {
    received: AtomicU64,
    registered: AtomicU64,
    unchanged: AtomicU64,
    skipped_without_location: AtomicU64,
    control: AtomicU64,
    failed: AtomicU64,
}

impl IngestStats {
    pub fn snapshot(&self) -> IngestStatsSnapshot {
        IngestStatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            registered: self.registered.load(Ordering::Relaxed),
            unchanged: self.unchanged.load(Ordering::Relaxed),
            skipped_without_location: self.skipped_without_location.load(Ordering::Relaxed),
            control: self.control.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`IngestStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct IngestStatsSnapshot {
    /// Non-blank lines read from the feed.
    pub received: u64,
    /// Tweets that were stored or replaced a different stored version.
    pub registered: u64,
    /// Tweets identical to the stored version, which changed nothing.
    pub unchanged: u64,
    /// Statuses dropped for lacking a position.
    pub skipped_without_location: u64,
    /// Control messages skipped.
    pub control: u64,
    /// Lines that could not be read, decoded or built.
    pub failed: u64,
}

/// What happened to one feed line.
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    Registered {
        thing_id: String,
        outcome: RegisterOutcome,
    },
    SkippedWithoutLocation,
    Control(ControlKind),
    KeepAlive,
}

/// Turns geo-tagged statuses into `tweet` things, registers them and notifies
/// the sink.
pub struct TweetAdapter<S> {
    tweet_type: Arc<ThingType>,
    warehouse: Arc<Warehouse>,
    sink: S,
    stats: Arc<IngestStats>,
}

impl<S: Sink> TweetAdapter<S> {
    /// Defines the tweet type in `warehouse` and wires up `sink`.
    pub fn new(warehouse: Arc<Warehouse>, sink: S) -> Result<Self, SchemaError> {
        let tweet_type = warehouse.define_type(tweet_type()?);
        Ok(Self {
            tweet_type,
            warehouse,
            sink,
            stats: Arc::new(IngestStats::default()),
        })
    }

    pub fn stats(&self) -> &Arc<IngestStats> {
        &self.stats
    }

    pub fn warehouse(&self) -> &Arc<Warehouse> {
        &self.warehouse
    }

    /// Builds the tweet for `status`, or `None` if it carries no position.
    pub fn thing_from_status(&self, status: &Status) -> Result<Option<Thing>, EventError> {
        let Some(location) = status.location() else {
            return Ok(None);
        };
        if !in_bounds(location) {
            return Err(EventError::InvalidLocation(location));
        }

        let thing = Thing::builder(&self.tweet_type)
            .identified_by(format!("{}{}", TWEET_ID_PREFIX, status.id))
            .location(location)
            .string("author", status.user.name.as_str())
            .date_time("date", status.created_at()?)
            .string("content", status.text.as_str())
            .build()?;
        Ok(Some(thing))
    }

    /// Processes one line without touching the counters.
    pub fn process_line(&self, line: &str) -> Result<EventOutcome, EventError> {
        if line.trim().is_empty() {
            return Ok(EventOutcome::KeepAlive);
        }

        let status = match FeedEvent::parse(line)? {
            FeedEvent::Control(kind) => return Ok(EventOutcome::Control(kind)),
            FeedEvent::Status(status) => status,
        };
        let Some(thing) = self.thing_from_status(&status)? else {
            return Ok(EventOutcome::SkippedWithoutLocation);
        };

        let thing = Arc::new(thing);
        let outcome = self.warehouse.register_thing(Arc::clone(&thing));
        if outcome.is_change() {
            // Drops are counted by the sink itself.
            let _ = self.sink.notify(&thing);
        }

        Ok(EventOutcome::Registered {
            thing_id: thing.id().to_string(),
            outcome,
        })
    }

    /// Processes one line, updating counters and logging failures.
    ///
    /// Never fails: a bad line is reported and counted, and the caller moves
    /// on to the next one.
    pub fn handle_line(&self, line: &str) -> Option<EventOutcome> {
        self.record(self.process_line(line))
    }

    /// Counts and logs a line the feed could not hand over as text.
    pub fn reject_line(&self, error: EventError) {
        self.record(Err(error));
    }

    fn record(&self, result: Result<EventOutcome, EventError>) -> Option<EventOutcome> {
        if !matches!(result, Ok(EventOutcome::KeepAlive)) {
            self.stats.received.fetch_add(1, Ordering::Relaxed);
        }

        match result {
            Ok(EventOutcome::Registered {
                thing_id,
                outcome: RegisterOutcome::Unchanged,
            }) => {
                self.stats.unchanged.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(thing_id = %thing_id, "tweet unchanged");
                Some(EventOutcome::Registered {
                    thing_id,
                    outcome: RegisterOutcome::Unchanged,
                })
            }
            Ok(EventOutcome::Registered { thing_id, outcome }) => {
                self.stats.registered.fetch_add(1, Ordering::Relaxed);
                tracing::info!(thing_id = %thing_id, ?outcome, "tweet registered");
                Some(EventOutcome::Registered { thing_id, outcome })
            }
            Ok(EventOutcome::SkippedWithoutLocation) => {
                self.stats
                    .skipped_without_location
                    .fetch_add(1, Ordering::Relaxed);
                Some(EventOutcome::SkippedWithoutLocation)
            }
            Ok(EventOutcome::Control(kind)) => {
                self.stats.control.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(kind = %kind, "skipping control message");
                Some(EventOutcome::Control(kind))
            }
            Ok(EventOutcome::KeepAlive) => Some(EventOutcome::KeepAlive),
            Err(e) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                tracing::error!("failed to process feed event: {}", e);
                None
            }
        }
    }

    /// Consumes `feed` until it ends or `stop` becomes `true`.
    ///
    /// The stop signal is checked before each event; an event already being
    /// processed always completes. Dropping the stop sender also stops the
    /// run.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Feed`] if the feed transport fails. Lines the
    /// feed rejects are counted as failed events and do not end the run.
    pub async fn run<F: FeedSource>(
        &self,
        feed: &mut F,
        mut stop: watch::Receiver<bool>,
    ) -> Result<(), IngestError> {
        tracing::info!(sender = %self.sink.name(), "tweet adapter started");

        loop {
            let stopped = *stop.borrow_and_update();
            if stopped {
                tracing::info!("stop requested, ending ingestion");
                break;
            }

            let next = tokio::select! {
                biased;
                changed = stop.changed() => {
                    if changed.is_err() {
                        tracing::info!("stop signal dropped, ending ingestion");
                        break;
                    }
                    continue;
                }
                line = feed.next_line() => line,
            };

            match next {
                Some(Ok(FeedLine::Text(line))) => {
                    self.handle_line(&line);
                }
                Some(Ok(FeedLine::Rejected(e))) => self.reject_line(e),
                Some(Err(e)) => return Err(e.into()),
                None => {
                    tracing::info!("feed ended");
                    break;
                }
            }
        }

        let stats = self.stats.snapshot();
        tracing::info!(
            received = stats.received,
            registered = stats.registered,
            unchanged = stats.unchanged,
            skipped_without_location = stats.skipped_without_location,
            control = stats.control,
            failed = stats.failed,
            "tweet adapter stopped"
        );
        Ok(())
    }
}

fn in_bounds(location: LatLng) -> bool {
    (-90.0..=90.0).contains(&location.latitude) && (-180.0..=180.0).contains(&location.longitude)
}
