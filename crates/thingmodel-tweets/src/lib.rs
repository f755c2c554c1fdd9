//! Geo-tagged tweet adapter for ThingModel.
//!
//! Reads a newline-delimited stream of statuses, turns every status that has
//! a geographic position into a `tweet` thing, registers it in a shared
//! [`Warehouse`](thingmodel_warehouse::Warehouse) and notifies a sink. A
//! read-only HTTP API exposes the stored things and the ingest counters.
//!
//! Per-event failures are logged and counted but never end the run; only a
//! failure of the feed transport does.

pub mod api;
pub mod config;
pub mod error;
pub mod feed;
pub mod ingest;
pub mod tweet;

use tokio::sync::watch;

/// Resolves once `stop` holds `true` or its sender is dropped.
pub async fn wait_for_stop(mut stop: watch::Receiver<bool>) {
    loop {
        let stopped = *stop.borrow_and_update();
        if stopped || stop.changed().await.is_err() {
            return;
        }
    }
}
