//! In-memory thing registry for ThingModel adapters.
//!
//! The [`Warehouse`] maps thing ids to immutable [`Thing`]s. It is created
//! once at process start, shared by `Arc` between the ingestion loop and any
//! readers, and never persisted.
//!
//! Registration is atomic per id and last-write-wins. Every change is
//! published as a [`WarehouseEvent`] to broadcast subscribers.

mod event;
mod warehouse;

pub use event::{RegisterOutcome, WarehouseEvent};
pub use thingmodel_schema::{Thing, ThingType};
pub use warehouse::{Warehouse, DEFAULT_EVENT_CAPACITY};
