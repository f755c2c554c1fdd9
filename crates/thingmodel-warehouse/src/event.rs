//! Change notifications published by the warehouse.

use std::sync::Arc;

use thingmodel_schema::{Thing, ThingType};

/// A change to the contents of a [`Warehouse`](crate::Warehouse).
///
/// Events are published after the change is visible to readers, so an
/// observer that looks the thing up on receipt sees the new state (or a later
/// one).
#[derive(Debug, Clone)]
pub enum WarehouseEvent {
    /// A thing was stored under an id that was not present before.
    ThingCreated(Arc<Thing>),
    /// A stored thing was replaced by one with different content.
    ThingUpdated(Arc<Thing>),
    /// A thing was removed.
    ThingDeleted { id: String },
    /// A thing type was defined or redefined.
    TypeDefined(Arc<ThingType>),
}

impl WarehouseEvent {
    /// Returns the canonical event type label.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ThingCreated(_) => "THING_CREATED",
            Self::ThingUpdated(_) => "THING_UPDATED",
            Self::ThingDeleted { .. } => "THING_DELETED",
            Self::TypeDefined(_) => "TYPE_DEFINED",
        }
    }

    /// Id of the affected thing, or `None` for type events.
    pub fn thing_id(&self) -> Option<&str> {
        match self {
            Self::ThingCreated(thing) | Self::ThingUpdated(thing) => Some(thing.id()),
            Self::ThingDeleted { id } => Some(id),
            Self::TypeDefined(_) => None,
        }
    }
}

/// Result of [`Warehouse::register_thing`](crate::Warehouse::register_thing).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// The id was not present; the thing was stored.
    Inserted,
    /// The id was present with different content; the thing replaced it.
    Replaced,
    /// The id was present with identical content; nothing changed.
    Unchanged,
}

impl RegisterOutcome {
    /// Whether the registration changed the warehouse.
    pub fn is_change(self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}
