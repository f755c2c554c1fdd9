use std::collections::HashSet;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thingmodel_schema::{Thing, ThingType, TypeRegistry};
use tokio::sync::broadcast;

use crate::event::{RegisterOutcome, WarehouseEvent};

/// Default capacity of the observer broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// In-memory store of things keyed by id.
///
/// Things are held behind `Arc` in a sharded concurrent map, so registrations
/// for different ids rarely contend and a reader always gets either the old or
/// the new thing for an id, never a mix. Registering an id that is already
/// present overwrites it.
///
/// Observers receive [`WarehouseEvent`]s through a broadcast channel. Sending
/// never blocks; an observer that falls more than the channel capacity behind
/// loses the oldest events.
pub struct Warehouse {
    things: DashMap<String, Arc<Thing>>,
    types: TypeRegistry,
    events_tx: broadcast::Sender<WarehouseEvent>,
}

impl std::fmt::Debug for Warehouse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Warehouse")
            .field("things_count", &self.things.len())
            .field("types", &self.types.names())
            .field("observers", &self.events_tx.receiver_count())
            .finish()
    }
}

impl Default for Warehouse {
    fn default() -> Self {
        Self::new()
    }
}

impl Warehouse {
    pub fn new() -> Self {
        Self::with_event_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Creates a warehouse whose observers may lag by up to `capacity` events.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_event_capacity(capacity: usize) -> Self {
        let (events_tx, _) = broadcast::channel(capacity);
        Self {
            things: DashMap::new(),
            types: TypeRegistry::new(),
            events_tx,
        }
    }

    fn publish(&self, event: WarehouseEvent) {
        if self.events_tx.receiver_count() == 0 {
            return;
        }
        if let Err(e) = self.events_tx.send(event) {
            tracing::warn!("warehouse event broadcast failed (no receivers): {}", e);
        }
    }

    /// Subscribes to change events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<WarehouseEvent> {
        self.events_tx.subscribe()
    }

    // ── types ────────────────────────────────────────────────────────

    /// Defines or redefines a thing type and returns the shared definition.
    ///
    /// Things already stored keep the definition they were built with.
    pub fn define_type(&self, thing_type: impl Into<Arc<ThingType>>) -> Arc<ThingType> {
        let thing_type = thing_type.into();
        self.types.define(Arc::clone(&thing_type));
        tracing::debug!(type_name = %thing_type.name(), "thing type defined");
        self.publish(WarehouseEvent::TypeDefined(Arc::clone(&thing_type)));
        thing_type
    }

    pub fn thing_type(&self, name: &str) -> Option<Arc<ThingType>> {
        self.types.get(name)
    }

    /// The registry of every type defined here or carried by a stored thing.
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    // ── things ───────────────────────────────────────────────────────

    /// Stores `thing` under its id, replacing any previous thing.
    ///
    /// Registering content equal to what is already stored changes nothing
    /// and publishes no event. The thing's type is added to the type registry
    /// if no type of that name is known yet.
    pub fn register_thing(&self, thing: impl Into<Arc<Thing>>) -> RegisterOutcome {
        let thing = thing.into();

        if self.types.define_if_absent(thing.thing_type()) {
            self.publish(WarehouseEvent::TypeDefined(Arc::clone(thing.thing_type())));
        }

        let outcome = match self.things.entry(thing.id().to_string()) {
            Entry::Occupied(mut entry) => {
                if **entry.get() == *thing {
                    RegisterOutcome::Unchanged
                } else {
                    entry.insert(Arc::clone(&thing));
                    RegisterOutcome::Replaced
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(Arc::clone(&thing));
                RegisterOutcome::Inserted
            }
        };

        match outcome {
            RegisterOutcome::Inserted => self.publish(WarehouseEvent::ThingCreated(thing)),
            RegisterOutcome::Replaced => self.publish(WarehouseEvent::ThingUpdated(thing)),
            RegisterOutcome::Unchanged => {}
        }
        outcome
    }

    /// Registers every thing in `things`, returning how many changed the
    /// warehouse.
    pub fn register_collection<I, T>(&self, things: I) -> usize
    where
        I: IntoIterator<Item = T>,
        T: Into<Arc<Thing>>,
    {
        things
            .into_iter()
            .map(|thing| self.register_thing(thing))
            .filter(|outcome| outcome.is_change())
            .count()
    }

    pub fn lookup(&self, id: &str) -> Option<Arc<Thing>> {
        self.things.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.things.contains_key(id)
    }

    /// Things that the thing stored under `id` is connected to.
    ///
    /// Connections to ids that are not stored are skipped. Returns an empty
    /// vector if `id` itself is not stored.
    pub fn connections_of(&self, id: &str) -> Vec<Arc<Thing>> {
        let Some(thing) = self.lookup(id) else {
            return Vec::new();
        };
        thing
            .connections()
            .filter_map(|target| self.lookup(target))
            .collect()
    }

    /// Removes the thing stored under `id` and returns it.
    pub fn remove_thing(&self, id: &str) -> Option<Arc<Thing>> {
        let (id, thing) = self.things.remove(id)?;
        self.publish(WarehouseEvent::ThingDeleted { id });
        Some(thing)
    }

    /// Lazily iterates over the stored things in unspecified order.
    ///
    /// Each call starts a fresh pass. The iterator holds a read lock on one
    /// shard at a time, so do not register or remove things from the same
    /// thread while it is alive; use [`snapshot`](Self::snapshot) for that.
    pub fn all(&self) -> impl Iterator<Item = Arc<Thing>> + '_ {
        self.things.iter().map(|entry| Arc::clone(entry.value()))
    }

    /// Collects the stored things into a vector.
    pub fn snapshot(&self) -> Vec<Arc<Thing>> {
        self.all().collect()
    }

    /// Ids of the stored things, in unspecified order.
    pub fn ids(&self) -> Vec<String> {
        self.things.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.things.len()
    }

    pub fn is_empty(&self) -> bool {
        self.things.is_empty()
    }

    /// Makes this warehouse mirror `source`.
    ///
    /// Things whose id is absent from `source` are removed; every thing in
    /// `source` is registered. Returns the number of changes applied.
    pub fn synchronize_from(&self, source: &Warehouse) -> usize {
        let incoming = source.snapshot();
        let keep: HashSet<&str> = incoming.iter().map(|thing| thing.id()).collect();

        let stale: Vec<String> = self
            .ids()
            .into_iter()
            .filter(|id| !keep.contains(id.as_str()))
            .collect();
        let removed = stale
            .iter()
            .filter(|id| self.remove_thing(id).is_some())
            .count();

        let changed = self.register_collection(incoming.iter().cloned());
        tracing::debug!(removed, changed, "warehouse synchronized");
        removed + changed
    }
}
