//! Named registry of shared thing types.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::thing_type::ThingType;

/// Thread-safe map from type name to the shared [`ThingType`] definition.
///
/// Things hold their type by `Arc`, so replacing a definition here never
/// affects things that were already built against the old one.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: RwLock<HashMap<String, Arc<ThingType>>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<ThingType>>> {
        self.types.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<ThingType>>> {
        self.types.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Stores `thing_type` under its name, replacing any previous definition.
    ///
    /// Returns the definition that was replaced, if any.
    pub fn define(&self, thing_type: impl Into<Arc<ThingType>>) -> Option<Arc<ThingType>> {
        let thing_type = thing_type.into();
        self.write().insert(thing_type.name().to_string(), thing_type)
    }

    /// Stores `thing_type` only if no type with that name exists yet.
    ///
    /// Returns `true` if the type was inserted.
    pub fn define_if_absent(&self, thing_type: &Arc<ThingType>) -> bool {
        let mut types = self.write();
        if types.contains_key(thing_type.name()) {
            return false;
        }
        types.insert(thing_type.name().to_string(), Arc::clone(thing_type));
        true
    }

    pub fn get(&self, name: &str) -> Option<Arc<ThingType>> {
        self.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// Registered type names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Snapshot of every registered type, sorted by name.
    pub fn all(&self) -> Vec<Arc<ThingType>> {
        let mut types: Vec<Arc<ThingType>> = self.read().values().cloned().collect();
        types.sort_by(|a, b| a.name().cmp(b.name()));
        types
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
