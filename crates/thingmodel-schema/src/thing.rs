//! Thing instances and their builder.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use thingmodel_types::{LatLng, Value};

use crate::error::SchemaError;
use crate::thing_type::{ThingType, LOCATION_FIELD};

/// An immutable instance of a [`ThingType`].
///
/// A thing always holds exactly one value per declared field of its type, each
/// of the declared kind. The type is shared with every other thing built from
/// it; the thing never owns or modifies it.
///
/// A thing may also be connected to other things by id. Connections are part
/// of the thing's content: two things with the same values but different
/// connections are different.
///
/// Changing a thing means building a new one with the same id and registering
/// it again.
#[derive(Debug, Clone, PartialEq)]
pub struct Thing {
    id: String,
    thing_type: Arc<ThingType>,
    values: HashMap<String, Value>,
    connections: BTreeSet<String>,
}

impl Thing {
    /// Starts a builder for a thing of type `thing_type`.
    pub fn builder(thing_type: &Arc<ThingType>) -> ThingBuilder {
        ThingBuilder::new(Arc::clone(thing_type))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn thing_type(&self) -> &Arc<ThingType> {
        &self.thing_type
    }

    pub fn type_name(&self) -> &str {
        self.thing_type.name()
    }

    /// Returns the value of `field`, or `None` if the type does not declare it.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Iterates over `(field, value)` pairs in declaration order.
    pub fn values(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.thing_type
            .fields()
            .iter()
            .filter_map(|f| self.values.get(&f.name).map(|v| (f.name.as_str(), v)))
    }

    pub fn string(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    pub fn double(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(Value::as_double)
    }

    pub fn int(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(Value::as_int)
    }

    pub fn boolean(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(Value::as_bool)
    }

    pub fn date_time(&self, field: &str) -> Option<DateTime<Utc>> {
        self.get(field).and_then(Value::as_date_time)
    }

    pub fn lat_lng(&self, field: &str) -> Option<LatLng> {
        self.get(field).and_then(Value::as_lat_lng)
    }

    /// Value of the conventional [`LOCATION_FIELD`], if declared.
    pub fn location(&self) -> Option<LatLng> {
        self.lat_lng(LOCATION_FIELD)
    }

    /// Ids of the things this thing is connected to, in sorted order.
    pub fn connections(&self) -> impl Iterator<Item = &str> + '_ {
        self.connections.iter().map(String::as_str)
    }

    pub fn is_connected_to(&self, id: &str) -> bool {
        self.connections.contains(id)
    }
}

/// Serialises as `{"id": .., "type": .., "fields": {..}, "connections": [..]}`
/// with fields in declaration order and connections sorted.
impl Serialize for Thing {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Thing", 4)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("type", self.thing_type.name())?;
        state.serialize_field("fields", &OrderedFields(self))?;
        state.serialize_field("connections", &self.connections)?;
        state.end()
    }
}

struct OrderedFields<'a>(&'a Thing);

impl Serialize for OrderedFields<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.values.len()))?;
        for (name, value) in self.0.values() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Fluent, single-use builder for [`Thing`].
///
/// Every supplied value is checked against the type immediately; the first
/// violation is latched and returned by [`build`](Self::build). Completeness
/// is only checked by `build`.
///
/// ```
/// use std::sync::Arc;
/// use thingmodel_schema::{LatLng, Thing, ThingType};
///
/// let webcam = Arc::new(
///     ThingType::builder("webcam")
///         .location()
///         .string("name")
///         .build()
///         .unwrap(),
/// );
///
/// let thing = Thing::builder(&webcam)
///     .identified_by("webcam:sjursoya")
///     .location(LatLng::new(59.888, 10.755))
///     .string("name", "Sjursoya webcam")
///     .build()
///     .unwrap();
///
/// assert_eq!(thing.string("name"), Some("Sjursoya webcam"));
/// ```
#[derive(Debug)]
#[must_use = "a builder does nothing until `build` is called"]
pub struct ThingBuilder {
    thing_type: Arc<ThingType>,
    id: Option<String>,
    values: HashMap<String, Value>,
    connections: BTreeSet<String>,
    error: Option<SchemaError>,
}

impl ThingBuilder {
    pub fn new(thing_type: Arc<ThingType>) -> Self {
        Self {
            thing_type,
            id: None,
            values: HashMap::new(),
            connections: BTreeSet::new(),
            error: None,
        }
    }

    /// Sets the identifier. A later call replaces an earlier one.
    pub fn identified_by(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Supplies the value of a declared field.
    pub fn value(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        if self.error.is_some() {
            return self;
        }

        let field = field.into();
        let value = value.into();
        self.error = self.check(&field, &value).err();
        if self.error.is_none() {
            self.values.insert(field, value);
        }
        self
    }

    fn check(&self, field: &str, value: &Value) -> Result<(), SchemaError> {
        if field.is_empty() {
            return Err(SchemaError::EmptyFieldName);
        }
        let expected = self
            .thing_type
            .kind_of(field)
            .ok_or_else(|| SchemaError::UnknownField {
                type_name: self.thing_type.name().to_string(),
                field: field.to_string(),
            })?;
        if value.kind() != expected {
            return Err(SchemaError::TypeMismatch {
                field: field.to_string(),
                expected,
                found: value.kind(),
            });
        }
        if self.values.contains_key(field) {
            return Err(SchemaError::DuplicateAssignment {
                field: field.to_string(),
            });
        }
        Ok(())
    }

    pub fn string(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.value(field, Value::String(value.into()))
    }

    pub fn double(self, field: impl Into<String>, value: f64) -> Self {
        self.value(field, Value::Double(value))
    }

    pub fn int(self, field: impl Into<String>, value: i64) -> Self {
        self.value(field, Value::Int(value))
    }

    pub fn boolean(self, field: impl Into<String>, value: bool) -> Self {
        self.value(field, Value::Boolean(value))
    }

    pub fn date_time(self, field: impl Into<String>, value: DateTime<Utc>) -> Self {
        self.value(field, Value::DateTime(value))
    }

    pub fn lat_lng(self, field: impl Into<String>, value: LatLng) -> Self {
        self.value(field, Value::LatLng(value))
    }

    /// Supplies the conventional [`LOCATION_FIELD`].
    pub fn location(self, value: LatLng) -> Self {
        self.lat_lng(LOCATION_FIELD, value)
    }

    /// Connects the thing to the thing identified by `id`. Connecting twice
    /// to the same id is the same as connecting once.
    pub fn connected_to(mut self, id: impl Into<String>) -> Self {
        if self.error.is_some() {
            return self;
        }
        let id = id.into();
        if id.is_empty() {
            self.error = Some(SchemaError::EmptyConnectionId);
        } else {
            self.connections.insert(id);
        }
        self
    }

    /// Finalizes the thing, consuming the builder.
    ///
    /// # Errors
    ///
    /// Returns the first latched value error, then [`SchemaError::MissingId`]
    /// if no non-empty id was given, then [`SchemaError::IncompleteThing`]
    /// listing every unassigned field in declaration order.
    pub fn build(self) -> Result<Thing, SchemaError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let id = match self.id {
            Some(id) if !id.is_empty() => id,
            _ => return Err(SchemaError::MissingId),
        };

        let missing: Vec<String> = self
            .thing_type
            .fields()
            .iter()
            .filter(|f| !self.values.contains_key(&f.name))
            .map(|f| f.name.clone())
            .collect();
        if !missing.is_empty() {
            return Err(SchemaError::IncompleteThing { id, missing });
        }

        Ok(Thing {
            id,
            thing_type: self.thing_type,
            values: self.values,
            connections: self.connections,
        })
    }
}
