//! Thing type declarations and their builder.

use serde::Serialize;
use thingmodel_types::ValueKind;

use crate::error::SchemaError;

/// Conventional name of the geographic position field.
pub const LOCATION_FIELD: &str = "location";

/// A single named, typed field of a [`ThingType`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDeclaration {
    /// Field name, unique within its type.
    pub name: String,
    /// Kind every value of this field must have.
    pub kind: ValueKind,
}

/// An immutable record shape: a name plus an ordered list of typed fields.
///
/// Thing types are built once through [`ThingTypeBuilder`] and then shared
/// (usually behind an `Arc`) by every thing built from them. There is no way
/// to add, remove or retype a field after `build`.
///
/// ```
/// use thingmodel_schema::ThingType;
///
/// let tweet = ThingType::builder("tweet")
///     .location()
///     .string("author")
///     .date_time("date")
///     .string("content")
///     .build()
///     .expect("field names are unique");
///
/// assert_eq!(tweet.name(), "tweet");
/// assert_eq!(tweet.len(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThingType {
    name: String,
    fields: Vec<FieldDeclaration>,
}

impl ThingType {
    /// Starts a builder for a type called `name`.
    pub fn builder(name: impl Into<String>) -> ThingTypeBuilder {
        ThingTypeBuilder::named(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared fields, in declaration order.
    pub fn fields(&self) -> &[FieldDeclaration] {
        &self.fields
    }

    /// Looks up a field declaration by name.
    pub fn field(&self, name: &str) -> Option<&FieldDeclaration> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns the declared kind of `name`, if the field exists.
    pub fn kind_of(&self, name: &str) -> Option<ValueKind> {
        self.field(name).map(|f| f.kind)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Fluent, single-use builder for [`ThingType`].
///
/// Declaration methods never fail in place. The first invalid declaration is
/// latched and returned by [`build`](Self::build); later declarations are
/// ignored once an error is latched.
#[derive(Debug)]
#[must_use = "a builder does nothing until `build` is called"]
pub struct ThingTypeBuilder {
    name: String,
    fields: Vec<FieldDeclaration>,
    error: Option<SchemaError>,
}

impl ThingTypeBuilder {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            error: None,
        }
    }

    /// Declares a field of an arbitrary kind.
    pub fn field(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        if self.error.is_some() {
            return self;
        }

        let name = name.into();
        if name.is_empty() {
            self.error = Some(SchemaError::EmptyFieldName);
        } else if self.fields.iter().any(|f| f.name == name) {
            self.error = Some(SchemaError::DuplicateField {
                type_name: self.name.clone(),
                field: name,
            });
        } else {
            self.fields.push(FieldDeclaration { name, kind });
        }
        self
    }

    pub fn string(self, name: impl Into<String>) -> Self {
        self.field(name, ValueKind::String)
    }

    pub fn double(self, name: impl Into<String>) -> Self {
        self.field(name, ValueKind::Double)
    }

    pub fn int(self, name: impl Into<String>) -> Self {
        self.field(name, ValueKind::Int)
    }

    pub fn boolean(self, name: impl Into<String>) -> Self {
        self.field(name, ValueKind::Boolean)
    }

    pub fn date_time(self, name: impl Into<String>) -> Self {
        self.field(name, ValueKind::DateTime)
    }

    pub fn lat_lng(self, name: impl Into<String>) -> Self {
        self.field(name, ValueKind::LatLng)
    }

    /// Declares the conventional [`LOCATION_FIELD`] as a `LatLng` field.
    pub fn location(self) -> Self {
        self.lat_lng(LOCATION_FIELD)
    }

    /// Appends every field of `base`, in its declaration order.
    ///
    /// A copied field whose name is already declared latches
    /// [`SchemaError::DuplicateField`].
    pub fn copy_of(self, base: &ThingType) -> Self {
        base.fields
            .iter()
            .fold(self, |builder, f| builder.field(f.name.clone(), f.kind))
    }

    /// Finalizes the type, consuming the builder.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::EmptyTypeName`] for an empty name, otherwise the
    /// first error latched by a declaration method.
    pub fn build(self) -> Result<ThingType, SchemaError> {
        if self.name.is_empty() {
            return Err(SchemaError::EmptyTypeName);
        }
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(ThingType {
            name: self.name,
            fields: self.fields,
        })
    }
}
