//! Error types for thing type and thing construction.

use thingmodel_types::ValueKind;

/// Errors raised while building a [`ThingType`](crate::ThingType) or a
/// [`Thing`](crate::Thing).
///
/// These are always returned synchronously from `build`; neither builder
/// ever yields a partially constructed value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// The thing type was given an empty name.
    #[error("thing type name must not be empty")]
    EmptyTypeName,

    /// A field was declared or supplied with an empty name.
    #[error("field name must not be empty")]
    EmptyFieldName,

    /// The same field name was declared twice on one type.
    #[error("field {field:?} is declared more than once on type {type_name:?}")]
    DuplicateField { type_name: String, field: String },

    /// A value was supplied for a field the type does not declare.
    #[error("type {type_name:?} has no field {field:?}")]
    UnknownField { type_name: String, field: String },

    /// A value of the wrong kind was supplied for a declared field.
    #[error("field {field:?} expects a {expected} value, got {found}")]
    TypeMismatch {
        field: String,
        expected: ValueKind,
        found: ValueKind,
    },

    /// `build` was called before every declared field received a value.
    #[error("thing {id:?} is missing values for {missing:?}")]
    IncompleteThing { id: String, missing: Vec<String> },

    /// A value was supplied twice for the same field.
    #[error("field {field:?} was assigned more than once")]
    DuplicateAssignment { field: String },

    /// `build` was called without a non-empty identifier.
    #[error("thing must be identified by a non-empty id")]
    MissingId,

    /// A connection was made to an empty id.
    #[error("connection target id must not be empty")]
    EmptyConnectionId,
}
