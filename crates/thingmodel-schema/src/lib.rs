//! Schema-driven typed entities.
//!
//! A [`ThingType`] is an immutable, named list of typed fields. A [`Thing`] is
//! an identified instance of one type holding exactly one value per declared
//! field. Both are produced by fluent, single-use builders that validate every
//! declaration and value and report the first violation from `build`.
//!
//! Types are shared by `Arc`: many things reference one type, and the
//! [`TypeRegistry`] keeps the canonical definition for each type name.

mod error;
mod registry;
mod thing;
mod thing_type;

pub use error::SchemaError;
pub use registry::TypeRegistry;
pub use thing::{Thing, ThingBuilder};
pub use thing_type::{FieldDeclaration, ThingType, ThingTypeBuilder, LOCATION_FIELD};
pub use thingmodel_types::{LatLng, Value, ValueKind};

#[cfg(test)]
mod tests;
