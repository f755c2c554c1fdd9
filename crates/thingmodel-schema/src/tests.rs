//! Unit tests for the type registry and builder latching.

use std::sync::Arc;

use crate::{SchemaError, Thing, ThingType, TypeRegistry, ValueKind};

fn webcam() -> Arc<ThingType> {
    Arc::new(
        ThingType::builder("webcam")
            .location()
            .string("url")
            .build()
            .expect("webcam type should build"),
    )
}

// ── TypeRegistry ─────────────────────────────────────────────────────

#[test]
fn registry_starts_empty() {
    let registry = TypeRegistry::new();
    assert!(registry.is_empty());
    assert_eq!(registry.len(), 0);
    assert!(registry.get("webcam").is_none());
}

#[test]
fn define_returns_replaced_definition() {
    let registry = TypeRegistry::new();
    assert!(registry.define(webcam()).is_none());

    let wider = ThingType::builder("webcam")
        .location()
        .string("url")
        .int("refresh_seconds")
        .build()
        .expect("wider type should build");
    let replaced = registry.define(wider).expect("old definition should be returned");

    assert_eq!(replaced.len(), 2);
    assert_eq!(registry.get("webcam").map(|t| t.len()), Some(3));
    assert_eq!(registry.len(), 1);
}

#[test]
fn define_if_absent_keeps_first_definition() {
    let registry = TypeRegistry::new();
    let first = webcam();
    assert!(registry.define_if_absent(&first));

    let other = Arc::new(
        ThingType::builder("webcam")
            .string("name")
            .build()
            .expect("type should build"),
    );
    assert!(!registry.define_if_absent(&other));

    let stored = registry.get("webcam").expect("type should be registered");
    assert!(Arc::ptr_eq(&stored, &first));
}

#[test]
fn names_and_all_are_sorted() {
    let registry = TypeRegistry::new();
    for name in ["tweet", "bus", "webcam"] {
        registry.define(
            ThingType::builder(name)
                .location()
                .build()
                .expect("type should build"),
        );
    }

    assert_eq!(registry.names(), vec!["bus", "tweet", "webcam"]);
    let all: Vec<String> = registry.all().iter().map(|t| t.name().to_string()).collect();
    assert_eq!(all, vec!["bus", "tweet", "webcam"]);
    assert!(registry.contains("bus"));
    assert!(!registry.contains("train"));
}

// ── latching ─────────────────────────────────────────────────────────

#[test]
fn type_builder_ignores_declarations_after_first_error() {
    let err = ThingType::builder("bus")
        .string("line")
        .string("line")
        .string("")
        .build()
        .unwrap_err();

    assert_eq!(
        err,
        SchemaError::DuplicateField {
            type_name: "bus".to_string(),
            field: "line".to_string(),
        }
    );
}

#[test]
fn thing_builder_reports_first_value_error_over_missing_id() {
    let err = Thing::builder(&webcam())
        .string("location", "not a position")
        .build()
        .unwrap_err();

    assert_eq!(
        err,
        SchemaError::TypeMismatch {
            field: "location".to_string(),
            expected: ValueKind::LatLng,
            found: ValueKind::String,
        }
    );
}

#[test]
fn empty_field_name_is_rejected_when_supplying_values() {
    let err = Thing::builder(&webcam())
        .identified_by("cam:1")
        .string("", "x")
        .build()
        .unwrap_err();
    assert_eq!(err, SchemaError::EmptyFieldName);
}
