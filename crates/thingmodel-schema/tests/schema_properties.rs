//! Property-based tests for builder invariants.
//!
//! - A type built from unique names keeps every name in declaration order.
//! - Repeating any name anywhere in a declaration fails the build.
//! - A thing builds exactly when every declared field is supplied, and the
//!   missing list is the unsupplied fields in declaration order.

use std::collections::BTreeSet;
use std::sync::Arc;

use proptest::prelude::*;
use thingmodel_schema::{SchemaError, Thing, ThingType, ValueKind};

// =============================================================================
// HELPER STRATEGIES
// =============================================================================

fn kind_strategy() -> impl Strategy<Value = ValueKind> {
    prop::sample::select(ValueKind::ALL.to_vec())
}

fn unique_names_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set("[a-z][a-z0-9_]{0,11}", 1..12)
        .prop_map(|names: BTreeSet<String>| names.into_iter().collect())
        .prop_shuffle()
}

fn build_type(names: &[String], kinds: &[ValueKind]) -> ThingType {
    names
        .iter()
        .zip(kinds.iter().cycle())
        .fold(ThingType::builder("generated"), |b, (name, kind)| {
            b.field(name.clone(), *kind)
        })
        .build()
        .expect("unique names should build")
}

// =============================================================================
// THING TYPE PROPERTIES
// =============================================================================

proptest! {
    #[test]
    fn unique_names_are_kept_in_order(
        names in unique_names_strategy(),
        kinds in prop::collection::vec(kind_strategy(), 1..6),
    ) {
        let thing_type = build_type(&names, &kinds);
        let declared: Vec<String> = thing_type.fields().iter().map(|f| f.name.clone()).collect();
        prop_assert_eq!(declared, names);
    }

    #[test]
    fn repeated_name_always_fails(
        names in unique_names_strategy(),
        pick in any::<prop::sample::Index>(),
        insert_at in any::<prop::sample::Index>(),
    ) {
        let repeated = names[pick.index(names.len())].clone();
        let mut declared = names.clone();
        declared.insert(insert_at.index(declared.len() + 1), repeated.clone());

        let result = declared
            .iter()
            .fold(ThingType::builder("generated"), |b, name| b.string(name.clone()))
            .build();

        prop_assert_eq!(
            result.unwrap_err(),
            SchemaError::DuplicateField { type_name: "generated".to_string(), field: repeated }
        );
    }
}

// =============================================================================
// THING PROPERTIES
// =============================================================================

proptest! {
    #[test]
    fn thing_builds_only_when_complete(
        names in unique_names_strategy(),
        supplied in prop::collection::vec(any::<bool>(), 12),
    ) {
        let thing_type = Arc::new(build_type(&names, &[ValueKind::Int]));

        let mut builder = Thing::builder(&thing_type).identified_by("generated:1");
        let mut expected_missing = Vec::new();
        for (i, name) in names.iter().enumerate() {
            if supplied[i] {
                builder = builder.int(name.clone(), i as i64);
            } else {
                expected_missing.push(name.clone());
            }
        }

        match builder.build() {
            Ok(thing) => {
                prop_assert!(expected_missing.is_empty());
                prop_assert_eq!(thing.values().count(), names.len());
            }
            Err(err) => {
                prop_assert_eq!(
                    err,
                    SchemaError::IncompleteThing { id: "generated:1".to_string(), missing: expected_missing }
                );
            }
        }
    }
}
