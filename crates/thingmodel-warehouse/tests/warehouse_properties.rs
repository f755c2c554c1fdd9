//! Property-based tests for warehouse registration semantics.

use std::collections::HashMap;
use std::sync::Arc;

use proptest::prelude::*;
use thingmodel_schema::{Thing, ThingType};
use thingmodel_warehouse::{RegisterOutcome, Warehouse};

fn note_type() -> Arc<ThingType> {
    Arc::new(
        ThingType::builder("note")
            .string("text")
            .build()
            .expect("note type should build"),
    )
}

fn note(thing_type: &Arc<ThingType>, id: u8, text: &str) -> Thing {
    Thing::builder(thing_type)
        .identified_by(format!("note:{}", id))
        .string("text", text)
        .build()
        .expect("note should build")
}

proptest! {
    /// Lookup after each registration returns the latest thing for that id,
    /// and `all` contains every registered id exactly once.
    #[test]
    fn lookup_returns_latest_registration(
        writes in prop::collection::vec((0u8..16, "[a-z]{0,6}"), 1..64),
    ) {
        let tt = note_type();
        let warehouse = Warehouse::new();
        let mut latest: HashMap<String, String> = HashMap::new();

        for (id, text) in &writes {
            let thing = note(&tt, *id, text);
            let key = thing.id().to_string();
            warehouse.register_thing(thing);
            latest.insert(key.clone(), text.clone());

            let stored = warehouse.lookup(&key).expect("registered thing should be present");
            prop_assert_eq!(stored.string("text"), Some(text.as_str()));
        }

        let mut ids: Vec<String> = warehouse.all().map(|t| t.id().to_string()).collect();
        ids.sort();
        let mut expected: Vec<String> = latest.keys().cloned().collect();
        expected.sort();
        prop_assert_eq!(ids, expected);
    }

    /// Registering the same thing twice is observably the same as once.
    #[test]
    fn double_registration_is_idempotent(id in 0u8..16, text in "[a-z]{0,6}") {
        let tt = note_type();
        let once = Warehouse::new();
        let twice = Warehouse::new();

        once.register_thing(note(&tt, id, &text));
        twice.register_thing(note(&tt, id, &text));
        let second = twice.register_thing(note(&tt, id, &text));

        prop_assert_eq!(second, RegisterOutcome::Unchanged);
        prop_assert_eq!(once.len(), twice.len());
        let key = format!("note:{}", id);
        prop_assert_eq!(once.lookup(&key), twice.lookup(&key));
    }
}
