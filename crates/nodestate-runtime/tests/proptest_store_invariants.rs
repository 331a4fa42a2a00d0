//! Property-based invariant tests for the proxy store.
//!
//! 1. An update that writes one field leaves every other field untouched.
//! 2. Snapshots taken before an update never observe it.
//! 3. Snapshots taken after an update always observe it.
//! 4. Version increases by exactly one per update.

use nodestate_core::{Fields, Payload, Value};
use nodestate_runtime::Store;
use proptest::prelude::*;

// ── Strategies ────────────────────────────────────────────────────────────

fn field_name() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c", "d", "e"]).prop_map(str::to_owned)
}

fn value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        (0i32..100).prop_map(Value::from),
        "[a-z]{0,6}".prop_map(Value::Text),
    ]
}

fn initial_fields() -> impl Strategy<Value = Fields> {
    prop::collection::vec((field_name(), value()), 0..5)
        .prop_map(|pairs| Fields::from(pairs.into_iter().collect::<Payload>()))
}

proptest! {
    #[test]
    fn single_field_update_is_isolated(
        initial in initial_fields(),
        field in field_name(),
        v in value(),
    ) {
        let store = Store::new(initial.clone());
        let f = field.clone();
        let nv = v.clone();
        store.update(move |fields| {
            fields.set(f, nv);
        });

        let snap = store.snapshot();
        prop_assert_eq!(snap.get(&field), Some(&v));
        for (k, old) in &initial {
            if *k != field {
                prop_assert_eq!(snap.get(k), Some(old));
            }
        }
    }

    #[test]
    fn snapshot_ordering(
        initial in initial_fields(),
        writes in prop::collection::vec((field_name(), value()), 1..8),
    ) {
        let store = Store::new(initial);
        for (field, v) in writes {
            let before = store.snapshot();
            let before_value = before.get(&field).cloned();
            let version = store.version();

            let f = field.clone();
            let nv = v.clone();
            store.update(move |fields| {
                fields.set(f, nv);
            });

            prop_assert_eq!(before.get(&field).cloned(), before_value);
            let after = store.snapshot();
            prop_assert_eq!(after.get(&field), Some(&v));
            prop_assert_eq!(store.version(), version + 1);
        }
    }
}
