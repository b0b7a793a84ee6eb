//! Property-based tests for variable binding.

use std::collections::BTreeSet;

use proptest::prelude::*;
use tm_common::Value;
use tm_core::binding::{is_time_column, VariableBinding, TIME_VARIABLE};
use tm_core::Dataset;

fn column_names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set(
        prop_oneof![
            "[A-Za-z][A-Za-z0-9_]{0,10}",
            "[A-Za-z]{0,4}(time|Time|TIME)[A-Za-z]{0,4}",
        ],
        1..10,
    )
    .prop_map(|set: BTreeSet<String>| set.into_iter().collect())
    .prop_shuffle()
}

fn dataset(names: &[String], seed: f64) -> Dataset {
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let row = (0..names.len())
        .map(|i| Value::Float(seed + i as f64))
        .collect();
    Dataset::from_rows(&refs, vec![row]).expect("unique names")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn time_first_then_non_time_columns_in_order(names in column_names()) {
        let binding = VariableBinding::derive(&dataset(&names, 0.0));
        let bound = binding.names();

        prop_assert_eq!(bound[0], TIME_VARIABLE);
        let expected: Vec<&str> = names
            .iter()
            .map(String::as_str)
            .filter(|n| !n.to_lowercase().contains("time"))
            .collect();
        prop_assert_eq!(&bound[1..], expected.as_slice());
        prop_assert_eq!(binding.len(), expected.len() + 1);
    }

    #[test]
    fn derivation_is_deterministic(names in column_names()) {
        let data = dataset(&names, 0.0);
        prop_assert_eq!(VariableBinding::derive(&data), VariableBinding::derive(&data));
    }

    #[test]
    fn tick_values_come_from_the_named_column(names in column_names(), seed in -1e6f64..1e6) {
        let data = dataset(&names, seed);
        let binding = VariableBinding::derive(&data);
        let row = data.row(0).expect("one row");
        let tick = binding.tick_row("2026-03-01 09:30:00", &row);

        prop_assert_eq!(tick.values.len(), binding.len());
        prop_assert_eq!(&tick.values[0], &Value::Text("2026-03-01 09:30:00".into()));
        for (name, value) in binding.names().iter().zip(&tick.values).skip(1) {
            prop_assert!(!is_time_column(name));
            prop_assert_eq!(Some(value), row.get(name));
        }
    }
}
