//! Property-based tests for the response repair pipeline

use planwright::context::truncate_chars;
use planwright::repair::{cosmetic_repair, extract_balanced_span, repair};
use proptest::prelude::*;
use serde_json::{json, Value};

fn json_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| json!(n)),
        "[a-zA-Z0-9 {}\\[\\]\",:\\\\]{0,16}".prop_map(Value::String),
    ]
}

fn json_value() -> impl Strategy<Value = Value> {
    json_leaf().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z_]{1,8}", inner, 0..4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

/// Arbitrary replies never panic, whatever the key.
#[test]
fn test_repair_never_panics() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(any::<String>(), "[a-z_]{1,12}"), |(raw, key)| {
            let _ = repair(&raw, &key);
            let _ = cosmetic_repair(&raw);
            let _ = extract_balanced_span(&raw);
            Ok(())
        })
        .unwrap();
}

/// A serialized object wrapped in commentary is recovered unchanged.
#[test]
fn test_wrapped_object_round_trips() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(json_value(), "[a-z]{0,20}", "[a-z]{0,20}"),
            |(inner, prefix, suffix)| {
                let object = json!({ "section": inner });
                let serialized = serde_json::to_string(&object).unwrap();

                let span = extract_balanced_span(&serialized);
                prop_assert_eq!(span, Some(serialized.as_str()));

                let raw = format!("{} {} {}", prefix, serialized, suffix);
                let repaired = repair(&raw, "section");
                prop_assert_eq!(repaired.section_value("section"), Some(&object["section"]));
                Ok(())
            },
        )
        .unwrap();
}

/// Truncation keeps at most `max` characters before the marker.
#[test]
fn test_truncate_respects_char_count() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(any::<String>(), 0usize..64), |(text, max)| {
            let truncated = truncate_chars(&text, max);
            let count = text.chars().count();
            if count <= max {
                prop_assert_eq!(truncated, text);
            } else {
                prop_assert!(truncated.ends_with("..."));
                prop_assert_eq!(truncated.chars().count(), max + 3);
                prop_assert!(text.starts_with(&truncated[..truncated.len() - 3]));
            }
            Ok(())
        })
        .unwrap();
}
