//! Property-based tests for narrative and tabular thresholds

use planwright::section::{FieldType, RecordShape, SectionSpec};
use planwright::validate::ValidationPolicy;
use proptest::prelude::*;
use serde_json::{json, Value};

/// Integer tolerance check agrees with the real-valued definition.
#[test]
fn test_word_target_matches_real_arithmetic() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(0usize..2000, 0u32..2000, 0u32..=100), |(words, min_words, pct)| {
            let policy = ValidationPolicy {
                word_tolerance_percent: pct,
                ..ValidationPolicy::default()
            };
            let threshold = f64::from(min_words) * f64::from(pct) / 100.0;
            // Integer inputs put any miss at least 0.01 below the threshold.
            prop_assert_eq!(
                policy.meets_word_target(words, min_words),
                words as f64 >= threshold - 1e-9
            );
            Ok(())
        })
        .unwrap();
}

/// Meeting the word target is enough, however short the words are.
#[test]
fn test_word_boundary_holds_for_any_word_length() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(1u32..60, 1usize..8), |(min_words, word_len)| {
            let policy = ValidationPolicy::default();
            let spec = SectionSpec::narrative("summary", min_words, "Summary");
            let needed = (min_words as usize * 80).div_ceil(100);
            let word = "a".repeat(word_len);
            let text = vec![word.as_str(); needed].join(" ");

            prop_assert!(policy.validate(&spec, &json!(text)).is_ok());
            if needed > 1 {
                let short = vec![word.as_str(); needed - 1].join(" ");
                prop_assert!(policy.validate(&spec, &json!(short)).is_err());
            }
            Ok(())
        })
        .unwrap();
}

/// Tabular values pass exactly when they carry enough complete records.
#[test]
fn test_record_count_boundary() {
    let mut runner = proptest::test_runner::TestRunner::default();
    let shape = RecordShape::new()
        .field("year", FieldType::Int)
        .field("value", FieldType::Float);

    runner
        .run(&(1usize..8, 0usize..12), |(min_records, len)| {
            let spec = SectionSpec::tabular("series", shape.clone(), min_records, "Series");
            let records: Vec<Value> = (0..len)
                .map(|i| json!({"year": i + 1, "value": i as f64 * 1.5, "extra": "dropped"}))
                .collect();
            let result = ValidationPolicy::default().validate(&spec, &Value::Array(records));

            prop_assert_eq!(result.is_ok(), len >= min_records);
            if let Ok(value) = result {
                let records = value.as_records().unwrap();
                prop_assert_eq!(records.len(), len);
                prop_assert!(records.iter().all(|r| !r.contains_key("extra")));
            }
            Ok(())
        })
        .unwrap();
}
