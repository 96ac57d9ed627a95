//! Section contract validation.
//!
//! Narrative sections must be text of non-trivial length whose word count reaches the
//! tolerance share of the section target. Tabular sections must be arrays with enough
//! records, each carrying every required field. Passing values are normalized into a
//! `SectionValue`; failing ones produce `ApiError::ValidationFailure`.

use crate::document::{word_count, Record, SectionValue};
use crate::error::ApiError;
use crate::section::{FieldType, RecordShape, SectionKind, SectionSpec};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

pub const DEFAULT_WORD_TOLERANCE_PERCENT: u32 = 80;
pub const DEFAULT_MIN_NARRATIVE_CHARS: usize = 20;

/// Thresholds applied on top of each section's own contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationPolicy {
    /// Share of `min_words` a narrative must reach, in percent.
    pub word_tolerance_percent: u32,
    /// Floor on trimmed narrative length, in characters.
    pub min_narrative_chars: usize,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            word_tolerance_percent: DEFAULT_WORD_TOLERANCE_PERCENT,
            min_narrative_chars: DEFAULT_MIN_NARRATIVE_CHARS,
        }
    }
}

impl ValidationPolicy {
    /// `words >= min_words * tolerance`, computed without floating point.
    pub fn meets_word_target(&self, words: usize, min_words: u32) -> bool {
        (words as u64) * 100 >= u64::from(min_words) * u64::from(self.word_tolerance_percent)
    }

    /// Character floor for a narrative with target `min_words`.
    ///
    /// Capped at the length of the shortest text that meets the word target (one-letter
    /// words, single spaces), so reaching the word target is always enough.
    pub fn char_floor(&self, min_words: u32) -> usize {
        let needed = (u64::from(min_words) * u64::from(self.word_tolerance_percent)).div_ceil(100);
        if needed == 0 {
            return self.min_narrative_chars;
        }
        let shortest = usize::try_from(2 * needed - 1).unwrap_or(usize::MAX);
        self.min_narrative_chars.min(shortest)
    }

    /// Check `value` against the contract of `spec`.
    pub fn validate(&self, spec: &SectionSpec, value: &Value) -> Result<SectionValue, ApiError> {
        match &spec.kind {
            SectionKind::Narrative { min_words } => self.validate_narrative(spec, *min_words, value),
            SectionKind::Tabular {
                record_shape,
                min_records,
            } => validate_tabular(spec, record_shape, *min_records, value),
        }
    }

    fn validate_narrative(
        &self,
        spec: &SectionSpec,
        min_words: u32,
        value: &Value,
    ) -> Result<SectionValue, ApiError> {
        let text = value
            .as_str()
            .ok_or_else(|| failure(spec, format!("expected text, got {}", type_name(value))))?
            .trim();

        let chars = text.chars().count();
        let floor = self.char_floor(min_words);
        if chars < floor {
            return Err(failure(
                spec,
                format!("text has {} characters, at least {} required", chars, floor),
            ));
        }

        let words = word_count(text);
        if !self.meets_word_target(words, min_words) {
            return Err(failure(
                spec,
                format!(
                    "text has {} words, target is {} with {}% tolerance",
                    words, min_words, self.word_tolerance_percent
                ),
            ));
        }

        Ok(SectionValue::Text(text.to_string()))
    }
}

fn validate_tabular(
    spec: &SectionSpec,
    shape: &RecordShape,
    min_records: usize,
    value: &Value,
) -> Result<SectionValue, ApiError> {
    let items = value
        .as_array()
        .ok_or_else(|| failure(spec, format!("expected a list, got {}", type_name(value))))?;

    if items.len() < min_records {
        return Err(failure(
            spec,
            format!("{} records, at least {} required", items.len(), min_records),
        ));
    }

    let mut records = Vec::with_capacity(items.len());
    for (position, item) in items.iter().enumerate() {
        let object = item.as_object().ok_or_else(|| {
            failure(
                spec,
                format!("record {} is {}, not an object", position, type_name(item)),
            )
        })?;

        if let Some(missing) = shape
            .required_fields()
            .find(|field| object.get(&field.name).map_or(true, Value::is_null))
        {
            return Err(failure(
                spec,
                format!("record {} is missing field '{}'", position, missing.name),
            ));
        }

        records.push(project(shape, object));
    }

    Ok(SectionValue::Records(records))
}

/// Keep only declared fields, in declared order, coercing numbers where it is lossless.
fn project(shape: &RecordShape, object: &Record) -> Record {
    shape
        .fields()
        .iter()
        .filter_map(|field| {
            object
                .get(&field.name)
                .map(|value| (field.name.clone(), coerce(field.field_type, value)))
        })
        .collect()
}

fn coerce(field_type: FieldType, value: &Value) -> Value {
    match (field_type, value) {
        (FieldType::Int, Value::Number(n)) if n.is_f64() => n
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| Value::Number(Number::from(f as i64)))
            .unwrap_or_else(|| value.clone()),
        (FieldType::Int, Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(|i| Value::Number(Number::from(i)))
            .unwrap_or_else(|_| value.clone()),
        (FieldType::Float, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| value.clone()),
        _ => value.clone(),
    }
}

fn failure(spec: &SectionSpec, reason: String) -> ApiError {
    ApiError::ValidationFailure {
        section: spec.key.clone(),
        reason,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "text",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
