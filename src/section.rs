//! Section schemas
//!
//! Every document section is described by a `SectionSpec`: a unique key, a semantic brief
//! passed to the generator, and a contract that is either narrative (free text with a
//! minimum word count) or tabular (an ordered list of fixed-shape records).

use crate::document::SectionValue;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub mod catalog;
pub mod registry;

pub use registry::SectionRegistry;

/// Primitive type of a tabular record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Int,
    Float,
    Text,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Text => "string",
        }
    }

    fn placeholder(self, year: u64) -> Value {
        match self {
            FieldType::Int => json!(year),
            FieldType::Float => json!(0.0),
            FieldType::Text => json!(""),
        }
    }
}

/// One named field of a record shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Optional fields are described to the generator but never enforced.
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

/// Ordered field list every record of a tabular section must follow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordShape(Vec<FieldSpec>);

impl RecordShape {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a required field.
    pub fn field(mut self, name: &str, field_type: FieldType) -> Self {
        self.0.push(FieldSpec {
            name: name.to_string(),
            field_type,
            required: true,
        });
        self
    }

    /// Append a field the generator should fill but the validator does not demand.
    pub fn optional(mut self, name: &str, field_type: FieldType) -> Self {
        self.0.push(FieldSpec {
            name: name.to_string(),
            field_type,
            required: false,
        });
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.0
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.0.iter().filter(|f| f.required)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render as `{ "year": int, "revenue": float }` for prompts.
    pub fn describe(&self) -> String {
        let fields: Vec<String> = self
            .0
            .iter()
            .map(|f| format!("\"{}\": {}", f.name, f.field_type.as_str()))
            .collect();
        format!("{{ {} }}", fields.join(", "))
    }

    /// Build a placeholder record for the given year, in declared field order.
    pub fn placeholder_record(&self, year: u64) -> Map<String, Value> {
        self.0
            .iter()
            .map(|f| (f.name.clone(), f.field_type.placeholder(year)))
            .collect()
    }
}

/// Section contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SectionKind {
    Narrative {
        min_words: u32,
    },
    Tabular {
        record_shape: RecordShape,
        min_records: usize,
    },
}

/// Immutable descriptor of one document section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSpec {
    pub key: String,
    pub description: String,
    #[serde(flatten)]
    pub kind: SectionKind,
    /// Illustrative value shown in prompts. Never treated as data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

impl SectionSpec {
    pub fn narrative(key: &str, min_words: u32, description: &str) -> Self {
        Self {
            key: key.to_string(),
            description: description.to_string(),
            kind: SectionKind::Narrative { min_words },
            example: None,
        }
    }

    pub fn tabular(
        key: &str,
        record_shape: RecordShape,
        min_records: usize,
        description: &str,
    ) -> Self {
        Self {
            key: key.to_string(),
            description: description.to_string(),
            kind: SectionKind::Tabular {
                record_shape,
                min_records,
            },
            example: None,
        }
    }

    pub fn with_example(mut self, example: Value) -> Self {
        self.example = Some(example);
        self
    }

    /// Word target for narrative sections.
    pub fn min_words(&self) -> Option<u32> {
        match self.kind {
            SectionKind::Narrative { min_words } => Some(min_words),
            SectionKind::Tabular { .. } => None,
        }
    }

    /// Type-correct "nothing" for this section.
    pub fn empty_default(&self) -> SectionValue {
        match self.kind {
            SectionKind::Narrative { .. } => SectionValue::Text(String::new()),
            SectionKind::Tabular { .. } => SectionValue::Records(Vec::new()),
        }
    }

    /// Example used in prompts: the declared one, or one synthesized from the record shape.
    pub fn illustrative_example(&self) -> Option<Value> {
        if let Some(example) = &self.example {
            return Some(example.clone());
        }
        match &self.kind {
            SectionKind::Narrative { .. } => None,
            SectionKind::Tabular {
                record_shape,
                min_records,
            } => {
                let count = (*min_records).clamp(1, 2) as u64;
                let records: Vec<Value> = (1..=count)
                    .map(|year| Value::Object(record_shape.placeholder_record(year)))
                    .collect();
                Some(Value::Array(records))
            }
        }
    }
}
