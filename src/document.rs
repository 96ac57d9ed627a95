//! Document model: section values, per-section status, and the assembled document.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fixed-shape record of a tabular section.
pub type Record = Map<String, Value>;

/// Content of one section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SectionValue {
    Text(String),
    Records(Vec<Record>),
}

impl SectionValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SectionValue::Text(text) => Some(text),
            SectionValue::Records(_) => None,
        }
    }

    pub fn as_records(&self) -> Option<&[Record]> {
        match self {
            SectionValue::Text(_) => None,
            SectionValue::Records(records) => Some(records),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            SectionValue::Text(text) => text.trim().is_empty(),
            SectionValue::Records(records) => records.is_empty(),
        }
    }
}

/// Whitespace-separated word count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Why a section fell back to its empty default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ExhaustionReason {
    /// Last attempt failed at the transport boundary.
    Transport(String),
    /// Last reply could not be turned into structured data.
    Unrecoverable,
    /// Last reply parsed but did not meet the section contract.
    Validation(String),
    /// The section task died before reporting.
    Panicked(String),
    /// A caller-level timeout fired before the section finished.
    TimedOut,
}

/// Outcome of one section in a generated document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SectionStatus {
    Generated { attempts: u32 },
    /// Rewritten by the enhancement pass after initial generation.
    Enhanced { attempts: u32 },
    Degraded {
        attempts: u32,
        reason: ExhaustionReason,
    },
}

impl SectionStatus {
    pub fn is_degraded(&self) -> bool {
        matches!(self, SectionStatus::Degraded { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            SectionStatus::Generated { attempts }
            | SectionStatus::Enhanced { attempts }
            | SectionStatus::Degraded { attempts, .. } => *attempts,
        }
    }
}

/// Final artifact: section key to value, in registry order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(IndexMap<String, SectionValue>);

impl Document {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn insert(&mut self, key: String, value: SectionValue) -> Option<SectionValue> {
        self.0.insert(key, value)
    }

    pub fn get(&self, key: &str) -> Option<&SectionValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SectionValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(key, value)| {
                    let json = match value {
                        SectionValue::Text(text) => Value::String(text.clone()),
                        SectionValue::Records(records) => Value::Array(
                            records.iter().cloned().map(Value::Object).collect(),
                        ),
                    };
                    (key.clone(), json)
                })
                .collect(),
        )
    }
}

/// A document together with how each of its sections was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedDocument {
    pub document: Document,
    pub report: IndexMap<String, SectionStatus>,
}

impl GeneratedDocument {
    pub fn degraded_sections(&self) -> Vec<&str> {
        self.report
            .iter()
            .filter(|(_, status)| status.is_degraded())
            .map(|(key, _)| key.as_str())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.report.values().all(|status| !status.is_degraded())
    }
}
