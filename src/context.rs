//! Generation context: the caller's source material plus language and currency.

use serde::{Deserialize, Serialize};

pub const DEFAULT_LANGUAGE: &str = "English";
pub const DEFAULT_CURRENCY: &str = "Euro";
pub const DEFAULT_MAX_INPUT_CHARS: usize = 100_000;

/// Per-request input shared read-only by every section job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationContext {
    pub source_text: String,
    pub language: String,
    pub currency: String,
}

impl GenerationContext {
    pub fn new(source_text: impl Into<String>, language: &str, currency: &str) -> Self {
        Self {
            source_text: source_text.into(),
            language: language.to_string(),
            currency: currency.to_string(),
        }
    }

    /// Merge free-form user inputs and extracted document text into one source text.
    ///
    /// Each input and each document is capped at `max_input_chars` characters.
    pub fn from_inputs(
        user_inputs: &[String],
        documents: &[String],
        language: &str,
        currency: &str,
        max_input_chars: usize,
    ) -> Self {
        let mut source_text = String::from("Business Plan Analysis:\n");
        for item in user_inputs.iter().filter(|i| !i.trim().is_empty()) {
            source_text.push_str("- ");
            source_text.push_str(&truncate_chars(item.trim(), max_input_chars));
            source_text.push('\n');
        }
        for document in documents.iter().filter(|d| !d.trim().is_empty()) {
            source_text.push_str("\nDocument Analysis:\n");
            source_text.push_str(&truncate_chars(document, max_input_chars));
            source_text.push('\n');
        }

        let language = if language.trim().is_empty() {
            DEFAULT_LANGUAGE
        } else {
            language.trim()
        };
        let currency = if currency.trim().is_empty() {
            DEFAULT_CURRENCY
        } else {
            currency.trim()
        };
        Self::new(source_text, language, currency)
    }
}

/// Cut `text` to at most `max_chars` characters, marking the cut with `...`.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => format!("{}...", &text[..byte_index]),
        None => text.to_string(),
    }
}
