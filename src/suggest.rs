//! Short answer suggestions for a single business plan question.

use crate::error::ApiError;
use crate::provider::{ChatMessage, CompletionOptions, ModelProviderClient};
use crate::repair::repair;
use serde_json::Value;
use tracing::{debug, info};

pub const SUGGESTION_COUNT: usize = 4;
const SUGGESTIONS_KEY: &str = "suggestions";

/// Sampling used for suggestions: a little cooler and much shorter than section generation.
pub fn suggestion_options() -> CompletionOptions {
    CompletionOptions {
        temperature: Some(0.4),
        max_tokens: Some(200),
    }
}

pub fn suggestion_prompt(question: &str) -> String {
    format!(
        "You are an expert business plan consultant. Generate {} different possible \
         professional answers for the following business plan question.\n\
         Keep each answer concise, under 10 words. Prefer shorter answers.\n\n\
         Question: {}\n\n\
         Return ONLY a JSON array of strings, no additional text or explanations.",
        SUGGESTION_COUNT,
        question.trim()
    )
}

/// Ask for alternative answers to `question`.
///
/// Unlike section generation this is a single request: transport and parse failures are
/// returned to the caller.
pub async fn generate_suggestions(
    client: &dyn ModelProviderClient,
    question: &str,
) -> Result<Vec<String>, ApiError> {
    if question.trim().is_empty() {
        return Err(ApiError::ValidationFailure {
            section: SUGGESTIONS_KEY.to_string(),
            reason: "question is empty".to_string(),
        });
    }

    let messages = vec![ChatMessage::system(suggestion_prompt(question))];
    let response = client.complete(messages, suggestion_options()).await?;
    let suggestions = parse_suggestions(&response.content)?;
    info!(count = suggestions.len(), "Suggestions generated");
    Ok(suggestions)
}

/// Recover a list of non-empty strings from a raw reply.
pub fn parse_suggestions(raw: &str) -> Result<Vec<String>, ApiError> {
    let repaired = repair(raw, SUGGESTIONS_KEY);
    let items = repaired
        .section_value(SUGGESTIONS_KEY)
        .and_then(Value::as_array)
        .ok_or_else(|| ApiError::Unrecoverable {
            section: SUGGESTIONS_KEY.to_string(),
        })?;

    let suggestions: Vec<String> = items
        .iter()
        .filter_map(|item| match item {
            Value::String(text) => Some(text.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .filter(|text| !text.is_empty())
        .collect();
    debug!(
        received = items.len(),
        kept = suggestions.len(),
        "Parsed suggestions"
    );

    if suggestions.is_empty() {
        return Err(ApiError::ValidationFailure {
            section: SUGGESTIONS_KEY.to_string(),
            reason: "no usable suggestions in reply".to_string(),
        });
    }
    Ok(suggestions)
}
