//! Prompt construction for section generation.
//!
//! Rendering is pure: the same spec, context and mode always produce the same messages.

use crate::context::GenerationContext;
use crate::document::word_count;
use crate::provider::ChatMessage;
use crate::section::{SectionKind, SectionSpec};
use serde_json::{json, Map, Value};

pub const SYSTEM_PROMPT: &str = "You are a senior financial analyst writing an investor-grade \
business plan, one section at a time. Every reply must be a single machine-readable JSON \
object: no markdown, no code fences, no comments, no text before or after the object. \
Write in the same language the user asks for. All financial numbers must be plain integers \
or floats without currency symbols, units or thousands separators.";

/// What the prompt asks the generator to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptMode {
    /// Write the section from the brief.
    Generate,
    /// Lengthen an existing draft that fell short of its word target.
    Expand { existing_text: String },
}

/// Source material as its own message, or `None` when there is none.
pub fn render_context(ctx: &GenerationContext) -> Option<String> {
    let source = ctx.source_text.trim();
    if source.is_empty() {
        None
    } else {
        Some(format!("Context:\n{}", source))
    }
}

/// Render the instruction for one section: task, locale and output contract.
///
/// The source text is not part of it, so truncating a long context never cuts the contract.
pub fn render_instruction(spec: &SectionSpec, ctx: &GenerationContext, mode: &PromptMode) -> String {
    let mut out = String::from("Task:\n");

    match (&spec.kind, mode) {
        (SectionKind::Narrative { min_words }, PromptMode::Expand { existing_text }) => {
            render_expand(&mut out, spec, *min_words, existing_text);
        }
        (SectionKind::Narrative { min_words }, PromptMode::Generate) => {
            out.push_str(&format!(
                "Write the \"{}\" section of the business plan.\n{}\n",
                spec.key, spec.description
            ));
            out.push_str(&format!(
                "Write at least {} words of continuous, detailed prose.\n",
                min_words
            ));
        }
        (
            SectionKind::Tabular {
                record_shape,
                min_records,
            },
            _,
        ) => {
            out.push_str(&format!(
                "Produce the \"{}\" section of the business plan.\n{}\n",
                spec.key, spec.description
            ));
            out.push_str(&format!(
                "Provide at least {} records, one per reporting year (year 1 to year {}).\n",
                min_records, min_records
            ));
            out.push_str(&format!(
                "Each record must have exactly these fields: {}\n",
                record_shape.describe()
            ));
            out.push_str(
                "Numbers must be plain integers or floats and must be consistent across records.\n",
            );
        }
    }

    out.push_str(&format!(
        "Write in {}. Express every monetary amount in {}.\n",
        ctx.language, ctx.currency
    ));
    out.push_str(&output_contract(spec));
    out
}

/// Messages for one generation request: system persona, the context, then the instruction.
pub fn build_messages(spec: &SectionSpec, ctx: &GenerationContext, mode: &PromptMode) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT)];
    if let Some(context) = render_context(ctx) {
        messages.push(ChatMessage::user(context));
    }
    messages.push(ChatMessage::user(render_instruction(spec, ctx, mode)));
    messages
}

fn render_expand(out: &mut String, spec: &SectionSpec, min_words: u32, existing_text: &str) {
    let existing = existing_text.trim();
    if existing.is_empty() {
        out.push_str(&format!(
            "The \"{}\" section has no usable draft yet. Write it from scratch.\n{}\n",
            spec.key, spec.description
        ));
    } else {
        out.push_str(&format!(
            "The current \"{}\" section is too short: {} words against a target of {}.\n",
            spec.key,
            word_count(existing),
            min_words
        ));
        out.push_str(&format!(
            "Rewrite and lengthen it, keeping its facts and tone, and add depth on: {}\n",
            spec.description
        ));
        out.push_str("Current text:\n\"\"\"\n");
        out.push_str(existing);
        out.push_str("\n\"\"\"\n");
    }
    out.push_str(&format!(
        "The result must contain at least {} words of continuous prose.\n",
        min_words
    ));
}

fn output_contract(spec: &SectionSpec) -> String {
    let (value_kind, shape) = match &spec.kind {
        SectionKind::Narrative { .. } => ("a single string", keyed(&spec.key, json!("..."))),
        SectionKind::Tabular { .. } => ("an array of records", keyed(&spec.key, json!([]))),
    };
    let mut contract = format!(
        "Output exactly one JSON object with exactly one key, \"{}\", whose value is {}. \
         Shape: {}\n",
        spec.key, value_kind, shape
    );
    if let Some(example) = spec.illustrative_example() {
        let wrapped = keyed(&spec.key, example);
        contract.push_str(&format!(
            "Illustrative example of the format only. Do not copy its values: {}\n",
            wrapped
        ));
    }
    contract.push_str("Return only the JSON object.");
    contract
}

fn keyed(key: &str, value: Value) -> Value {
    let mut object = Map::new();
    object.insert(key.to_string(), value);
    Value::Object(object)
}
