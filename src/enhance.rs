//! Enhancement pass: a best-effort second round for narratives that came back short.
//!
//! Targets are narrative sections whose text is below the word tolerance of their target,
//! including ones that degraded to an empty string. Each gets a single Expand attempt; a
//! rewrite replaces the entry only when it validated and is not shorter than what it replaces.

use crate::document::{word_count, GeneratedDocument, SectionStatus, SectionValue};
use crate::prompt::PromptMode;
use crate::retry::SectionOutcome;
use crate::section::SectionSpec;
use crate::validate::ValidationPolicy;
use std::collections::HashMap;
use tracing::{debug, info};

/// Narratives in `generated` that fall short of their word target, with their Expand prompt.
pub fn enhancement_targets<'a>(
    specs: impl IntoIterator<Item = &'a SectionSpec>,
    generated: &GeneratedDocument,
    policy: &ValidationPolicy,
) -> Vec<(SectionSpec, PromptMode)> {
    specs
        .into_iter()
        .filter_map(|spec| {
            let min_words = spec.min_words()?;
            let text = generated.document.get(&spec.key)?.as_text()?;
            if policy.meets_word_target(word_count(text), min_words) {
                return None;
            }
            debug!(
                section = %spec.key,
                words = word_count(text),
                min_words,
                "Narrative below word target, scheduling expansion"
            );
            Some((
                spec.clone(),
                PromptMode::Expand {
                    existing_text: text.to_string(),
                },
            ))
        })
        .collect()
}

/// Fold expansion outcomes into `generated`. Returns how many sections were replaced.
pub fn apply_enhancements(
    generated: &mut GeneratedDocument,
    outcomes: HashMap<String, SectionOutcome>,
) -> usize {
    let mut replaced = 0;
    for (key, outcome) in outcomes {
        let SectionStatus::Generated { attempts } = outcome.status else {
            debug!(section = %key, "Expansion failed, keeping original text");
            continue;
        };
        let SectionValue::Text(rewrite) = outcome.value else {
            continue;
        };
        let current_words = generated
            .document
            .get(&key)
            .and_then(SectionValue::as_text)
            .map(word_count)
            .unwrap_or(0);
        if word_count(&rewrite) < current_words {
            debug!(section = %key, "Expansion is shorter than the original, discarding");
            continue;
        }

        let previous_attempts = generated
            .report
            .get(&key)
            .map(SectionStatus::attempts)
            .unwrap_or(0);
        info!(
            section = %key,
            from_words = current_words,
            to_words = word_count(&rewrite),
            "Narrative section expanded"
        );
        generated.document.insert(key.clone(), SectionValue::Text(rewrite));
        generated.report.insert(
            key,
            SectionStatus::Enhanced {
                attempts: previous_attempts + attempts,
            },
        );
        replaced += 1;
    }
    replaced
}
