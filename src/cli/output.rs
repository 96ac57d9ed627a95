//! CLI output: error mapping and plain-text presentation.

use crate::document::{ExhaustionReason, GeneratedDocument, SectionStatus};
use crate::error::ApiError;
use crate::section::{SectionKind, SectionRegistry};

/// Map domain/service errors to a string for CLI output.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::Timeout => {
            "Generation timed out before any section finished; raise generation.document_timeout_secs"
                .to_string()
        }
        other => other.to_string(),
    }
}

/// One line per section: key, kind and target.
pub fn format_sections_text(registry: &SectionRegistry) -> String {
    let width = registry.keys().map(str::len).max().unwrap_or(0);
    registry
        .iter()
        .map(|spec| {
            let target = match &spec.kind {
                SectionKind::Narrative { min_words } => format!("narrative  >= {} words", min_words),
                SectionKind::Tabular {
                    record_shape,
                    min_records,
                } => format!(
                    "tabular    >= {} records of {}",
                    min_records,
                    record_shape.describe()
                ),
            };
            format!("{:width$}  {}", spec.key, target, width = width)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Summary of how each section was produced, for stderr.
pub fn format_report_text(generated: &GeneratedDocument) -> String {
    generated
        .report
        .iter()
        .map(|(key, status)| {
            let detail = match status {
                SectionStatus::Generated { attempts } => format!("generated ({} attempts)", attempts),
                SectionStatus::Enhanced { attempts } => format!("enhanced ({} attempts)", attempts),
                SectionStatus::Degraded { attempts, reason } => {
                    format!("degraded ({} attempts): {}", attempts, describe_reason(reason))
                }
            };
            format!("{}: {}", key, detail)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn describe_reason(reason: &ExhaustionReason) -> String {
    match reason {
        ExhaustionReason::Transport(detail) => format!("transport failure, {}", detail),
        ExhaustionReason::Unrecoverable => "no structured reply".to_string(),
        ExhaustionReason::Validation(detail) => detail.clone(),
        ExhaustionReason::Panicked(detail) => format!("task failed, {}", detail),
        ExhaustionReason::TimedOut => "document deadline passed".to_string(),
    }
}
