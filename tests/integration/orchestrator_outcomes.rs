//! Per-section outcomes: retries, transport failures, section selection

use super::test_utils::{controller, ScriptedProvider};
use planwright::document::{ExhaustionReason, SectionStatus, SectionValue};
use planwright::error::{ApiError, TransportError};
use planwright::section::{FieldType, RecordShape, SectionSpec};
use planwright::{DocumentOrchestrator, GenerationContext, OrchestratorSettings, SectionRegistry};
use std::sync::Arc;
use std::time::Duration;

const LONG_TEXT: &str = "Our roastery sources green coffee directly from cooperatives in \
Ethiopia and Colombia and roasts in small batches for cafes and households across Lyon.";

fn registry() -> Arc<SectionRegistry> {
    Arc::new(
        SectionRegistry::new(vec![
            SectionSpec::narrative("summary", 20, "Company summary."),
            SectionSpec::narrative("team", 20, "Team background."),
            SectionSpec::tabular(
                "revenue",
                RecordShape::new()
                    .field("year", FieldType::Int)
                    .field("amount", FieldType::Float),
                2,
                "Revenue per year.",
            ),
        ])
        .unwrap(),
    )
}

fn orchestrator(provider: Arc<ScriptedProvider>) -> DocumentOrchestrator {
    DocumentOrchestrator::new(
        controller(provider),
        registry(),
        OrchestratorSettings {
            pacing: Duration::from_millis(300),
            document_timeout: None,
            enhance: false,
        },
    )
}

fn context() -> GenerationContext {
    GenerationContext::new("Coffee roastery.", "English", "Euro")
}

#[tokio::test(start_paused = true)]
async fn transient_failure_recovers_on_retry() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .script(
                "summary",
                vec![
                    Err(TransportError::RateLimited("slow down".into())),
                    Ok(format!(r#"{{"summary": "{}"}}"#, LONG_TEXT)),
                ],
            )
            .reply("team", &format!(r#"{{"team": "{}"}}"#, LONG_TEXT))
            .reply(
                "revenue",
                r#"{"revenue": [{"year": 1, "amount": 10}, {"year": 2, "amount": 20.5}]}"#,
            ),
    );

    let generated = orchestrator(provider.clone())
        .generate(context())
        .await
        .unwrap();

    assert!(generated.is_complete());
    assert_eq!(
        generated.report["summary"],
        SectionStatus::Generated { attempts: 2 }
    );
    assert_eq!(provider.calls_for("summary"), 2);
    let records = generated.document.get("revenue").unwrap().as_records().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1]["amount"], serde_json::json!(20.5));
}

#[tokio::test(start_paused = true)]
async fn persistent_transport_failure_is_reported_as_transport() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .script(
                "summary",
                vec![Err(TransportError::AuthFailed("bad key".into()))],
            )
            .reply("team", &format!(r#"{{"team": "{}"}}"#, LONG_TEXT))
            .reply(
                "revenue",
                r#"{"revenue": [{"year": 1, "amount": 10}, {"year": 2, "amount": 20}]}"#,
            ),
    );

    let generated = orchestrator(provider.clone())
        .generate(context())
        .await
        .unwrap();

    match &generated.report["summary"] {
        SectionStatus::Degraded {
            attempts: 3,
            reason: ExhaustionReason::Transport(message),
        } => assert!(message.contains("bad key")),
        other => panic!("Unexpected status: {:?}", other),
    }
    assert_eq!(
        generated.document.get("summary"),
        Some(&SectionValue::Text(String::new()))
    );
    assert_eq!(
        generated.report["team"],
        SectionStatus::Generated { attempts: 1 }
    );
}

#[tokio::test(start_paused = true)]
async fn too_few_records_degrade_to_empty_list() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .reply("summary", &format!(r#"{{"summary": "{}"}}"#, LONG_TEXT))
            .reply("team", &format!(r#"{{"team": "{}"}}"#, LONG_TEXT))
            .reply("revenue", r#"{"revenue": [{"year": 1, "amount": 10}]}"#),
    );

    let generated = orchestrator(provider.clone())
        .generate(context())
        .await
        .unwrap();

    assert_eq!(
        generated.document.get("revenue"),
        Some(&SectionValue::Records(Vec::new()))
    );
    assert_eq!(provider.calls_for("revenue"), 3);
    assert_eq!(generated.degraded_sections(), vec!["revenue"]);
}

#[tokio::test(start_paused = true)]
async fn selected_sections_only_touch_requested_keys() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .reply("team", &format!(r#"{{"team": "{}"}}"#, LONG_TEXT))
            .reply(
                "revenue",
                r#"{"revenue": [{"year": 1, "amount": 10}, {"year": 2, "amount": 20}]}"#,
            ),
    );

    let generated = orchestrator(provider.clone())
        .generate_sections(context(), &["revenue".to_string(), "team".to_string()])
        .await
        .unwrap();

    let keys: Vec<&str> = generated.document.keys().collect();
    assert_eq!(keys, vec!["team", "revenue"]);
    assert_eq!(provider.calls_for("summary"), 0);
    assert!(generated.is_complete());
}

#[tokio::test(start_paused = true)]
async fn unknown_section_is_rejected_before_any_call() {
    let provider = Arc::new(ScriptedProvider::new());

    let result = orchestrator(provider.clone())
        .generate_sections(context(), &["team".to_string(), "swot".to_string()])
        .await;

    assert!(matches!(result, Err(ApiError::UnknownSection(key)) if key == "swot"));
    assert_eq!(provider.total_calls(), 0);
}
