//! End-to-end document generation against a scripted generation service

use super::test_utils::{controller, ScriptedProvider};
use planwright::document::{ExhaustionReason, SectionStatus, SectionValue};
use planwright::section::{FieldType, RecordShape, SectionSpec};
use planwright::{DocumentOrchestrator, GenerationContext, OrchestratorSettings, SectionRegistry};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const TABULAR_REPLY: &str = r#"{"cash_flow": [
    {"year": 1, "value": 1200.5},
    {"year": 2, "value": 1800.0},
    {"year": 3, "value": 2400.25}
]}"#;

fn registry() -> Arc<SectionRegistry> {
    let sections = vec![
        SectionSpec::narrative("overview", 10, "Short overview of the company."),
        SectionSpec::tabular(
            "cash_flow",
            RecordShape::new()
                .field("year", FieldType::Int)
                .field("value", FieldType::Float),
            3,
            "Yearly net cash flow.",
        ),
    ];
    Arc::new(SectionRegistry::new(sections).unwrap())
}

fn provider() -> Arc<ScriptedProvider> {
    Arc::new(
        ScriptedProvider::new()
            .reply("overview", r#"{"overview": "We sell coffee in Lyon."}"#)
            .reply("cash_flow", TABULAR_REPLY),
    )
}

fn context() -> GenerationContext {
    GenerationContext::new("Specialty coffee roastery in Lyon.", "English", "Euro")
}

fn settings(enhance: bool) -> OrchestratorSettings {
    OrchestratorSettings {
        pacing: Duration::from_millis(300),
        document_timeout: None,
        enhance,
    }
}

#[tokio::test(start_paused = true)]
async fn short_narrative_degrades_while_table_succeeds() {
    let provider = provider();
    let orchestrator =
        DocumentOrchestrator::new(controller(provider.clone()), registry(), settings(false));

    let generated = orchestrator.generate(context()).await.unwrap();

    assert_eq!(
        generated.document.to_json(),
        json!({
            "overview": "",
            "cash_flow": [
                {"year": 1, "value": 1200.5},
                {"year": 2, "value": 1800.0},
                {"year": 3, "value": 2400.25}
            ]
        })
    );
    assert_eq!(provider.calls_for("overview"), 3);
    assert_eq!(provider.calls_for("cash_flow"), 1);
    assert_eq!(
        generated.report["cash_flow"],
        SectionStatus::Generated { attempts: 1 }
    );
    match &generated.report["overview"] {
        SectionStatus::Degraded { attempts, reason } => {
            assert_eq!(*attempts, 3);
            assert!(matches!(reason, ExhaustionReason::Validation(_)));
        }
        other => panic!("Expected degraded overview, got {:?}", other),
    }
    assert_eq!(generated.degraded_sections(), vec!["overview"]);
}

#[tokio::test(start_paused = true)]
async fn enhancement_pass_makes_one_more_call_and_never_shortens() {
    let provider = provider();
    let orchestrator =
        DocumentOrchestrator::new(controller(provider.clone()), registry(), settings(true));

    let generated = orchestrator.generate(context()).await.unwrap();

    assert_eq!(provider.calls_for("overview"), 4);
    assert_eq!(provider.calls_for("cash_flow"), 1);
    assert_eq!(
        generated.document.get("overview"),
        Some(&SectionValue::Text(String::new()))
    );
    let prompts = provider.prompts_for("overview");
    assert!(prompts[3].contains("no usable draft yet"));
}

#[tokio::test(start_paused = true)]
async fn document_keys_follow_registry_order() {
    let provider = provider();
    let orchestrator =
        DocumentOrchestrator::new(controller(provider), registry(), settings(false));

    let generated = orchestrator.generate(context()).await.unwrap();

    let keys: Vec<&str> = generated.document.keys().collect();
    assert_eq!(keys, vec!["overview", "cash_flow"]);
    let reported: Vec<&str> = generated.report.keys().map(String::as_str).collect();
    assert_eq!(reported, keys);
}

#[tokio::test(start_paused = true)]
async fn full_catalog_always_yields_every_key() {
    let registry = Arc::new(SectionRegistry::business_plan(3));
    // No scripts at all: every call fails at the transport boundary.
    let provider = Arc::new(ScriptedProvider::new());
    let orchestrator = DocumentOrchestrator::new(
        controller(provider.clone()),
        registry.clone(),
        settings(false),
    );

    let generated = orchestrator.generate(context()).await.unwrap();

    assert_eq!(generated.document.len(), registry.len());
    for spec in registry.iter() {
        let value = generated.document.get(&spec.key).unwrap();
        assert_eq!(value, &spec.empty_default(), "section {}", spec.key);
    }
    assert_eq!(provider.total_calls(), registry.len() * 3);
    assert!(!generated.is_complete());
}
