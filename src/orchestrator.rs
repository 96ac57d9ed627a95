//! Document orchestrator: fans out one job per section, merges outcomes, runs enhancement.
//!
//! Jobs are spawned in registry order with a fixed pacing delay between dispatches and then
//! collected as they finish. The merged document always carries exactly one entry per
//! requested section, in registry order, whatever happened to the individual jobs.

use crate::config::PlanwrightConfig;
use crate::context::GenerationContext;
use crate::document::{Document, ExhaustionReason, GeneratedDocument};
use crate::enhance::{apply_enhancements, enhancement_targets};
use crate::error::ApiError;
use crate::prompt::PromptMode;
use crate::provider::ModelProviderClient;
use crate::retry::{RetryController, RetryPolicy, SectionOutcome};
use crate::section::{SectionRegistry, SectionSpec};
use futures::stream::{FuturesUnordered, StreamExt};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout_at, Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_PACING: Duration = Duration::from_millis(300);

/// Scheduling knobs for one orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// Delay between consecutive dispatches; completions are never paced.
    pub pacing: Duration,
    /// Deadline for the whole document, enhancement included.
    pub document_timeout: Option<Duration>,
    pub enhance: bool,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            pacing: DEFAULT_PACING,
            document_timeout: None,
            enhance: true,
        }
    }
}

/// Outcomes gathered by one dispatch round.
struct Round {
    outcomes: HashMap<String, SectionOutcome>,
    timed_out: bool,
}

/// A spawned section job. Dropping it aborts the task, so cancelling a generation call
/// stops every job it started.
struct SectionTask {
    spec: SectionSpec,
    handle: JoinHandle<SectionOutcome>,
}

impl Drop for SectionTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Generates business plan documents section by section.
pub struct DocumentOrchestrator {
    controller: RetryController,
    registry: Arc<SectionRegistry>,
    settings: OrchestratorSettings,
}

impl DocumentOrchestrator {
    pub fn new(
        controller: RetryController,
        registry: Arc<SectionRegistry>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            controller,
            registry,
            settings,
        }
    }

    /// Wire an orchestrator from loaded configuration.
    pub fn from_config(
        client: Arc<dyn ModelProviderClient>,
        registry: Arc<SectionRegistry>,
        config: &PlanwrightConfig,
    ) -> Self {
        let controller = RetryController::new(
            client,
            config.provider.completion_options(),
            config.generation.retry_policy(),
            config.generation.validation_policy(),
        );
        Self::new(controller, registry, config.generation.orchestrator_settings())
    }

    pub fn registry(&self) -> &SectionRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Generate every registry section.
    ///
    /// Fails only with `ApiError::Timeout`, when the document deadline passes before any
    /// section finished.
    pub async fn generate(&self, ctx: GenerationContext) -> Result<GeneratedDocument, ApiError> {
        let specs: Vec<SectionSpec> = self.registry.iter().cloned().collect();
        self.generate_specs(ctx, specs).await
    }

    /// Generate only `keys`, in registry order. Unknown keys fail before anything is sent.
    pub async fn generate_sections(
        &self,
        ctx: GenerationContext,
        keys: &[String],
    ) -> Result<GeneratedDocument, ApiError> {
        for key in keys {
            self.registry.get(key)?;
        }
        let wanted: HashSet<&str> = keys.iter().map(String::as_str).collect();
        let specs: Vec<SectionSpec> = self
            .registry
            .iter()
            .filter(|spec| wanted.contains(spec.key.as_str()))
            .cloned()
            .collect();
        self.generate_specs(ctx, specs).await
    }

    async fn generate_specs(
        &self,
        ctx: GenerationContext,
        specs: Vec<SectionSpec>,
    ) -> Result<GeneratedDocument, ApiError> {
        let started = std::time::Instant::now();
        let deadline = self.settings.document_timeout.map(|t| Instant::now() + t);
        let ctx = Arc::new(ctx);
        info!(
            sections = specs.len(),
            language = %ctx.language,
            currency = %ctx.currency,
            "Document generation started"
        );

        let jobs = specs
            .iter()
            .map(|spec| (spec.clone(), PromptMode::Generate))
            .collect();
        let round = self.run_round(&self.controller, &ctx, jobs, deadline).await;
        if round.timed_out && round.outcomes.is_empty() {
            warn!(
                duration_ms = started.elapsed().as_millis(),
                "Document deadline passed before any section finished"
            );
            return Err(ApiError::Timeout);
        }

        let mut generated = merge(&specs, round.outcomes);

        if self.settings.enhance && !round.timed_out {
            self.enhance(&ctx, &specs, &mut generated, deadline).await;
        }

        let degraded = generated.degraded_sections();
        info!(
            sections = generated.document.len(),
            degraded = degraded.len(),
            timed_out = round.timed_out,
            duration_ms = started.elapsed().as_millis(),
            "Document generation completed"
        );
        if !degraded.is_empty() {
            warn!(sections = ?degraded, "Document contains degraded sections");
        }
        Ok(generated)
    }

    async fn enhance(
        &self,
        ctx: &Arc<GenerationContext>,
        specs: &[SectionSpec],
        generated: &mut GeneratedDocument,
        deadline: Option<Instant>,
    ) {
        let targets = enhancement_targets(specs, generated, self.controller.validation());
        if targets.is_empty() {
            return;
        }
        info!(sections = targets.len(), "Enhancement pass started");
        let single = self.controller.with_policy(RetryPolicy::single_attempt());
        let round = self.run_round(&single, ctx, targets, deadline).await;
        let replaced = apply_enhancements(generated, round.outcomes);
        info!(
            replaced,
            timed_out = round.timed_out,
            "Enhancement pass completed"
        );
    }

    /// Spawn one task per job with pacing between dispatches, then collect until all
    /// finish or the deadline passes. Unfinished tasks are aborted and left out.
    async fn run_round(
        &self,
        controller: &RetryController,
        ctx: &Arc<GenerationContext>,
        jobs: Vec<(SectionSpec, PromptMode)>,
        deadline: Option<Instant>,
    ) -> Round {
        let mut tasks: Vec<SectionTask> = Vec::with_capacity(jobs.len());
        let mut outcomes = HashMap::with_capacity(jobs.len());
        let pacing = self.settings.pacing;

        let work = async {
            for (index, (spec, mode)) in jobs.into_iter().enumerate() {
                if index > 0 && !pacing.is_zero() {
                    sleep(pacing).await;
                }
                debug!(section = %spec.key, "Dispatching section job");
                let controller = controller.clone();
                let ctx = Arc::clone(ctx);
                let job_spec = spec.clone();
                let handle =
                    tokio::spawn(async move { controller.run(&job_spec, &ctx, &mode).await });
                tasks.push(SectionTask { spec, handle });
            }

            let mut pending: FuturesUnordered<_> = tasks
                .iter_mut()
                .map(|task| {
                    let SectionTask { spec, handle } = task;
                    let spec = &*spec;
                    async move { (spec, handle.await) }
                })
                .collect();
            while let Some((spec, joined)) = pending.next().await {
                outcomes.insert(spec.key.clone(), settle(spec, joined));
            }
        };

        let timed_out = match deadline {
            Some(deadline) => timeout_at(deadline, work).await.is_err(),
            None => {
                work.await;
                false
            }
        };

        if timed_out {
            for task in tasks.iter_mut() {
                if outcomes.contains_key(&task.spec.key) {
                    continue;
                }
                if task.handle.is_finished() {
                    let joined = (&mut task.handle).await;
                    outcomes.insert(task.spec.key.clone(), settle(&task.spec, joined));
                } else {
                    debug!(section = %task.spec.key, "Aborting unfinished section job");
                    task.handle.abort();
                }
            }
        }

        Round {
            outcomes,
            timed_out,
        }
    }
}

/// A task that died is reported as a degraded section, never as an error.
fn settle(
    spec: &SectionSpec,
    joined: Result<SectionOutcome, tokio::task::JoinError>,
) -> SectionOutcome {
    joined.unwrap_or_else(|err| {
        warn!(section = %spec.key, error = %err, "Section task failed");
        SectionOutcome::degraded(spec, 0, ExhaustionReason::Panicked(err.to_string()))
    })
}

/// One entry per spec, in spec order. Missing outcomes become empty defaults.
fn merge(specs: &[SectionSpec], mut outcomes: HashMap<String, SectionOutcome>) -> GeneratedDocument {
    let mut document = Document::new();
    let mut report = IndexMap::with_capacity(specs.len());
    for spec in specs {
        let outcome = outcomes
            .remove(&spec.key)
            .unwrap_or_else(|| SectionOutcome::degraded(spec, 0, ExhaustionReason::TimedOut));
        document.insert(spec.key.clone(), outcome.value);
        report.insert(spec.key.clone(), outcome.status);
    }
    GeneratedDocument { document, report }
}
