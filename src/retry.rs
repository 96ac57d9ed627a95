//! Retry controller: drives one section job through bounded attempts.
//!
//! Each attempt is prompt → transport → repair → validate. Failures of any of the three
//! later steps are retried the same way, with a growing delay between attempts. When the
//! attempt budget is spent the job resolves to the section's empty default; nothing in here
//! returns an error to the caller.

use crate::context::GenerationContext;
use crate::document::{ExhaustionReason, SectionStatus, SectionValue};
use crate::error::ApiError;
use crate::prompt::{build_messages, PromptMode};
use crate::provider::{ChatMessage, CompletionOptions, ModelProviderClient};
use crate::repair::repair;
use crate::section::SectionSpec;
use crate::validate::ValidationPolicy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF_OFFSET_MS: u64 = 2000;
pub const DEFAULT_BACKOFF_UNIT_MS: u64 = 1000;
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 10_000;

/// Lifecycle of a single section job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Pending,
    InFlight,
    Repairing,
    Validating,
    Succeeded,
    Exhausted,
}

/// Attempt bound and backoff shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_offset: Duration,
    pub backoff_unit: Duration,
    pub backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_offset: Duration::from_millis(DEFAULT_BACKOFF_OFFSET_MS),
            backoff_unit: Duration::from_millis(DEFAULT_BACKOFF_UNIT_MS),
            backoff_max: Duration::from_millis(DEFAULT_BACKOFF_MAX_MS),
        }
    }
}

impl RetryPolicy {
    /// One attempt, no backoff. Used by the enhancement pass.
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay after the failed attempt number `attempt` (1-based):
    /// `offset + unit * 2^(attempt - 1)`, capped at `backoff_max`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        let growth = self.backoff_unit.saturating_mul(1u32 << exponent);
        self.backoff_offset
            .saturating_add(growth)
            .min(self.backoff_max)
    }
}

/// Attempt counter and state of one section job.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub section_key: String,
    pub attempt: u32,
    pub state: JobState,
}

impl GenerationJob {
    pub fn new(section_key: &str) -> Self {
        Self {
            section_key: section_key.to_string(),
            attempt: 0,
            state: JobState::Pending,
        }
    }

    fn transition(&mut self, next: JobState) {
        debug!(
            section = %self.section_key,
            attempt = self.attempt,
            from = ?self.state,
            to = ?next,
            "Job state transition"
        );
        self.state = next;
    }
}

/// Terminal result of one section job.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionOutcome {
    pub key: String,
    pub value: SectionValue,
    pub status: SectionStatus,
}

impl SectionOutcome {
    /// Empty default for a job that never reached a terminal state on its own.
    pub fn degraded(spec: &SectionSpec, attempts: u32, reason: ExhaustionReason) -> Self {
        Self {
            key: spec.key.clone(),
            value: spec.empty_default(),
            status: SectionStatus::Degraded { attempts, reason },
        }
    }
}

/// Runs section jobs against one provider with a fixed policy.
#[derive(Clone)]
pub struct RetryController {
    client: Arc<dyn ModelProviderClient>,
    options: CompletionOptions,
    policy: RetryPolicy,
    validation: ValidationPolicy,
}

impl RetryController {
    pub fn new(
        client: Arc<dyn ModelProviderClient>,
        options: CompletionOptions,
        policy: RetryPolicy,
        validation: ValidationPolicy,
    ) -> Self {
        Self {
            client,
            options,
            policy,
            validation,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn validation(&self) -> &ValidationPolicy {
        &self.validation
    }

    /// Same controller with a different attempt policy.
    pub fn with_policy(&self, policy: RetryPolicy) -> Self {
        Self {
            policy,
            ..self.clone()
        }
    }

    /// Drive one section to `Succeeded` or `Exhausted`.
    pub async fn run(
        &self,
        spec: &SectionSpec,
        ctx: &GenerationContext,
        mode: &PromptMode,
    ) -> SectionOutcome {
        let mut job = GenerationJob::new(&spec.key);
        let messages = build_messages(spec, ctx, mode);
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = None;

        while job.attempt < max_attempts {
            job.attempt += 1;
            match self.attempt(&mut job, spec, &messages).await {
                Ok(value) => {
                    job.transition(JobState::Succeeded);
                    return SectionOutcome {
                        key: spec.key.clone(),
                        value,
                        status: SectionStatus::Generated {
                            attempts: job.attempt,
                        },
                    };
                }
                Err(err) => {
                    let exhausted = job.attempt >= max_attempts;
                    warn!(
                        section = %spec.key,
                        attempt = job.attempt,
                        max_attempts,
                        error = %err,
                        will_retry = !exhausted,
                        "Section attempt failed"
                    );
                    last_error = Some(err);
                    if !exhausted {
                        sleep(self.policy.delay_after(job.attempt)).await;
                    }
                }
            }
        }

        job.transition(JobState::Exhausted);
        let reason = last_error
            .map(exhaustion_reason)
            .unwrap_or(ExhaustionReason::Unrecoverable);
        warn!(
            section = %spec.key,
            attempts = job.attempt,
            reason = ?reason,
            "Section exhausted, using empty default"
        );
        SectionOutcome::degraded(spec, job.attempt, reason)
    }

    async fn attempt(
        &self,
        job: &mut GenerationJob,
        spec: &SectionSpec,
        messages: &[ChatMessage],
    ) -> Result<SectionValue, ApiError> {
        job.transition(JobState::InFlight);
        let start = Instant::now();
        info!(
            section = %spec.key,
            provider_name = %self.client.provider_name(),
            model = %self.client.model_name(),
            attempt = job.attempt,
            message_count = messages.len(),
            "Provider request sent"
        );
        let response = self
            .client
            .complete(messages.to_vec(), self.options.clone())
            .await?;
        info!(
            section = %spec.key,
            attempt = job.attempt,
            duration_ms = start.elapsed().as_millis(),
            response_chars = response.content.chars().count(),
            "Provider response received"
        );

        job.transition(JobState::Repairing);
        let repaired = repair(&response.content, &spec.key);
        let value = repaired
            .section_value(&spec.key)
            .ok_or_else(|| ApiError::Unrecoverable {
                section: spec.key.clone(),
            })?;

        job.transition(JobState::Validating);
        self.validation.validate(spec, value)
    }
}

fn exhaustion_reason(err: ApiError) -> ExhaustionReason {
    match err {
        ApiError::Transport(transport) => ExhaustionReason::Transport(transport.to_string()),
        ApiError::ValidationFailure { reason, .. } => ExhaustionReason::Validation(reason),
        ApiError::Unrecoverable { .. } => ExhaustionReason::Unrecoverable,
        other => ExhaustionReason::Validation(other.to_string()),
    }
}
