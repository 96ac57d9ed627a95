//! Configuration System
//!
//! Layered configuration: built-in defaults, the user-level global file, workspace files and
//! finally `PLANWRIGHT__SECTION__KEY` environment variables. The loaded `PlanwrightConfig` is
//! passed down explicitly; nothing here is a global.

use crate::error::ApiError;
use crate::logging::LoggingConfig;
use crate::orchestrator::OrchestratorSettings;
use crate::provider::{CompletionOptions, ModelProvider, TransportSettings, MAX_OUTPUT_TOKENS};
use crate::retry::RetryPolicy;
use crate::section::SectionRegistry;
use crate::validate::ValidationPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod merge {
    pub mod merge_policy;
}
mod sources {
    pub mod environment;
    pub mod global_file;
    pub mod workspace_file;
}

pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanwrightConfig {
    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which OpenAI-compatible service to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    #[serde(rename = "openai")]
    OpenAI,
    Groq,
    Local,
}

impl ProviderType {
    /// Environment variable consulted when no API key is configured.
    pub fn api_key_env(self) -> Option<&'static str> {
        match self {
            ProviderType::OpenAI => Some("OPENAI_API_KEY"),
            ProviderType::Groq => Some("GROQ_API_KEY"),
            ProviderType::Local => None,
        }
    }
}

/// Generation service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_type")]
    pub provider_type: ProviderType,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL override; required for `local`
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_provider_type() -> ProviderType {
    ProviderType::Groq
}

fn default_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_temperature() -> f32 {
    0.6
}

fn default_max_tokens() -> u32 {
    8000
}

fn default_max_message_chars() -> usize {
    8000
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: default_provider_type(),
            model: default_model(),
            api_key: None,
            endpoint: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_message_chars: default_max_message_chars(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ProviderConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("Model name cannot be empty".to_string());
        }
        if let Some(endpoint) = &self.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(format!("Invalid endpoint URL: {}", endpoint));
            }
        }
        if self.provider_type == ProviderType::Local && self.endpoint.is_none() {
            return Err("Local provider requires an endpoint".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "Temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            ));
        }
        if self.max_tokens == 0 {
            return Err("max_tokens must be greater than zero".to_string());
        }
        if self.max_message_chars == 0 {
            return Err("max_message_chars must be greater than zero".to_string());
        }
        Ok(())
    }

    /// Configured key, or the provider's conventional environment variable.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| {
                self.provider_type
                    .api_key_env()
                    .and_then(|var| std::env::var(var).ok())
                    .filter(|key| !key.trim().is_empty())
            })
    }

    pub fn to_model_provider(&self) -> Result<ModelProvider, ApiError> {
        let missing_key = || {
            ApiError::ConfigError(format!(
                "Missing API key for provider '{:?}': set provider.api_key or {}",
                self.provider_type,
                self.provider_type.api_key_env().unwrap_or("an API key"),
            ))
        };
        let model = self.model.clone();
        match self.provider_type {
            ProviderType::OpenAI => Ok(ModelProvider::OpenAI {
                model,
                api_key: self.resolved_api_key().ok_or_else(missing_key)?,
                base_url: self.endpoint.clone(),
            }),
            ProviderType::Groq => Ok(ModelProvider::Groq {
                model,
                api_key: self.resolved_api_key().ok_or_else(missing_key)?,
            }),
            ProviderType::Local => Ok(ModelProvider::LocalCustom {
                model,
                endpoint: self.endpoint.clone().ok_or_else(|| {
                    ApiError::ConfigError("Local provider requires an endpoint".to_string())
                })?,
                api_key: self.resolved_api_key(),
            }),
        }
    }

    pub fn completion_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens.min(MAX_OUTPUT_TOKENS)),
        }
    }

    pub fn transport_settings(&self) -> TransportSettings {
        TransportSettings {
            max_message_chars: self.max_message_chars,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

/// Orchestration, retry and validation knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_backoff_offset_ms")]
    pub backoff_offset_ms: u64,

    #[serde(default = "default_backoff_unit_ms")]
    pub backoff_unit_ms: u64,

    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    /// Delay between section dispatches
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,

    /// Whole-document deadline; unset means no deadline
    #[serde(default)]
    pub document_timeout_secs: Option<u64>,

    #[serde(default = "default_word_tolerance_percent")]
    pub word_tolerance_percent: u32,

    #[serde(default = "default_min_narrative_chars")]
    pub min_narrative_chars: usize,

    /// Run the enhancement pass after the first round
    #[serde(default = "default_true")]
    pub enhance: bool,

    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,

    #[serde(default = "default_reporting_years")]
    pub reporting_years: usize,

    /// TOML section catalog replacing the built-in one
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
}

fn default_max_attempts() -> u32 {
    crate::retry::DEFAULT_MAX_ATTEMPTS
}

fn default_backoff_offset_ms() -> u64 {
    crate::retry::DEFAULT_BACKOFF_OFFSET_MS
}

fn default_backoff_unit_ms() -> u64 {
    crate::retry::DEFAULT_BACKOFF_UNIT_MS
}

fn default_backoff_max_ms() -> u64 {
    crate::retry::DEFAULT_BACKOFF_MAX_MS
}

fn default_pacing_ms() -> u64 {
    300
}

fn default_word_tolerance_percent() -> u32 {
    crate::validate::DEFAULT_WORD_TOLERANCE_PERCENT
}

fn default_min_narrative_chars() -> usize {
    crate::validate::DEFAULT_MIN_NARRATIVE_CHARS
}

fn default_true() -> bool {
    true
}

fn default_max_input_chars() -> usize {
    crate::context::DEFAULT_MAX_INPUT_CHARS
}

fn default_reporting_years() -> usize {
    crate::section::catalog::DEFAULT_REPORTING_YEARS
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_offset_ms: default_backoff_offset_ms(),
            backoff_unit_ms: default_backoff_unit_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            pacing_ms: default_pacing_ms(),
            document_timeout_secs: None,
            word_tolerance_percent: default_word_tolerance_percent(),
            min_narrative_chars: default_min_narrative_chars(),
            enhance: default_true(),
            max_input_chars: default_max_input_chars(),
            reporting_years: default_reporting_years(),
            catalog_path: None,
        }
    }
}

impl GenerationConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }
        if self.word_tolerance_percent > 100 {
            return Err(format!(
                "word_tolerance_percent must be at most 100, got {}",
                self.word_tolerance_percent
            ));
        }
        if self.backoff_max_ms < self.backoff_offset_ms {
            return Err("backoff_max_ms cannot be lower than backoff_offset_ms".to_string());
        }
        if self.document_timeout_secs == Some(0) {
            return Err("document_timeout_secs must be greater than zero when set".to_string());
        }
        if self.reporting_years == 0 {
            return Err("reporting_years must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff_offset: Duration::from_millis(self.backoff_offset_ms),
            backoff_unit: Duration::from_millis(self.backoff_unit_ms),
            backoff_max: Duration::from_millis(self.backoff_max_ms),
        }
    }

    pub fn validation_policy(&self) -> ValidationPolicy {
        ValidationPolicy {
            word_tolerance_percent: self.word_tolerance_percent,
            min_narrative_chars: self.min_narrative_chars,
        }
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            pacing: Duration::from_millis(self.pacing_ms),
            document_timeout: self.document_timeout_secs.map(Duration::from_secs),
            enhance: self.enhance,
        }
    }

    /// Registry from `catalog_path`, or the built-in business plan catalog.
    pub fn load_registry(&self) -> Result<SectionRegistry, ApiError> {
        match &self.catalog_path {
            Some(path) => SectionRegistry::from_file(path),
            None => Ok(SectionRegistry::business_plan(self.reporting_years)),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Provider(String),
    Generation(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Provider(msg) => write!(f, "Provider: {}", msg),
            ValidationError::Generation(msg) => write!(f, "Generation: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl PlanwrightConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if let Err(e) = self.provider.validate() {
            errors.push(ValidationError::Provider(e));
        }
        if let Err(e) = self.generation.validate() {
            errors.push(ValidationError::Generation(e));
        }
        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and fold every problem into one `ConfigError`.
    pub fn ensure_valid(&self) -> Result<(), ApiError> {
        self.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })
    }
}

/// Loads `PlanwrightConfig` from its layered sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, then the global file, then `config/*.toml` under `workspace_root`,
    /// then `PLANWRIGHT__*` environment variables.
    pub fn load(workspace_root: &Path) -> Result<PlanwrightConfig, ApiError> {
        let builder = merge::merge_policy::builder_with_defaults()?;
        let builder = sources::global_file::add_to_builder(builder)?;
        let builder = sources::workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = sources::environment::add_to_builder(builder);
        Ok(builder.build()?.try_deserialize()?)
    }

    /// Defaults overlaid with a single explicit file.
    pub fn load_from_file(path: &Path) -> Result<PlanwrightConfig, ApiError> {
        if !path.exists() {
            return Err(ApiError::ConfigError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let builder = merge::merge_policy::builder_with_defaults()?
            .add_source(config::File::from(path).required(true));
        Ok(builder.build()?.try_deserialize()?)
    }
}
