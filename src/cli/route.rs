//! CLI route: single route table and run context.

use crate::cli::output::{format_report_text, format_sections_text};
use crate::cli::parse::Commands;
use crate::config::{ConfigLoader, PlanwrightConfig};
use crate::context::GenerationContext;
use crate::error::ApiError;
use crate::orchestrator::DocumentOrchestrator;
use crate::provider::{ModelProviderClient, ProviderFactory};
use crate::section::SectionRegistry;
use crate::suggest::generate_suggestions;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Runtime context for CLI execution: workspace and loaded configuration.
pub struct RunContext {
    workspace_root: PathBuf,
    config: PlanwrightConfig,
}

impl RunContext {
    /// Create run context from workspace root and optional config path.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        config.ensure_valid()?;
        Ok(Self {
            workspace_root,
            config,
        })
    }

    pub fn from_config(workspace_root: PathBuf, config: PlanwrightConfig) -> Self {
        Self {
            workspace_root,
            config,
        }
    }

    pub fn config(&self) -> &PlanwrightConfig {
        &self.config
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Generate {
                text,
                document,
                language,
                currency,
                section,
                no_enhance,
                report,
                output,
            } => {
                let documents = document
                    .iter()
                    .map(|path| self.read_document(path))
                    .collect::<Result<Vec<_>, _>>()?;
                if text.iter().all(|t| t.trim().is_empty()) && documents.is_empty() {
                    return Err(ApiError::ConfigError(
                        "Nothing to work from: pass at least one --text or --document".to_string(),
                    ));
                }
                let ctx = GenerationContext::from_inputs(
                    text,
                    &documents,
                    language,
                    currency,
                    self.config.generation.max_input_chars,
                );

                let mut config = self.config.clone();
                if *no_enhance {
                    config.generation.enhance = false;
                }
                let registry = Arc::new(config.generation.load_registry()?);
                let orchestrator =
                    DocumentOrchestrator::from_config(self.client()?, registry, &config);

                let generated = block_on(async {
                    if section.is_empty() {
                        orchestrator.generate(ctx).await
                    } else {
                        orchestrator.generate_sections(ctx, section).await
                    }
                })??;

                let value = if *report {
                    json!({ "document": generated.document.to_json(), "report": generated.report })
                } else {
                    generated.document.to_json()
                };
                let rendered = to_pretty(&value)?;
                match output {
                    Some(path) => {
                        std::fs::write(path, &rendered)?;
                        info!(path = %path.display(), "Document written");
                        Ok(format!(
                            "Wrote {}\n{}",
                            path.display(),
                            format_report_text(&generated)
                        ))
                    }
                    None => Ok(rendered),
                }
            }
            Commands::Sections { format } => {
                let registry = self.config.generation.load_registry()?;
                if format == "json" {
                    let specs: Vec<_> = registry.iter().collect();
                    to_pretty(&json!({ "sections": specs }))
                } else {
                    Ok(format_sections_text(&registry))
                }
            }
            Commands::Suggest { question } => {
                let client = self.client()?;
                let suggestions = block_on(generate_suggestions(client.as_ref(), question))??;
                Ok(suggestions
                    .iter()
                    .map(|s| format!("- {}", s))
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
        }
    }

    /// Active registry, for callers that only need the catalog.
    pub fn registry(&self) -> Result<SectionRegistry, ApiError> {
        self.config.generation.load_registry()
    }

    fn client(&self) -> Result<Arc<dyn ModelProviderClient>, ApiError> {
        let provider = self.config.provider.to_model_provider()?;
        let client =
            ProviderFactory::create_client(&provider, &self.config.provider.transport_settings())?;
        Ok(Arc::from(client))
    }

    fn read_document(&self, path: &Path) -> Result<String, ApiError> {
        let resolved = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        };
        std::fs::read_to_string(&resolved).map_err(|e| {
            ApiError::ConfigError(format!(
                "Failed to read document {}: {}",
                resolved.display(),
                e
            ))
        })
    }
}

fn block_on<F: std::future::Future>(future: F) -> Result<F::Output, ApiError> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| ApiError::ConfigError(format!("Failed to create async runtime: {}", e)))?;
    Ok(rt.block_on(future))
}

fn to_pretty(value: &serde_json::Value) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::ConfigError(format!("Failed to render JSON: {}", e)))
}
