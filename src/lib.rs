//! Planwright: business plan generation, one section at a time
//!
//! A section registry describes the document. For every section the orchestrator builds a
//! prompt, calls the generation service, repairs the free-text reply into structured data and
//! validates it, retrying with backoff and degrading to an empty value when attempts run out.
//! The merged document always carries every registry key.

pub mod cli;
pub mod config;
pub mod context;
pub mod document;
pub mod enhance;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod repair;
pub mod retry;
pub mod section;
pub mod suggest;
pub mod validate;

pub use context::GenerationContext;
pub use document::{Document, ExhaustionReason, GeneratedDocument, SectionStatus, SectionValue};
pub use error::{ApiError, TransportError};
pub use orchestrator::{DocumentOrchestrator, OrchestratorSettings};
pub use section::{SectionKind, SectionRegistry, SectionSpec};
