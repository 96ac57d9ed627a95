//! Error types for the section generation pipeline.

use thiserror::Error;

/// Failures at the provider transport boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Provider request failed: {0}")]
    RequestFailed(String),

    #[error("Provider authentication failed: {0}")]
    AuthFailed(String),

    #[error("Provider rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Provider model not found: {0}")]
    ModelNotFound(String),

    #[error("Payload too large, reduce the input size: {0}")]
    PayloadTooLarge(String),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// Library-wide error type.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("No structured value could be recovered for section '{section}'")]
    Unrecoverable { section: String },

    #[error("Section '{section}' failed validation: {reason}")]
    ValidationFailure { section: String, reason: String },

    #[error("Unknown section: {0}")]
    UnknownSection(String),

    #[error("Section registry defect: {0}")]
    RegistryDefect(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Document generation timed out before any section completed")]
    Timeout,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

impl From<toml::de::Error> for ApiError {
    fn from(err: toml::de::Error) -> Self {
        ApiError::ConfigError(format!("Invalid catalog file: {}", err))
    }
}
