//! Error types for the prefuel recommendation pipeline.

use thiserror::Error;

/// Failures of the external generation service.
///
/// These are fatal to a pipeline run: the orchestrator stops at the failing stage
/// and hands the error back unchanged. Nothing here is retried.
#[derive(Debug, Error)]
pub enum GenerationServiceError {
    #[error("Provider authentication failed: {0}")]
    AuthFailed(String),

    #[error("Provider rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Provider model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider request failed: {0}")]
    RequestFailed(String),

    #[error("Provider error: {0}")]
    Provider(String),
}

/// Errors raised while building or driving the pipeline from the outside.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Generation(#[from] GenerationServiceError),

    #[error("Invalid activity context: {0}")]
    InvalidContext(String),

    #[error("Invalid pipeline plan: {0}")]
    InvalidPlan(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
