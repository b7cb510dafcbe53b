//! Error types for SMS Triage.

use std::time::Duration;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Persistence errors. These are logged by the pipeline and never
/// alter an already-computed result.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Primary extractor errors. Every variant is recoverable; the pipeline
/// falls back to deterministic extraction instead of failing.
#[derive(Debug, thiserror::Error)]
pub enum ExtractorError {
    #[error("Extractor {extractor} request failed: {reason}")]
    RequestFailed { extractor: String, reason: String },

    #[error("Invalid response from {extractor}: {reason}")]
    InvalidResponse { extractor: String, reason: String },

    #[error("Extractor {extractor} timed out after {timeout:?}")]
    Timeout { extractor: String, timeout: Duration },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Pipeline-stage errors. Anything surfacing here after the filter decision
/// becomes a `status = error` result with partial diagnostics retained.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Serialization failed: {0}")]
    Serialization(String),
}
