//! Typed errors for the claim extraction library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use thiserror::Error;

/// Errors surfaced to callers of the extraction pipeline.
///
/// Everything else (model failures, open circuits, validation rejections)
/// is absorbed and converted into a degraded result.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Input text was empty or whitespace-only
    #[error("cannot extract from empty input")]
    EmptyInput,

    /// Operation was cancelled by the caller
    #[error("operation cancelled")]
    Cancelled,
}

/// Errors raised by an external extraction capability.
#[derive(Debug, Clone, Error)]
pub enum ExtractorError {
    /// Network failure, timeout, rate limit, or server-side error
    #[error("transient extractor failure: {0}")]
    Transient(String),

    /// The model answered but produced nothing usable (empty tokens,
    /// malformed or unalignable output)
    #[error("empty response from {model}: {reason}")]
    EmptyResponse { model: String, reason: String },
}

impl ExtractorError {
    /// Create an empty-response error for a model.
    pub fn empty_response(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EmptyResponse {
            model: model.into(),
            reason: reason.into(),
        }
    }

    /// Returns the failure kind used for retry decisions.
    ///
    /// Empty responses are never retried against the same model.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Transient(_) => FailureKind::Retryable,
            Self::EmptyResponse { .. } => FailureKind::NonRetryable,
        }
    }
}

/// Classification of extractor failures for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Failure may be transient; the call should be retried.
    ///
    /// Examples: network timeout, temporary unavailability, rate limiting
    Retryable,

    /// Failure is permanent for this model; move on to the next one.
    NonRetryable,
}

/// The circuit breaker rejected a call without attempting it.
#[derive(Debug, Clone, Error)]
#[error("circuit breaker is open (retry in {retry_in_ms}ms)")]
pub struct CircuitOpenError {
    /// Milliseconds until the breaker will allow a half-open trial
    pub retry_in_ms: u64,
}

/// A rule in an externally supplied pattern library is invalid.
#[derive(Debug, Error)]
pub enum PatternError {
    /// Regex failed to compile
    #[error("invalid pattern '{label}' in {category}: {source}")]
    InvalidRegex {
        category: String,
        label: String,
        #[source]
        source: regex::Error,
    },

    /// JSON document could not be parsed
    #[error("invalid pattern library document: {0}")]
    Document(#[from] serde_json::Error),

    /// Document could not be read
    #[error("failed to read pattern library: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Result type alias for extractor calls.
pub type ExtractorResult<T> = std::result::Result<T, ExtractorError>;
