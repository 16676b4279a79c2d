//! Error types for the sessiondigest domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each pipeline stage has its own error type; [`Error`] is the per-item
//! union the batch runner catches and turns into a failure outcome.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The per-item error type for every pipeline stage.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Processing error: {0}")]
    Processing(#[from] ProcessingError),

    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),

    #[error("I/O error: {0}")]
    Io(#[from] IoError),
}

impl Error {
    /// The coarse category recorded in a batch failure outcome.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::Processing(_) => ErrorKind::Processing,
            Error::Adapter(_) => ErrorKind::Adapter,
            Error::Io(_) => ErrorKind::Io,
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Error category reported per failed batch item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Processing,
    Adapter,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "ValidationError",
            ErrorKind::Processing => "ProcessingError",
            ErrorKind::Adapter => "AdapterError",
            ErrorKind::Io => "IOError",
        };
        f.write_str(name)
    }
}

// --- Validation ---

/// A single problem found while validating an input record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    /// JSON path of the offending value, e.g. `llm_conversation[2].role`
    pub path: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Input did not conform to the session schema.
///
/// Carries every issue found by the validation pass, not just the first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn new(issues: Vec<FieldIssue>) -> Self {
        Self { issues }
    }

    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(vec![FieldIssue::new(path, message)])
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.issues.as_slice() {
            [] => f.write_str("invalid session record"),
            [only] => write!(f, "{}: {}", only.path, only.message),
            [first, rest @ ..] => write!(
                f,
                "{}: {} (and {} more issue(s))",
                first.path,
                first.message,
                rest.len()
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

// --- Processing ---

#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("enrichment is required but failed: {0}")]
    EnrichmentRequired(#[source] AdapterError),

    #[error("failed to encode processed record: {0}")]
    Encode(String),
}

// --- LLM adapter ---

#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    #[error("provider call failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("provider did not answer within {secs}s")]
    Timeout { secs: u64 },

    #[error("provider returned a malformed payload: {0}")]
    MalformedPayload(String),

    #[error("payload does not match the expected shape: {0}")]
    SchemaMismatch(String),
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

// --- I/O boundary ---

#[derive(Debug, Clone, Error)]
pub enum IoError {
    #[error("failed to read {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("failed to write {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    #[error("failed to copy {from} to {to}: {reason}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        reason: String,
    },

    #[error("failed to create directory {path}: {reason}")]
    CreateDir { path: PathBuf, reason: String },

    #[error("failed to list {path}: {reason}")]
    List { path: PathBuf, reason: String },

    #[error("output directory {path} is already used by another input")]
    OutputClaimed { path: PathBuf },
}
