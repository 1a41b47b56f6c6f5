use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the feature pipeline.
///
/// Malformed URLs never produce one of these; they degrade to default
/// feature values instead (see [`crate::url_parts::UrlParts::degraded`]).
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Transform was requested before the pipeline was fitted or loaded.
    #[error("pipeline is not fitted: call fit() or load a persisted state first")]
    NotFitted,

    /// Fit was called with zero documents.
    #[error("cannot fit on an empty corpus")]
    EmptyCorpus,

    /// A construction parameter is out of range.
    #[error("invalid configuration: {param} = {value}, expected {constraint}")]
    InvalidConfig {
        param: String,
        value: String,
        constraint: String,
    },

    /// Matrix width does not match what the consumer expects.
    #[error("dimension mismatch: expected {expected} columns, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Failures while reading or writing a persisted pipeline state.
///
/// All of these are fatal at startup: a consumer must not serve with a
/// partially loaded state.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed pipeline state: {0}")]
    Malformed(String),

    #[error("unsupported artifact format {found:?} (expected {expected:?})")]
    UnsupportedFormat { found: String, expected: &'static str },

    #[error("unsupported artifact version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("checksum mismatch: header {expected}, body {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("lexical schema mismatch at column {index}: stored {stored:?}, expected {expected:?}")]
    SchemaMismatch {
        index: usize,
        stored: String,
        expected: String,
    },

    #[error("inconsistent {block} vocabulary: {reason}")]
    Inconsistent { block: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
