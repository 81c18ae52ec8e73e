//! Centralized error types for spamsift.
//!
//! Only fatal conditions are expressed as errors. Per-message problems
//! (bad headers, undecodable bodies, unparseable URLs) are degraded to
//! safe defaults inside the record builder and logged as diagnostics,
//! so a single malformed message never aborts a batch.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the spamsift library.
#[derive(Error, Debug)]
pub enum SiftError {
    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// A required dataset resource (index file, corpus folder) is absent.
    #[error("Missing resource at '{path}': {hint}")]
    MissingResource { path: PathBuf, hint: String },

    /// The table file is corrupt or was written with an incompatible version.
    #[error("Corrupt or incompatible table '{path}': {reason}")]
    InvalidTable { path: PathBuf, reason: String },

    /// A message filename stem is not of the form `<integer>_<label>`.
    #[error("Invalid message identifier '{0}': expected '<integer>_<label>'")]
    BadIdentifier(String),

    /// The labels file could not be read or written.
    #[error("Labels file error at '{path}': {reason}")]
    LabelsFile { path: PathBuf, reason: String },

    /// Prediction or weight introspection was attempted before training.
    #[error("Model has not been trained yet. Call `train()` first.")]
    Untrained,

    /// The training data cannot produce a classifier.
    #[error("Unusable training data: {0}")]
    TrainingData(String),
}

/// Convenience alias for `Result<T, SiftError>`.
pub type Result<T> = std::result::Result<T, SiftError>;

impl SiftError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` inside functions returning `SiftError`
/// when no path context is available (rare — prefer `SiftError::io`).
impl From<std::io::Error> for SiftError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
