//! Error types for alignwatch.
//!
//! Library crates use [`AlignwatchError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all alignwatch operations.
#[derive(Debug, thiserror::Error)]
pub enum AlignwatchError {
    /// Transport failure or non-2xx response.
    #[error("network error: {0}")]
    Network(String),

    /// Response body did not match the expected schema.
    #[error("malformed payload: {message}")]
    MalformedPayload { message: String },

    /// A supplementary artifact failed while the mandatory one succeeded.
    #[error("artifact '{artifact}' unavailable: {reason}")]
    PartialArtifact { artifact: String, reason: String },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Invalid input (bad job id, bad URL template, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, AlignwatchError>;

impl AlignwatchError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a malformed-payload error from any displayable message.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedPayload {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Downgrade a supplementary artifact failure into a partial-artifact error.
    pub fn partial(artifact: impl Into<String>, cause: &AlignwatchError) -> Self {
        Self::PartialArtifact {
            artifact: artifact.into(),
            reason: cause.to_string(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
