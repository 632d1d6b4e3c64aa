//! Error types for the proposal generator.
//!
//! Library crates use [`ProposalError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all proposal generator operations.
#[derive(Debug, thiserror::Error)]
pub enum ProposalError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error talking to the completion service or blob storage.
    #[error("network error: {0}")]
    Network(String),

    /// JSON or reference-data parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// State store or database error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Completion service error (API, model, or response shape).
    #[error("completion error: {0}")]
    Completion(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (blank input, malformed field value, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Document serialization error.
    #[error("render error: {0}")]
    Render(String),

    /// Blob publication error.
    #[error("publish error: {0}")]
    Publish(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ProposalError>;

impl ProposalError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = ProposalError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = ProposalError::validation("no input provided");
        assert!(err.to_string().contains("no input provided"));

        let err = ProposalError::Completion("rate limited".into());
        assert_eq!(err.to_string(), "completion error: rate limited");
    }

    #[test]
    fn io_error_keeps_path() {
        let err = ProposalError::io(
            "/tmp/projectinfo.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        let text = err.to_string();
        assert!(text.contains("projectinfo.json"));
        assert!(text.contains("gone"));
    }
}
