//! Error types for TopicForge.
//!
//! Library crates use [`TopicForgeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all TopicForge operations.
#[derive(Debug, thiserror::Error)]
pub enum TopicForgeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Connectivity or timeout failure before a response status was received.
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status, with the code and raw body retained.
    #[error("api error: HTTP {status}: {body}")]
    ApiStatus { status: u16, body: String },

    /// Response arrived but its structure lacks the expected content.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Title extraction failure, terminal for the input that caused it.
    #[error("extraction error: {0}")]
    Extraction(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad input, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TopicForgeError>;

impl TopicForgeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
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
        let err = TopicForgeError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = TopicForgeError::ApiStatus {
            status: 503,
            body: "service unavailable".into(),
        };
        assert_eq!(
            err.to_string(),
            "api error: HTTP 503: service unavailable"
        );

        let err = TopicForgeError::Extraction("HTTP 401: bad key".into());
        assert!(err.to_string().contains("401"));
    }
}
