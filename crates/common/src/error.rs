//! Error types shared across Frameforge crates.

use std::path::PathBuf;

/// Top-level error type for Frameforge operations.
///
/// The first four variants are raised before the encoder runs; `EncodingFailure`
/// carries the engine's own message unchanged.
#[derive(Debug, thiserror::Error)]
pub enum FrameforgeError {
    #[error("{field} should be in type {expected}. You provided {actual}")]
    TypeMismatch {
        field: &'static str,
        expected: &'static str,
        actual: String,
    },

    #[error("{field} should be an object with input and output properties")]
    MissingOrInvalidField { field: &'static str },

    #[error("backgroundVideo property is not correctly set: {reason}")]
    MalformedBackgroundVideoSpec { reason: String },

    #[error("Cannot create/access output directory {}: {message}", path.display())]
    DirectoryUnavailable { path: PathBuf, message: String },

    #[error("{message}")]
    EncodingFailure { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type alias using FrameforgeError.
pub type FrameforgeResult<T> = Result<T, FrameforgeError>;

impl FrameforgeError {
    pub fn type_mismatch(
        field: &'static str,
        expected: &'static str,
        actual: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            field,
            expected,
            actual: actual.into(),
        }
    }

    pub fn missing_field(field: &'static str) -> Self {
        Self::MissingOrInvalidField { field }
    }

    pub fn malformed_background(reason: impl Into<String>) -> Self {
        Self::MalformedBackgroundVideoSpec {
            reason: reason.into(),
        }
    }

    pub fn directory_unavailable(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::DirectoryUnavailable {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::EncodingFailure {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }
}
