//! Error types for the CTC greedy decoder.
//!
//! All decoder failures are detected before any output is written, so a returned
//! error always means the output buffers were left untouched.

use std::io;
use thiserror::Error;

/// Primary error type for the crate.
#[derive(Debug, Error)]
pub enum DecoderError {
    /// Malformed shapes, lengths or configuration detected before decoding.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The output time extent cannot hold a sequence's valid length.
    #[error(
        "Output too small: sequence {sequence} needs {required} time slots but the output holds {available}"
    )]
    OutputTooSmall {
        /// Index of the offending sequence in the batch.
        sequence: usize,
        /// Declared valid length of that sequence.
        required: usize,
        /// Time extent of the output buffer.
        available: usize,
    },

    /// Errors from loading or validating configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Errors from the underlying IO system.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse error category, for callers that only branch on the kind of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    OutputTooSmall,
    Configuration,
    Io,
}

impl DecoderError {
    /// Shorthand for building an [`DecoderError::InvalidArgument`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        DecoderError::InvalidArgument(msg.into())
    }

    /// The category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DecoderError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            DecoderError::OutputTooSmall { .. } => ErrorKind::OutputTooSmall,
            DecoderError::Configuration(_) => ErrorKind::Configuration,
            DecoderError::Io(_) | DecoderError::Json(_) => ErrorKind::Io,
        }
    }
}

/// Convenience type alias for Results with DecoderError.
pub type Result<T> = std::result::Result<T, DecoderError>;

/// Extension trait for adding context to foreign errors.
pub trait ErrorContext<T> {
    /// Convert into a configuration error prefixed with `context`.
    fn config_context(self, context: &'static str) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::fmt::Display,
{
    fn config_context(self, context: &'static str) -> Result<T> {
        self.map_err(|e| DecoderError::Configuration(format!("{}: {}", context, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            DecoderError::invalid("bad blank").kind(),
            ErrorKind::InvalidArgument
        );
        let err = DecoderError::OutputTooSmall {
            sequence: 1,
            required: 8,
            available: 4,
        };
        assert_eq!(err.kind(), ErrorKind::OutputTooSmall);
        assert_eq!(
            err.to_string(),
            "Output too small: sequence 1 needs 8 time slots but the output holds 4"
        );
    }

    #[test]
    fn test_config_context() {
        let raw: std::result::Result<(), String> = Err("missing field".to_string());
        let err = raw.config_context("Failed to load configuration").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(
            err.to_string(),
            "Configuration error: Failed to load configuration: missing field"
        );
    }
}
