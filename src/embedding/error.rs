//! Errors returned by embedding model loading and inference.

use std::path::PathBuf;
use thiserror::Error;

use crate::error::{ClassifiedError, ErrorKind};

/// Errors returned by an [`super::EmbeddingModel`] implementation.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Model files were not found.
    #[error("embedding model not found at path: {path}")]
    ModelNotFound {
        /// Missing model path.
        path: PathBuf,
    },

    /// Model load failed.
    #[error("failed to load embedding model: {reason}")]
    ModelLoadFailed {
        /// Error message.
        reason: String,
    },

    /// Inference failed.
    #[error("embedding inference failed: {reason}")]
    InferenceFailed {
        /// Error message.
        reason: String,
    },

    /// Tokenization failed.
    #[error("tokenization failed: {reason}")]
    TokenizationFailed {
        /// Error message.
        reason: String,
    },

    /// Configuration is invalid.
    #[error("invalid model configuration: {reason}")]
    InvalidConfig {
        /// Error message.
        reason: String,
    },
}

impl ClassifiedError for EmbeddingError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::ModelNotFound { .. } | Self::InvalidConfig { .. } => ErrorKind::Validation,
            Self::ModelLoadFailed { .. }
            | Self::InferenceFailed { .. }
            | Self::TokenizationFailed { .. } => ErrorKind::Internal,
        }
    }
}

impl From<candle_core::Error> for EmbeddingError {
    fn from(err: candle_core::Error) -> Self {
        EmbeddingError::InferenceFailed {
            reason: err.to_string(),
        }
    }
}

impl From<std::io::Error> for EmbeddingError {
    fn from(err: std::io::Error) -> Self {
        EmbeddingError::ModelLoadFailed {
            reason: err.to_string(),
        }
    }
}
