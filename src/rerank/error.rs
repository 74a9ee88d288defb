//! Errors returned by the re-ranking components.

use thiserror::Error;

use crate::error::{ClassifiedError, ErrorKind};

/// Errors returned by a [`super::cross_encoder::CrossEncoderModel`].
#[derive(Debug, Error)]
pub enum RerankError {
    /// Malformed re-ranker configuration.
    #[error("invalid cross-encoder config: {reason}")]
    InvalidConfig {
        /// Why the configuration was rejected.
        reason: String,
    },

    /// The model or its weights could not be loaded.
    #[error("failed to load cross-encoder model: {reason}")]
    ModelLoadFailed {
        /// Underlying failure description.
        reason: String,
    },

    /// Tokenization of a query/candidate pair failed.
    #[error("tokenization failed: {reason}")]
    TokenizationFailed {
        /// Underlying failure description.
        reason: String,
    },

    /// Model inference failed.
    #[error("cross-encoder inference failed: {reason}")]
    InferenceFailed {
        /// Underlying failure description.
        reason: String,
    },

    /// A batch did not complete within its configured timeout; the caller
    /// falls back to input ordering rather than propagating this.
    #[error("cross-encoder batch timed out after {timeout_ms}ms")]
    Timeout {
        /// Configured timeout, in milliseconds.
        timeout_ms: u64,
    },
}

impl ClassifiedError for RerankError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfig { .. } => ErrorKind::Validation,
            Self::ModelLoadFailed { .. } | Self::TokenizationFailed { .. } => ErrorKind::Internal,
            Self::InferenceFailed { .. } => ErrorKind::Backend,
            Self::Timeout { .. } => ErrorKind::Timeout,
        }
    }
}

impl From<candle_core::Error> for RerankError {
    fn from(e: candle_core::Error) -> Self {
        Self::InferenceFailed {
            reason: e.to_string(),
        }
    }
}

impl From<std::io::Error> for RerankError {
    fn from(e: std::io::Error) -> Self {
        Self::ModelLoadFailed {
            reason: e.to_string(),
        }
    }
}
