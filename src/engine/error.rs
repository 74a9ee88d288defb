//! Errors returned by the hybrid query engine.

use thiserror::Error;

use crate::embedding::EmbeddingError;
use crate::error::{ClassifiedError, ErrorKind};

/// Errors returned by [`super::HybridQueryEngine`] operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The query embedding could not be computed.
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    /// Fetching documents for the final result set failed unexpectedly.
    #[error("failed to resolve matched documents: {reason}")]
    DocumentResolution {
        /// Underlying failure description.
        reason: String,
    },
}

impl ClassifiedError for EngineError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Embedding(e) => e.kind(),
            Self::DocumentResolution { .. } => ErrorKind::Internal,
        }
    }
}
