//! Errors returned by the project auth manager and its key store.

use thiserror::Error;

use crate::error::{ClassifiedError, ErrorKind};

/// Errors returned by [`super::manager::ProjectAuthManager`] operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No key exists with the given id.
    #[error("api key not found: {key_id}")]
    NotFound {
        /// The id that failed to resolve.
        key_id: String,
    },

    /// A caller-supplied field failed validation (empty name, unknown
    /// scope, non-positive expiry).
    #[error("invalid api key field: {reason}")]
    Validation {
        /// Human-readable description.
        reason: String,
    },

    /// The key store (rusqlite) failed unexpectedly.
    #[error("api key store error: {reason}")]
    Store {
        /// Underlying failure description.
        reason: String,
    },
}

impl ClassifiedError for AuthError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Store { .. } => ErrorKind::Internal,
        }
    }
}

impl From<rusqlite::Error> for AuthError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Store {
            reason: e.to_string(),
        }
    }
}
