//! Errors returned by vector backend operations.

use thiserror::Error;

use crate::error::{ClassifiedError, ErrorKind};

/// Errors returned by a [`super::VectorBackend`] implementation.
#[derive(Debug, Error)]
pub enum VectorBackendError {
    /// Could not reach the backend endpoint.
    #[error("failed to connect to vector backend at '{url}': {message}")]
    ConnectionFailed {
        /// Endpoint URL.
        url: String,
        /// Underlying error message.
        message: String,
    },

    /// The backend did not respond within the configured timeout.
    #[error("vector backend request timed out after {timeout_ms}ms")]
    Timeout {
        /// Configured timeout, in milliseconds.
        timeout_ms: u64,
    },

    /// Collection creation or lookup failed.
    #[error("collection operation failed for '{collection}': {message}")]
    CollectionFailed {
        /// Collection name.
        collection: String,
        /// Underlying error message.
        message: String,
    },

    /// The named collection does not exist.
    #[error("collection not found: {collection}")]
    CollectionNotFound {
        /// Collection name.
        collection: String,
    },

    /// A vector had the wrong dimensionality for its collection.
    #[error("invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension.
        actual: usize,
    },

    /// Document insertion failed.
    #[error("failed to add documents to '{collection}': {message}")]
    AddDocumentsFailed {
        /// Collection name.
        collection: String,
        /// Underlying error message.
        message: String,
    },

    /// A query failed.
    #[error("query failed against '{collection}': {message}")]
    QueryFailed {
        /// Collection name.
        collection: String,
        /// Underlying error message.
        message: String,
    },

    /// Deletion failed.
    #[error("failed to delete documents from '{collection}': {message}")]
    DeleteFailed {
        /// Collection name.
        collection: String,
        /// Underlying error message.
        message: String,
    },

    /// The circuit breaker protecting this backend is open.
    #[error(transparent)]
    CircuitOpen(#[from] crate::resilience::circuit_breaker::CircuitBreakerError),

    /// The backend does not implement this optional operation (e.g.
    /// `query_keyword`/`query_hybrid` on a pure vector store).
    #[error("operation not supported by this backend: {operation}")]
    NotSupported {
        /// Name of the unsupported operation.
        operation: &'static str,
    },

    /// A factory configuration string named a backend kind outside the
    /// closed variant set (`"qdrant"`, `"mock"`).
    #[error("unknown vector backend kind: {kind}")]
    UnknownBackend {
        /// The unrecognized configuration string.
        kind: String,
    },
}

impl ClassifiedError for VectorBackendError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::ConnectionFailed { .. } => ErrorKind::Connection,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::CollectionFailed { .. }
            | Self::CollectionNotFound { .. }
            | Self::AddDocumentsFailed { .. }
            | Self::QueryFailed { .. }
            | Self::DeleteFailed { .. } => ErrorKind::Backend,
            Self::InvalidDimension { .. }
            | Self::NotSupported { .. }
            | Self::UnknownBackend { .. } => ErrorKind::Validation,
            Self::CircuitOpen(_) => ErrorKind::CircuitOpen,
        }
    }
}
