//! The [`VectorBackend`] trait: the closed interface the hybrid engine
//! depends on, expressed as a trait with a closed variant set plus a factory
//! keyed by a configuration string.

use async_trait::async_trait;

use super::error::VectorBackendError;
use super::model::{BackendHealth, BackendStatistics, VectorDocument, VectorMatch};

/// Abstraction over an external vector store. The hybrid engine only ever
/// talks to the reliability-wrapped [`super::adapter::VectorBackendAdapter`],
/// never directly to an implementation of this trait.
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Inserts or overwrites a batch of documents with their embeddings.
    async fn add_documents(&self, docs: Vec<VectorDocument>) -> Result<(), VectorBackendError>;

    /// Dense vector similarity search, returning the top `top_k` matches.
    async fn query_vector(
        &self,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorMatch>, VectorBackendError>;

    /// Sparse/keyword search, if the backend supports it natively. Default:
    /// unsupported.
    async fn query_keyword(
        &self,
        _text: &str,
        _top_k: usize,
    ) -> Result<Vec<VectorMatch>, VectorBackendError> {
        Err(VectorBackendError::NotSupported {
            operation: "query_keyword",
        })
    }

    /// Backend-native hybrid search, if supported. Default: unsupported (the
    /// hybrid engine performs fusion itself in that case).
    async fn query_hybrid(
        &self,
        _embedding: &[f32],
        _text: &str,
        _top_k: usize,
        _alpha: f32,
    ) -> Result<Vec<VectorMatch>, VectorBackendError> {
        Err(VectorBackendError::NotSupported {
            operation: "query_hybrid",
        })
    }

    /// Deletes documents by id, returning the count actually removed.
    async fn delete_documents(&self, ids: &[String]) -> Result<usize, VectorBackendError>;

    /// Aggregate collection statistics.
    async fn get_statistics(&self) -> Result<BackendStatistics, VectorBackendError>;

    /// A direct health probe, bypassing the circuit breaker.
    async fn get_health(&self) -> Result<BackendHealth, VectorBackendError>;
}
