//! Vector backend abstraction: the closed trait the hybrid engine depends
//! on, a reliability-wrapped adapter, and two implementations (Qdrant for
//! production, an in-memory store for tests and the `mock` feature).

pub mod adapter;
pub mod backend;
pub mod client;
pub mod error;
#[cfg(feature = "mock")]
pub mod mock;
pub mod model;

pub use adapter::{SharedVectorBackendAdapter, VectorBackendAdapter};
pub use backend::VectorBackend;
pub use client::QdrantBackend;
pub use error::VectorBackendError;
#[cfg(feature = "mock")]
pub use mock::InMemoryVectorBackend;
pub use model::{BackendHealth, BackendStatistics, HealthStatus, VectorDocument, VectorMatch};

/// Collection name prefix applied to every project-scoped Qdrant collection.
pub const COLLECTION_PREFIX: &str = "kbcore_project_";

/// Builds the collection name a project's vector data lives under.
pub fn collection_name(project_id: &str) -> String {
    format!("{COLLECTION_PREFIX}{project_id}")
}

/// The closed set of vector backend kinds a factory string may name.
pub const BACKEND_KIND_QDRANT: &str = "qdrant";
/// In-memory backend kind string, only buildable when the `mock` feature
/// is enabled.
pub const BACKEND_KIND_MOCK: &str = "mock";

/// Builds a reliability-wrapped [`VectorBackend`] trait object from a
/// configuration string naming one of the closed backend kinds. `url` is
/// only consulted for `"qdrant"`.
pub async fn create_vector_backend(
    kind: &str,
    url: &str,
    collection: &str,
    dimension: usize,
    circuit_breaker: crate::config::CircuitBreakerConfig,
    retry: crate::config::RetryConfig,
) -> Result<std::sync::Arc<dyn VectorBackend>, VectorBackendError> {
    match kind {
        BACKEND_KIND_QDRANT => {
            let backend = QdrantBackend::connect(url, collection, dimension).await?;
            Ok(std::sync::Arc::new(VectorBackendAdapter::new(
                backend,
                circuit_breaker,
                retry,
            )))
        }
        #[cfg(feature = "mock")]
        BACKEND_KIND_MOCK => {
            let backend = InMemoryVectorBackend::new(collection, dimension);
            Ok(std::sync::Arc::new(VectorBackendAdapter::new(
                backend,
                circuit_breaker,
                retry,
            )))
        }
        other => Err(VectorBackendError::UnknownBackend {
            kind: other.to_string(),
        }),
    }
}
