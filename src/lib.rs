//! # kbcore
//!
//! Hybrid-retrieval knowledge-base core: vector + keyword fusion search,
//! MMR/diversity and cross-encoder re-ranking, query expansion, and a
//! semantic cache, all behind a project-isolation layer with scoped API
//! keys.
//!
//! ```text
//! Query → (expand) → keyword ⊕ vector fusion → MMR/diversity → (rerank)
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use kbcore::Config;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! config.validate()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature flags
//!
//! | Feature | Purpose |
//! |---------|---------|
//! | `cpu` | CPU-only inference (docs.rs default) |
//! | `metal` | Apple Silicon GPU acceleration |
//! | `cuda` | NVIDIA GPU acceleration |
//! | `mock` | In-memory vector backend for tests/examples |
//!
//! ## Modules
//!
//! - [`project`] - Per-project isolation: repository, caches, engine, collection
//! - [`auth`] - Scoped, expiring, revocable API keys
//! - [`engine`] - Hybrid keyword/vector search with MMR/diversity
//! - [`rerank`] - Cross-encoder re-ranking over a small candidate pool
//! - [`query`] - Acronym/synonym query expansion
//! - [`cache`] - Bounded LRU, embedding cache, and semantic cache
//! - [`repository`] - Document store and inverted term index
//! - [`vectordb`] - Vector backend trait, Qdrant client, reliability adapter
//! - [`embedding`] - Candle-backed BERT-family embedder
//! - [`resilience`] - Circuit breaker and retry policy
//! - [`config`] - Environment-backed configuration
//! - [`error`] - Shared error classification vocabulary
//! - [`hashing`] - BLAKE3-based API-key secret hashing

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod auth;
pub mod cache;
pub mod config;
pub mod constants;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod hashing;
pub mod project;
pub mod query;
pub mod repository;
pub mod rerank;
pub mod resilience;
pub mod vectordb;

pub use auth::{ApiKey, ApiKeyMetadata, ApiKeyStore, AuthError, CreatedApiKey, ProjectAuthManager, Scope};
pub use cache::{CacheStats, EmbeddingCache, LruCache, SemanticCache, SemanticCacheStats, SemanticMatch};
pub use config::{CircuitBreakerConfig, Config, ConfigError, RetryConfig};
pub use constants::{DimConfig, DimValidationError, validate_embedding_dim};
pub use embedding::{CandleBertEmbedder, EmbeddingError, EmbeddingModel, EmbeddingModelConfig, EmbeddingModelFamily, MockEmbedder};
pub use engine::{EngineError, HybridQueryEngine, ScoredDocument, SearchMode, SearchOutcome};
pub use error::{ClassifiedError, ErrorKind};
pub use hashing::{generate_api_key_secret, hash_api_key_secret, hash_to_hex};
pub use project::{Project, ProjectError, ProjectManager, ProjectQueryResult, ProjectStats, ProjectStore, ProjectUpdate, QueryOptions};
pub use query::{ExpandedQuery, QueryExpander, SynonymLexicon};
pub use repository::{Document, DocumentRepository, RepositoryError, RepositoryStats};
pub use rerank::{rerank, CrossEncoderModel, RerankCandidate, RerankError, RerankedResult};
pub use resilience::{CircuitBreaker, CircuitBreakerError, CircuitMetrics, CircuitState, RetryCounters, RetryPolicy};
#[cfg(feature = "mock")]
pub use vectordb::InMemoryVectorBackend;
pub use vectordb::{
    collection_name, create_vector_backend, BackendHealth, BackendStatistics, HealthStatus, QdrantBackend,
    SharedVectorBackendAdapter, VectorBackend, VectorBackendAdapter, VectorBackendError, VectorDocument,
    VectorMatch, BACKEND_KIND_MOCK, BACKEND_KIND_QDRANT,
};
