//! Types exchanged across the [`super::VectorBackend`] boundary.

use std::collections::HashMap;

/// A single scored match returned by a vector or keyword query.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorMatch {
    /// The matched document id.
    pub doc_id: String,
    /// Similarity or relevance score. Interpretation (cosine, BM25, …) is
    /// backend-specific; the hybrid engine only relies on "higher is better".
    pub score: f32,
    /// Backend-stored metadata for the match.
    pub metadata: HashMap<String, String>,
}

/// Aggregate statistics reported by a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendStatistics {
    /// Backend implementation name (e.g. `"qdrant"`, `"mock"`).
    pub backend: String,
    /// Collection name this project is bound to.
    pub collection: String,
    /// Number of documents (points) stored in the collection.
    pub total_documents: usize,
    /// Embedding dimension of the collection.
    pub dimension: usize,
}

/// Coarse health classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Backend reachable, circuit closed.
    Healthy,
    /// Backend reachable but the circuit breaker is not fully closed, or a
    /// non-fatal condition was observed.
    Degraded,
    /// Backend unreachable or the circuit breaker is open.
    Unhealthy,
}

/// Health snapshot for a backend, as surfaced by a project's stats endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendHealth {
    /// Coarse health classification.
    pub status: HealthStatus,
    /// Whether the last direct probe reached the backend at all.
    pub backend_available: bool,
    /// Current circuit breaker state, as a label (`"closed"`, `"open"`, `"half_open"`).
    pub circuit_breaker_state: String,
    /// The most recent error message observed, if any.
    pub last_error: Option<String>,
}

/// A single document destined for the vector backend, paired with its
/// embedding for `add_documents`.
#[derive(Debug, Clone)]
pub struct VectorDocument {
    /// Document id.
    pub doc_id: String,
    /// Pre-computed embedding.
    pub embedding: Vec<f32>,
    /// Full text content, stored alongside the vector for keyword/hybrid
    /// backends that support it.
    pub content: String,
    /// Arbitrary metadata stored with the point.
    pub metadata: HashMap<String, String>,
}
