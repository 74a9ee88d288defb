//! Project and query-result types.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::engine::SearchMode;
use crate::query::expander::ExpandedQuery;
use crate::vectordb::{BackendHealth, BackendStatistics};

/// `(project_id, name, description, embedding_model_name, collection_handle,
/// created_at)`. Each project owns a distinct repository, embedding cache,
/// semantic cache, and vector-store collection. The embedding model is fixed
/// at creation; changing it requires creating a new project.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    /// Stable identifier, caller-supplied or generated.
    pub project_id: String,
    /// Display name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Fixed for the project's lifetime.
    pub embedding_model_name: String,
    /// The vector-store collection this project's documents live in.
    pub collection_handle: String,
    /// Arbitrary caller metadata.
    pub metadata: HashMap<String, String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Partial update accepted by [`super::manager::ProjectManager::update_project`].
/// Embedding model is deliberately absent: it is immutable after creation.
#[derive(Debug, Clone, Default)]
pub struct ProjectUpdate {
    /// New display name, if changing.
    pub name: Option<String>,
    /// New description, if changing.
    pub description: Option<String>,
    /// Metadata entries to merge in (existing keys are overwritten).
    pub metadata: Option<HashMap<String, String>>,
}

/// Options accepted by [`super::manager::ProjectManager::query_project`].
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Which retrieval phase(s) to draw from.
    pub mode: SearchMode,
    /// Number of results to return.
    pub top_k: usize,
    /// Vector weight override for hybrid fusion; `None` uses the project's
    /// configured default.
    pub alpha: Option<f32>,
    /// Whether a vector-phase failure degrades to keyword-only rather than
    /// propagating.
    pub fallback_on_error: bool,
    /// Apply query expansion (acronym/synonym) before retrieval.
    pub expand_query: bool,
    /// Re-rank the retrieved set with MMR at this `lambda`, if set.
    pub mmr_lambda: Option<f32>,
    /// Re-rank the retrieved set with diversity sampling at this threshold,
    /// if set. Mutually exclusive with `mmr_lambda`; MMR takes precedence.
    pub diversity_threshold: Option<f32>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            mode: SearchMode::Hybrid,
            top_k: 10,
            alpha: None,
            fallback_on_error: true,
            expand_query: false,
            mmr_lambda: None,
            diversity_threshold: None,
        }
    }
}

/// The result of [`super::manager::ProjectManager::query_project`].
#[derive(Debug, Clone)]
pub struct ProjectQueryResult {
    /// Ranked results.
    pub results: Vec<crate::engine::ScoredDocument>,
    /// Set when the engine degraded (vector-phase failure absorbed).
    pub degraded: bool,
    /// Query expansion detail, present only when `expand_query` was set.
    pub expansion: Option<ExpandedQuery>,
}

/// The result of [`super::manager::ProjectManager::get_project_stats`].
#[derive(Debug, Clone)]
pub struct ProjectStats {
    /// Document and index-term counts.
    pub documents: usize,
    /// Distinct indexed terms.
    pub terms: usize,
    /// Semantic cache statistics.
    pub cache_size: usize,
    /// Embedding cache statistics.
    pub embedding_cache_size: usize,
    /// Vector backend statistics, if the backend probe succeeded.
    pub backend: Option<BackendStatistics>,
    /// Vector backend health, if the backend probe succeeded.
    pub backend_health: Option<BackendHealth>,
}
