//! Types returned by the hybrid query engine.

use serde::{Deserialize, Serialize};

use crate::repository::Document;

/// A document paired with the score it earned in a particular search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    /// The matched document.
    pub document: Document,
    /// Score in `[0, 1]` (keyword/vector) or a fused combination (hybrid).
    pub score: f32,
}

/// Which retrieval phase(s) a search or re-rank draws its candidate pool
/// from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Dense vector similarity only.
    Vector,
    /// Sparse keyword matching only.
    Keyword,
    /// Fused vector + keyword.
    Hybrid,
}

/// The result of a search that can gracefully degrade.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    /// Ranked results, already truncated to the requested `top_k`.
    pub results: Vec<ScoredDocument>,
    /// Set when the vector phase failed and the engine fell back to a
    /// narrower result set (keyword-only, or empty).
    pub degraded: bool,
}
