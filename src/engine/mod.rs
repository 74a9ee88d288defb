//! Hybrid query engine: composes keyword and vector retrieval with score
//! fusion, graceful degradation, and MMR/diversity re-ranking. Vector scoring
//! runs in-process over the embedding cache rather than through an external
//! ANN index — the vector backend adapter is the durability path for
//! `add_documents`/`delete_documents`, not the query path; see DESIGN.md.

pub mod error;
pub mod model;

pub use error::EngineError;
pub use model::{ScoredDocument, SearchMode, SearchOutcome};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::cache::embedding_cache::EmbeddingCache;
use crate::constants::DEFAULT_ALPHA;
use crate::embedding::EmbeddingModel;
use crate::repository::{tokenize, Document, DocumentRepository};
use crate::rerank::mmr::{select_diversity, select_mmr, RankedCandidate};

/// Cosine similarity; zero-norm vectors yield `0.0` rather than `NaN`.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Composes the document repository, embedding cache, and embedding model
/// into keyword, vector, and fused hybrid search.
pub struct HybridQueryEngine {
    repository: Arc<DocumentRepository>,
    embedding_cache: Arc<EmbeddingCache>,
    embedder: Arc<dyn EmbeddingModel>,
    alpha: f32,
}

impl HybridQueryEngine {
    /// Builds an engine over the given components, with `alpha` as the
    /// default vector weight for [`Self::search_hybrid`].
    pub fn new(
        repository: Arc<DocumentRepository>,
        embedding_cache: Arc<EmbeddingCache>,
        embedder: Arc<dyn EmbeddingModel>,
        alpha: f32,
    ) -> Self {
        Self {
            repository,
            embedding_cache,
            embedder,
            alpha: alpha.clamp(0.0, 1.0),
        }
    }

    /// Builds an engine using [`DEFAULT_ALPHA`].
    pub fn with_defaults(
        repository: Arc<DocumentRepository>,
        embedding_cache: Arc<EmbeddingCache>,
        embedder: Arc<dyn EmbeddingModel>,
    ) -> Self {
        Self::new(repository, embedding_cache, embedder, DEFAULT_ALPHA)
    }

    /// Lowercases and whitespace-splits `query`, snapshots the repository's
    /// index for exactly those terms, and ranks documents by match count,
    /// normalized by the number of unique query terms. Ties are broken by
    /// repository insertion order. Never truncated; callers top-k downstream.
    #[instrument(skip(self), fields(op = "search.keyword"))]
    pub fn search_keyword(&self, query: &str) -> Vec<ScoredDocument> {
        self.keyword_scores(query, usize::MAX)
            .into_iter()
            .filter_map(|(doc_id, score)| {
                self.repository
                    .get_document(&doc_id)
                    .map(|document| ScoredDocument { document, score })
            })
            .collect()
    }

    fn keyword_scores(&self, query: &str, limit: usize) -> Vec<(String, f32)> {
        if query.trim().is_empty() {
            return Vec::new();
        }

        let terms = tokenize(query);
        let unique_terms: HashSet<&String> = terms.iter().collect();
        let denom = unique_terms.len().max(1) as f32;

        let snapshot = self.repository.get_index_snapshot(&terms);
        let mut matches: HashMap<String, u32> = HashMap::new();
        for doc_ids in snapshot.values() {
            for doc_id in doc_ids {
                *matches.entry(doc_id.clone()).or_insert(0) += 1;
            }
        }

        let mut scored: Vec<(String, f32)> = matches
            .into_iter()
            .map(|(doc_id, count)| (doc_id, count as f32 / denom))
            .collect();

        scored.sort_by(|(a_id, a_score), (b_id, b_score)| {
            b_score
                .partial_cmp(a_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    let a_ord = self.repository.document_ordinal(a_id).unwrap_or(u64::MAX);
                    let b_ord = self.repository.document_ordinal(b_id).unwrap_or(u64::MAX);
                    a_ord.cmp(&b_ord)
                })
        });
        scored.truncate(limit);
        scored
    }

    fn embed_query(&self, query: &str) -> Result<Vec<f32>, EngineError> {
        self.embedder.embed(query).map_err(EngineError::from)
    }

    fn vector_scores(&self, query_embedding: &[f32], limit: usize) -> Vec<(String, f32)> {
        let embedder = Arc::clone(&self.embedder);
        let embed_fn = move |text: &str| embedder.embed(text).ok();

        let mut scored: Vec<(String, f32)> = self
            .repository
            .document_ids()
            .into_iter()
            .filter_map(|doc_id| {
                let content = self.repository.get_document(&doc_id)?.content;
                let embedding =
                    self.embedding_cache
                        .get_or_compute(&doc_id, &content, &embed_fn)?;
                Some((doc_id, cosine_similarity(query_embedding, &embedding)))
            })
            .collect();

        scored.sort_by(|(_, a), (_, b)| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        scored
    }

    /// Embeds `query` and ranks every known document by cosine similarity
    /// to it. Returns `(results, degraded)`: `degraded` is set when
    /// `fallback_on_error` absorbed an embedding failure into an empty
    /// result rather than propagating it.
    #[instrument(skip(self), fields(op = "search.vector"))]
    pub fn search_vector(
        &self,
        query: &str,
        top_k: usize,
        fallback_on_error: bool,
    ) -> Result<(Vec<ScoredDocument>, bool), EngineError> {
        if query.trim().is_empty() {
            return Ok((Vec::new(), false));
        }

        let embedding = match self.embed_query(query) {
            Ok(e) => e,
            Err(err) => {
                if fallback_on_error {
                    warn!(error = %err, "vector phase failed, returning degraded empty result");
                    return Ok((Vec::new(), true));
                }
                return Err(err);
            }
        };

        let results = self
            .vector_scores(&embedding, top_k)
            .into_iter()
            .filter_map(|(doc_id, score)| {
                self.repository
                    .get_document(&doc_id)
                    .map(|document| ScoredDocument { document, score })
            })
            .collect();

        Ok((results, false))
    }

    /// Fuses keyword and vector retrieval: `combined = alpha * vector_score
    /// + (1 - alpha) * keyword_score` over the union of candidate ids, each
    /// phase over-fetching `2 * top_k` candidates before the union. A
    /// vector-phase failure always degrades the result (never propagates):
    /// with `fallback_on_error` set, it substitutes keyword-only results;
    /// otherwise it returns an empty, degraded result directly.
    #[instrument(skip(self), fields(op = "search.hybrid"))]
    pub fn search_hybrid(
        &self,
        query: &str,
        alpha: Option<f32>,
        top_k: usize,
        fallback_on_error: bool,
    ) -> Result<(Vec<ScoredDocument>, bool), EngineError> {
        if query.trim().is_empty() {
            return Ok((Vec::new(), false));
        }

        let alpha = alpha.unwrap_or(self.alpha).clamp(0.0, 1.0);
        let over_fetch = top_k.saturating_mul(2).max(top_k);

        let vector_scores = match self.embed_query(query) {
            Ok(embedding) => Some(self.vector_scores(&embedding, over_fetch)),
            Err(err) => {
                warn!(error = %err, fallback_on_error, "hybrid vector phase failed");
                None
            }
        };

        // A vector-phase failure always degrades the result rather than
        // propagating: `fallback_on_error` only decides whether the
        // degraded path substitutes keyword-only results or gives up with
        // an empty list.
        let Some(vector_scores) = vector_scores else {
            if !fallback_on_error {
                return Ok((Vec::new(), true));
            }

            let keyword_scores = self.keyword_scores(query, over_fetch);
            if keyword_scores.is_empty() {
                return Ok((Vec::new(), true));
            }
            let results = keyword_scores
                .into_iter()
                .take(top_k)
                .filter_map(|(doc_id, score)| {
                    self.repository
                        .get_document(&doc_id)
                        .map(|document| ScoredDocument { document, score })
                })
                .collect();
            return Ok((results, true));
        };

        let keyword_scores = self.keyword_scores(query, over_fetch);
        let keyword_map: HashMap<String, f32> = keyword_scores.into_iter().collect();
        let vector_map: HashMap<String, f32> = vector_scores.into_iter().collect();

        let mut ids: HashSet<String> = HashSet::new();
        ids.extend(keyword_map.keys().cloned());
        ids.extend(vector_map.keys().cloned());

        let mut combined: Vec<(String, f32)> = ids
            .into_iter()
            .map(|id| {
                let v = vector_map.get(&id).copied().unwrap_or(0.0);
                let k = keyword_map.get(&id).copied().unwrap_or(0.0);
                (id, alpha * v + (1.0 - alpha) * k)
            })
            .collect();

        combined.sort_by(|(a_id, a), (b_id, b)| {
            b.partial_cmp(a)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    let a_ord = self.repository.document_ordinal(a_id).unwrap_or(u64::MAX);
                    let b_ord = self.repository.document_ordinal(b_id).unwrap_or(u64::MAX);
                    a_ord.cmp(&b_ord)
                })
        });
        combined.truncate(top_k);

        let ids: Vec<String> = combined.iter().map(|(id, _)| id.clone()).collect();
        let documents = self.repository.get_documents_by_ids(&ids);
        let doc_by_id: HashMap<String, Document> = documents
            .into_iter()
            .map(|d| (d.doc_id.clone(), d))
            .collect();

        let results = combined
            .into_iter()
            .filter_map(|(id, score)| doc_by_id.get(&id).cloned().map(|document| ScoredDocument { document, score }))
            .collect();

        Ok((results, false))
    }

    /// Builds the `(doc_id, relevance, embedding)` candidate pool for a
    /// given retrieval mode, used by both MMR and diversity re-ranking.
    fn ranked_candidates(
        &self,
        query: &str,
        mode: SearchMode,
        limit: usize,
    ) -> Result<Vec<RankedCandidate>, EngineError> {
        let scored: Vec<(String, f32)> = match mode {
            SearchMode::Keyword => self.keyword_scores(query, limit),
            SearchMode::Vector => {
                let embedding = self.embed_query(query)?;
                self.vector_scores(&embedding, limit)
            }
            SearchMode::Hybrid => {
                let (results, _) = self.search_hybrid(query, None, limit, true)?;
                results
                    .into_iter()
                    .map(|r| (r.document.doc_id, r.score))
                    .collect()
            }
        };

        let embedder = Arc::clone(&self.embedder);
        let embed_fn = move |text: &str| embedder.embed(text).ok();

        Ok(scored
            .into_iter()
            .filter_map(|(doc_id, relevance)| {
                let content = self.repository.get_document(&doc_id)?.content;
                let embedding =
                    self.embedding_cache
                        .get_or_compute(&doc_id, &content, &embed_fn)?;
                Some(RankedCandidate {
                    doc_id,
                    relevance,
                    embedding,
                })
            })
            .collect())
    }

    fn resolve(&self, ids: Vec<String>, scores_by_id: &HashMap<String, f32>) -> Vec<ScoredDocument> {
        let documents = self.repository.get_documents_by_ids(&ids);
        let doc_by_id: HashMap<String, Document> = documents
            .into_iter()
            .map(|d| (d.doc_id.clone(), d))
            .collect();

        ids.into_iter()
            .filter_map(|id| {
                let document = doc_by_id.get(&id)?.clone();
                let score = scores_by_id.get(&id).copied().unwrap_or(0.0);
                Some(ScoredDocument { document, score })
            })
            .collect()
    }

    /// Retrieves `3 * top_k` candidates in `mode`, then greedily selects
    /// `top_k` by Maximal Marginal Relevance: `lambda * relevance - (1 -
    /// lambda) * max_similarity_to_already_selected`.
    #[instrument(skip(self), fields(op = "search.mmr"))]
    pub fn search_with_mmr(
        &self,
        query: &str,
        lambda: f32,
        top_k: usize,
        mode: SearchMode,
    ) -> Result<Vec<ScoredDocument>, EngineError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let candidates = self.ranked_candidates(query, mode, top_k.saturating_mul(3))?;
        let scores_by_id: HashMap<String, f32> = candidates
            .iter()
            .map(|c| (c.doc_id.clone(), c.relevance))
            .collect();

        debug!(candidates = candidates.len(), lambda, "running MMR selection");
        let selected = select_mmr(&candidates, lambda.clamp(0.0, 1.0), top_k);
        Ok(self.resolve(selected, &scores_by_id))
    }

    /// Retrieves `3 * top_k` candidates in `mode`, then keeps candidates in
    /// rank order whose cosine similarity to every already-selected
    /// candidate stays strictly below `threshold`.
    #[instrument(skip(self), fields(op = "search.diversity"))]
    pub fn search_with_diversity(
        &self,
        query: &str,
        threshold: f32,
        top_k: usize,
        mode: SearchMode,
    ) -> Result<Vec<ScoredDocument>, EngineError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let candidates = self.ranked_candidates(query, mode, top_k.saturating_mul(3))?;
        let scores_by_id: HashMap<String, f32> = candidates
            .iter()
            .map(|c| (c.doc_id.clone(), c.relevance))
            .collect();

        debug!(candidates = candidates.len(), threshold, "running diversity selection");
        let selected = select_diversity(&candidates, threshold, top_k);
        Ok(self.resolve(selected, &scores_by_id))
    }
}
