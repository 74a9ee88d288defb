//! Result re-ranking: a cross-encoder re-scorer and a standalone
//! MMR/diversity re-ranker — the same algorithm as the hybrid engine's
//! `search_with_mmr`/`search_with_diversity`, usable directly against an
//! arbitrary candidate list without going through the engine.

pub mod cross_encoder;
pub mod error;
pub mod mmr;

pub use cross_encoder::{
    normalize_scores, CandleCrossEncoder, CrossEncoderConfig, CrossEncoderModel,
};
pub use error::RerankError;
pub use mmr::{select_diversity, select_mmr, RankedCandidate};

use std::time::Instant;

use tracing::warn;

/// A candidate as given to [`rerank`], preserving every source field plus
/// its text content to score.
#[derive(Debug, Clone)]
pub struct RerankCandidate {
    /// Document id.
    pub doc_id: String,
    /// Text content scored against the query.
    pub content: String,
    /// The candidate's score from the upstream search, kept alongside the
    /// cross-encoder score so callers can combine them.
    pub original_score: f32,
}

/// A candidate after cross-encoder scoring.
#[derive(Debug, Clone)]
pub struct RerankedResult {
    /// Document id.
    pub doc_id: String,
    /// 1-indexed rank after re-scoring.
    pub rank: usize,
    /// Raw cross-encoder score, normalized to `[0, 1]`.
    pub rerank_score: f32,
    /// The score callers should sort/display by. Equal to `rerank_score`
    /// unless the caller requested score combination.
    pub final_score: f32,
    /// The candidate's original upstream score.
    pub original_score: f32,
}

/// Re-scores `candidates` against `query` with `model`, falling back to the
/// input ordering (with `rerank_score = original_score`) if scoring exceeds
/// `model.timeout()`. Candidate pools are expected to be small (typically ≤
/// 50); this call blocks the calling thread for at most one timeout's worth
/// of wall-clock time.
pub fn rerank(
    model: &dyn CrossEncoderModel,
    query: &str,
    candidates: Vec<RerankCandidate>,
    top_k: usize,
) -> Vec<RerankedResult> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let started = Instant::now();
    let mut raw_scores = Vec::with_capacity(candidates.len());
    let mut fell_back = false;

    for candidate in &candidates {
        if started.elapsed() > model.timeout() {
            warn!("cross-encoder batch exceeded timeout, falling back to input order");
            fell_back = true;
            break;
        }
        match model.score(query, &candidate.content) {
            Ok(score) => raw_scores.push(score),
            Err(e) => {
                warn!(error = %e, "cross-encoder scoring failed, falling back to input order");
                fell_back = true;
                break;
            }
        }
    }

    if fell_back {
        return candidates
            .into_iter()
            .take(top_k)
            .enumerate()
            .map(|(idx, c)| RerankedResult {
                doc_id: c.doc_id,
                rank: idx + 1,
                rerank_score: c.original_score,
                final_score: c.original_score,
                original_score: c.original_score,
            })
            .collect();
    }

    let normalized = normalize_scores(&raw_scores);
    let mut scored: Vec<RerankedResult> = candidates
        .into_iter()
        .zip(normalized)
        .map(|(c, score)| RerankedResult {
            doc_id: c.doc_id,
            rank: 0,
            rerank_score: score,
            final_score: score,
            original_score: c.original_score,
        })
        .collect();

    scored.sort_by(|a, b| {
        b.rerank_score
            .partial_cmp(&a.rerank_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(top_k);
    for (idx, result) in scored.iter_mut().enumerate() {
        result.rank = idx + 1;
    }

    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, content: &str, original_score: f32) -> RerankCandidate {
        RerankCandidate {
            doc_id: id.to_string(),
            content: content.to_string(),
            original_score,
        }
    }

    #[test]
    fn empty_candidates_short_circuit() {
        let model = CandleCrossEncoder::stub();
        assert!(rerank(&model, "q", Vec::new(), 5).is_empty());
    }

    #[test]
    fn ranks_are_1_indexed_and_contiguous() {
        let model = CandleCrossEncoder::stub();
        let candidates = vec![
            candidate("a", "alpha", 0.5),
            candidate("b", "beta", 0.4),
            candidate("c", "gamma", 0.3),
        ];
        let results = rerank(&model, "query", candidates, 3);
        let ranks: Vec<usize> = results.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn truncates_to_top_k() {
        let model = CandleCrossEncoder::stub();
        let candidates = vec![
            candidate("a", "alpha", 0.5),
            candidate("b", "beta", 0.4),
            candidate("c", "gamma", 0.3),
        ];
        let results = rerank(&model, "query", candidates, 2);
        assert_eq!(results.len(), 2);
    }
}
