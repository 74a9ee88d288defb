//! Standalone MMR and diversity-sampling re-rankers, usable without a
//! cross-encoder. Both operate over a candidate pool already scored by the
//! hybrid engine.

/// A candidate entering MMR or diversity selection: its relevance score from
/// the upstream search plus the embedding used to judge similarity against
/// already-selected candidates.
#[derive(Debug, Clone)]
pub struct RankedCandidate {
    /// Document id.
    pub doc_id: String,
    /// Relevance score from the upstream vector/keyword/hybrid search.
    pub relevance: f32,
    /// Embedding used for the similarity term.
    pub embedding: Vec<f32>,
}

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

/// Selects up to `top_k` ids from `candidates` by Maximal Marginal Relevance.
///
/// `lambda` trades relevance against diversity: `1.0` is pure relevance,
/// `0.0` is pure diversity against what has already been picked.
pub fn select_mmr(candidates: &[RankedCandidate], lambda: f32, top_k: usize) -> Vec<String> {
    if candidates.is_empty() || top_k == 0 {
        return Vec::new();
    }

    let mut remaining: Vec<&RankedCandidate> = candidates.iter().collect();
    let mut selected: Vec<&RankedCandidate> = Vec::with_capacity(top_k.min(candidates.len()));

    while selected.len() < top_k && !remaining.is_empty() {
        let best_idx = remaining
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| {
                mmr_score(a, &selected, lambda)
                    .partial_cmp(&mmr_score(b, &selected, lambda))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(idx, _)| idx)
            .expect("remaining is non-empty");

        selected.push(remaining.remove(best_idx));
    }

    selected.into_iter().map(|c| c.doc_id.clone()).collect()
}

fn mmr_score(candidate: &RankedCandidate, selected: &[&RankedCandidate], lambda: f32) -> f32 {
    if selected.is_empty() {
        return candidate.relevance;
    }
    let max_similarity = selected
        .iter()
        .map(|s| cosine_similarity(&candidate.embedding, &s.embedding))
        .fold(f32::MIN, f32::max);
    lambda * candidate.relevance - (1.0 - lambda) * max_similarity
}

/// Selects up to `top_k` ids from `candidates`, assumed already in rank
/// order, keeping a candidate only if its similarity to every
/// already-selected candidate is strictly below `threshold`.
pub fn select_diversity(
    candidates: &[RankedCandidate],
    threshold: f32,
    top_k: usize,
) -> Vec<String> {
    let mut selected: Vec<&RankedCandidate> = Vec::with_capacity(top_k.min(candidates.len()));

    for candidate in candidates {
        if selected.len() >= top_k {
            break;
        }
        let diverse_enough = selected
            .iter()
            .all(|s| cosine_similarity(&candidate.embedding, &s.embedding) < threshold);
        if diverse_enough {
            selected.push(candidate);
        }
    }

    selected.into_iter().map(|c| c.doc_id.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, relevance: f32, embedding: Vec<f32>) -> RankedCandidate {
        RankedCandidate {
            doc_id: id.to_string(),
            relevance,
            embedding,
        }
    }

    #[test]
    fn mmr_with_lambda_one_is_pure_relevance() {
        let candidates = vec![
            candidate("a", 0.9, vec![1.0, 0.0]),
            candidate("b", 0.8, vec![1.0, 0.0]),
            candidate("c", 0.5, vec![0.0, 1.0]),
        ];
        let selected = select_mmr(&candidates, 1.0, 2);
        assert_eq!(selected, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn mmr_with_lambda_zero_prefers_diversity_after_first_pick() {
        let candidates = vec![
            candidate("a", 0.9, vec![1.0, 0.0]),
            candidate("b", 0.85, vec![1.0, 0.0]),
            candidate("c", 0.5, vec![0.0, 1.0]),
        ];
        let selected = select_mmr(&candidates, 0.0, 2);
        assert_eq!(selected[0], "a");
        assert_eq!(selected[1], "c");
    }

    #[test]
    fn diversity_drops_near_duplicates() {
        let candidates = vec![
            candidate("a", 0.9, vec![1.0, 0.0]),
            candidate("b", 0.8, vec![0.99, 0.01]),
            candidate("c", 0.5, vec![0.0, 1.0]),
        ];
        let selected = select_diversity(&candidates, 0.95, 3);
        assert_eq!(selected, vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn empty_candidates_yield_empty_selection() {
        assert!(select_mmr(&[], 0.5, 5).is_empty());
        assert!(select_diversity(&[], 0.5, 5).is_empty());
    }

    #[test]
    fn top_k_zero_yields_empty_selection() {
        let candidates = vec![candidate("a", 0.9, vec![1.0, 0.0])];
        assert!(select_mmr(&candidates, 0.5, 0).is_empty());
        assert!(select_diversity(&candidates, 0.5, 0).is_empty());
    }
}
