//! Approximate `(query, embedding) -> results` cache keyed by cosine
//! similarity rather than exact match.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Result payload stored alongside a cached query.
pub type CachedResults = Vec<serde_json::Value>;

struct Entry {
    query: String,
    embedding: Vec<f32>,
    results: CachedResults,
    inserted_at: Instant,
    hit_count: u64,
}

/// Configuration for a [`SemanticCache`].
#[derive(Debug, Clone, Copy)]
pub struct SemanticCacheConfig {
    /// Minimum cosine similarity for a probe to count as a hit.
    pub similarity_threshold: f32,
    /// Entry lifetime.
    pub ttl: Duration,
    /// Maximum entries before LRU-by-insertion-order eviction.
    pub max_entries: usize,
}

/// A single matched result, returned by [`SemanticCache::get`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticMatch {
    /// The results stored with the matched entry.
    pub results: CachedResults,
    /// Cosine similarity between the probe and the matched entry.
    pub similarity: f32,
    /// The original query text that was cached.
    pub matched_query: String,
}

/// A `(query_text, hit_count)` pair, used by [`SemanticCache::get_top_queries`].
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPopularity {
    /// The cached query text.
    pub query: String,
    /// Times this entry has been matched.
    pub hit_count: u64,
}

/// Aggregate counters for a [`SemanticCache`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SemanticCacheStats {
    /// Successful similarity matches.
    pub hits: u64,
    /// Probes with no sufficiently similar entry.
    pub misses: u64,
    /// Entries evicted for being over capacity.
    pub evictions: u64,
    /// Current entry count.
    pub size: usize,
}

struct Inner {
    entries: VecDeque<Entry>,
}

/// Cosine similarity; yields 0 for a zero-norm vector rather than NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Thread-safe approximate cache: a probe embedding hits the highest-scoring
/// non-expired entry at or above `similarity_threshold`.
pub struct SemanticCache {
    config: SemanticCacheConfig,
    inner: Mutex<Inner>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl SemanticCache {
    /// Creates a semantic cache with the given configuration.
    pub fn new(config: SemanticCacheConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                entries: VecDeque::new(),
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Inserts a new entry, evicting the oldest entry first if over capacity.
    pub fn put(&self, query: &str, embedding: Vec<f32>, results: CachedResults) {
        let mut inner = self.inner.lock();
        if inner.entries.len() >= self.config.max_entries {
            inner.entries.pop_front();
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        inner.entries.push_back(Entry {
            query: query.to_string(),
            embedding,
            results,
            inserted_at: Instant::now(),
            hit_count: 0,
        });
    }

    /// Looks up the best non-expired match for `embedding`. Entries found
    /// expired during the scan are dropped opportunistically. A hit promotes
    /// the matched entry to most-recently-used, so [`Self::put`]'s eviction
    /// always drops the genuine least-recently-used entry rather than
    /// whichever entry happened to be inserted first.
    pub fn get(&self, embedding: &[f32]) -> Option<SemanticMatch> {
        let mut inner = self.inner.lock();
        let now = Instant::now();
        inner
            .entries
            .retain(|e| now.duration_since(e.inserted_at) <= self.config.ttl);

        let mut best: Option<(usize, f32)> = None;
        for (idx, entry) in inner.entries.iter().enumerate() {
            let sim = cosine_similarity(embedding, &entry.embedding);
            if sim >= self.config.similarity_threshold {
                match best {
                    Some((_, best_sim)) if sim <= best_sim => {}
                    _ => best = Some((idx, sim)),
                }
            }
        }

        match best {
            Some((idx, similarity)) => {
                let mut entry = inner.entries.remove(idx).expect("idx came from this deque");
                entry.hit_count += 1;
                let result = SemanticMatch {
                    results: entry.results.clone(),
                    similarity,
                    matched_query: entry.query.clone(),
                };
                inner.entries.push_back(entry);
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(result)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Bulk-inserts a batch of queries, embedding and executing each via the
    /// provided functions.
    pub fn warm<E, Q>(&self, queries: &[String], embed_fn: E, query_fn: Q)
    where
        E: Fn(&str) -> Vec<f32>,
        Q: Fn(&str) -> CachedResults,
    {
        for query in queries {
            let embedding = embed_fn(query);
            let results = query_fn(query);
            self.put(query, embedding, results);
        }
    }

    /// Removes expired entries outside of a `get` scan. Returns the count
    /// removed.
    pub fn cleanup_expired(&self) -> usize {
        let mut inner = self.inner.lock();
        let now = Instant::now();
        let before = inner.entries.len();
        inner
            .entries
            .retain(|e| now.duration_since(e.inserted_at) <= self.config.ttl);
        before - inner.entries.len()
    }

    /// The `k` most-hit entries, descending by `hit_count`.
    pub fn get_top_queries(&self, k: usize) -> Vec<QueryPopularity> {
        let inner = self.inner.lock();
        let mut popularity: Vec<QueryPopularity> = inner
            .entries
            .iter()
            .map(|e| QueryPopularity {
                query: e.query.clone(),
                hit_count: e.hit_count,
            })
            .collect();
        popularity.sort_by(|a, b| b.hit_count.cmp(&a.hit_count));
        popularity.truncate(k);
        popularity
    }

    /// Aggregate counters.
    pub fn stats(&self) -> SemanticCacheStats {
        SemanticCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size: self.inner.lock().entries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn config(threshold: f32, ttl_ms: u64, max_entries: usize) -> SemanticCacheConfig {
        SemanticCacheConfig {
            similarity_threshold: threshold,
            ttl: Duration::from_millis(ttl_ms),
            max_entries,
        }
    }

    #[test]
    fn zero_norm_vectors_yield_zero_similarity() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn exact_match_hits_above_threshold() {
        let cache = SemanticCache::new(config(0.9, 60_000, 10));
        cache.put("hello", vec![1.0, 0.0], vec![serde_json::json!({"id": "d1"})]);
        let result = cache.get(&[1.0, 0.0]).unwrap();
        assert_eq!(result.matched_query, "hello");
        assert!((result.similarity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn below_threshold_is_a_miss() {
        let cache = SemanticCache::new(config(0.99, 60_000, 10));
        cache.put("hello", vec![1.0, 0.0], vec![]);
        assert!(cache.get(&[0.5, 0.5]).is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn picks_highest_scoring_entry_above_threshold() {
        let cache = SemanticCache::new(config(0.5, 60_000, 10));
        cache.put("a", vec![1.0, 0.0], vec![serde_json::json!("a")]);
        cache.put("b", vec![0.9, 0.1], vec![serde_json::json!("b")]);
        let result = cache.get(&[1.0, 0.0]).unwrap();
        assert_eq!(result.matched_query, "a");
    }

    #[test]
    fn expired_entries_are_ignored_during_scan() {
        let cache = SemanticCache::new(config(0.5, 20, 10));
        cache.put("hello", vec![1.0, 0.0], vec![]);
        thread::sleep(Duration::from_millis(40));
        assert!(cache.get(&[1.0, 0.0]).is_none());
    }

    #[test]
    fn eviction_at_capacity_increments_counter() {
        let cache = SemanticCache::new(config(0.5, 60_000, 2));
        cache.put("a", vec![1.0], vec![]);
        cache.put("b", vec![1.0], vec![]);
        cache.put("c", vec![1.0], vec![]);
        assert_eq!(cache.stats().evictions, 1);
        assert_eq!(cache.stats().size, 2);
    }

    #[test]
    fn a_hit_promotes_the_entry_past_insertion_order_eviction() {
        let cache = SemanticCache::new(config(0.5, 60_000, 2));
        cache.put("a", vec![1.0, 0.0], vec![serde_json::json!("a")]);
        cache.put("b", vec![0.0, 1.0], vec![serde_json::json!("b")]);

        // Re-hit "a", promoting it to most-recently-used ahead of "b".
        cache.get(&[1.0, 0.0]).unwrap();

        // At capacity, the next insert must evict "b" (now the true LRU
        // entry), not "a", even though "a" was inserted first.
        cache.put("c", vec![0.0, 0.0], vec![serde_json::json!("c")]);

        assert!(cache.get(&[1.0, 0.0]).is_some());
        assert!(cache.get(&[0.0, 1.0]).is_none());
    }

    #[test]
    fn cleanup_expired_removes_stale_entries() {
        let cache = SemanticCache::new(config(0.5, 20, 10));
        cache.put("a", vec![1.0], vec![]);
        thread::sleep(Duration::from_millis(40));
        assert_eq!(cache.cleanup_expired(), 1);
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn top_queries_ranks_by_hit_count() {
        let cache = SemanticCache::new(config(0.5, 60_000, 10));
        cache.put("a", vec![1.0, 0.0], vec![]);
        cache.put("b", vec![0.0, 1.0], vec![]);
        cache.get(&[1.0, 0.0]);
        cache.get(&[1.0, 0.0]);
        cache.get(&[0.0, 1.0]);

        let top = cache.get_top_queries(2);
        assert_eq!(top[0].query, "a");
        assert_eq!(top[0].hit_count, 2);
        assert_eq!(top[1].query, "b");
        assert_eq!(top[1].hit_count, 1);
    }

    #[test]
    fn concurrent_put_and_get_does_not_panic() {
        use std::sync::Arc;
        let cache = Arc::new(SemanticCache::new(config(0.5, 60_000, 50)));
        let mut handles = Vec::new();
        for t in 0..4 {
            let cache = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                for i in 0..50 {
                    cache.put(&format!("q{t}-{i}"), vec![t as f32, i as f32], vec![]);
                    cache.get(&[t as f32, i as f32]);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
    }
}
