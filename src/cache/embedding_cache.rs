//! LRU cache of precomputed document embeddings, keyed by `doc_id`.

use tracing::warn;

use super::lru::{CacheStats, LruCache};
use crate::repository::DocumentRepository;

/// A function that embeds document content, returning `None` on failure.
pub trait EmbedFn: Fn(&str) -> Option<Vec<f32>> {}
impl<F: Fn(&str) -> Option<Vec<f32>>> EmbedFn for F {}

/// Caches `doc_id -> embedding` so the vector phase of a query need not
/// re-embed documents it has already seen.
pub struct EmbeddingCache {
    inner: LruCache<String, Vec<f32>>,
}

impl EmbeddingCache {
    /// Creates an embedding cache with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: LruCache::new(capacity),
        }
    }

    /// Returns the cached embedding for `doc_id`, if present.
    pub fn get(&self, doc_id: &str) -> Option<Vec<f32>> {
        self.inner.get(&doc_id.to_string())
    }

    /// Inserts or overwrites the embedding for `doc_id`.
    pub fn put(&self, doc_id: &str, embedding: Vec<f32>) {
        self.inner.put(doc_id.to_string(), embedding);
    }

    /// Returns the embedding for `doc_id`, computing and caching it via
    /// `embed` on a miss.
    pub fn get_or_compute(&self, doc_id: &str, content: &str, embed: &impl EmbedFn) -> Option<Vec<f32>> {
        if let Some(cached) = self.get(doc_id) {
            return Some(cached);
        }
        let embedding = embed(content)?;
        self.put(doc_id, embedding.clone());
        Some(embedding)
    }

    /// Current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.inner.stats()
    }

    /// Embeds every document in `repo` not already cached. A single
    /// document's embedding failure is logged and skipped; it does not
    /// abort the scan. Returns the number of embeddings inserted.
    pub fn precompute_embeddings(&self, repo: &DocumentRepository, embed: &impl EmbedFn) -> usize {
        self.refresh(repo, embed, false).1
    }

    /// Re-scans `repo` and inserts embeddings for any `doc_id` missing from
    /// the cache. With `force`, recomputes every document's embedding
    /// regardless of what is already cached.
    ///
    /// Returns `(scanned, inserted)`: the number of documents scanned, and
    /// the number of embeddings newly inserted.
    pub fn refresh_embeddings(&self, repo: &DocumentRepository, embed: &impl EmbedFn, force: bool) -> (usize, usize) {
        self.refresh(repo, embed, force)
    }

    fn refresh(&self, repo: &DocumentRepository, embed: &impl EmbedFn, force: bool) -> (usize, usize) {
        let ids = repo.document_ids();
        let mut inserted = 0;
        for doc_id in &ids {
            if !force && self.inner.contains(doc_id) {
                continue;
            }
            let Some(doc) = repo.get_document(doc_id) else {
                continue;
            };
            match embed(&doc.content) {
                Some(embedding) => {
                    self.put(doc_id, embedding);
                    inserted += 1;
                }
                None => {
                    warn!(doc_id = %doc_id, "failed to precompute embedding, skipping");
                }
            }
        }
        (ids.len(), inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::Document;
    use std::collections::HashMap;

    fn doc(id: &str) -> Document {
        Document {
            doc_id: id.to_string(),
            content: id.to_string(),
            name: id.to_string(),
            path: String::new(),
            metadata: HashMap::new(),
        }
    }

    fn stub_embed(text: &str) -> Option<Vec<f32>> {
        Some(vec![text.len() as f32, 1.0])
    }

    #[test]
    fn get_or_compute_caches_on_miss() {
        let cache = EmbeddingCache::new(10);
        assert!(cache.get("d1").is_none());
        let embedding = cache.get_or_compute("d1", "hello", &stub_embed).unwrap();
        assert_eq!(embedding, vec![5.0, 1.0]);
        assert_eq!(cache.get("d1"), Some(vec![5.0, 1.0]));
    }

    #[test]
    fn precompute_embeds_every_document_once() {
        let repo = DocumentRepository::new();
        repo.add_document(doc("d1"));
        repo.add_document(doc("d2"));
        let cache = EmbeddingCache::new(10);

        let inserted = cache.precompute_embeddings(&repo, &stub_embed);
        assert_eq!(inserted, 2);
        assert!(cache.get("d1").is_some());
        assert!(cache.get("d2").is_some());
    }

    #[test]
    fn refresh_skips_already_cached_unless_forced() {
        let repo = DocumentRepository::new();
        repo.add_document(doc("d1"));
        let cache = EmbeddingCache::new(10);
        cache.precompute_embeddings(&repo, &stub_embed);

        repo.add_document(doc("d2"));
        let (scanned, inserted) = cache.refresh_embeddings(&repo, &stub_embed, false);
        assert_eq!(scanned, 2);
        assert_eq!(inserted, 1);

        let (scanned, inserted) = cache.refresh_embeddings(&repo, &stub_embed, true);
        assert_eq!(scanned, 2);
        assert_eq!(inserted, 2);
    }

    #[test]
    fn failing_embed_is_skipped_not_fatal() {
        let repo = DocumentRepository::new();
        repo.add_document(doc("d1"));
        repo.add_document(doc("d2"));
        let cache = EmbeddingCache::new(10);

        let flaky = |text: &str| -> Option<Vec<f32>> {
            if text == "d1" {
                None
            } else {
                Some(vec![1.0])
            }
        };

        let inserted = cache.precompute_embeddings(&repo, &flaky);
        assert_eq!(inserted, 1);
        assert!(cache.get("d1").is_none());
        assert!(cache.get("d2").is_some());
    }
}
