//! In-memory mock embedder for tests: deterministic, zero-dependency.

use super::error::EmbeddingError;
use super::EmbeddingModel;

/// A fixed-dimension embedder that hashes text into a deterministic unit
/// vector. Used in tests and by the `mock` feature in place of a real model.
pub struct MockEmbedder {
    dim: usize,
}

impl MockEmbedder {
    /// Creates a mock embedder producing `dim`-dimensional vectors.
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl EmbeddingModel for MockEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        use std::hash::{DefaultHasher, Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut state = hasher.finish();

        let mut v = Vec::with_capacity(self.dim);
        for _ in 0..self.dim {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            v.push(((state >> 32) as f32 / u32::MAX as f32) * 2.0 - 1.0);
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        Ok(v)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn embedding_dim(&self) -> usize {
        self.dim
    }

    fn model_name(&self) -> &str {
        "mock-embedder"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_for_same_text() {
        let m = MockEmbedder::new(16);
        assert_eq!(m.embed("hello").unwrap(), m.embed("hello").unwrap());
    }

    #[test]
    fn different_text_differs() {
        let m = MockEmbedder::new(16);
        assert_ne!(m.embed("hello").unwrap(), m.embed("world").unwrap());
    }
}
