//! The embedding-model contact surface: `embed(text) -> vector<f32>` plus
//! `embedding_dim()`, consumed by the hybrid engine as an opaque capability.
//!
//! The model *runtime* is treated as an external collaborator — the core
//! only depends on [`EmbeddingModel`]. [`bert_embedder::CandleBertEmbedder`]
//! is shipped as the one real fulfillment (candle-backed, closed family set)
//! and [`mock::MockEmbedder`] as the zero-dependency test double.

pub mod bert_embedder;
pub mod config;
pub(crate) mod device;
pub mod error;
pub mod mock;
pub(crate) mod utils;

pub use bert_embedder::CandleBertEmbedder;
pub use config::{EmbeddingModelConfig, EmbeddingModelFamily};
pub use error::EmbeddingError;
pub use mock::MockEmbedder;

/// Consumed by the hybrid engine as an opaque `embed(text) -> vector<f32>`
/// capability. Implementations must be deterministic for a given model
/// version and thread-safe (`Send + Sync`) since the engine may call them
/// from many concurrent query threads.
pub trait EmbeddingModel: Send + Sync {
    /// Embeds a single string.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embeds a batch of strings. The default implementation embeds each
    /// independently; implementations with true batched inference should
    /// override this.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// The fixed dimension of vectors this model produces.
    fn embedding_dim(&self) -> usize;

    /// A human-readable model identifier, for statistics/health surfaces.
    fn model_name(&self) -> &str;
}
