//! Candle-backed BERT-family sentence embedder (mean-pooled, L2-normalized).
//!
//! Runs any MiniLM/MPNet-class checkpoint in `config.json` +
//! `model.safetensors` + `tokenizer.json` layout. With no `model_path`
//! configured it falls back to a deterministic stub so the crate builds and
//! runs its test suite with zero external model files.

use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use super::config::EmbeddingModelConfig;
use super::device::select_device;
use super::error::EmbeddingError;
use super::utils::load_tokenizer_with_truncation;
use super::EmbeddingModel;

enum Backend {
    Model {
        model: BertModel,
        tokenizer: Tokenizer,
        device: Device,
    },
    Stub {
        device: Device,
    },
}

/// A MiniLM/MPNet-class bi-encoder loaded via `candle`.
pub struct CandleBertEmbedder {
    backend: Backend,
    config: EmbeddingModelConfig,
}

impl std::fmt::Debug for CandleBertEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandleBertEmbedder")
            .field("family", &self.config.family)
            .field("stub", &matches!(self.backend, Backend::Stub { .. }))
            .finish()
    }
}

impl CandleBertEmbedder {
    /// Loads the embedder. With no `model_path` configured, runs in
    /// deterministic stub mode.
    pub fn load(config: EmbeddingModelConfig) -> Result<Self, EmbeddingError> {
        config.validate()?;
        let device = select_device()?;
        debug!(?device, family = ?config.family, "selected compute device for embedder");

        let Some(model_path) = config.model_path.clone() else {
            warn!("embedding model running in stub mode (testing only)");
            return Ok(Self {
                backend: Backend::Stub { device },
                config,
            });
        };

        let config_path = model_path.join("config.json");
        let weights_path = model_path.join("model.safetensors");

        let config_content = std::fs::read_to_string(&config_path)?;
        let bert_config: BertConfig =
            serde_json::from_str(&config_content).map_err(|e| EmbeddingError::ModelLoadFailed {
                reason: format!("failed to parse config.json: {e}"),
            })?;

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)?
        };
        let model = BertModel::load(vb, &bert_config)?;
        let tokenizer = load_tokenizer_with_truncation(&model_path, config.max_seq_len)
            .map_err(|e| EmbeddingError::TokenizationFailed {
                reason: e.to_string(),
            })?;

        info!(model_path = %model_path.display(), dim = config.family.dim(), "embedding model loaded");

        Ok(Self {
            backend: Backend::Model {
                model,
                tokenizer,
                device,
            },
            config,
        })
    }

    /// Loads a stub embedder requiring no model files.
    pub fn stub(family: super::config::EmbeddingModelFamily) -> Self {
        Self {
            backend: Backend::Stub { device: Device::Cpu },
            config: EmbeddingModelConfig::stub(family),
        }
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        match &self.backend {
            Backend::Model {
                model,
                tokenizer,
                device,
            } => embed_with_model(model, tokenizer, device, text),
            Backend::Stub { .. } => Ok(stub_embedding(text, self.config.family.dim())),
        }
    }
}

impl EmbeddingModel for CandleBertEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_one(text)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|t| self.embed_one(t)).collect()
    }

    fn embedding_dim(&self) -> usize {
        self.config.family.dim()
    }

    fn model_name(&self) -> &str {
        match self.config.family {
            super::config::EmbeddingModelFamily::MiniLm => "all-MiniLM-L6-v2",
            super::config::EmbeddingModelFamily::Mpnet => "all-mpnet-base-v2",
            super::config::EmbeddingModelFamily::MultilingualMpnet => {
                "paraphrase-multilingual-mpnet-base-v2"
            }
        }
    }
}

fn embed_with_model(
    model: &BertModel,
    tokenizer: &Tokenizer,
    device: &Device,
    text: &str,
) -> Result<Vec<f32>, EmbeddingError> {
    let encoding = tokenizer
        .encode(text, true)
        .map_err(|e| EmbeddingError::TokenizationFailed {
            reason: e.to_string(),
        })?;

    let ids = encoding.get_ids();
    let type_ids = encoding.get_type_ids();
    let attention_mask = encoding.get_attention_mask();

    let input_ids = Tensor::new(ids, device)?.unsqueeze(0)?;
    let token_type_ids = Tensor::new(type_ids, device)?.unsqueeze(0)?;
    let mask = Tensor::new(attention_mask, device)?.unsqueeze(0)?;

    let hidden = model.forward(&input_ids, &token_type_ids, Some(&mask))?;

    // Mean pooling over the sequence dimension, weighted by the attention mask.
    let mask_f32 = mask.to_dtype(DType::F32)?.unsqueeze(2)?;
    let masked = hidden.broadcast_mul(&mask_f32)?;
    let summed = masked.sum(1)?;
    let counts = mask_f32.sum(1)?.clamp(1e-9, f64::MAX)?;
    let pooled = summed.broadcast_div(&counts)?;

    let vector = pooled.i(0)?.to_vec1::<f32>()?;
    Ok(normalize(vector))
}

fn normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

/// Deterministic hash-seeded embedding used when no model is loaded.
fn stub_embedding(text: &str, dim: usize) -> Vec<f32> {
    use std::hash::{DefaultHasher, Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    let mut state = hasher.finish();

    let mut v = Vec::with_capacity(dim);
    for _ in 0..dim {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        v.push(((state >> 32) as f32 / u32::MAX as f32) * 2.0 - 1.0);
    }
    normalize(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::config::EmbeddingModelFamily;

    #[test]
    fn stub_embeddings_have_configured_dimension() {
        let embedder = CandleBertEmbedder::stub(EmbeddingModelFamily::MiniLm);
        let v = embedder.embed("hello world").unwrap();
        assert_eq!(v.len(), 384);
    }

    #[test]
    fn stub_embeddings_are_deterministic() {
        let embedder = CandleBertEmbedder::stub(EmbeddingModelFamily::MiniLm);
        assert_eq!(
            embedder.embed("same text").unwrap(),
            embedder.embed("same text").unwrap()
        );
    }

    #[test]
    fn stub_embeddings_are_unit_normalized() {
        let embedder = CandleBertEmbedder::stub(EmbeddingModelFamily::Mpnet);
        let v = embedder.embed("normalize me").unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn batch_matches_single() {
        let embedder = CandleBertEmbedder::stub(EmbeddingModelFamily::MiniLm);
        let batch = embedder.embed_batch(&["a", "b"]).unwrap();
        assert_eq!(batch[0], embedder.embed("a").unwrap());
        assert_eq!(batch[1], embedder.embed("b").unwrap());
    }
}
