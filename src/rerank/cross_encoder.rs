//! Candle-backed cross-encoder re-ranker: a post-hoc re-scorer applied to a
//! small candidate pool.

use std::path::PathBuf;
use std::time::Duration;

use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use crate::embedding::device::select_device;
use crate::embedding::utils::load_tokenizer_with_truncation;

use super::error::RerankError;

/// Default candidates scored per batch call before falling back.
pub const DEFAULT_BATCH_SIZE: usize = 16;
/// Default per-batch scoring timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
/// Max tokens considered per query/candidate pair.
pub const MAX_SEQ_LEN: usize = 512;

/// Configuration for a [`CandleCrossEncoder`].
#[derive(Debug, Clone)]
pub struct CrossEncoderConfig {
    /// Directory with `config.json`, `model.safetensors`, `tokenizer.json`.
    /// `None` runs the cross-encoder in stub mode.
    pub model_path: Option<PathBuf>,
    /// Candidates scored together before a fallback decision is made.
    pub batch_size: usize,
    /// Wall-clock budget for scoring one batch.
    pub timeout: Duration,
}

impl Default for CrossEncoderConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            batch_size: DEFAULT_BATCH_SIZE,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl CrossEncoderConfig {
    /// A config with no model path (deterministic stub mode).
    pub fn stub() -> Self {
        Self::default()
    }

    /// A config that loads real model files from `model_path`.
    pub fn new<P: Into<PathBuf>>(model_path: P) -> Self {
        Self {
            model_path: Some(model_path.into()),
            ..Self::default()
        }
    }

    /// Validates structural invariants.
    pub fn validate(&self) -> Result<(), RerankError> {
        if self.batch_size == 0 {
            return Err(RerankError::InvalidConfig {
                reason: "batch_size must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

/// A re-scoring capability over a `(query, candidate)` text pair.
pub trait CrossEncoderModel: Send + Sync {
    /// Scores one pair. Returned scores need not be bounded; callers
    /// normalize with [`normalize_scores`].
    fn score(&self, query: &str, candidate: &str) -> Result<f32, RerankError>;

    /// Configured batch size, used by the caller to chunk large candidate
    /// pools and to decide when a timeout should trigger fallback.
    fn batch_size(&self) -> usize;

    /// Configured per-batch timeout.
    fn timeout(&self) -> Duration;
}

enum Backend {
    Model {
        model: BertModel,
        tokenizer: Tokenizer,
        device: Device,
        classifier: Option<(Tensor, Tensor)>,
    },
    Stub,
}

/// The one real [`CrossEncoderModel`] fulfillment: a BERT-family joint
/// encoder with an optional linear classification head, following the
/// `config.json`/`model.safetensors`/`tokenizer.json` layout. With no
/// `model_path` configured it falls back to a deterministic stub.
pub struct CandleCrossEncoder {
    backend: Backend,
    config: CrossEncoderConfig,
}

impl std::fmt::Debug for CandleCrossEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandleCrossEncoder")
            .field("stub", &matches!(self.backend, Backend::Stub))
            .field("batch_size", &self.config.batch_size)
            .finish()
    }
}

impl CandleCrossEncoder {
    /// Loads the cross-encoder. With no `model_path` configured, runs in
    /// deterministic stub mode.
    pub fn load(config: CrossEncoderConfig) -> Result<Self, RerankError> {
        config.validate()?;
        let device = select_device().map_err(|e| RerankError::ModelLoadFailed {
            reason: e.to_string(),
        })?;

        let Some(model_path) = config.model_path.clone() else {
            warn!("cross-encoder running in stub mode (testing only)");
            return Ok(Self {
                backend: Backend::Stub,
                config,
            });
        };

        let config_path = model_path.join("config.json");
        let weights_path = model_path.join("model.safetensors");

        if !config_path.exists() || !weights_path.exists() {
            return Err(RerankError::ModelLoadFailed {
                reason: format!(
                    "missing config.json or model.safetensors under {}",
                    model_path.display()
                ),
            });
        }

        let config_content = std::fs::read_to_string(&config_path)?;
        let bert_config: BertConfig =
            serde_json::from_str(&config_content).map_err(|e| RerankError::ModelLoadFailed {
                reason: format!("failed to parse config.json: {e}"),
            })?;

        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)? };
        let model = BertModel::load(vb.pp("bert"), &bert_config)?;

        // A sequence-classification head, if the checkpoint ships one. Its
        // absence just means scoring falls back to a pooled-similarity proxy.
        let classifier = vb
            .pp("classifier")
            .get((1, bert_config.hidden_size), "weight")
            .and_then(|w| vb.pp("classifier").get(1, "bias").map(|b| (w, b)))
            .ok();

        let tokenizer = load_tokenizer_with_truncation(&model_path, MAX_SEQ_LEN).map_err(|e| {
            RerankError::ModelLoadFailed {
                reason: e.to_string(),
            }
        })?;

        info!(
            model_path = %model_path.display(),
            has_classifier_head = classifier.is_some(),
            "cross-encoder model loaded"
        );

        Ok(Self {
            backend: Backend::Model {
                model,
                tokenizer,
                device,
                classifier,
            },
            config,
        })
    }

    /// Loads a stub cross-encoder requiring no model files.
    pub fn stub() -> Self {
        Self {
            backend: Backend::Stub,
            config: CrossEncoderConfig::stub(),
        }
    }
}

impl CrossEncoderModel for CandleCrossEncoder {
    fn score(&self, query: &str, candidate: &str) -> Result<f32, RerankError> {
        match &self.backend {
            Backend::Model {
                model,
                tokenizer,
                device,
                classifier,
            } => score_with_model(model, tokenizer, device, classifier.as_ref(), query, candidate),
            Backend::Stub => Ok(stub_score(query, candidate)),
        }
    }

    fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    fn timeout(&self) -> Duration {
        self.config.timeout
    }
}

fn score_with_model(
    model: &BertModel,
    tokenizer: &Tokenizer,
    device: &Device,
    classifier: Option<&(Tensor, Tensor)>,
    query: &str,
    candidate: &str,
) -> Result<f32, RerankError> {
    let encoding = tokenizer
        .encode((query, candidate), true)
        .map_err(|e| RerankError::TokenizationFailed {
            reason: e.to_string(),
        })?;

    let ids = Tensor::new(encoding.get_ids(), device)?.unsqueeze(0)?;
    let type_ids = Tensor::new(encoding.get_type_ids(), device)?.unsqueeze(0)?;
    let mask = Tensor::new(encoding.get_attention_mask(), device)?.unsqueeze(0)?;

    let hidden = model.forward(&ids, &type_ids, Some(&mask))?;
    let cls = hidden.i((0, 0))?;

    let logit = match classifier {
        Some((weight, bias)) => {
            let weight_vec = weight.i(0)?.to_vec1::<f32>()?;
            let bias_value = bias.i(0)?.to_scalar::<f32>()?;
            let cls_vec = cls.to_vec1::<f32>()?;
            let dot: f32 = weight_vec.iter().zip(cls_vec.iter()).map(|(w, x)| w * x).sum();
            dot + bias_value
        }
        None => {
            // No classification head: fall back to the norm of the pooled
            // [CLS] vector as a relative relevance proxy.
            cls.to_vec1::<f32>()?.iter().map(|x| x * x).sum::<f32>().sqrt()
        }
    };

    debug!(logit, "cross-encoder raw logit");
    Ok(sigmoid(logit))
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Deterministic hash-seeded score used when no model is loaded. Bounded to
/// `[0, 1]` so it mixes correctly with real scores in tests.
fn stub_score(query: &str, candidate: &str) -> f32 {
    use std::hash::{DefaultHasher, Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    query.hash(&mut hasher);
    candidate.hash(&mut hasher);
    let hash = hasher.finish();
    (hash % 1000) as f32 / 1000.0
}

/// Min-max normalizes a batch of raw scores into `[0, 1]`. A batch that is
/// already bounded (e.g. sigmoid output) is a no-op up to floating rounding.
pub fn normalize_scores(scores: &[f32]) -> Vec<f32> {
    if scores.is_empty() {
        return Vec::new();
    }
    let min = scores.iter().cloned().fold(f32::MAX, f32::min);
    let max = scores.iter().cloned().fold(f32::MIN, f32::max);
    if (max - min).abs() < f32::EPSILON {
        return scores.iter().map(|_| 1.0).collect();
    }
    scores.iter().map(|s| (s - min) / (max - min)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_scores_are_deterministic_and_bounded() {
        let encoder = CandleCrossEncoder::stub();
        let a = encoder.score("q", "candidate one").unwrap();
        let b = encoder.score("q", "candidate one").unwrap();
        assert_eq!(a, b);
        assert!((0.0..=1.0).contains(&a));
    }

    #[test]
    fn different_candidates_score_differently() {
        let encoder = CandleCrossEncoder::stub();
        let a = encoder.score("q", "candidate one").unwrap();
        let b = encoder.score("q", "candidate two").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn normalize_scores_maps_to_unit_interval() {
        let normalized = normalize_scores(&[1.0, 3.0, 5.0]);
        assert_eq!(normalized, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn normalize_scores_handles_uniform_batch() {
        let normalized = normalize_scores(&[2.0, 2.0]);
        assert_eq!(normalized, vec![1.0, 1.0]);
    }

    #[test]
    fn normalize_scores_empty_is_empty() {
        assert!(normalize_scores(&[]).is_empty());
    }
}
