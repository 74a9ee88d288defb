//! Embedding model family configuration.
//!
//! The closed variant set: a MiniLM-class model (dim 384), an MPNet-class
//! model (dim 768), and a multilingual MPNet-class model (dim 768). The
//! family is fixed for the lifetime of a project.

use std::path::PathBuf;

use crate::constants::{DIM_MINILM, DIM_MPNET};
use crate::embedding::error::EmbeddingError;

/// Default max sequence length for bi-encoder embedding models.
pub const DEFAULT_MAX_SEQ_LEN: usize = 256;

/// Which closed family of embedding model a project is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingModelFamily {
    /// `all-MiniLM-L6-v2`-class model, dimension 384.
    MiniLm,
    /// `all-mpnet-base-v2`-class model, dimension 768.
    Mpnet,
    /// `paraphrase-multilingual-mpnet-base-v2`-class model, dimension 768.
    MultilingualMpnet,
}

impl EmbeddingModelFamily {
    /// Resolves a family from a model name. Unknown names fall back to
    /// [`Self::MiniLm`] — the smallest, default family.
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.contains("multilingual") {
            Self::MultilingualMpnet
        } else if lower.contains("mpnet") {
            Self::Mpnet
        } else {
            Self::MiniLm
        }
    }

    /// The embedding dimension this family produces.
    pub fn dim(self) -> usize {
        match self {
            Self::MiniLm => DIM_MINILM,
            Self::Mpnet | Self::MultilingualMpnet => DIM_MPNET,
        }
    }
}

/// Configuration for a [`super::bert_embedder::CandleBertEmbedder`].
#[derive(Debug, Clone)]
pub struct EmbeddingModelConfig {
    /// Model family, determines the expected output dimension.
    pub family: EmbeddingModelFamily,
    /// Directory containing `config.json`, `model.safetensors`, and
    /// `tokenizer.json`. `None` runs the embedder in stub mode.
    pub model_path: Option<PathBuf>,
    /// Max tokens considered per input.
    pub max_seq_len: usize,
}

impl EmbeddingModelConfig {
    /// A config bound to `family` with no model path (deterministic stub mode).
    pub fn stub(family: EmbeddingModelFamily) -> Self {
        Self {
            family,
            model_path: None,
            max_seq_len: DEFAULT_MAX_SEQ_LEN,
        }
    }

    /// A config that loads real model files from `model_path`.
    pub fn new<P: Into<PathBuf>>(family: EmbeddingModelFamily, model_path: P) -> Self {
        Self {
            family,
            model_path: Some(model_path.into()),
            max_seq_len: DEFAULT_MAX_SEQ_LEN,
        }
    }

    /// Validates that a configured model path exists.
    pub fn validate(&self) -> Result<(), EmbeddingError> {
        if let Some(path) = &self.model_path
            && !path.exists()
        {
            return Err(EmbeddingError::ModelNotFound { path: path.clone() });
        }
        Ok(())
    }
}
