//! Cross-cutting, shared constants.
//!
//! Embedding dimension is a per-project runtime value (it follows the
//! embedding model chosen at project-creation time), not a compile-time
//! invariant — see [`DimConfig`].

/// Dimension of a MiniLM-class embedding model.
pub const DIM_MINILM: usize = 384;
/// Dimension of an MPNet-class embedding model (including multilingual variants).
pub const DIM_MPNET: usize = 768;

/// Default hybrid-search vector weight (`alpha`).
pub const DEFAULT_ALPHA: f32 = 0.7;

/// Default MMR relevance/diversity trade-off.
pub const DEFAULT_LAMBDA: f32 = 0.5;

/// Default semantic-cache similarity threshold.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.95;

/// Runtime dimension configuration, agreed on at project-creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimConfig {
    /// The embedding vector dimension (number of floats).
    pub embedding_dim: usize,
}

impl DimConfig {
    /// Creates a new dimension configuration.
    pub fn new(embedding_dim: usize) -> Self {
        Self { embedding_dim }
    }

    /// Validates that the dimension is usable (non-zero).
    pub fn validate(&self) -> Result<(), DimValidationError> {
        if self.embedding_dim == 0 {
            return Err(DimValidationError::ZeroDimension);
        }
        Ok(())
    }
}

impl Default for DimConfig {
    fn default() -> Self {
        Self {
            embedding_dim: DIM_MINILM,
        }
    }
}

/// Error returned when dimension validation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DimValidationError {
    /// Embedding dimension cannot be zero.
    ZeroDimension,
    /// Runtime dimension does not match the project's expected dimension.
    DimensionMismatch {
        /// Dimension recorded at project creation.
        expected: usize,
        /// Dimension observed on this call.
        actual: usize,
    },
}

impl std::fmt::Display for DimValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroDimension => write!(f, "embedding dimension cannot be zero"),
            Self::DimensionMismatch { expected, actual } => {
                write!(f, "dimension mismatch: expected {expected}, got {actual}")
            }
        }
    }
}

impl std::error::Error for DimValidationError {}

/// Validates that a runtime embedding dimension matches the project's
/// expected dimension.
pub fn validate_embedding_dim(actual: usize, expected: usize) -> Result<(), DimValidationError> {
    if actual != expected {
        return Err(DimValidationError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dim_config_default_is_minilm() {
        assert_eq!(DimConfig::default().embedding_dim, DIM_MINILM);
    }

    #[test]
    fn dim_config_rejects_zero() {
        assert_eq!(
            DimConfig::new(0).validate(),
            Err(DimValidationError::ZeroDimension)
        );
    }

    #[test]
    fn validate_embedding_dim_mismatch() {
        assert_eq!(
            validate_embedding_dim(DIM_MPNET, DIM_MINILM),
            Err(DimValidationError::DimensionMismatch {
                expected: DIM_MINILM,
                actual: DIM_MPNET
            })
        );
    }
}
