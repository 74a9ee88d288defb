//! Environment-backed configuration.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::DEFAULT_ALPHA;

/// Circuit-breaker tuning, see [`crate::resilience::circuit_breaker`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircuitBreakerConfig {
    /// Failures within `failure_window` before the breaker opens.
    pub failure_threshold: u32,
    /// Sliding window, in seconds, over which failures are counted.
    pub failure_window: Duration,
    /// Time spent in `Open` before a probe is allowed.
    pub recovery_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            failure_window: Duration::from_secs(60),
            recovery_timeout: Duration::from_secs(30),
        }
    }
}

/// Retry tuning, see [`crate::resilience::retry`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts (the first try plus retries).
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_wait: Duration,
    /// Multiplier applied to the wait on each subsequent attempt.
    pub multiplier: f64,
    /// Ceiling on the computed wait.
    pub max_wait: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_wait: Duration::from_millis(100),
            multiplier: 2.0,
            max_wait: Duration::from_secs(5),
        }
    }
}

/// Semantic-cache tuning, see [`crate::cache::semantic_cache`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SemanticCacheConfig {
    /// Minimum cosine similarity for a probe to count as a hit.
    pub similarity_threshold: f32,
    /// Entry lifetime in seconds.
    pub ttl_seconds: u64,
    /// Maximum entries before LRU eviction.
    pub max_entries: usize,
}

impl Default for SemanticCacheConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.95,
            ttl_seconds: 3600,
            max_entries: 1000,
        }
    }
}

/// Root configuration for a server hosting this crate's core.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Root directory for per-project state (vector collections, metadata store).
    pub data_dir: PathBuf,
    /// Default embedding model name assigned to newly created projects.
    pub embedding_model: String,
    /// Per-project semantic cache size (entry count), used as the default
    /// for [`SemanticCacheConfig::max_entries`].
    pub cache_capacity: u32,
    /// Default hybrid-search vector weight.
    pub alpha: f32,
    /// Circuit breaker tuning applied to the vector backend adapter.
    pub circuit_breaker: CircuitBreakerConfig,
    /// Retry tuning applied to the vector backend adapter.
    pub retry: RetryConfig,
    /// Semantic cache tuning.
    pub semantic_cache: SemanticCacheConfig,
    /// CORS origins honored by the HTTP surface. Parsed and validated here
    /// so the surface can read it back, but not otherwise acted on by the
    /// core.
    pub allowed_origins: Vec<String>,
    /// Maximum accepted request body size, in bytes. Same surface-only
    /// status as `allowed_origins`.
    pub max_request_size: u64,
}

impl Default for Config {
    fn default() -> Self {
        let semantic_cache = SemanticCacheConfig::default();
        Self {
            data_dir: PathBuf::from("./.kbcore"),
            embedding_model: "all-MiniLM-L6-v2".to_string(),
            cache_capacity: semantic_cache.max_entries as u32,
            alpha: DEFAULT_ALPHA,
            circuit_breaker: CircuitBreakerConfig::default(),
            retry: RetryConfig::default(),
            semantic_cache,
            allowed_origins: Vec::new(),
            max_request_size: 10 * 1024 * 1024,
        }
    }
}

impl Config {
    const ENV_DATA_DIR: &'static str = "KBCORE_DATA_DIR";
    const ENV_EMBEDDING_MODEL: &'static str = "KBCORE_EMBEDDING_MODEL";
    const ENV_CACHE_CAPACITY: &'static str = "KBCORE_CACHE_CAPACITY";
    const ENV_ALPHA: &'static str = "KBCORE_ALPHA";
    const ENV_ALLOWED_ORIGINS: &'static str = "KBCORE_ALLOWED_ORIGINS";
    const ENV_MAX_REQUEST_SIZE: &'static str = "KBCORE_MAX_REQUEST_SIZE";

    /// Loads configuration from the environment, falling back to defaults
    /// for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let data_dir = Self::parse_path_from_env(Self::ENV_DATA_DIR, defaults.data_dir);
        let embedding_model =
            Self::parse_string_from_env(Self::ENV_EMBEDDING_MODEL, defaults.embedding_model);
        let cache_capacity =
            Self::parse_u32_from_env(Self::ENV_CACHE_CAPACITY, defaults.cache_capacity);
        let alpha = Self::parse_alpha_from_env(defaults.alpha)?;
        let allowed_origins = Self::parse_origins_from_env();
        let max_request_size =
            Self::parse_u64_from_env(Self::ENV_MAX_REQUEST_SIZE, defaults.max_request_size);

        let mut semantic_cache = defaults.semantic_cache;
        semantic_cache.max_entries = cache_capacity as usize;

        Ok(Self {
            data_dir,
            embedding_model,
            cache_capacity,
            alpha,
            circuit_breaker: defaults.circuit_breaker,
            retry: defaults.retry,
            semantic_cache,
            allowed_origins,
            max_request_size,
        })
    }

    /// Validates structural invariants not caught by parsing alone.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_dir.exists() && !self.data_dir.is_dir() {
            return Err(ConfigError::NotADirectory {
                path: self.data_dir.clone(),
            });
        }

        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(ConfigError::InvalidValue {
                name: Self::ENV_ALPHA,
                value: self.alpha.to_string(),
                reason: "alpha must be between 0 and 1".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.semantic_cache.similarity_threshold) {
            return Err(ConfigError::InvalidValue {
                name: "similarity_threshold",
                value: self.semantic_cache.similarity_threshold.to_string(),
                reason: "similarity_threshold must be between 0 and 1".to_string(),
            });
        }

        Ok(())
    }

    fn parse_path_from_env(var_name: &str, default: PathBuf) -> PathBuf {
        env::var(var_name).map(PathBuf::from).unwrap_or(default)
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        env::var(var_name).unwrap_or(default)
    }

    fn parse_u32_from_env(var_name: &str, default: u32) -> u32 {
        env::var(var_name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn parse_u64_from_env(var_name: &str, default: u64) -> u64 {
        env::var(var_name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn parse_alpha_from_env(default: f32) -> Result<f32, ConfigError> {
        match env::var(Self::ENV_ALPHA) {
            Ok(value) => {
                let parsed: f64 = value.parse().map_err(|e| ConfigError::ParseError {
                    name: Self::ENV_ALPHA,
                    value: value.clone(),
                    source: e,
                })?;
                Ok(parsed as f32)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_origins_from_env() -> Vec<String> {
        env::var(Self::ENV_ALLOWED_ORIGINS)
            .ok()
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}
