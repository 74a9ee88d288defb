//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

use crate::error::{ClassifiedError, ErrorKind};

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric value parsed from the environment was out of range.
    #[error("invalid value for '{name}': {value} ({reason})")]
    InvalidValue {
        /// Environment variable name.
        name: &'static str,
        /// Raw string value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// An environment value could not be parsed as the expected type.
    #[error("failed to parse '{name}'='{value}': {source}")]
    ParseError {
        /// Environment variable name.
        name: &'static str,
        /// Raw string value.
        value: String,
        #[source]
        /// Underlying parse error.
        source: std::num::ParseFloatError,
    },

    /// `data_dir` exists but is not a directory.
    #[error("data_dir is not a directory: {path}")]
    NotADirectory {
        /// Offending path.
        path: PathBuf,
    },
}

impl ClassifiedError for ConfigError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}
