//! Shared error vocabulary.
//!
//! Every module owns its own `thiserror`-derived error enum, but each one
//! classifies its variants into this small, crate-wide set of abstract
//! kinds so that retry policies, circuit breakers, and callers can reason
//! about failures without matching on module-specific types.

/// Abstract error classification shared across all module error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input. Never retried, surfaced to the caller as-is.
    Validation,
    /// An identifier (document, project, key) could not be resolved.
    NotFound,
    /// A call was rejected by an open circuit breaker.
    CircuitOpen,
    /// The downstream backend failed after retries were exhausted.
    Backend,
    /// The operation did not complete within its deadline.
    Timeout,
    /// A transport-level connection failure.
    Connection,
    /// A local I/O failure.
    Io,
    /// A programmer error that should never be swallowed.
    Internal,
}

impl ErrorKind {
    /// Whether a failure of this kind should be retried by [`crate::resilience::retry`].
    pub fn is_retriable(self) -> bool {
        matches!(self, Self::Timeout | Self::Connection | Self::Io)
    }

    /// Whether a failure of this kind counts against a circuit breaker's
    /// failure window.
    pub fn counts_toward_circuit(self) -> bool {
        matches!(self, Self::Backend | Self::Timeout | Self::Connection | Self::Io)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::CircuitOpen => "circuit_open",
            Self::Backend => "backend",
            Self::Timeout => "timeout",
            Self::Connection => "connection",
            Self::Io => "io",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Implemented by every module's error enum to expose its abstract kind.
pub trait ClassifiedError {
    /// Returns the abstract kind this error maps to.
    fn kind(&self) -> ErrorKind;

    /// Convenience wrapper around [`ErrorKind::is_retriable`].
    fn is_retriable(&self) -> bool {
        self.kind().is_retriable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retriable_kinds() {
        assert!(ErrorKind::Timeout.is_retriable());
        assert!(ErrorKind::Connection.is_retriable());
        assert!(ErrorKind::Io.is_retriable());
        assert!(!ErrorKind::Validation.is_retriable());
        assert!(!ErrorKind::CircuitOpen.is_retriable());
        assert!(!ErrorKind::NotFound.is_retriable());
    }

    #[test]
    fn circuit_accounting_kinds() {
        assert!(ErrorKind::Backend.counts_toward_circuit());
        assert!(!ErrorKind::Validation.counts_toward_circuit());
        assert!(!ErrorKind::NotFound.counts_toward_circuit());
    }
}
