//! Reliability primitives: circuit breaker and retry policy.
//!
//! These are pure, storage-agnostic building blocks. [`crate::vectordb::adapter`]
//! composes them into the reliability envelope around the vector backend.

pub mod circuit_breaker;
pub mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerError, CircuitMetrics, CircuitState};
pub use retry::{RetryCounters, RetryPolicy};
