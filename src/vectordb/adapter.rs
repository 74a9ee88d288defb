//! The reliability envelope around a [`VectorBackend`]: retry first, circuit
//! breaker enclosing the retry.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{CircuitBreakerConfig, RetryConfig};
use crate::resilience::circuit_breaker::{CircuitBreaker, CircuitMetrics};
use crate::resilience::retry::{RetryCounters, RetryPolicy};

use super::backend::VectorBackend;
use super::error::VectorBackendError;
use super::model::{BackendHealth, BackendStatistics, HealthStatus, VectorDocument, VectorMatch};

/// Wraps any [`VectorBackend`] with retry and a circuit breaker. The hybrid
/// engine depends on this type, never on a bare backend.
pub struct VectorBackendAdapter<B: VectorBackend> {
    inner: B,
    circuit_breaker: CircuitBreaker,
    retry: RetryPolicy,
}

impl<B: VectorBackend> VectorBackendAdapter<B> {
    /// Wraps `inner` with the given circuit breaker and retry tuning.
    pub fn new(inner: B, circuit_breaker: CircuitBreakerConfig, retry: RetryConfig) -> Self {
        Self {
            inner,
            circuit_breaker: CircuitBreaker::new(circuit_breaker),
            retry: RetryPolicy::new(retry),
        }
    }

    /// Current circuit breaker counters, for health/statistics reporting.
    pub fn circuit_metrics(&self) -> CircuitMetrics {
        self.circuit_breaker.metrics()
    }

    /// Current retry counters, for health/statistics reporting.
    pub fn retry_counters(&self) -> RetryCounters {
        self.retry.counters()
    }

    async fn guarded<T, F, Fut>(&self, op: F) -> Result<T, VectorBackendError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, VectorBackendError>>,
    {
        self.circuit_breaker.check()?;

        let result = self.retry.call_async(op).await;

        match &result {
            Ok(_) => self.circuit_breaker.record_success(),
            Err(err) => {
                if err.kind().counts_toward_circuit() {
                    self.circuit_breaker.record_failure();
                }
            }
        }

        result
    }
}

/// Convenience alias matching how a project typically holds its backend:
/// behind an `Arc` so the adapter can be shared across concurrent requests.
pub type SharedVectorBackendAdapter<B> = Arc<VectorBackendAdapter<B>>;

#[async_trait]
impl<B: VectorBackend> VectorBackend for VectorBackendAdapter<B> {
    async fn add_documents(&self, docs: Vec<VectorDocument>) -> Result<(), VectorBackendError> {
        self.guarded(|| {
            let docs = docs.clone();
            async move { self.inner.add_documents(docs).await }
        })
        .await
    }

    async fn query_vector(
        &self,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorMatch>, VectorBackendError> {
        self.guarded(|| async { self.inner.query_vector(embedding, top_k).await })
            .await
    }

    async fn query_keyword(
        &self,
        text: &str,
        top_k: usize,
    ) -> Result<Vec<VectorMatch>, VectorBackendError> {
        self.guarded(|| async { self.inner.query_keyword(text, top_k).await })
            .await
    }

    async fn query_hybrid(
        &self,
        embedding: &[f32],
        text: &str,
        top_k: usize,
        alpha: f32,
    ) -> Result<Vec<VectorMatch>, VectorBackendError> {
        self.guarded(|| async { self.inner.query_hybrid(embedding, text, top_k, alpha).await })
            .await
    }

    async fn delete_documents(&self, ids: &[String]) -> Result<usize, VectorBackendError> {
        self.guarded(|| async { self.inner.delete_documents(ids).await })
            .await
    }

    async fn get_statistics(&self) -> Result<BackendStatistics, VectorBackendError> {
        self.guarded(|| async { self.inner.get_statistics().await })
            .await
    }

    async fn get_health(&self) -> Result<BackendHealth, VectorBackendError> {
        let state = self.circuit_breaker.state();
        if self.circuit_breaker.check().is_err() {
            return Ok(BackendHealth {
                status: HealthStatus::Unhealthy,
                backend_available: false,
                circuit_breaker_state: state.to_string(),
                last_error: Some("circuit breaker open".to_string()),
            });
        }

        match self.inner.get_health().await {
            Ok(mut health) => {
                health.circuit_breaker_state = state.to_string();
                if state != crate::resilience::circuit_breaker::CircuitState::Closed
                    && health.status == HealthStatus::Healthy
                {
                    health.status = HealthStatus::Degraded;
                }
                Ok(health)
            }
            Err(e) => Ok(BackendHealth {
                status: HealthStatus::Unhealthy,
                backend_available: false,
                circuit_breaker_state: state.to_string(),
                last_error: Some(e.to_string()),
            }),
        }
    }
}
