//! In-memory [`VectorBackend`] used for tests and the `mock` feature — no
//! external service required.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::backend::VectorBackend;
use super::error::VectorBackendError;
use super::model::{
    BackendHealth, BackendStatistics, HealthStatus, VectorDocument, VectorMatch,
};

struct StoredPoint {
    embedding: Vec<f32>,
    metadata: HashMap<String, String>,
}

/// An in-process, lock-guarded point store implementing [`VectorBackend`].
pub struct InMemoryVectorBackend {
    collection: String,
    dimension: usize,
    points: RwLock<HashMap<String, StoredPoint>>,
    /// When set, every call fails with this error — used to exercise the
    /// reliability envelope (circuit breaker / retry / degradation) in tests.
    fail_with: RwLock<Option<String>>,
}

impl InMemoryVectorBackend {
    /// Creates an empty backend bound to `collection` at `dimension`.
    pub fn new(collection: impl Into<String>, dimension: usize) -> Self {
        Self {
            collection: collection.into(),
            dimension,
            points: RwLock::new(HashMap::new()),
            fail_with: RwLock::new(None),
        }
    }

    /// Makes every subsequent call fail with a connection error, simulating
    /// a downstream outage.
    pub fn inject_failure(&self, message: impl Into<String>) {
        *self.fail_with.write() = Some(message.into());
    }

    /// Clears any injected failure.
    pub fn clear_failure(&self) {
        *self.fail_with.write() = None;
    }

    fn check_failure(&self) -> Result<(), VectorBackendError> {
        if let Some(message) = self.fail_with.read().clone() {
            return Err(VectorBackendError::ConnectionFailed {
                url: self.collection.clone(),
                message,
            });
        }
        Ok(())
    }
}

/// Cosine similarity; zero-norm vectors yield `0.0` rather than `NaN`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorBackend for InMemoryVectorBackend {
    async fn add_documents(&self, docs: Vec<VectorDocument>) -> Result<(), VectorBackendError> {
        self.check_failure()?;
        for doc in &docs {
            if doc.embedding.len() != self.dimension {
                return Err(VectorBackendError::InvalidDimension {
                    expected: self.dimension,
                    actual: doc.embedding.len(),
                });
            }
        }
        let mut points = self.points.write();
        for doc in docs {
            points.insert(
                doc.doc_id,
                StoredPoint {
                    embedding: doc.embedding,
                    metadata: doc.metadata,
                },
            );
        }
        Ok(())
    }

    async fn query_vector(
        &self,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorMatch>, VectorBackendError> {
        self.check_failure()?;
        let points = self.points.read();
        let mut matches: Vec<VectorMatch> = points
            .iter()
            .map(|(doc_id, point)| VectorMatch {
                doc_id: doc_id.clone(),
                score: cosine_similarity(embedding, &point.embedding),
                metadata: point.metadata.clone(),
            })
            .collect();
        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn delete_documents(&self, ids: &[String]) -> Result<usize, VectorBackendError> {
        self.check_failure()?;
        let mut points = self.points.write();
        let mut removed = 0;
        for id in ids {
            if points.remove(id).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn get_statistics(&self) -> Result<BackendStatistics, VectorBackendError> {
        self.check_failure()?;
        Ok(BackendStatistics {
            backend: "mock".to_string(),
            collection: self.collection.clone(),
            total_documents: self.points.read().len(),
            dimension: self.dimension,
        })
    }

    async fn get_health(&self) -> Result<BackendHealth, VectorBackendError> {
        match self.check_failure() {
            Ok(()) => Ok(BackendHealth {
                status: HealthStatus::Healthy,
                backend_available: true,
                circuit_breaker_state: "closed".to_string(),
                last_error: None,
            }),
            Err(e) => Ok(BackendHealth {
                status: HealthStatus::Unhealthy,
                backend_available: false,
                circuit_breaker_state: "closed".to_string(),
                last_error: Some(e.to_string()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, v: Vec<f32>) -> VectorDocument {
        VectorDocument {
            doc_id: id.to_string(),
            embedding: v,
            content: id.to_string(),
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn add_and_query_ranks_by_similarity() {
        let backend = InMemoryVectorBackend::new("c", 2);
        backend
            .add_documents(vec![doc("a", vec![1.0, 0.0]), doc("b", vec![0.0, 1.0])])
            .await
            .unwrap();

        let results = backend.query_vector(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(results[0].doc_id, "a");
    }

    #[tokio::test]
    async fn dimension_mismatch_is_rejected() {
        let backend = InMemoryVectorBackend::new("c", 2);
        let err = backend.add_documents(vec![doc("a", vec![1.0])]).await;
        assert!(matches!(err, Err(VectorBackendError::InvalidDimension { .. })));
    }

    #[tokio::test]
    async fn injected_failure_propagates() {
        let backend = InMemoryVectorBackend::new("c", 2);
        backend.inject_failure("boom");
        let err = backend.query_vector(&[1.0, 0.0], 1).await;
        assert!(matches!(err, Err(VectorBackendError::ConnectionFailed { .. })));
    }

    #[tokio::test]
    async fn delete_reports_actual_count() {
        let backend = InMemoryVectorBackend::new("c", 2);
        backend
            .add_documents(vec![doc("a", vec![1.0, 0.0])])
            .await
            .unwrap();
        let removed = backend
            .delete_documents(&["a".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, 1);
    }
}
