//! Qdrant-backed [`VectorBackend`] implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, DeletePointsBuilder, PointStruct, PointsIdsList,
    SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder, Value,
};

use super::backend::VectorBackend;
use super::error::VectorBackendError;
use super::model::{BackendHealth, BackendStatistics, HealthStatus, VectorDocument, VectorMatch};

/// Payload key the original string `doc_id` is stored under (Qdrant point
/// ids must be a `u64` or UUID, so the caller-facing id travels in the
/// payload instead).
const DOC_ID_PAYLOAD_KEY: &str = "doc_id";
const CONTENT_PAYLOAD_KEY: &str = "content";
const METADATA_PREFIX: &str = "meta_";

/// A Qdrant collection bound to one project.
pub struct QdrantBackend {
    client: Qdrant,
    collection: String,
    dimension: usize,
}

impl QdrantBackend {
    /// Connects to `url` and ensures `collection` exists at `dimension`.
    pub async fn connect(
        url: &str,
        collection: impl Into<String>,
        dimension: usize,
    ) -> Result<Self, VectorBackendError> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| VectorBackendError::ConnectionFailed {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let collection = collection.into();
        let backend = Self {
            client,
            collection,
            dimension,
        };
        backend.ensure_collection().await?;
        Ok(backend)
    }

    async fn ensure_collection(&self) -> Result<(), VectorBackendError> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| VectorBackendError::CollectionFailed {
                collection: self.collection.clone(),
                message: e.to_string(),
            })?;

        if !exists {
            let vectors_config = VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine);
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection)
                        .vectors_config(vectors_config)
                        .on_disk_payload(true),
                )
                .await
                .map_err(|e| VectorBackendError::CollectionFailed {
                    collection: self.collection.clone(),
                    message: e.to_string(),
                })?;
        }

        Ok(())
    }

    fn point_id(doc_id: &str) -> u64 {
        // Stable projection of the string id onto Qdrant's numeric point id
        // space. Collisions would merge distinct documents; the payload's
        // `doc_id` field remains the source of truth the repository keys on.
        let hash = blake3::hash(doc_id.as_bytes());
        u64::from_le_bytes(hash.as_bytes()[0..8].try_into().expect("8 bytes"))
    }
}

#[async_trait]
impl VectorBackend for QdrantBackend {
    async fn add_documents(&self, docs: Vec<VectorDocument>) -> Result<(), VectorBackendError> {
        if docs.is_empty() {
            return Ok(());
        }

        for doc in &docs {
            if doc.embedding.len() != self.dimension {
                return Err(VectorBackendError::InvalidDimension {
                    expected: self.dimension,
                    actual: doc.embedding.len(),
                });
            }
        }

        let points: Vec<PointStruct> = docs
            .into_iter()
            .map(|doc| {
                let mut payload: HashMap<String, Value> = HashMap::new();
                payload.insert(DOC_ID_PAYLOAD_KEY.to_string(), doc.doc_id.clone().into());
                payload.insert(CONTENT_PAYLOAD_KEY.to_string(), doc.content.into());
                for (k, v) in doc.metadata {
                    payload.insert(format!("{METADATA_PREFIX}{k}"), v.into());
                }
                PointStruct::new(Self::point_id(&doc.doc_id), doc.embedding, payload)
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(|e| VectorBackendError::AddDocumentsFailed {
                collection: self.collection.clone(),
                message: e.to_string(),
            })?;

        Ok(())
    }

    async fn query_vector(
        &self,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorMatch>, VectorBackendError> {
        let search = SearchPointsBuilder::new(&self.collection, embedding.to_vec(), top_k as u64)
            .with_payload(true);

        let response = self.client.search_points(search).await.map_err(|e| {
            VectorBackendError::QueryFailed {
                collection: self.collection.clone(),
                message: e.to_string(),
            }
        })?;

        Ok(response
            .result
            .into_iter()
            .map(|point| {
                let payload = point.payload;
                let doc_id = payload
                    .get(DOC_ID_PAYLOAD_KEY)
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default();

                let metadata = payload
                    .iter()
                    .filter_map(|(k, v)| {
                        k.strip_prefix(METADATA_PREFIX)
                            .map(|stripped| (stripped.to_string(), v.as_str().unwrap_or_default().to_string()))
                    })
                    .collect();

                VectorMatch {
                    doc_id,
                    score: point.score,
                    metadata,
                }
            })
            .collect())
    }

    async fn delete_documents(&self, ids: &[String]) -> Result<usize, VectorBackendError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let point_ids: Vec<_> = ids.iter().map(|id| Self::point_id(id).into()).collect();
        let selector = PointsIdsList { ids: point_ids };

        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.collection)
                    .points(selector)
                    .wait(true),
            )
            .await
            .map_err(|e| VectorBackendError::DeleteFailed {
                collection: self.collection.clone(),
                message: e.to_string(),
            })?;

        Ok(ids.len())
    }

    async fn get_statistics(&self) -> Result<BackendStatistics, VectorBackendError> {
        let info = self
            .client
            .collection_info(&self.collection)
            .await
            .map_err(|e| VectorBackendError::CollectionFailed {
                collection: self.collection.clone(),
                message: e.to_string(),
            })?;

        let total_documents = info
            .result
            .map(|r| r.points_count.unwrap_or(0) as usize)
            .unwrap_or(0);

        Ok(BackendStatistics {
            backend: "qdrant".to_string(),
            collection: self.collection.clone(),
            total_documents,
            dimension: self.dimension,
        })
    }

    async fn get_health(&self) -> Result<BackendHealth, VectorBackendError> {
        match self.client.health_check().await {
            Ok(_) => Ok(BackendHealth {
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
