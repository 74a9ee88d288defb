//! Resolves a project id to its isolated repository, caches, engine, and
//! vector-store collection.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::cache::embedding_cache::EmbeddingCache;
use crate::cache::semantic_cache::{SemanticCache, SemanticCacheConfig as RuntimeSemanticCacheConfig};
use crate::config::Config;
use crate::embedding::{CandleBertEmbedder, EmbeddingModel, EmbeddingModelConfig, EmbeddingModelFamily};
use crate::engine::{HybridQueryEngine, ScoredDocument};
use crate::query::expander::QueryExpander;
use crate::repository::{Document, DocumentRepository};
use crate::vectordb::{self, VectorBackend, VectorDocument};

use super::error::ProjectError;
use super::store::ProjectStore;
use super::types::{Project, ProjectQueryResult, ProjectStats, ProjectUpdate, QueryOptions};

/// The per-project runtime state a [`ProjectManager`] constructs lazily and
/// then shares across every request for that project.
struct ProjectComponents {
    repository: Arc<DocumentRepository>,
    embedding_cache: Arc<EmbeddingCache>,
    semantic_cache: Arc<SemanticCache>,
    embedder: Arc<dyn EmbeddingModel>,
    engine: Arc<HybridQueryEngine>,
    backend: Arc<dyn VectorBackend>,
    expander: Arc<QueryExpander>,
}

/// Creates/lists/deletes projects and resolves a project id to its
/// components. Each project owns a distinct [`DocumentRepository`],
/// embedding cache, semantic cache, and vector-store collection, built once
/// and shared thereafter — construction itself is serialized by the
/// `components` registry lock.
///
/// Document and embedding state lives only in process memory — only project
/// metadata and API keys are persisted (via
/// [`ProjectStore`]/[`crate::auth::ApiKeyStore`]); there is no durable
/// write-ahead log for document content.
pub struct ProjectManager {
    store: ProjectStore,
    config: Config,
    backend_kind: String,
    backend_url: String,
    model_path: Option<PathBuf>,
    components: RwLock<HashMap<String, Arc<ProjectComponents>>>,
}

impl ProjectManager {
    /// Builds a manager over an already-open metadata store. `backend_kind`
    /// is one of [`vectordb::BACKEND_KIND_QDRANT`]/[`vectordb::BACKEND_KIND_MOCK`];
    /// `backend_url` is only consulted for the Qdrant kind. `model_path`, if
    /// set, points at a real embedding-model checkpoint directory shared by
    /// every project's embedder; `None` runs every project's embedder in
    /// deterministic stub mode.
    pub fn new(
        config: Config,
        store: ProjectStore,
        backend_kind: impl Into<String>,
        backend_url: impl Into<String>,
        model_path: Option<PathBuf>,
    ) -> Self {
        Self {
            store,
            config,
            backend_kind: backend_kind.into(),
            backend_url: backend_url.into(),
            model_path,
            components: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a project: validates its fields, builds its runtime
    /// components (including the vector-store collection), and persists its
    /// metadata record. A failure building components leaves no metadata
    /// record behind.
    #[instrument(skip(self, metadata), fields(op = "project.create"))]
    pub async fn create_project(
        &self,
        id: Option<String>,
        name: &str,
        description: &str,
        embedding_model: &str,
        metadata: HashMap<String, String>,
    ) -> Result<Project, ProjectError> {
        if name.trim().is_empty() {
            return Err(ProjectError::Validation {
                reason: "project name must not be empty".to_string(),
            });
        }

        let project_id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
        if self.store.get(&project_id)?.is_some() {
            return Err(ProjectError::AlreadyExists { project_id });
        }

        let project = Project {
            project_id: project_id.clone(),
            name: name.to_string(),
            description: description.to_string(),
            embedding_model_name: embedding_model.to_string(),
            collection_handle: vectordb::collection_name(&project_id),
            metadata,
            created_at: Utc::now(),
        };

        let built = self.build_components(&project).await?;

        self.store.insert(&project)?;
        self.components
            .write()
            .await
            .insert(project_id, Arc::new(built));

        Ok(project)
    }

    /// Lists every known project, in creation order.
    pub fn list_projects(&self) -> Result<Vec<Project>, ProjectError> {
        Ok(self.store.list()?)
    }

    /// Fetches one project's metadata, if it exists.
    pub fn get_project(&self, project_id: &str) -> Result<Option<Project>, ProjectError> {
        Ok(self.store.get(project_id)?)
    }

    /// Partially updates a project's name/description/metadata. The
    /// embedding model is immutable — [`ProjectUpdate`] has no field for it.
    #[instrument(skip(self, update), fields(op = "project.update"))]
    pub fn update_project(&self, project_id: &str, update: ProjectUpdate) -> Result<Project, ProjectError> {
        let mut project = self
            .store
            .get(project_id)?
            .ok_or_else(|| ProjectError::NotFound {
                project_id: project_id.to_string(),
            })?;

        if let Some(name) = update.name {
            if name.trim().is_empty() {
                return Err(ProjectError::Validation {
                    reason: "project name must not be empty".to_string(),
                });
            }
            project.name = name;
        }
        if let Some(description) = update.description {
            project.description = description;
        }
        if let Some(metadata) = update.metadata {
            project.metadata.extend(metadata);
        }

        self.store.update(&project)?;
        Ok(project)
    }

    /// Tears down a project: drops its in-memory components (best-effort
    /// clearing its vector-store collection first) and removes its metadata
    /// record.
    #[instrument(skip(self), fields(op = "project.delete"))]
    pub async fn delete_project(&self, project_id: &str) -> Result<(), ProjectError> {
        if let Some(components) = self.components.write().await.remove(project_id) {
            let ids = components.repository.document_ids();
            if !ids.is_empty()
                && let Err(e) = components.backend.delete_documents(&ids).await
            {
                warn!(project_id, error = %e, "failed to clear vector collection on project delete");
            }
        }

        if self.store.delete(project_id)? {
            Ok(())
        } else {
            Err(ProjectError::NotFound {
                project_id: project_id.to_string(),
            })
        }
    }

    /// Ingests one document: adds it to the repository, embeds it into the
    /// embedding cache, and mirrors it to the vector backend for durability.
    /// A backend-mirror failure is logged and does not fail ingestion — the
    /// document is already queryable in-process, and the mirror is a
    /// best-effort durability path, not the query path (see `DESIGN.md`).
    #[instrument(skip(self, content, metadata), fields(op = "project.ingest"))]
    pub async fn ingest_document(
        &self,
        project_id: &str,
        content: &str,
        name: Option<String>,
        path: Option<String>,
        metadata: HashMap<String, String>,
    ) -> Result<String, ProjectError> {
        if content.trim().is_empty() {
            return Err(ProjectError::Validation {
                reason: "document content must not be empty".to_string(),
            });
        }

        let components = self.resolve(project_id).await?;
        let doc_id = Uuid::new_v4().to_string();
        let doc = Document {
            doc_id: doc_id.clone(),
            content: content.to_string(),
            name: name.unwrap_or_else(|| doc_id.clone()),
            path: path.unwrap_or_default(),
            metadata: metadata.clone(),
        };
        components.repository.add_document(doc);

        match components.embedder.embed(content) {
            Ok(embedding) => {
                components.embedding_cache.put(&doc_id, embedding.clone());
                let vector_doc = VectorDocument {
                    doc_id: doc_id.clone(),
                    embedding,
                    content: content.to_string(),
                    metadata,
                };
                if let Err(e) = components.backend.add_documents(vec![vector_doc]).await {
                    warn!(project_id, doc_id = %doc_id, error = %e, "vector backend mirror failed, continuing");
                }
            }
            Err(e) => {
                warn!(project_id, doc_id = %doc_id, error = %e, "embedding failed at ingest, document remains keyword-searchable only");
            }
        }

        Ok(doc_id)
    }

    /// Runs a query against a project: optional query expansion, a semantic-
    /// cache probe, then the hybrid engine (optionally MMR/diversity
    /// re-ranked), with the result cached back for future semantically-
    /// similar probes.
    #[instrument(skip(self, query, options), fields(op = "project.query"))]
    pub async fn query_project(
        &self,
        project_id: &str,
        query: &str,
        options: QueryOptions,
    ) -> Result<ProjectQueryResult, ProjectError> {
        let components = self.resolve(project_id).await?;

        if query.trim().is_empty() {
            return Ok(ProjectQueryResult {
                results: Vec::new(),
                degraded: false,
                expansion: None,
            });
        }

        let expansion = options.expand_query.then(|| components.expander.expand(query));
        let effective_query = expansion
            .as_ref()
            .map(|e| e.expanded.clone())
            .unwrap_or_else(|| query.to_string());

        let query_embedding = components.embedder.embed(&effective_query).ok();

        if let Some(embedding) = &query_embedding
            && let Some(hit) = components.semantic_cache.get(embedding)
        {
            let results: Vec<ScoredDocument> = hit
                .results
                .into_iter()
                .filter_map(|v| serde_json::from_value(v).ok())
                .collect();
            return Ok(ProjectQueryResult {
                results,
                degraded: false,
                expansion,
            });
        }

        let (results, degraded) = if let Some(lambda) = options.mmr_lambda {
            let results = components
                .engine
                .search_with_mmr(&effective_query, lambda, options.top_k, options.mode)?;
            (results, false)
        } else if let Some(threshold) = options.diversity_threshold {
            let results = components
                .engine
                .search_with_diversity(&effective_query, threshold, options.top_k, options.mode)?;
            (results, false)
        } else {
            match options.mode {
                crate::engine::SearchMode::Keyword => {
                    let mut results = components.engine.search_keyword(&effective_query);
                    results.truncate(options.top_k);
                    (results, false)
                }
                crate::engine::SearchMode::Vector => {
                    components
                        .engine
                        .search_vector(&effective_query, options.top_k, options.fallback_on_error)?
                }
                crate::engine::SearchMode::Hybrid => components.engine.search_hybrid(
                    &effective_query,
                    options.alpha,
                    options.top_k,
                    options.fallback_on_error,
                )?,
            }
        };

        if !degraded
            && let Some(embedding) = query_embedding
        {
            let cached: Vec<serde_json::Value> = results
                .iter()
                .filter_map(|r| serde_json::to_value(r).ok())
                .collect();
            components.semantic_cache.put(query, embedding, cached);
        }

        Ok(ProjectQueryResult {
            results,
            degraded,
            expansion,
        })
    }

    /// Aggregate statistics for a project: repository/cache sizes plus a
    /// best-effort backend probe (`None` fields if the backend call fails —
    /// stats reporting never fails the whole call over a degraded backend).
    #[instrument(skip(self), fields(op = "project.stats"))]
    pub async fn get_project_stats(&self, project_id: &str) -> Result<ProjectStats, ProjectError> {
        let components = self.resolve(project_id).await?;

        let repo_stats = components.repository.get_stats();
        let cache_stats = components.semantic_cache.stats();
        let embedding_stats = components.embedding_cache.stats();

        Ok(ProjectStats {
            documents: repo_stats.documents,
            terms: repo_stats.terms,
            cache_size: cache_stats.size,
            embedding_cache_size: embedding_stats.size,
            backend: components.backend.get_statistics().await.ok(),
            backend_health: components.backend.get_health().await.ok(),
        })
    }

    /// Drops every in-memory project component. Metadata records survive —
    /// this is in-process teardown for orderly shutdown/tests, not deletion.
    pub async fn cleanup_all(&self) {
        self.components.write().await.clear();
    }

    async fn resolve(&self, project_id: &str) -> Result<Arc<ProjectComponents>, ProjectError> {
        if let Some(components) = self.components.read().await.get(project_id) {
            return Ok(Arc::clone(components));
        }

        let mut guard = self.components.write().await;
        if let Some(components) = guard.get(project_id) {
            return Ok(Arc::clone(components));
        }

        let project = self
            .store
            .get(project_id)?
            .ok_or_else(|| ProjectError::NotFound {
                project_id: project_id.to_string(),
            })?;

        let built = Arc::new(self.build_components(&project).await?);
        guard.insert(project_id.to_string(), Arc::clone(&built));
        Ok(built)
    }

    async fn build_components(&self, project: &Project) -> Result<ProjectComponents, ProjectError> {
        let family = EmbeddingModelFamily::from_name(&project.embedding_model_name);
        let embedder_config = match &self.model_path {
            Some(path) => EmbeddingModelConfig::new(family, path.clone()),
            None => EmbeddingModelConfig::stub(family),
        };
        let embedder: Arc<dyn EmbeddingModel> = Arc::new(CandleBertEmbedder::load(embedder_config)?);

        let repository = Arc::new(DocumentRepository::new());
        let embedding_cache = Arc::new(EmbeddingCache::new(self.config.cache_capacity as usize));
        let semantic_cache = Arc::new(SemanticCache::new(RuntimeSemanticCacheConfig {
            similarity_threshold: self.config.semantic_cache.similarity_threshold,
            ttl: Duration::from_secs(self.config.semantic_cache.ttl_seconds),
            max_entries: self.config.semantic_cache.max_entries,
        }));

        let backend = vectordb::create_vector_backend(
            &self.backend_kind,
            &self.backend_url,
            &project.collection_handle,
            family.dim(),
            self.config.circuit_breaker,
            self.config.retry,
        )
        .await?;

        let engine = Arc::new(HybridQueryEngine::new(
            Arc::clone(&repository),
            Arc::clone(&embedding_cache),
            Arc::clone(&embedder),
            self.config.alpha,
        ));

        Ok(ProjectComponents {
            repository,
            embedding_cache,
            semantic_cache,
            embedder,
            engine,
            backend,
            expander: Arc::new(QueryExpander::new(true, 5)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SearchMode;

    fn manager() -> ProjectManager {
        let mut config = Config::default();
        config.semantic_cache.max_entries = 10;
        ProjectManager::new(
            config,
            ProjectStore::open_in_memory().unwrap(),
            vectordb::BACKEND_KIND_MOCK,
            "",
            None,
        )
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let manager = manager();
        let project = manager
            .create_project(None, "demo", "a demo project", "all-MiniLM-L6-v2", HashMap::new())
            .await
            .unwrap();

        let fetched = manager.get_project(&project.project_id).unwrap().unwrap();
        assert_eq!(fetched.name, "demo");
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected() {
        let manager = manager();
        manager
            .create_project(Some("p1".to_string()), "a", "", "all-MiniLM-L6-v2", HashMap::new())
            .await
            .unwrap();
        let err = manager
            .create_project(Some("p1".to_string()), "b", "", "all-MiniLM-L6-v2", HashMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ProjectError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn ingest_and_query_round_trips() {
        let manager = manager();
        let project = manager
            .create_project(None, "demo", "", "all-MiniLM-L6-v2", HashMap::new())
            .await
            .unwrap();

        manager
            .ingest_document(
                &project.project_id,
                "rust programming language",
                None,
                None,
                HashMap::new(),
            )
            .await
            .unwrap();
        manager
            .ingest_document(
                &project.project_id,
                "python data science",
                None,
                None,
                HashMap::new(),
            )
            .await
            .unwrap();

        let result = manager
            .query_project(
                &project.project_id,
                "rust programming",
                QueryOptions {
                    mode: SearchMode::Keyword,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(!result.degraded);
        assert_eq!(result.results[0].document.content, "rust programming language");
    }

    #[tokio::test]
    async fn query_unknown_project_is_not_found() {
        let manager = manager();
        let err = manager
            .query_project("missing", "hello", QueryOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProjectError::NotFound { .. }));
    }

    #[tokio::test]
    async fn delete_removes_metadata_and_components() {
        let manager = manager();
        let project = manager
            .create_project(None, "demo", "", "all-MiniLM-L6-v2", HashMap::new())
            .await
            .unwrap();

        manager.delete_project(&project.project_id).await.unwrap();
        assert!(manager.get_project(&project.project_id).unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_query_short_circuits() {
        let manager = manager();
        let project = manager
            .create_project(None, "demo", "", "all-MiniLM-L6-v2", HashMap::new())
            .await
            .unwrap();

        let result = manager
            .query_project(&project.project_id, "   ", QueryOptions::default())
            .await
            .unwrap();
        assert!(result.results.is_empty());
        assert!(!result.degraded);
    }

    #[tokio::test]
    async fn stats_report_repository_and_cache_sizes() {
        let manager = manager();
        let project = manager
            .create_project(None, "demo", "", "all-MiniLM-L6-v2", HashMap::new())
            .await
            .unwrap();
        manager
            .ingest_document(&project.project_id, "hello world", None, None, HashMap::new())
            .await
            .unwrap();

        let stats = manager.get_project_stats(&project.project_id).await.unwrap();
        assert_eq!(stats.documents, 1);
    }
}
