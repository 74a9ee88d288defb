//! Errors returned by the project manager and its metadata store.

use thiserror::Error;

use crate::engine::EngineError;
use crate::error::{ClassifiedError, ErrorKind};
use crate::vectordb::VectorBackendError;

/// Errors returned by [`super::manager::ProjectManager`] operations.
#[derive(Debug, Error)]
pub enum ProjectError {
    /// No project exists with the given id.
    #[error("project not found: {project_id}")]
    NotFound {
        /// The id that failed to resolve.
        project_id: String,
    },

    /// A project with the given id already exists.
    #[error("project already exists: {project_id}")]
    AlreadyExists {
        /// The colliding id.
        project_id: String,
    },

    /// A caller-supplied field failed validation (empty name, unknown model
    /// family, attempted embedding-model change on update).
    #[error("invalid project field: {reason}")]
    Validation {
        /// Human-readable description.
        reason: String,
    },

    /// The metadata store (rusqlite) failed unexpectedly.
    #[error("project metadata store error: {reason}")]
    Store {
        /// Underlying failure description.
        reason: String,
    },

    /// Constructing or tearing down the project's vector collection failed.
    #[error(transparent)]
    VectorBackend(#[from] VectorBackendError),

    /// Constructing the embedding model for a project failed.
    #[error(transparent)]
    Embedding(#[from] crate::embedding::EmbeddingError),

    /// Querying a project's hybrid engine failed.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The requested document could not be resolved within the project.
    #[error("document not found in project {project_id}: {doc_id}")]
    DocumentNotFound {
        /// Project the lookup was scoped to.
        project_id: String,
        /// The id that failed to resolve.
        doc_id: String,
    },
}

impl ClassifiedError for ProjectError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } | Self::DocumentNotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists { .. } | Self::Validation { .. } => ErrorKind::Validation,
            Self::Store { .. } => ErrorKind::Internal,
            Self::VectorBackend(e) => e.kind(),
            Self::Embedding(e) => e.kind(),
            Self::Engine(e) => e.kind(),
        }
    }
}

impl From<rusqlite::Error> for ProjectError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Store {
            reason: e.to_string(),
        }
    }
}
