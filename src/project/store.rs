//! `rusqlite`-backed persistence for project metadata records.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection};

use super::error::ProjectError;
use super::types::Project;

/// Owns the `projects` table. One connection, serialized behind a mutex —
/// metadata writes are infrequent compared to query traffic, so this is not
/// a contention point.
pub struct ProjectStore {
    conn: Mutex<Connection>,
}

impl ProjectStore {
    /// Opens (creating if absent) the sqlite database at `path` and ensures
    /// the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens an in-memory database, for tests.
    pub fn open_in_memory() -> Result<Self, ProjectError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<(), ProjectError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS projects (
                project_id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                embedding_model_name TEXT NOT NULL,
                collection_handle TEXT NOT NULL,
                metadata_json TEXT NOT NULL,
                created_at TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Inserts a new project record. Fails if `project_id` already exists.
    pub fn insert(&self, project: &Project) -> Result<(), ProjectError> {
        let metadata_json = serde_json::to_string(&project.metadata).map_err(|e| ProjectError::Store {
            reason: e.to_string(),
        })?;

        let conn = self.conn.lock().expect("project store mutex poisoned");
        conn.execute(
            "INSERT INTO projects
                (project_id, name, description, embedding_model_name, collection_handle, metadata_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                project.project_id,
                project.name,
                project.description,
                project.embedding_model_name,
                project.collection_handle,
                metadata_json,
                project.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                ProjectError::AlreadyExists {
                    project_id: project.project_id.clone(),
                }
            }
            other => ProjectError::from(other),
        })?;
        Ok(())
    }

    /// Fetches one project by id.
    pub fn get(&self, project_id: &str) -> Result<Option<Project>, ProjectError> {
        let conn = self.conn.lock().expect("project store mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT project_id, name, description, embedding_model_name, collection_handle, metadata_json, created_at
             FROM projects WHERE project_id = ?1",
        )?;
        let mut rows = stmt.query(params![project_id])?;
        match rows.next()? {
            Some(row) => Ok(Some(Self::row_to_project(row)?)),
            None => Ok(None),
        }
    }

    /// Lists every project, ordered by creation time.
    pub fn list(&self) -> Result<Vec<Project>, ProjectError> {
        let conn = self.conn.lock().expect("project store mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT project_id, name, description, embedding_model_name, collection_handle, metadata_json, created_at
             FROM projects ORDER BY created_at ASC",
        )?;
        let rows = stmt.query_map([], Self::row_to_project)?;
        let mut projects = Vec::new();
        for row in rows {
            projects.push(row?);
        }
        Ok(projects)
    }

    /// Overwrites the mutable fields of an existing project record.
    pub fn update(&self, project: &Project) -> Result<(), ProjectError> {
        let metadata_json = serde_json::to_string(&project.metadata).map_err(|e| ProjectError::Store {
            reason: e.to_string(),
        })?;

        let conn = self.conn.lock().expect("project store mutex poisoned");
        let changed = conn.execute(
            "UPDATE projects SET name = ?2, description = ?3, metadata_json = ?4 WHERE project_id = ?1",
            params![project.project_id, project.name, project.description, metadata_json],
        )?;
        if changed == 0 {
            return Err(ProjectError::NotFound {
                project_id: project.project_id.clone(),
            });
        }
        Ok(())
    }

    /// Deletes a project record. `Ok(false)` if it did not exist.
    pub fn delete(&self, project_id: &str) -> Result<bool, ProjectError> {
        let conn = self.conn.lock().expect("project store mutex poisoned");
        let changed = conn.execute("DELETE FROM projects WHERE project_id = ?1", params![project_id])?;
        Ok(changed > 0)
    }

    fn row_to_project(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
        let metadata_json: String = row.get(5)?;
        let metadata: HashMap<String, String> = serde_json::from_str(&metadata_json).unwrap_or_default();
        let created_at_text: String = row.get(6)?;
        let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_at_text)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc.timestamp_opt(0, 0).unwrap());

        Ok(Project {
            project_id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            embedding_model_name: row.get(3)?,
            collection_handle: row.get(4)?,
            metadata,
            created_at,
        })
    }
}
