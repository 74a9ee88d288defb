//! `rusqlite`-backed persistence for API key records.

use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection};

use super::error::AuthError;
use super::types::{ApiKey, Scope};

/// Owns the `api_keys` table. One connection, serialized behind a mutex —
/// key writes (create/revoke) are rare compared to the validation reads they
/// guard, which only ever touch one row by its hash index.
pub struct ApiKeyStore {
    conn: Mutex<Connection>,
}

impl ApiKeyStore {
    /// Opens (creating if absent) the sqlite database at `path` and ensures
    /// the schema exists. Safe to point at the same file a [`crate::project::ProjectStore`]
    /// uses — the two own disjoint tables.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, AuthError> {
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens an in-memory database, for tests.
    pub fn open_in_memory() -> Result<Self, AuthError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<(), AuthError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS api_keys (
                key_id TEXT PRIMARY KEY,
                project_id TEXT NOT NULL,
                hashed_secret TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                scope TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT,
                revoked INTEGER NOT NULL,
                last_used_at TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_api_keys_hash ON api_keys(hashed_secret);
            CREATE INDEX IF NOT EXISTS idx_api_keys_project ON api_keys(project_id);",
        )?;
        Ok(())
    }

    /// Inserts a new key record.
    pub fn insert(&self, key: &ApiKey) -> Result<(), AuthError> {
        let conn = self.conn.lock().expect("api key store mutex poisoned");
        conn.execute(
            "INSERT INTO api_keys
                (key_id, project_id, hashed_secret, name, scope, created_at, expires_at, revoked, last_used_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                key.key_id,
                key.project_id,
                key.hashed_secret,
                key.name,
                key.scope.as_str(),
                key.created_at.to_rfc3339(),
                key.expires_at.map(|t| t.to_rfc3339()),
                key.revoked as i64,
                key.last_used_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    /// Looks up a key by the hex-encoded hash of its raw secret.
    pub fn get_by_hash(&self, hashed_secret: &str) -> Result<Option<ApiKey>, AuthError> {
        let conn = self.conn.lock().expect("api key store mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT key_id, project_id, hashed_secret, name, scope, created_at, expires_at, revoked, last_used_at
             FROM api_keys WHERE hashed_secret = ?1",
        )?;
        let mut rows = stmt.query(params![hashed_secret])?;
        match rows.next()? {
            Some(row) => Ok(Some(Self::row_to_key(row)?)),
            None => Ok(None),
        }
    }

    /// Lists every key scoped to `project_id`, ordered by creation time.
    pub fn list_for_project(&self, project_id: &str) -> Result<Vec<ApiKey>, AuthError> {
        let conn = self.conn.lock().expect("api key store mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT key_id, project_id, hashed_secret, name, scope, created_at, expires_at, revoked, last_used_at
             FROM api_keys WHERE project_id = ?1 ORDER BY created_at ASC",
        )?;
        let rows = stmt.query_map(params![project_id], Self::row_to_key)?;
        let mut keys = Vec::new();
        for row in rows {
            keys.push(row?);
        }
        Ok(keys)
    }

    /// Marks a key revoked. `Ok(false)` if `key_id` does not exist.
    pub fn revoke(&self, key_id: &str) -> Result<bool, AuthError> {
        let conn = self.conn.lock().expect("api key store mutex poisoned");
        let changed = conn.execute(
            "UPDATE api_keys SET revoked = 1 WHERE key_id = ?1",
            params![key_id],
        )?;
        Ok(changed > 0)
    }

    /// Stamps `last_used_at` to `now` for a successfully validated key.
    pub fn touch_last_used(&self, key_id: &str, now: DateTime<Utc>) -> Result<(), AuthError> {
        let conn = self.conn.lock().expect("api key store mutex poisoned");
        conn.execute(
            "UPDATE api_keys SET last_used_at = ?2 WHERE key_id = ?1",
            params![key_id, now.to_rfc3339()],
        )?;
        Ok(())
    }

    fn row_to_key(row: &rusqlite::Row<'_>) -> rusqlite::Result<ApiKey> {
        let scope_text: String = row.get(4)?;
        let scope = Scope::parse(&scope_text).unwrap_or(Scope::Read);

        let created_at_text: String = row.get(5)?;
        let created_at = Self::parse_timestamp(&created_at_text);

        let expires_at_text: Option<String> = row.get(6)?;
        let expires_at = expires_at_text.map(|t| Self::parse_timestamp(&t));

        let last_used_at_text: Option<String> = row.get(8)?;
        let last_used_at = last_used_at_text.map(|t| Self::parse_timestamp(&t));

        let revoked: i64 = row.get(7)?;

        Ok(ApiKey {
            key_id: row.get(0)?,
            project_id: row.get(1)?,
            hashed_secret: row.get(2)?,
            name: row.get(3)?,
            scope,
            created_at,
            expires_at,
            revoked: revoked != 0,
            last_used_at,
        })
    }

    fn parse_timestamp(text: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(text)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc.timestamp_opt(0, 0).unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: &str, project_id: &str, hash: &str) -> ApiKey {
        ApiKey {
            key_id: id.to_string(),
            project_id: project_id.to_string(),
            hashed_secret: hash.to_string(),
            name: "ci".to_string(),
            scope: Scope::Read,
            created_at: Utc::now(),
            expires_at: None,
            revoked: false,
            last_used_at: None,
        }
    }

    #[test]
    fn insert_and_lookup_by_hash_round_trips() {
        let store = ApiKeyStore::open_in_memory().unwrap();
        store.insert(&key("k1", "p1", "deadbeef")).unwrap();
        let fetched = store.get_by_hash("deadbeef").unwrap().unwrap();
        assert_eq!(fetched.key_id, "k1");
    }

    #[test]
    fn revoke_flips_flag() {
        let store = ApiKeyStore::open_in_memory().unwrap();
        store.insert(&key("k1", "p1", "deadbeef")).unwrap();
        assert!(store.revoke("k1").unwrap());
        let fetched = store.get_by_hash("deadbeef").unwrap().unwrap();
        assert!(fetched.revoked);
    }

    #[test]
    fn revoke_unknown_key_reports_false() {
        let store = ApiKeyStore::open_in_memory().unwrap();
        assert!(!store.revoke("missing").unwrap());
    }

    #[test]
    fn list_for_project_excludes_other_projects() {
        let store = ApiKeyStore::open_in_memory().unwrap();
        store.insert(&key("k1", "p1", "hash1")).unwrap();
        store.insert(&key("k2", "p2", "hash2")).unwrap();
        let keys = store.list_for_project("p1").unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].key_id, "k1");
    }

    #[test]
    fn touch_last_used_updates_timestamp() {
        let store = ApiKeyStore::open_in_memory().unwrap();
        store.insert(&key("k1", "p1", "deadbeef")).unwrap();
        let now = Utc::now();
        store.touch_last_used("k1", now).unwrap();
        let fetched = store.get_by_hash("deadbeef").unwrap().unwrap();
        assert!(fetched.last_used_at.is_some());
    }
}
