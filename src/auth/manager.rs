//! Scoped API key issuance, validation, and revocation.

use chrono::{Duration as ChronoDuration, Utc};
use tracing::instrument;
use uuid::Uuid;

use crate::hashing::{generate_api_key_secret, hash_api_key_secret, hash_to_hex};

use super::error::AuthError;
use super::store::ApiKeyStore;
use super::types::{ApiKey, ApiKeyMetadata, CreatedApiKey, Scope};

/// Issues, validates, and revokes project-scoped API keys. Stateless beyond
/// the backing [`ApiKeyStore`] — safe to share across threads behind an
/// `Arc`, same as [`crate::project::ProjectManager`].
pub struct ProjectAuthManager {
    store: ApiKeyStore,
}

impl ProjectAuthManager {
    /// Wraps an already-open key store.
    pub fn new(store: ApiKeyStore) -> Self {
        Self { store }
    }

    /// Generates a fresh secret, hashes it, and persists the record. The raw
    /// secret is returned exactly once, in [`CreatedApiKey::secret`]; only
    /// the hash is ever stored.
    #[instrument(skip(self), fields(op = "auth.create_key"))]
    pub fn create_api_key(
        &self,
        project_id: &str,
        name: &str,
        scope: Scope,
        expires_days: Option<i64>,
    ) -> Result<CreatedApiKey, AuthError> {
        if name.trim().is_empty() {
            return Err(AuthError::Validation {
                reason: "api key name must not be empty".to_string(),
            });
        }
        if let Some(days) = expires_days
            && days <= 0
        {
            return Err(AuthError::Validation {
                reason: "expires_days must be positive".to_string(),
            });
        }

        let secret = generate_api_key_secret();
        let hashed_secret = hash_to_hex(&hash_api_key_secret(&secret));
        let created_at = Utc::now();
        let expires_at = expires_days.map(|days| created_at + ChronoDuration::days(days));

        let key = ApiKey {
            key_id: Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            hashed_secret,
            name: name.to_string(),
            scope,
            created_at,
            expires_at,
            revoked: false,
            last_used_at: None,
        };

        self.store.insert(&key)?;

        Ok(CreatedApiKey {
            metadata: key.to_metadata(),
            secret,
        })
    }

    /// Validates a raw secret against a project and required scope: the key
    /// must resolve, be unrevoked, be unexpired, match the project, and carry
    /// a scope that satisfies `required_scope`. On success, stamps
    /// `last_used_at`.
    #[instrument(skip(self, secret), fields(op = "auth.validate"))]
    pub fn validate_project_access(
        &self,
        secret: &str,
        project_id: &str,
        required_scope: Scope,
    ) -> Result<bool, AuthError> {
        let hashed = hash_to_hex(&hash_api_key_secret(secret));
        let Some(key) = self.store.get_by_hash(&hashed)? else {
            return Ok(false);
        };

        if key.revoked {
            return Ok(false);
        }
        if let Some(expires_at) = key.expires_at
            && Utc::now() >= expires_at
        {
            return Ok(false);
        }
        if key.project_id != project_id {
            return Ok(false);
        }
        if !key.scope.satisfies(required_scope) {
            return Ok(false);
        }

        self.store.touch_last_used(&key.key_id, Utc::now())?;
        Ok(true)
    }

    /// Lists every key issued for `project_id`. Never includes the raw
    /// secret, nor its hash.
    pub fn list_project_keys(&self, project_id: &str) -> Result<Vec<ApiKeyMetadata>, AuthError> {
        Ok(self
            .store
            .list_for_project(project_id)?
            .into_iter()
            .map(|k| k.to_metadata())
            .collect())
    }

    /// Revokes a key by id. Fails with [`AuthError::NotFound`] if it does
    /// not exist.
    #[instrument(skip(self), fields(op = "auth.revoke"))]
    pub fn revoke_api_key(&self, key_id: &str) -> Result<(), AuthError> {
        if self.store.revoke(key_id)? {
            Ok(())
        } else {
            Err(AuthError::NotFound {
                key_id: key_id.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ProjectAuthManager {
        ProjectAuthManager::new(ApiKeyStore::open_in_memory().unwrap())
    }

    #[test]
    fn created_secret_validates_against_its_own_project() {
        let manager = manager();
        let created = manager
            .create_api_key("proj-a", "ci", Scope::Read, None)
            .unwrap();

        assert!(manager
            .validate_project_access(&created.secret, "proj-a", Scope::Read)
            .unwrap());
    }

    #[test]
    fn write_scope_satisfies_read_requirement() {
        let manager = manager();
        let created = manager
            .create_api_key("proj-a", "ci", Scope::Write, None)
            .unwrap();

        assert!(manager
            .validate_project_access(&created.secret, "proj-a", Scope::Read)
            .unwrap());
        assert!(!manager
            .validate_project_access(&created.secret, "proj-a", Scope::Admin)
            .unwrap());
    }

    #[test]
    fn read_scope_does_not_satisfy_write_requirement() {
        let manager = manager();
        let created = manager
            .create_api_key("proj-a", "ci", Scope::Read, None)
            .unwrap();

        assert!(!manager
            .validate_project_access(&created.secret, "proj-a", Scope::Write)
            .unwrap());
    }

    #[test]
    fn project_mismatch_is_denied() {
        let manager = manager();
        let created = manager
            .create_api_key("proj-a", "ci", Scope::Admin, None)
            .unwrap();

        assert!(!manager
            .validate_project_access(&created.secret, "proj-b", Scope::Read)
            .unwrap());
    }

    #[test]
    fn revoked_key_is_denied() {
        let manager = manager();
        let created = manager
            .create_api_key("proj-a", "ci", Scope::Read, None)
            .unwrap();
        manager.revoke_api_key(&created.metadata.key_id).unwrap();

        assert!(!manager
            .validate_project_access(&created.secret, "proj-a", Scope::Read)
            .unwrap());
    }

    #[test]
    fn non_positive_expiry_is_rejected_at_creation() {
        let manager = manager();
        let err = manager
            .create_api_key("proj-a", "ci", Scope::Read, Some(0))
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation { .. }));
    }

    #[test]
    fn future_expiry_validates_before_it_elapses() {
        let manager = manager();
        let created = manager
            .create_api_key("proj-a", "ci", Scope::Read, Some(1))
            .unwrap();
        assert!(manager
            .validate_project_access(&created.secret, "proj-a", Scope::Read)
            .unwrap());
    }

    #[test]
    fn unknown_secret_is_denied() {
        let manager = manager();
        assert!(!manager
            .validate_project_access("kb_does_not_exist", "proj-a", Scope::Read)
            .unwrap());
    }

    #[test]
    fn revoking_unknown_key_fails() {
        let manager = manager();
        let err = manager.revoke_api_key("missing").unwrap_err();
        assert!(matches!(err, AuthError::NotFound { .. }));
    }

    #[test]
    fn empty_name_is_rejected() {
        let manager = manager();
        let err = manager
            .create_api_key("proj-a", "  ", Scope::Read, None)
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation { .. }));
    }

    #[test]
    fn list_keys_never_exposes_secret_or_hash() {
        let manager = manager();
        manager
            .create_api_key("proj-a", "ci", Scope::Read, None)
            .unwrap();
        let keys = manager.list_project_keys("proj-a").unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].name, "ci");
    }
}
