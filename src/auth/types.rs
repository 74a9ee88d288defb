//! API key and scope types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named capability granted to an API key, compared hierarchically:
/// `Admin` satisfies everything, `Write` satisfies `Write` and `Read`,
/// `Read` satisfies only `Read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Query access.
    Read,
    /// Ingest/mutate access. Implies `Read`.
    Write,
    /// Project administration (key issuance/revocation). Implies `Write` and `Read`.
    Admin,
}

impl Scope {
    /// Parses a scope from its lowercase name. `None` on an unknown scope —
    /// callers surface that as a validation error.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "read" => Some(Self::Read),
            "write" => Some(Self::Write),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// The scope's name, as stored and as accepted by [`Self::parse`].
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Admin => "admin",
        }
    }

    /// Whether a key carrying `self` satisfies a check for `required`, per
    /// the hierarchy `admin ⊇ write ⊇ read`.
    pub fn satisfies(self, required: Scope) -> bool {
        self.rank() >= required.rank()
    }

    fn rank(self) -> u8 {
        match self {
            Self::Read => 0,
            Self::Write => 1,
            Self::Admin => 2,
        }
    }
}

/// A full API key record, including the stored secret hash. Never leaves
/// [`super::manager::ProjectAuthManager`] — callers see [`ApiKeyMetadata`].
#[derive(Debug, Clone)]
pub struct ApiKey {
    /// Stable identifier for this key, distinct from the secret itself.
    pub key_id: String,
    /// The project this key grants access to.
    pub project_id: String,
    /// Hex-encoded BLAKE3 hash of the raw secret.
    pub hashed_secret: String,
    /// Caller-assigned display name.
    pub name: String,
    /// The highest scope this key was granted. A single scope is stored
    /// rather than a set, since the hierarchy in [`Scope::satisfies`] already
    /// makes a lone `Admin` or `Write` grant imply everything below it.
    pub scope: Scope,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Optional expiry; `None` means the key never expires on its own.
    pub expires_at: Option<DateTime<Utc>>,
    /// Set by [`super::manager::ProjectAuthManager::revoke_api_key`].
    pub revoked: bool,
    /// Updated on every successful [`super::manager::ProjectAuthManager::validate_project_access`].
    pub last_used_at: Option<DateTime<Utc>>,
}

impl ApiKey {
    /// A public view of the record with the secret hash stripped —
    /// `list_project_keys` returns metadata but never the raw secret, and
    /// the hash is equally sensitive so it is withheld too.
    pub fn to_metadata(&self) -> ApiKeyMetadata {
        ApiKeyMetadata {
            key_id: self.key_id.clone(),
            project_id: self.project_id.clone(),
            name: self.name.clone(),
            scope: self.scope,
            created_at: self.created_at,
            expires_at: self.expires_at,
            revoked: self.revoked,
            last_used_at: self.last_used_at,
        }
    }
}

/// The public, hash-free view of an [`ApiKey`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKeyMetadata {
    /// Stable identifier for this key.
    pub key_id: String,
    /// The project this key grants access to.
    pub project_id: String,
    /// Caller-assigned display name.
    pub name: String,
    /// The highest scope this key was granted.
    pub scope: Scope,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Optional expiry.
    pub expires_at: Option<DateTime<Utc>>,
    /// Whether the key has been revoked.
    pub revoked: bool,
    /// Last successful validation, if any.
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Returned once, at creation time, by
/// [`super::manager::ProjectAuthManager::create_api_key`] — the only moment
/// the raw secret is ever available.
#[derive(Debug, Clone)]
pub struct CreatedApiKey {
    /// The stored record (secret hash only).
    pub metadata: ApiKeyMetadata,
    /// The raw secret. Never persisted, never retrievable again.
    pub secret: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_hierarchy_is_cumulative() {
        assert!(Scope::Admin.satisfies(Scope::Read));
        assert!(Scope::Admin.satisfies(Scope::Write));
        assert!(Scope::Admin.satisfies(Scope::Admin));
        assert!(Scope::Write.satisfies(Scope::Read));
        assert!(Scope::Write.satisfies(Scope::Write));
        assert!(!Scope::Write.satisfies(Scope::Admin));
        assert!(!Scope::Read.satisfies(Scope::Write));
        assert!(!Scope::Read.satisfies(Scope::Admin));
    }

    #[test]
    fn parse_round_trips_as_str() {
        for scope in [Scope::Read, Scope::Write, Scope::Admin] {
            assert_eq!(Scope::parse(scope.as_str()), Some(scope));
        }
        assert_eq!(Scope::parse("bogus"), None);
    }
}
