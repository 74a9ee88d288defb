//! BLAKE3-based hashing for API-key secrets.

use rand::rngs::OsRng;
use rand::RngCore;

/// Hashes an API-key secret for storage. The raw secret itself is never
/// persisted, only this hash.
#[inline]
pub fn hash_api_key_secret(secret: &str) -> [u8; 32] {
    *blake3::hash(secret.as_bytes()).as_bytes()
}

/// Hex-encodes a byte slice for storage as a text column. Used both for the
/// 32-byte secret hash and for the raw secret bytes themselves — hex is
/// already URL-safe, so no separate base64/base32 encoding step is needed.
#[inline]
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Hex-encodes a hash for storage as a text column.
#[inline]
pub fn hash_to_hex(hash: &[u8; 32]) -> String {
    hex_encode(hash)
}

/// Generates a fresh API-key secret: 32 cryptographically random bytes,
/// hex-encoded (already URL-safe) and prefixed so the key's purpose is
/// visible at a glance.
pub fn generate_api_key_secret() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    format!("kb_{}", hex_encode(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashing_is_deterministic() {
        assert_eq!(
            hash_api_key_secret("kb_abc123"),
            hash_api_key_secret("kb_abc123")
        );
    }

    #[test]
    fn different_secrets_hash_differently() {
        assert_ne!(
            hash_api_key_secret("kb_abc123"),
            hash_api_key_secret("kb_abc124")
        );
    }

    #[test]
    fn hex_encoding_roundtrips_length() {
        let hash = hash_api_key_secret("kb_abc123");
        assert_eq!(hash_to_hex(&hash).len(), 64);
    }

    #[test]
    fn generated_secrets_are_prefixed_and_unique() {
        let a = generate_api_key_secret();
        let b = generate_api_key_secret();
        assert!(a.starts_with("kb_"));
        assert_eq!(a.len(), 3 + 64);
        assert_ne!(a, b);
    }
}
