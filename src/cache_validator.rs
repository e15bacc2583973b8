use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Checksummed cache entries for directory responses.
///
/// Values are stored as JSON together with a SHA-256 digest of that JSON.
/// On read the digest is recomputed; a mismatch or unreadable entry is
/// treated as a cache miss so the caller refetches from the directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedCacheEntry {
    /// JSON encoding of the cached value
    pub data: String,
    /// SHA-256 of `data`, hex encoded
    pub checksum: String,
}

impl ValidatedCacheEntry {
    pub fn new(data: String) -> Self {
        let checksum = Self::compute_checksum(&data);
        Self { data, checksum }
    }

    fn compute_checksum(data: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn is_valid(&self) -> bool {
        Self::compute_checksum(&self.data) == self.checksum
    }

    /// Encodes `value` into a sealed cache string.
    pub fn seal<T: Serialize>(value: &T) -> Option<String> {
        let data = serde_json::to_string(value).ok()?;
        serde_json::to_string(&Self::new(data)).ok()
    }

    /// Decodes a sealed cache string, returning `None` when it is corrupted.
    pub fn open<T: DeserializeOwned>(sealed: &str) -> Option<T> {
        let entry: ValidatedCacheEntry = serde_json::from_str(sealed).ok()?;

        if !entry.is_valid() {
            tracing::warn!(
                "Cache validation failed: checksum mismatch. Expected: {}, Data length: {}",
                entry.checksum,
                entry.data.len()
            );
            return None;
        }
        serde_json::from_str(&entry.data).ok()
    }
}
