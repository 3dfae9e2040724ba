//! Optional key-value cache consulted by the generator.
//!
//! The cache is treated as eventually consistent: a miss (or a failed read)
//! always falls through to generation, and callers log and ignore write
//! failures.

use crate::Result;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[async_trait]
pub trait Cache: Send + Sync {
    /// Returns the stored bytes, or `None` if the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;
}

/// Deterministic cache key: `prefix:sha256(part₀ ‖ 0x1f ‖ part₁ ‖ …)`.
///
/// ```rust
/// use storymap_core::cache_key;
///
/// let a = cache_key("storymap", &["Online bookstore"]);
/// assert_eq!(a, cache_key("storymap", &["Online bookstore"]));
/// assert!(a.starts_with("storymap:"));
/// ```
pub fn cache_key(prefix: &str, parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update([0x1f]);
        }
        hasher.update(part.as_bytes());
    }
    format!("{prefix}:{}", hex::encode(hasher.finalize()))
}

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// Process-local cache with per-entry expiry.
#[derive(Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Expired entries are swept on every write.
    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(key.to_string(), Entry { value, expires_at: now + ttl });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = InMemoryCache::new();
        cache.set_with_ttl("k", b"v".to_vec(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(b"v".to_vec()));
        assert_eq!(cache.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let cache = InMemoryCache::new();
        cache.set_with_ttl("k", b"v".to_vec(), Duration::ZERO).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_write_sweeps_expired_entries() {
        let cache = InMemoryCache::new();
        cache.set_with_ttl("stale-1", b"v".to_vec(), Duration::ZERO).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
        cache.set_with_ttl("stale-2", b"v".to_vec(), Duration::ZERO).await.unwrap();
        assert_eq!(cache.len(), 1);

        tokio::time::sleep(Duration::from_millis(2)).await;
        cache.set_with_ttl("fresh", b"v".to_vec(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("fresh").await.unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn test_cache_key_separates_parts() {
        assert_ne!(cache_key("p", &["ab", "c"]), cache_key("p", &["a", "bc"]));
        assert_ne!(cache_key("p", &["x"]), cache_key("q", &["x"]));
        // sha256 hex digest
        assert_eq!(cache_key("p", &["x"]).len(), "p:".len() + 64);
    }
}
