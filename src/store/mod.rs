//! Cache store abstraction
//!
//! The store owns entry storage and eviction. The controller only ever reads
//! from it during lookup and writes a single blob after a successful job.

mod local;
mod memory;

pub use local::LocalStore;
pub use memory::InMemoryStore;

use crate::error::SlotCacheResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default inactivity window after which entries expire
pub const DEFAULT_RETENTION_DAYS: u32 = 7;

/// Metadata describing one stored entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreEntry {
    /// Exact key the blob was stored under
    pub key: String,
    /// Blob size in bytes
    pub size_bytes: u64,
    /// When the entry was written
    pub created_at: DateTime<Utc>,
    /// When the entry was last read or written
    pub last_accessed_at: DateTime<Utc>,
}

impl StoreEntry {
    /// Create metadata for a freshly written blob
    pub fn new(key: impl Into<String>, size_bytes: u64) -> Self {
        let now = Utc::now();
        Self {
            key: key.into(),
            size_bytes,
            created_at: now,
            last_accessed_at: now,
        }
    }

    /// Whether the entry has been idle longer than the retention window
    pub fn is_expired(&self, retention_days: u32, now: DateTime<Utc>) -> bool {
        retention_days > 0
            && self.last_accessed_at < now - chrono::Duration::days(i64::from(retention_days))
    }
}

/// Key-value blob store shared between CI runs
///
/// Implementations return `StoreUnavailable` when the backing service
/// cannot be reached; callers degrade that to a cache miss.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Whether an entry exists under exactly this key
    async fn contains(&self, key: &str) -> SlotCacheResult<bool>;

    /// Find the newest entry whose key starts with `prefix`
    async fn find_by_prefix(&self, prefix: &str) -> SlotCacheResult<Option<String>>;

    /// Fetch the blob stored under `key`, refreshing its access time
    async fn get(&self, key: &str) -> SlotCacheResult<Option<Vec<u8>>>;

    /// Fetch the newest blob whose key starts with `prefix`
    async fn get_by_prefix(&self, prefix: &str) -> SlotCacheResult<Option<(String, Vec<u8>)>> {
        let Some(key) = self.find_by_prefix(prefix).await? else {
            return Ok(None);
        };
        Ok(self.get(&key).await?.map(|blob| (key, blob)))
    }

    /// Store a blob under `key`; the last writer for a key wins
    async fn put(&self, key: &str, blob: Vec<u8>) -> SlotCacheResult<()>;

    /// List all live entries
    async fn list(&self) -> SlotCacheResult<Vec<StoreEntry>>;

    /// Human-readable store name for display
    fn store_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_expiry_window() {
        let now = Utc::now();
        let mut entry = StoreEntry::new("linux-deps-abc", 10);

        entry.last_accessed_at = now - chrono::Duration::days(6);
        assert!(!entry.is_expired(DEFAULT_RETENTION_DAYS, now));

        entry.last_accessed_at = now - chrono::Duration::days(8);
        assert!(entry.is_expired(DEFAULT_RETENTION_DAYS, now));
    }

    #[test]
    fn zero_retention_never_expires() {
        let now = Utc::now();
        let mut entry = StoreEntry::new("k", 0);
        entry.last_accessed_at = now - chrono::Duration::days(365);
        assert!(!entry.is_expired(0, now));
    }

    #[tokio::test]
    async fn get_by_prefix_composes_lookup_and_fetch() {
        let store = InMemoryStore::new();
        store.put("linux-deps-111", b"blob".to_vec()).await.unwrap();

        let (key, blob) = store.get_by_prefix("linux-deps-").await.unwrap().unwrap();
        assert_eq!(key, "linux-deps-111");
        assert_eq!(blob, b"blob");

        assert!(store.get_by_prefix("macos-").await.unwrap().is_none());
    }
}
