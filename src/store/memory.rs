//! In-process cache store
//!
//! Keeps blobs in memory. Useful for offline tests of cache decisions and for
//! embedding the controller without a backing service.

use super::{CacheStore, StoreEntry, DEFAULT_RETENTION_DAYS};
use crate::error::{SlotCacheError, SlotCacheResult};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;

struct Slot {
    entry: StoreEntry,
    blob: Vec<u8>,
    /// Insertion order, breaks ties between equal timestamps
    seq: u64,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Slot>,
    next_seq: u64,
}

/// Mutex-guarded map store
pub struct InMemoryStore {
    inner: Mutex<Inner>,
    retention_days: u32,
    available: bool,
}

impl InMemoryStore {
    /// Create an empty store with the default retention window
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            retention_days: DEFAULT_RETENTION_DAYS,
            available: true,
        }
    }

    /// Create a store whose every call fails with `StoreUnavailable`
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Override the retention window (0 disables expiry)
    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }

    /// Insert an entry with explicit metadata (for simulating aged entries)
    pub async fn insert_entry(&self, entry: StoreEntry, blob: Vec<u8>) {
        let mut inner = self.inner.lock().await;
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner
            .entries
            .insert(entry.key.clone(), Slot { entry, blob, seq });
    }

    fn check_available(&self) -> SlotCacheResult<()> {
        if self.available {
            Ok(())
        } else {
            Err(SlotCacheError::StoreUnavailable(
                "in-memory store marked unavailable".to_string(),
            ))
        }
    }

    fn is_live(&self, slot: &Slot) -> bool {
        !slot.entry.is_expired(self.retention_days, Utc::now())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for InMemoryStore {
    async fn contains(&self, key: &str) -> SlotCacheResult<bool> {
        self.check_available()?;
        let inner = self.inner.lock().await;
        Ok(inner.entries.get(key).is_some_and(|s| self.is_live(s)))
    }

    async fn find_by_prefix(&self, prefix: &str) -> SlotCacheResult<Option<String>> {
        self.check_available()?;
        let inner = self.inner.lock().await;
        Ok(inner
            .entries
            .values()
            .filter(|s| s.entry.key.starts_with(prefix) && self.is_live(s))
            .max_by_key(|s| (s.entry.created_at, s.seq))
            .map(|s| s.entry.key.clone()))
    }

    async fn get(&self, key: &str) -> SlotCacheResult<Option<Vec<u8>>> {
        self.check_available()?;
        let mut inner = self.inner.lock().await;
        let live = inner.entries.get(key).is_some_and(|s| self.is_live(s));
        if !live {
            return Ok(None);
        }
        Ok(inner.entries.get_mut(key).map(|slot| {
            slot.entry.last_accessed_at = Utc::now();
            slot.blob.clone()
        }))
    }

    async fn put(&self, key: &str, blob: Vec<u8>) -> SlotCacheResult<()> {
        self.check_available()?;
        let entry = StoreEntry::new(key, blob.len() as u64);
        self.insert_entry(entry, blob).await;
        Ok(())
    }

    async fn list(&self) -> SlotCacheResult<Vec<StoreEntry>> {
        self.check_available()?;
        let inner = self.inner.lock().await;
        let mut entries: Vec<StoreEntry> = inner
            .entries
            .values()
            .filter(|s| self.is_live(s))
            .map(|s| s.entry.clone())
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    fn store_name(&self) -> &'static str {
        "memory"
    }
}
