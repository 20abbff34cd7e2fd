//! Directory-backed cache store
//!
//! Each entry is two files under the store root:
//!
//! | File | Contents |
//! |------|----------|
//! | `{key}.blob` | opaque blob |
//! | `{key}.json` | `StoreEntry` metadata |
//!
//! Writes land in a temporary file and are renamed into place, so concurrent
//! readers never see a partial blob. Entries idle longer than the retention
//! window are ignored by lookups and deleted by `prune`.

use super::{CacheStore, StoreEntry, DEFAULT_RETENTION_DAYS};
use crate::cache::key::validate_key_segment;
use crate::error::{SlotCacheError, SlotCacheResult};
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

const BLOB_EXT: &str = "blob";
const META_EXT: &str = "json";

/// Cache store rooted at a local directory
pub struct LocalStore {
    root: PathBuf,
    retention_days: u32,
}

impl LocalStore {
    /// Create a store rooted at `root` with the default retention window
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }

    /// Override the retention window (0 disables expiry)
    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }

    /// Store root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Delete entries idle longer than `retention_days`
    ///
    /// Returns the entries that were (or, for a dry run, would be) removed.
    pub async fn prune(
        &self,
        retention_days: u32,
        dry_run: bool,
    ) -> SlotCacheResult<Vec<StoreEntry>> {
        let now = Utc::now();
        let expired: Vec<StoreEntry> = self
            .read_all_entries()
            .await?
            .into_iter()
            .filter(|e| e.is_expired(retention_days, now))
            .collect();

        if !dry_run {
            for entry in &expired {
                debug!("Pruning cache entry: {}", entry.key);
                self.remove(&entry.key).await?;
            }
        }

        Ok(expired)
    }

    /// Remove an entry's blob and metadata
    pub async fn remove(&self, key: &str) -> SlotCacheResult<()> {
        for path in [self.blob_path(key), self.meta_path(key)] {
            if let Err(e) = fs::remove_file(&path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    return Err(SlotCacheError::io(
                        format!("removing cache file {}", path.display()),
                        e,
                    ));
                }
            }
        }
        Ok(())
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.{}", key, BLOB_EXT))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.{}", key, META_EXT))
    }

    fn check_key(key: &str) -> SlotCacheResult<()> {
        validate_key_segment(key).map_err(|reason| SlotCacheError::InvalidKey {
            key: key.to_string(),
            reason,
        })
    }

    async fn ensure_root(&self) -> SlotCacheResult<()> {
        fs::create_dir_all(&self.root).await.map_err(|e| {
            SlotCacheError::StoreUnavailable(format!(
                "cannot create store directory {}: {}",
                self.root.display(),
                e
            ))
        })
    }

    /// Write `bytes` to `path` via a temporary file in the same directory
    async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> SlotCacheResult<()> {
        let tmp = self.root.join(format!(".{}.tmp", Uuid::new_v4()));
        fs::write(&tmp, bytes)
            .await
            .map_err(|e| SlotCacheError::io(format!("writing {}", tmp.display()), e))?;
        if let Err(e) = fs::rename(&tmp, path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(SlotCacheError::io(
                format!("renaming into {}", path.display()),
                e,
            ));
        }
        Ok(())
    }

    async fn read_entry(&self, key: &str) -> SlotCacheResult<Option<StoreEntry>> {
        let path = self.meta_path(key);
        let content = match fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SlotCacheError::io(
                    format!("reading cache metadata {}", path.display()),
                    e,
                ))
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| SlotCacheError::CorruptEntry {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    async fn write_entry(&self, entry: &StoreEntry) -> SlotCacheResult<()> {
        let content = serde_json::to_string_pretty(entry)?;
        self.write_atomic(&self.meta_path(&entry.key), content.as_bytes())
            .await
    }

    /// Bump `last_accessed_at` on the sidecar as it is now on disk
    ///
    /// Everything else in the sidecar is kept, so a `put` that landed after
    /// the blob was read is not rolled back.
    async fn touch(&self, key: &str) -> SlotCacheResult<()> {
        if let Some(mut current) = self.read_entry(key).await? {
            current.last_accessed_at = Utc::now();
            self.write_entry(&current).await?;
        }
        Ok(())
    }

    /// Read every metadata sidecar, skipping ones that fail to parse
    async fn read_all_entries(&self) -> SlotCacheResult<Vec<StoreEntry>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut dir = fs::read_dir(&self.root).await.map_err(|e| {
            SlotCacheError::StoreUnavailable(format!(
                "cannot read store directory {}: {}",
                self.root.display(),
                e
            ))
        })?;

        let mut entries = Vec::new();
        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|e| SlotCacheError::io("reading store directory entry", e))?
        {
            let path = item.path();
            if path.extension().is_none_or(|ext| ext != META_EXT) {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match self.read_entry(key).await {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => {}
                Err(e) => warn!("Skipping unreadable cache entry {}: {}", key, e),
            }
        }

        Ok(entries)
    }

    fn is_live(&self, entry: &StoreEntry) -> bool {
        !entry.is_expired(self.retention_days, Utc::now())
    }
}

#[async_trait]
impl CacheStore for LocalStore {
    async fn contains(&self, key: &str) -> SlotCacheResult<bool> {
        Self::check_key(key)?;
        Ok(self
            .read_entry(key)
            .await?
            .is_some_and(|e| self.is_live(&e) && self.blob_path(key).exists()))
    }

    async fn find_by_prefix(&self, prefix: &str) -> SlotCacheResult<Option<String>> {
        Ok(self
            .read_all_entries()
            .await?
            .into_iter()
            .filter(|e| {
                e.key.starts_with(prefix) && self.is_live(e) && self.blob_path(&e.key).exists()
            })
            .max_by(|a, b| {
                a.created_at
                    .cmp(&b.created_at)
                    .then_with(|| a.key.cmp(&b.key))
            })
            .map(|e| e.key))
    }

    async fn get(&self, key: &str) -> SlotCacheResult<Option<Vec<u8>>> {
        Self::check_key(key)?;
        let Some(entry) = self.read_entry(key).await? else {
            return Ok(None);
        };
        if !self.is_live(&entry) {
            debug!("Cache entry {} expired", key);
            return Ok(None);
        }

        let path = self.blob_path(key);
        let blob = match fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SlotCacheError::io(
                    format!("reading cache blob {}", path.display()),
                    e,
                ))
            }
        };

        if let Err(e) = self.touch(key).await {
            warn!("Failed to refresh access time for {}: {}", key, e);
        }

        Ok(Some(blob))
    }

    async fn put(&self, key: &str, blob: Vec<u8>) -> SlotCacheResult<()> {
        Self::check_key(key)?;
        self.ensure_root().await?;

        let entry = StoreEntry::new(key, blob.len() as u64);
        self.write_atomic(&self.blob_path(key), &blob).await?;
        self.write_entry(&entry).await?;

        debug!("Stored {} bytes under {}", entry.size_bytes, key);
        Ok(())
    }

    async fn list(&self) -> SlotCacheResult<Vec<StoreEntry>> {
        let mut entries: Vec<StoreEntry> = self
            .read_all_entries()
            .await?
            .into_iter()
            .filter(|e| self.is_live(e))
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    fn store_name(&self) -> &'static str {
        "local"
    }
}
