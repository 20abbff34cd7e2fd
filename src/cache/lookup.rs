//! Store lookup and populate decisions
//!
//! Lookup is a pure query: it picks which stored key (if any) a slot should
//! restore from, but never fetches the blob. Store failures degrade to a
//! miss so a broken cache can only make a job slower, never fail it.

use crate::cache::key::CacheKey;
use crate::error::SlotCacheResult;
use crate::store::CacheStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Outcome of looking a key up in the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "key", rename_all = "snake_case")]
pub enum CacheLookupResult {
    /// The exact key is stored
    Hit(CacheKey),
    /// Only a restore-prefix match is stored
    PartialHit(CacheKey),
    /// Nothing usable is stored
    Miss,
}

impl CacheLookupResult {
    /// Key to restore from, if any
    pub fn matched_key(&self) -> Option<&CacheKey> {
        match self {
            Self::Hit(key) | Self::PartialHit(key) => Some(key),
            Self::Miss => None,
        }
    }

    /// Whether the exact key was found
    pub fn is_exact_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }
}

impl fmt::Display for CacheLookupResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hit(key) => write!(f, "hit ({})", key),
            Self::PartialHit(key) => write!(f, "partial hit ({})", key),
            Self::Miss => write!(f, "miss"),
        }
    }
}

/// Look `key` up in `store`, falling back to each restore prefix in order
pub async fn lookup(
    store: &dyn CacheStore,
    key: &CacheKey,
    restore_prefixes: &[String],
) -> CacheLookupResult {
    match try_lookup(store, key, restore_prefixes).await {
        Ok(result) => {
            debug!("Lookup for {}: {}", key, result);
            result
        }
        Err(e) => {
            warn!(
                "Cache lookup for {} failed on {} store, treating as miss: {}",
                key,
                store.store_name(),
                e
            );
            CacheLookupResult::Miss
        }
    }
}

async fn try_lookup(
    store: &dyn CacheStore,
    key: &CacheKey,
    restore_prefixes: &[String],
) -> SlotCacheResult<CacheLookupResult> {
    if store.contains(key.as_str()).await? {
        return Ok(CacheLookupResult::Hit(key.clone()));
    }

    for prefix in restore_prefixes {
        if let Some(found) = store.find_by_prefix(prefix).await? {
            debug!("Restore prefix {} matched {}", prefix, found);
            return Ok(CacheLookupResult::PartialHit(CacheKey::from_raw(found)));
        }
    }

    Ok(CacheLookupResult::Miss)
}

/// Whether the exact key must be written after the job
///
/// A partial hit restores from a nearby entry, but the exact key is still
/// absent, so it is populated for the next run.
pub fn should_populate(result: &CacheLookupResult) -> bool {
    !result.is_exact_hit()
}
