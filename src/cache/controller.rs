//! Cache controller
//!
//! Drives each slot through key derivation, lookup, restore and populate
//! against an injected store. Every cache failure degrades to running the
//! slot uncached; only state-machine misuse is reported as an error.

use crate::archive;
use crate::cache::key::{resolve, CacheSlot};
use crate::cache::lookup::lookup;
use crate::cache::state::{SlotRun, SlotState};
use crate::error::{SlotCacheError, SlotCacheResult};
use crate::store::CacheStore;
use tracing::{error, info, warn};

/// Per-job cache controller
pub struct CacheController {
    store: Box<dyn CacheStore>,
    os: String,
}

impl CacheController {
    /// Create a controller for one OS identifier
    pub fn new(store: Box<dyn CacheStore>, os: impl Into<String>) -> SlotCacheResult<Self> {
        let os = os.into();
        if os.is_empty() {
            return Err(SlotCacheError::EmptyOsIdentifier);
        }
        Ok(Self { store, os })
    }

    /// OS identifier keys are computed for
    pub fn os(&self) -> &str {
        &self.os
    }

    /// The injected store
    pub fn store(&self) -> &dyn CacheStore {
        &*self.store
    }

    /// Compute a slot's key and look it up
    ///
    /// A missing key input disables the slot for this run instead of
    /// failing the job.
    pub async fn plan(&self, slot: CacheSlot) -> SlotCacheResult<SlotRun> {
        let mut run = SlotRun::new(slot);

        let key = match resolve(&run.slot, &self.os) {
            Ok(key) => key,
            Err(e) => {
                error!("Caching disabled for slot {}: {}", run.slot.name, e);
                run.disable(e.to_string())?;
                return Ok(run);
            }
        };

        run.key_computed(key.clone())?;
        let result = lookup(self.store(), &key, &run.slot.restore_prefixes).await;
        info!("Slot {}: {}", run.slot.name, result);
        run.looked_up(result)?;

        Ok(run)
    }

    /// Fetch and unpack the matched blob into the slot's storage path
    ///
    /// A blob that cannot be fetched or unpacked turns the run into a miss.
    pub async fn restore(&self, run: &mut SlotRun) -> SlotCacheResult<()> {
        if !matches!(run.state, SlotState::Hit | SlotState::PartialHit) {
            return Ok(());
        }
        let Some(key) = run.lookup.as_ref().and_then(|l| l.matched_key()).cloned() else {
            return Ok(());
        };

        let restored = match self.store.get(key.as_str()).await {
            Ok(Some(blob)) => archive::unpack(&blob, &run.slot.storage_path),
            Ok(None) => Err(SlotCacheError::CorruptEntry {
                key: key.to_string(),
                reason: "entry vanished before it could be fetched".to_string(),
            }),
            Err(e) => Err(e),
        };

        match restored {
            Ok(()) => {
                info!(
                    "Restored slot {} from {} into {}",
                    run.slot.name,
                    key,
                    run.slot.storage_path.display()
                );
                Ok(())
            }
            Err(e) => {
                warn!("Failed to restore slot {} from {}: {}", run.slot.name, key, e);
                run.restore_failed()
            }
        }
    }

    /// Plan and restore a slot in one step
    pub async fn plan_and_restore(&self, slot: CacheSlot) -> SlotCacheResult<SlotRun> {
        let mut run = self.plan(slot).await?;
        self.restore(&mut run).await?;
        Ok(run)
    }

    /// Write the slot's storage path under its exact key if needed
    ///
    /// Returns whether the store now holds the exact key. Missing storage
    /// paths and store failures are logged and skipped.
    pub async fn save(&self, run: &mut SlotRun) -> SlotCacheResult<bool> {
        if !run.needs_populate() {
            return Ok(run.state == SlotState::Hit || run.state == SlotState::Populated);
        }
        let Some(key) = run.key.clone() else {
            return Ok(false);
        };

        if !run.slot.storage_path.exists() {
            warn!(
                "Not saving slot {}: {}",
                run.slot.name,
                SlotCacheError::StoragePathMissing {
                    slot: run.slot.name.clone(),
                    path: run.slot.storage_path.clone(),
                }
            );
            return Ok(false);
        }

        let blob = match archive::pack(&run.slot.storage_path) {
            Ok(blob) => blob,
            Err(e) => {
                warn!("Not saving slot {}: {}", run.slot.name, e);
                return Ok(false);
            }
        };

        let size = blob.len();
        match self.store.put(key.as_str(), blob).await {
            Ok(()) => {
                info!("Saved slot {} as {} ({} bytes)", run.slot.name, key, size);
                run.populated()?;
                Ok(true)
            }
            Err(e) => {
                warn!(
                    "Failed to save slot {} to {} store: {}",
                    run.slot.name,
                    self.store.store_name(),
                    e
                );
                Ok(false)
            }
        }
    }
}
