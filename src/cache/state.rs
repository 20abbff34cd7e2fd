//! Per-slot cache state for one job run
//!
//! Tracks each slot through
//! `Unresolved -> KeyComputed -> {Hit, PartialHit, Miss} -> Populated`.
//! A slot whose key cannot be computed ends in `Disabled` and runs uncached.

use crate::cache::key::{CacheKey, CacheSlot};
use crate::cache::lookup::{should_populate, CacheLookupResult};
use crate::error::{SlotCacheError, SlotCacheResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tokio::fs;
use uuid::Uuid;

/// State of one slot within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    /// Key not computed yet
    Unresolved,
    /// Key computed, store not queried yet
    KeyComputed,
    /// Exact key found in the store
    Hit,
    /// Restored from a restore-prefix match
    PartialHit,
    /// Nothing usable in the store
    Miss,
    /// Exact key written after the job
    Populated,
    /// Key inputs unavailable, slot runs uncached
    Disabled,
}

impl SlotState {
    /// Whether the run for this slot is finished
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Hit | Self::Populated | Self::Disabled)
    }

    /// Whether `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: SlotState) -> bool {
        use SlotState::*;
        matches!(
            (self, next),
            (Unresolved, KeyComputed)
                | (Unresolved, Disabled)
                | (KeyComputed, Hit)
                | (KeyComputed, PartialHit)
                | (KeyComputed, Miss)
                | (Hit, Miss)
                | (PartialHit, Miss)
                | (PartialHit, Populated)
                | (Miss, Populated)
        )
    }

    fn from_lookup(result: &CacheLookupResult) -> Self {
        match result {
            CacheLookupResult::Hit(_) => Self::Hit,
            CacheLookupResult::PartialHit(_) => Self::PartialHit,
            CacheLookupResult::Miss => Self::Miss,
        }
    }
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unresolved => "unresolved",
            Self::KeyComputed => "key-computed",
            Self::Hit => "hit",
            Self::PartialHit => "partial-hit",
            Self::Miss => "miss",
            Self::Populated => "populated",
            Self::Disabled => "disabled",
        };
        write!(f, "{}", name)
    }
}

/// One slot's progress through a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotRun {
    /// The slot being cached
    pub slot: CacheSlot,
    /// Current state
    pub state: SlotState,
    /// Exact key, once computed
    pub key: Option<CacheKey>,
    /// Lookup outcome, once queried
    pub lookup: Option<CacheLookupResult>,
    /// Why the slot was disabled
    pub disabled_reason: Option<String>,
}

impl SlotRun {
    /// Start a run for a slot
    pub fn new(slot: CacheSlot) -> Self {
        Self {
            slot,
            state: SlotState::Unresolved,
            key: None,
            lookup: None,
            disabled_reason: None,
        }
    }

    fn advance(&mut self, next: SlotState) -> SlotCacheResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(SlotCacheError::InvalidTransition {
                slot: self.slot.name.clone(),
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        self.state = next;
        Ok(())
    }

    /// Record the computed key
    pub fn key_computed(&mut self, key: CacheKey) -> SlotCacheResult<()> {
        self.advance(SlotState::KeyComputed)?;
        self.key = Some(key);
        Ok(())
    }

    /// Record that the key could not be computed
    pub fn disable(&mut self, reason: impl Into<String>) -> SlotCacheResult<()> {
        self.advance(SlotState::Disabled)?;
        self.disabled_reason = Some(reason.into());
        Ok(())
    }

    /// Record the store lookup outcome
    pub fn looked_up(&mut self, result: CacheLookupResult) -> SlotCacheResult<()> {
        self.advance(SlotState::from_lookup(&result))?;
        self.lookup = Some(result);
        Ok(())
    }

    /// Downgrade a hit whose blob could not be restored
    ///
    /// The exact key is then rewritten after the job like any other miss.
    pub fn restore_failed(&mut self) -> SlotCacheResult<()> {
        self.advance(SlotState::Miss)?;
        self.lookup = Some(CacheLookupResult::Miss);
        Ok(())
    }

    /// Record that the exact key was written
    pub fn populated(&mut self) -> SlotCacheResult<()> {
        self.advance(SlotState::Populated)
    }

    /// Whether the exact key should be written after the job
    pub fn needs_populate(&self) -> bool {
        matches!(self.state, SlotState::Miss | SlotState::PartialHit)
            && self.lookup.as_ref().is_some_and(should_populate)
    }

    /// Whether the job can skip rebuilding this slot's artifact
    pub fn is_exact_hit(&self) -> bool {
        self.state == SlotState::Hit
    }
}

/// Slot runs persisted between the restore and save steps of a job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    /// Unique run ID
    pub id: Uuid,
    /// OS identifier keys were computed for
    pub os: String,
    /// When the restore step ran
    pub created_at: DateTime<Utc>,
    /// Slot runs in declaration order
    pub slots: Vec<SlotRun>,
}

impl RunState {
    /// Create a run record
    pub fn new(os: impl Into<String>, slots: Vec<SlotRun>) -> Self {
        Self {
            id: Uuid::new_v4(),
            os: os.into(),
            created_at: Utc::now(),
            slots,
        }
    }

    /// Load a run record, failing with `RunStateMissing` if absent
    pub async fn load(path: &Path) -> SlotCacheResult<Self> {
        if !path.exists() {
            return Err(SlotCacheError::RunStateMissing(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| SlotCacheError::io(format!("reading run state {}", path.display()), e))?;

        Ok(serde_json::from_str(&content)?)
    }

    /// Save the run record
    pub async fn save(&self, path: &Path) -> SlotCacheResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| SlotCacheError::io("creating run state directory", e))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .await
            .map_err(|e| SlotCacheError::io(format!("writing run state {}", path.display()), e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn run() -> SlotRun {
        SlotRun::new(CacheSlot::new("dependencies", "/cache/pip"))
    }

    #[test]
    fn terminal_states() {
        assert!(SlotState::Hit.is_terminal());
        assert!(SlotState::Populated.is_terminal());
        assert!(SlotState::Disabled.is_terminal());
        assert!(!SlotState::Miss.is_terminal());
        assert!(!SlotState::PartialHit.is_terminal());
    }

    #[test]
    fn hit_path() {
        let mut r = run();
        r.key_computed(CacheKey::from_raw("k")).unwrap();
        r.looked_up(CacheLookupResult::Hit(CacheKey::from_raw("k")))
            .unwrap();

        assert!(r.is_exact_hit());
        assert!(!r.needs_populate());
        assert!(r.populated().is_err());
    }

    #[test]
    fn miss_then_populate() {
        let mut r = run();
        r.key_computed(CacheKey::from_raw("k")).unwrap();
        r.looked_up(CacheLookupResult::Miss).unwrap();

        assert!(r.needs_populate());
        r.populated().unwrap();
        assert_eq!(r.state, SlotState::Populated);
        assert!(!r.needs_populate());
    }

    #[test]
    fn partial_hit_restore_failure_degrades_to_miss() {
        let mut r = run();
        r.key_computed(CacheKey::from_raw("k")).unwrap();
        r.looked_up(CacheLookupResult::PartialHit(CacheKey::from_raw("k-old")))
            .unwrap();
        r.restore_failed().unwrap();

        assert_eq!(r.state, SlotState::Miss);
        assert!(r.needs_populate());
    }

    #[test]
    fn lookup_requires_key() {
        let mut r = run();
        let err = r.looked_up(CacheLookupResult::Miss).unwrap_err();
        assert!(matches!(err, SlotCacheError::InvalidTransition { .. }));
    }

    #[test]
    fn disabled_is_final() {
        let mut r = run();
        r.disable("requirements.txt missing").unwrap();
        assert!(r.key_computed(CacheKey::from_raw("k")).is_err());
        assert!(!r.needs_populate());
    }

    #[test]
    fn state_display() {
        assert_eq!(SlotState::PartialHit.to_string(), "partial-hit");
        assert_eq!(SlotState::KeyComputed.to_string(), "key-computed");
    }

    #[tokio::test]
    async fn run_state_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("runs/last-run.json");

        let mut r = run();
        r.key_computed(CacheKey::from_raw("linux-dependencies-abc"))
            .unwrap();
        r.looked_up(CacheLookupResult::Miss).unwrap();
        let state = RunState::new("linux", vec![r]);

        state.save(&path).await.unwrap();
        let loaded = RunState::load(&path).await.unwrap();

        assert_eq!(loaded.id, state.id);
        assert_eq!(loaded.os, "linux");
        assert_eq!(loaded.slots[0].state, SlotState::Miss);
        assert!(loaded.slots[0].needs_populate());
    }

    #[tokio::test]
    async fn missing_run_state() {
        let temp = TempDir::new().unwrap();
        let err = RunState::load(&temp.path().join("none.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, SlotCacheError::RunStateMissing(_)));
    }
}
