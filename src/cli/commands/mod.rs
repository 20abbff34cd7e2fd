//! CLI command implementations

pub mod config;
pub mod gc;
pub mod key;
pub mod list;
pub mod restore;
pub mod save;

pub use config::execute as config;
pub use gc::execute as gc;
pub use key::execute as key;
pub use list::execute as list;
pub use restore::execute as restore;
pub use save::execute as save;

use crate::cache::CacheSlot;
use crate::config::{Config, ConfigManager};
use crate::error::{SlotCacheError, SlotCacheResult};
use crate::store::LocalStore;
use std::path::{Path, PathBuf};

/// Everything a command needs about the current job
#[derive(Debug, Clone)]
pub struct JobContext {
    /// Merged configuration
    pub config: Config,
    /// OS identifier for keys
    pub os: String,
    /// Directory relative key inputs and storage paths resolve against
    pub project_dir: PathBuf,
}

impl JobContext {
    /// Build runtime slots for the requested names (all enabled slots if empty)
    pub fn slots(&self, names: &[String]) -> SlotCacheResult<Vec<CacheSlot>> {
        if let Some(unknown) = names.iter().find(|n| self.config.slot(n).is_none()) {
            return Err(SlotCacheError::SlotNotFound(unknown.clone()));
        }

        self.config
            .slots
            .iter()
            .filter(|s| s.enabled)
            .filter(|s| names.is_empty() || names.contains(&s.name))
            .map(|s| s.to_slot(&self.project_dir, &self.os))
            .collect()
    }

    /// Open the configured local store
    pub fn store(&self) -> LocalStore {
        let root = match &self.config.store.path {
            Some(path) => anchor(path, &self.project_dir),
            None => ConfigManager::default_store_dir(),
        };
        LocalStore::new(root).with_retention_days(self.config.store.retention_days)
    }

    /// Run state file, honoring a command-line override
    pub fn run_state_path(&self, explicit: Option<PathBuf>) -> PathBuf {
        explicit
            .or_else(|| self.config.general.run_state.clone())
            .map(|p| anchor(&p, &self.project_dir))
            .unwrap_or_else(ConfigManager::default_run_state_path)
    }
}

fn anchor(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
