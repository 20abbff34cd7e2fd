//! Configuration schema for slotcache
//!
//! Global configuration lives at `~/.config/slotcache/config.toml`; a
//! project-local `.slotcache.toml` is merged over it.

use crate::cache::key::{CacheSlot, KeyInput};
use crate::error::SlotCacheResult;
use crate::store::DEFAULT_RETENTION_DAYS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Placeholder in restore prefixes replaced with the OS identifier
pub const OS_PLACEHOLDER: &str = "{os}";

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Cache store settings
    pub store: StoreConfig,

    /// Declared cache slots
    #[serde(rename = "slot")]
    pub slots: Vec<SlotConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            store: StoreConfig::default(),
            slots: vec![
                SlotConfig {
                    name: "dependencies".to_string(),
                    path: "~/.cache/pip".to_string(),
                    key_inputs: vec![KeyInput::File(PathBuf::from("requirements.txt"))],
                    restore_prefixes: vec![format!("{}-deps-", OS_PLACEHOLDER)],
                    enabled: true,
                },
                SlotConfig {
                    name: "model-weights".to_string(),
                    path: "~/.cache/torch/sentence_transformers".to_string(),
                    key_inputs: vec![KeyInput::File(PathBuf::from("config.yaml"))],
                    restore_prefixes: vec![format!("{}-sentence-transformers-", OS_PLACEHOLDER)],
                    enabled: true,
                },
            ],
        }
    }
}

impl Config {
    /// Look up a slot declaration by name
    pub fn slot(&self, name: &str) -> Option<&SlotConfig> {
        self.slots.iter().find(|s| s.name == name)
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// OS identifier override (default: detected)
    pub os: Option<String>,

    /// Log format: "text" or "json"
    pub log_format: String,

    /// Where restore records the run for save (default: state dir)
    pub run_state: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            os: None,
            log_format: "text".to_string(),
            run_state: None,
        }
    }
}

/// Cache store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store root directory (default: user cache dir)
    pub path: Option<PathBuf>,

    /// Remove entries idle for more than N days (0 = never)
    pub retention_days: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

/// One declared cache slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotConfig {
    /// Slot name
    pub name: String,

    /// Storage path (`~/` expands to the home directory, relative paths
    /// are relative to the project directory)
    pub path: String,

    /// Files and literals feeding the key, in order
    #[serde(default)]
    pub key_inputs: Vec<KeyInput>,

    /// Fallback key prefixes, most specific first; `{os}` is substituted
    #[serde(default)]
    pub restore_prefixes: Vec<String>,

    /// Skip the slot entirely when false
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl SlotConfig {
    /// Build the runtime slot for a project directory and OS
    pub fn to_slot(&self, project_dir: &Path, os: &str) -> SlotCacheResult<CacheSlot> {
        let slot = CacheSlot {
            name: self.name.clone(),
            storage_path: expand_path(&self.path, project_dir),
            key_inputs: self
                .key_inputs
                .iter()
                .map(|input| match input {
                    KeyInput::File(path) => KeyInput::File(project_dir.join(path)),
                    KeyInput::Literal(value) => KeyInput::Literal(value.clone()),
                })
                .collect(),
            restore_prefixes: self
                .restore_prefixes
                .iter()
                .map(|p| p.replace(OS_PLACEHOLDER, os))
                .collect(),
        };
        slot.validate()?;
        Ok(slot)
    }
}

/// Expand a leading `~/` and anchor relative paths at `base`
fn expand_path(raw: &str, base: &Path) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    base.join(raw)
}
