//! Configuration management for slotcache

pub mod schema;

pub use schema::{Config, SlotConfig};

use crate::error::{SlotCacheError, SlotCacheResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Project-local configuration file name
pub const LOCAL_CONFIG_FILE: &str = ".slotcache.toml";

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("slotcache")
            .join("config.toml")
    }

    /// Get the state directory path
    pub fn state_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("slotcache")
    }

    /// Default run state file shared by `restore` and `save`
    pub fn default_run_state_path() -> PathBuf {
        Self::state_dir().join("last-run.json")
    }

    /// Default local store directory
    pub fn default_store_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("slotcache")
            .join("store")
    }

    /// Find `.slotcache.toml` in `start` or any of its ancestors
    pub fn find_local_config(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(LOCAL_CONFIG_FILE))
            .find(|candidate| candidate.is_file())
    }

    /// Load configuration, using defaults if the file does not exist
    pub async fn load(&self) -> SlotCacheResult<Config> {
        self.load_merged(None).await
    }

    /// Load the global configuration with an optional local file merged over it
    ///
    /// Tables merge key by key with local values winning. Slots merge by
    /// name: a local slot replaces the global slot of the same name, new
    /// local slots are appended. Without a global file the built-in
    /// defaults are the base.
    pub async fn load_merged(&self, local: Option<&Path>) -> SlotCacheResult<Config> {
        let mut merged = if self.config_path.exists() {
            Self::read_table(&self.config_path).await?
        } else {
            debug!("Config file not found, using defaults");
            default_table()?
        };

        if let Some(local_path) = local {
            debug!("Merging local config {}", local_path.display());
            let overlay = Self::read_table(local_path).await?;
            merge_tables(&mut merged, overlay);
        }

        let source = local.unwrap_or(&self.config_path);
        toml::Value::Table(merged)
            .try_into()
            .map_err(|e: toml::de::Error| SlotCacheError::ConfigInvalid {
                path: source.to_path_buf(),
                reason: e.to_string(),
            })
    }

    async fn read_table(path: &Path) -> SlotCacheResult<toml::Table> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| SlotCacheError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| SlotCacheError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> SlotCacheResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            SlotCacheError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> SlotCacheResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| SlotCacheError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// The built-in configuration as a TOML table
fn default_table() -> SlotCacheResult<toml::Table> {
    match toml::Value::try_from(Config::default())? {
        toml::Value::Table(table) => Ok(table),
        other => Err(SlotCacheError::Internal(format!(
            "default config serialized to {}",
            other.type_str()
        ))),
    }
}

/// Merge `overlay` into `base`, recursing into nested tables
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        let replacement = match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
                None
            }
            (Some(toml::Value::Array(existing)), toml::Value::Array(incoming)) if key == "slot" => {
                merge_slots(existing, incoming);
                None
            }
            (_, value) => Some(value),
        };
        if let Some(value) = replacement {
            base.insert(key, value);
        }
    }
}

/// Merge slot arrays by slot name
fn merge_slots(base: &mut Vec<toml::Value>, overlay: Vec<toml::Value>) {
    let slot_name = |v: &toml::Value| v.get("name").and_then(|n| n.as_str()).map(str::to_owned);

    for incoming in overlay {
        let name = slot_name(&incoming);
        match base
            .iter_mut()
            .find(|existing| name.is_some() && slot_name(existing) == name)
        {
            Some(existing) => *existing = incoming,
            None => base.push(incoming),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_default_when_missing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nonexistent.toml");
        let manager = ConfigManager::with_path(path);

        let config = manager.load().await.unwrap();
        assert_eq!(config.store.retention_days, 7);
        assert_eq!(config.slots.len(), 2);
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        let manager = ConfigManager::with_path(path);

        let mut config = Config::default();
        config.general.os = Some("linux".to_string());
        config.store.retention_days = 3;

        manager.save(&config).await.unwrap();
        let loaded = manager.load().await.unwrap();

        assert_eq!(loaded.general.os.as_deref(), Some("linux"));
        assert_eq!(loaded.store.retention_days, 3);
        assert_eq!(loaded.slots, config.slots);
    }

    #[tokio::test]
    async fn invalid_config_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[store\nretention_days = ").unwrap();

        let err = ConfigManager::with_path(path.clone()).load().await.unwrap_err();
        match err {
            SlotCacheError::ConfigInvalid { path: p, .. } => assert_eq!(p, path),
            other => panic!("expected ConfigInvalid, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn local_overrides_global() {
        let temp = TempDir::new().unwrap();
        let global = temp.path().join("config.toml");
        std::fs::write(
            &global,
            r#"
            [store]
            path = "/global/store"
            retention_days = 14

            [[slot]]
            name = "dependencies"
            path = "/global/pip"
            key_inputs = [{ file = "requirements.txt" }]

            [[slot]]
            name = "tools"
            path = "/global/tools"
        "#,
        )
        .unwrap();

        let local = temp.path().join(LOCAL_CONFIG_FILE);
        std::fs::write(
            &local,
            r#"
            [store]
            retention_days = 2

            [[slot]]
            name = "dependencies"
            path = ".venv"
            key_inputs = [{ file = "uv.lock" }]

            [[slot]]
            name = "models"
            path = "models"
        "#,
        )
        .unwrap();

        let config = ConfigManager::with_path(global)
            .load_merged(Some(&local))
            .await
            .unwrap();

        assert_eq!(config.store.path, Some(PathBuf::from("/global/store")));
        assert_eq!(config.store.retention_days, 2);

        let names: Vec<&str> = config.slots.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["dependencies", "tools", "models"]);
        assert_eq!(config.slot("dependencies").unwrap().path, ".venv");
    }

    #[tokio::test]
    async fn local_merges_over_defaults_without_global() {
        let temp = TempDir::new().unwrap();
        let local = temp.path().join(LOCAL_CONFIG_FILE);
        std::fs::write(
            &local,
            r#"
            [[slot]]
            name = "tools"
            path = "tools"
        "#,
        )
        .unwrap();

        let config = ConfigManager::with_path(temp.path().join("absent.toml"))
            .load_merged(Some(&local))
            .await
            .unwrap();

        let names: Vec<&str> = config.slots.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["dependencies", "model-weights", "tools"]);
        assert_eq!(config.store.retention_days, 7);
        assert_eq!(config.slots, {
            let mut expected = Config::default().slots;
            expected.push(config.slot("tools").unwrap().clone());
            expected
        });
    }

    #[test]
    fn find_local_config_walks_up() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(temp.path().join("a").join(LOCAL_CONFIG_FILE), "").unwrap();

        let found = ConfigManager::find_local_config(&nested).unwrap();
        assert_eq!(found, temp.path().join("a").join(LOCAL_CONFIG_FILE));
    }
}
