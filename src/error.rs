//! Error types for slotcache
//!
//! All modules use `SlotCacheResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for slotcache operations
pub type SlotCacheResult<T> = Result<T, SlotCacheError>;

/// All errors that can occur in slotcache
#[derive(Error, Debug)]
pub enum SlotCacheError {
    // Key derivation errors
    #[error("Key input for slot '{slot}' not found: {path}")]
    InputMissing { slot: String, path: PathBuf },

    #[error("OS identifier must not be empty")]
    EmptyOsIdentifier,

    #[error("Invalid OS identifier '{os}': {reason}")]
    InvalidOsIdentifier { os: String, reason: String },

    #[error("Invalid slot '{name}': {reason}")]
    InvalidSlot { name: String, reason: String },

    #[error("Slot not configured: {0}")]
    SlotNotFound(String),

    #[error("Invalid slot transition for '{slot}': {from} -> {to}")]
    InvalidTransition {
        slot: String,
        from: String,
        to: String,
    },

    // Store errors
    #[error("Cache store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Invalid cache key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("Corrupt cache entry {key}: {reason}")]
    CorruptEntry { key: String, reason: String },

    // Archive errors
    #[error("Storage path not found for slot '{slot}': {path}")]
    StoragePathMissing { slot: String, path: PathBuf },

    #[error("Archive error for {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No cache run recorded at {0}")]
    RunStateMissing(PathBuf),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SlotCacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a missing key input error
    pub fn input_missing(slot: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::InputMissing {
            slot: slot.into(),
            path: path.into(),
        }
    }

    /// Whether the job should carry on as if no cache existed
    ///
    /// Caching is an optimization: these errors disable caching for a slot
    /// or a single store call, never the job itself.
    pub fn is_gracefully_degradable(&self) -> bool {
        matches!(
            self,
            Self::InputMissing { .. }
                | Self::StoreUnavailable(_)
                | Self::CorruptEntry { .. }
                | Self::StoragePathMissing { .. }
                | Self::Archive { .. }
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::InputMissing { .. } => {
                Some("Check the slot's key_inputs paths, they are relative to the project directory")
            }
            Self::EmptyOsIdentifier => Some("Pass --os or set SLOTCACHE_OS"),
            Self::SlotNotFound(_) => Some("Run: slotcache config show"),
            Self::RunStateMissing(_) => Some("Run: slotcache restore before slotcache save"),
            Self::StoreUnavailable(_) => Some("Check store.path in the configuration"),
            _ => None,
        }
    }
}
