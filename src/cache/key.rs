//! Slot definitions and content-addressed key derivation
//!
//! A slot's key is `{os}-{slot}-{sha256}` where the hash covers the bytes of
//! every key input, in declaration order. Same inputs = same key.

use crate::error::{SlotCacheError, SlotCacheResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

/// Byte fed to the hasher between consecutive key inputs
const INPUT_SEPARATOR: &[u8] = b"\0";

/// One value whose content participates in a slot's key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyInput {
    /// Raw bytes of a file (lockfile, configuration file)
    File(PathBuf),
    /// A literal string, e.g. a toolchain version
    Literal(String),
}

impl KeyInput {
    /// Read the bytes this input contributes to the key
    fn read(&self, slot: &str) -> SlotCacheResult<Vec<u8>> {
        match self {
            Self::Literal(value) => Ok(value.as_bytes().to_vec()),
            Self::File(path) => fs::read(path).map_err(|e| match e.kind() {
                ErrorKind::NotFound => SlotCacheError::input_missing(slot, path),
                _ => SlotCacheError::io(format!("reading key input {}", path.display()), e),
            }),
        }
    }
}

impl fmt::Display for KeyInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Literal(value) => write!(f, "\"{}\"", value),
        }
    }
}

/// A named class of cacheable artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSlot {
    /// Slot identifier embedded in every key
    pub name: String,
    /// Where the slot's artifact lives on disk
    pub storage_path: PathBuf,
    /// Ordered inputs feeding the key
    pub key_inputs: Vec<KeyInput>,
    /// Fallback key prefixes, most specific first
    pub restore_prefixes: Vec<String>,
}

impl CacheSlot {
    /// Create a slot with no key inputs or restore prefixes
    pub fn new(name: impl Into<String>, storage_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            storage_path: storage_path.into(),
            key_inputs: Vec::new(),
            restore_prefixes: Vec::new(),
        }
    }

    /// Add a file key input
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_inputs.push(KeyInput::File(path.into()));
        self
    }

    /// Add a literal key input
    pub fn with_literal(mut self, value: impl Into<String>) -> Self {
        self.key_inputs.push(KeyInput::Literal(value.into()));
        self
    }

    /// Add a restore prefix (call in most-specific-first order)
    pub fn with_restore_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.restore_prefixes.push(prefix.into());
        self
    }

    /// Check the slot name can be embedded in a key and a file name
    pub fn validate(&self) -> SlotCacheResult<()> {
        validate_key_segment(&self.name).map_err(|reason| SlotCacheError::InvalidSlot {
            name: self.name.clone(),
            reason,
        })
    }
}

/// Reject key segments that would break key parsing or store file names
pub(crate) fn validate_key_segment(segment: &str) -> Result<(), String> {
    if segment.is_empty() {
        return Err("must not be empty".to_string());
    }
    if let Some(c) = segment
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(format!("contains unsupported character '{}'", c));
    }
    Ok(())
}

/// A derived cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Wrap an existing key string (e.g. one listed by a store)
    pub fn from_raw(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The content hash component (everything after the last '-')
    pub fn hash(&self) -> &str {
        self.0.rsplit('-').next().unwrap_or_default()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derive the cache key for a slot on the given OS
///
/// Reads every file input in order; a missing file fails with
/// `InputMissing`. The input bytes are joined with a NUL separator and
/// hashed with SHA-256.
pub fn resolve(slot: &CacheSlot, os: &str) -> SlotCacheResult<CacheKey> {
    if os.is_empty() {
        return Err(SlotCacheError::EmptyOsIdentifier);
    }

    let mut hasher = Sha256::new();
    for (i, input) in slot.key_inputs.iter().enumerate() {
        if i > 0 {
            hasher.update(INPUT_SEPARATOR);
        }
        hasher.update(input.read(&slot.name)?);
    }
    let hash = hex::encode(hasher.finalize());

    let key = CacheKey(format!("{}-{}-{}", os, slot.name, hash));
    debug!("Resolved key for slot {}: {}", slot.name, key);
    Ok(key)
}
