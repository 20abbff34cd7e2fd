//! slotcache - Build artifact cache controller
//!
//! Derives deterministic cache keys for named artifact slots from the
//! contents of lockfiles and configuration files, and decides per CI job
//! whether stored artifacts can be reused.

pub mod archive;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod platform;
pub mod store;

pub use error::{SlotCacheError, SlotCacheResult};
