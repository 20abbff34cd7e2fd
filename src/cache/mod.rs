//! Build artifact cache controller
//!
//! Decides, per cache slot, whether a stored artifact can be reused.
//! Keys are derived from the contents of declared key inputs, so changing a
//! lockfile or configuration file invalidates exactly the slots that watch it.
//!
//! # Lookup Outcomes
//!
//! | Outcome | Restore | Populate after job |
//! |---------|---------|--------------------|
//! | Hit | exact key | no |
//! | PartialHit | newest restore-prefix match | yes |
//! | Miss | nothing | yes |
//!
//! Store failures are treated as misses; a missing key input disables
//! caching for that slot only.

pub mod controller;
pub mod key;
pub mod lookup;
pub mod state;

pub use controller::CacheController;
pub use key::{resolve, CacheKey, CacheSlot, KeyInput};
pub use lookup::{lookup, should_populate, CacheLookupResult};
pub use state::{RunState, SlotRun, SlotState};
