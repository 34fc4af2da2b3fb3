//! Cache Module
//!
//! In-memory mirrors of the persistent entity collections, with whole-set TTL
//! expiry and single-flight reloads.

mod entity;
mod set;
mod stats;


// Re-export public types
pub use entity::EntityCache;
pub use set::CacheSet;
pub use stats::CacheStats;

// == Public Constants ==
/// Default age after which a cached entity set is discarded (15 minutes)
pub const DEFAULT_ENTITY_TTL_SECS: u64 = 15 * 60;
