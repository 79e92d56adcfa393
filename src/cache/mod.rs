//! Cache Module
//!
//! Provides the on-disk response cache with TTL expiration and
//! content-addressed keys.

mod entry;
mod key;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use key::{CacheKey, CacheType, QueryParams};
pub use stats::CacheStats;
pub use store::CacheStore;
