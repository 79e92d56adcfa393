//! Cache Entry Module
//!
//! Defines the on-disk record for a cached payload with TTL metadata.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Upper bound applied to stored TTLs (100 years)
const MAX_TTL_SECONDS: i64 = 100 * 365 * 24 * 60 * 60;

// == Cache Entry ==
/// A cached payload plus the metadata needed to judge its validity.
///
/// The file holding an entry is self-describing: validity can be recomputed
/// from `stored_at` and `ttl_seconds` alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Cache key the entry was written under
    pub key: String,
    /// When the entry was written
    pub stored_at: DateTime<Utc>,
    /// Lifetime in seconds from `stored_at`
    pub ttl_seconds: u64,
    /// The stored payload
    pub value: Value,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry stamped with the current time.
    pub fn new(key: impl Into<String>, value: Value, ttl_seconds: u64) -> Self {
        Self::stored_at(key, value, ttl_seconds, Utc::now())
    }

    /// Creates an entry with an explicit write time.
    pub fn stored_at(
        key: impl Into<String>,
        value: Value,
        ttl_seconds: u64,
        stored_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key: key.into(),
            stored_at,
            ttl_seconds,
            value,
        }
    }

    // == Validity ==
    /// Checks whether the entry is still valid at `now`.
    ///
    /// Boundary condition: an entry is valid while `now - stored_at < ttl`.
    /// Once exactly `ttl_seconds` have elapsed the entry is expired.
    /// A write time in the future (clock skew) counts as zero elapsed.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        let elapsed = (now - self.stored_at).max(Duration::zero());
        elapsed < self.ttl()
    }

    fn ttl(&self) -> Duration {
        let secs = i64::try_from(self.ttl_seconds).unwrap_or(i64::MAX);
        Duration::seconds(secs.min(MAX_TTL_SECONDS))
    }
}
