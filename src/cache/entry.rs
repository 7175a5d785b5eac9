//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with write-time metadata.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// A single cache entry: value, optional version and write-time metadata.
///
/// Owned exclusively by the store; values leave it only as clones.
#[derive(Debug, Clone)]
pub struct CacheEntry<V, Ver> {
    /// The stored value
    pub value: V,
    /// Version, if the writer supplied one
    pub version: Option<Ver>,
    /// Monotonic clock reading at last write, used for TTL
    pub written_at: Instant,
    /// Wall-clock Unix milliseconds at last write, comparable across members
    pub timestamp_ms: u64,
    /// Position in the store's write order
    pub seq: u64,
}

impl<V, Ver> CacheEntry<V, Ver> {
    // == Constructor ==
    /// Creates an entry stamped with the current time.
    pub fn new(value: V, version: Option<Ver>, seq: u64) -> Self {
        Self {
            value,
            version,
            written_at: Instant::now(),
            timestamp_ms: current_timestamp_ms(),
            seq,
        }
    }

    // == Is Expired ==
    /// Checks if the entry's age exceeds `ttl`.
    ///
    /// An entry written exactly `ttl` ago is still live; `None` never expires.
    pub fn is_expired(&self, ttl: Option<Duration>) -> bool {
        match ttl {
            Some(ttl) => self.written_at.elapsed() > ttl,
            None => false,
        }
    }

    /// Returns true if the entry was written before `cutoff_ms`.
    pub fn written_before(&self, cutoff_ms: u64) -> bool {
        self.timestamp_ms < cutoff_ms
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}
