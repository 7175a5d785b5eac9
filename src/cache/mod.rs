//! Cache Module
//!
//! Provides the local entry store with size-bounded, oldest-write-first
//! eviction, TTL expiration and version-aware writes.

mod entry;
mod order;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry};
pub use order::WriteOrder;
pub use stats::CacheStats;
pub use store::CacheStore;
