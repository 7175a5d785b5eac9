//! Region Cache - a per-member local cache with cluster-wide invalidation
//!
//! Each member keeps its own copy of cached entries, bounded by size and
//! time-to-live. Local writes are broadcast as invalidations so peers drop
//! their stale copies; a member never re-applies what it published itself.
//! Versioned types use a comparator so an out-of-order update cannot replace
//! a newer cached value.

pub mod cache;
pub mod cluster;
pub mod config;
pub mod error;
pub mod invalidation;
pub mod region;
pub mod tasks;
pub mod version;

pub use cluster::{ClusterHandle, InvalidationMessage, MemberId, Membership};
pub use config::{ConfigLookup, EvictionPolicy, MapConfig};
pub use error::{CacheError, Result};
pub use region::{LocalRegionCache, RegionClusterHandle};
pub use tasks::spawn_cleanup_task;
pub use version::{RegionDescriptor, VersionComparator};
