//! Background Tasks Module
//!
//! Periodic maintenance that runs alongside a region cache.
//!
//! # Tasks
//! - TTL Cleanup: Purges expired entries at a configured interval

mod cleanup;

pub use cleanup::spawn_cleanup_task;
