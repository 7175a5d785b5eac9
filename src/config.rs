//! Configuration Module
//!
//! Eviction policy for a region cache and the named map configuration it can be
//! derived from.

use std::env;
use std::time::Duration;

/// Size and time-to-live limits for one region cache.
///
/// Immutable once constructed. `None` means "no limit" for either field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EvictionPolicy {
    /// Maximum number of entries, `None` = unbounded
    pub max_size: Option<usize>,
    /// Maximum entry age, `None` = entries never expire
    pub time_to_live: Option<Duration>,
}

impl EvictionPolicy {
    /// Creates a policy with explicit limits.
    pub fn new(max_size: Option<usize>, time_to_live: Option<Duration>) -> Self {
        Self {
            max_size,
            time_to_live,
        }
    }

    /// Unbounded size, no TTL.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Derives a policy from a named map configuration.
    ///
    /// A size of `0` and a TTL of `0` seconds both mean "not set".
    pub fn from_map_config(config: &MapConfig) -> Self {
        let max_size = match config.eviction.size {
            0 => None,
            size => Some(size as usize),
        };
        let time_to_live = match config.time_to_live_seconds {
            0 => None,
            secs => Some(Duration::from_secs(u64::from(secs))),
        };

        Self {
            max_size,
            time_to_live,
        }
    }

    /// Returns true if `len` entries would exceed the size limit.
    pub fn is_over_capacity(&self, len: usize) -> bool {
        self.max_size.is_some_and(|max| len > max)
    }
}

/// Eviction sub-configuration of a named map configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EvictionConfig {
    /// Maximum entry count, 0 = unbounded
    pub size: u32,
}

/// Named map-like resource configuration supplied by the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MapConfig {
    pub eviction: EvictionConfig,
    /// Entry time-to-live in seconds, 0 = none
    pub time_to_live_seconds: u32,
}

impl MapConfig {
    /// Creates a map configuration with the given size limit and TTL.
    pub fn new(size: u32, time_to_live_seconds: u32) -> Self {
        Self {
            eviction: EvictionConfig { size },
            time_to_live_seconds,
        }
    }

    /// Loads a map configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `REGION_CACHE_MAX_SIZE` - Maximum entries (default: 0, unbounded)
    /// - `REGION_CACHE_TTL_SECONDS` - Entry TTL in seconds (default: 0, none)
    pub fn from_env() -> Self {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Builds a configuration from a variable lookup. Missing or unparsable
    /// values fall back to 0.
    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let parse = |name: &str| var(name).and_then(|v| v.parse().ok()).unwrap_or(0);
        Self::new(parse("REGION_CACHE_MAX_SIZE"), parse("REGION_CACHE_TTL_SECONDS"))
    }
}

/// Outcome of looking up a named map configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLookup {
    /// A configuration was resolved for the name
    Found(MapConfig),
    /// The environment cannot serve configuration lookups (e.g. a lite client)
    Unsupported,
}
