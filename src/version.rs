//! Version Comparators
//!
//! Region descriptors declare, per logical entity/collection type, whether the
//! cached data is versioned. Comparators are fetched only for versioned types:
//! asking an unversioned descriptor for one is an observable mistake.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{CacheError, Result};

/// Ordering function over entry versions.
pub type VersionComparator<Ver> = Arc<dyn Fn(&Ver, &Ver) -> Ordering + Send + Sync>;

/// Deferred accessor producing an entity's version comparator.
pub type ComparatorAccess<Ver> = Box<dyn FnOnce() -> Result<VersionComparator<Ver>> + Send>;

/// Comparator using the natural ordering of `Ver`.
pub fn natural_order<Ver: Ord + 'static>() -> VersionComparator<Ver> {
    Arc::new(|a: &Ver, b: &Ver| a.cmp(b))
}

/// Which side of a region descriptor a comparator came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    Entity,
    Collection,
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataKind::Entity => f.write_str("entity"),
            DataKind::Collection => f.write_str("collection"),
        }
    }
}

/// Caching declaration for one entity type.
pub trait EntityDataCaching<Ver>: Send + Sync {
    fn is_versioned(&self) -> bool;

    /// Only meaningful when `is_versioned()` is true.
    fn version_comparator_access(&self) -> ComparatorAccess<Ver>;
}

/// Caching declaration for one collection type.
pub trait CollectionDataCaching<Ver>: Send + Sync {
    fn is_versioned(&self) -> bool;

    /// Comparator over the owning entity's versions. Only meaningful when
    /// `is_versioned()` is true.
    fn owner_version_comparator(&self) -> Result<VersionComparator<Ver>>;
}

/// Domain data region descriptor: the entity and collection types cached in
/// one region.
pub struct RegionDescriptor<Ver> {
    entity_caching: Vec<Arc<dyn EntityDataCaching<Ver>>>,
    collection_caching: Vec<Arc<dyn CollectionDataCaching<Ver>>>,
}

impl<Ver> RegionDescriptor<Ver> {
    pub fn new() -> Self {
        Self {
            entity_caching: Vec::new(),
            collection_caching: Vec::new(),
        }
    }

    pub fn with_entity(mut self, config: Arc<dyn EntityDataCaching<Ver>>) -> Self {
        self.entity_caching.push(config);
        self
    }

    pub fn with_collection(mut self, config: Arc<dyn CollectionDataCaching<Ver>>) -> Self {
        self.collection_caching.push(config);
        self
    }

    pub fn entity_caching(&self) -> &[Arc<dyn EntityDataCaching<Ver>>] {
        &self.entity_caching
    }

    pub fn collection_caching(&self) -> &[Arc<dyn CollectionDataCaching<Ver>>] {
        &self.collection_caching
    }
}

impl<Ver> Default for RegionDescriptor<Ver> {
    fn default() -> Self {
        Self::new()
    }
}

// == Comparator Registry ==
/// Comparators resolved once per cache instance, entity side and collection
/// side independently.
pub struct ComparatorRegistry<Ver> {
    entity: Option<VersionComparator<Ver>>,
    collection: Option<VersionComparator<Ver>>,
}

impl<Ver> ComparatorRegistry<Ver> {
    /// Registry with no comparators: every write is accepted unconditionally.
    pub fn unversioned() -> Self {
        Self {
            entity: None,
            collection: None,
        }
    }

    /// Resolves comparators from a region descriptor.
    ///
    /// The versioned flag is checked before the accessor is touched; accessors
    /// of unversioned types are never invoked. Resolution failures are returned
    /// to the caller.
    pub fn resolve(region: &str, descriptor: Option<&RegionDescriptor<Ver>>) -> Result<Self> {
        let mut registry = Self::unversioned();
        let Some(descriptor) = descriptor else {
            return Ok(registry);
        };

        for config in descriptor.entity_caching() {
            if !config.is_versioned() {
                continue;
            }
            let access = config.version_comparator_access();
            let comparator =
                access().map_err(|err| resolution_error(region, DataKind::Entity, err))?;
            registry.entity = Some(comparator);
        }

        for config in descriptor.collection_caching() {
            if !config.is_versioned() {
                continue;
            }
            let comparator = config
                .owner_version_comparator()
                .map_err(|err| resolution_error(region, DataKind::Collection, err))?;
            registry.collection = Some(comparator);
        }

        debug!(
            "Region '{}' comparators resolved: entity={}, collection={}",
            region,
            registry.entity.is_some(),
            registry.collection.is_some()
        );
        Ok(registry)
    }

    /// Comparator applied to this region's entries.
    ///
    /// A region normally caches a single logical type; when both sides are
    /// versioned the collection side, resolved last, takes precedence.
    pub fn effective(&self) -> Option<VersionComparator<Ver>> {
        self.collection.clone().or_else(|| self.entity.clone())
    }

    pub fn is_versioned(&self) -> bool {
        self.entity.is_some() || self.collection.is_some()
    }
}

impl<Ver> fmt::Debug for ComparatorRegistry<Ver> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComparatorRegistry")
            .field("entity", &self.entity.is_some())
            .field("collection", &self.collection.is_some())
            .finish()
    }
}

fn resolution_error(region: &str, kind: DataKind, err: CacheError) -> CacheError {
    CacheError::ComparatorResolution {
        region: region.to_string(),
        kind,
        reason: err.to_string(),
    }
}
