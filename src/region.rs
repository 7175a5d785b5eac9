//! Local Region Cache
//!
//! One member's copy of a named cache region. Local mutations go to the entry
//! store first and are then broadcast as invalidations; peers' invalidations
//! arrive through the channel binding.

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::cache::{CacheStats, CacheStore};
use crate::cluster::{ClusterHandle, InvalidationMessage};
use crate::config::{ConfigLookup, EvictionPolicy};
use crate::error::Result;
use crate::invalidation::{BindingState, ChannelBinding, InvalidationListener, ListenerGate};
use crate::version::{ComparatorRegistry, RegionDescriptor};

/// Cluster handle as seen by a region cache keyed by `K` with versions `Ver`.
pub type RegionClusterHandle<K, Ver> = Arc<dyn ClusterHandle<InvalidationMessage<K, Ver>>>;

// == Local Region Cache ==
/// Per-member cache for one region with cluster-wide invalidation.
pub struct LocalRegionCache<K, V, Ver = u64> {
    name: String,
    store: Arc<Mutex<CacheStore<K, V, Ver>>>,
    policy: EvictionPolicy,
    comparators: ComparatorRegistry<Ver>,
    binding: ChannelBinding<InvalidationMessage<K, Ver>>,
}

impl<K, V, Ver> LocalRegionCache<K, V, Ver>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    Ver: Clone + Send + Sync + 'static,
{
    // == Constructors ==
    /// Creates a cache whose eviction policy comes from the cluster's map
    /// configuration for `name`, or defaults when none can be looked up.
    ///
    /// # Arguments
    /// * `name` - Region name; also the name of the invalidation channel
    /// * `handle` - Cluster handle, if running inside a cluster
    /// * `region` - Descriptor declaring which cached types are versioned
    /// * `use_topic` - Subscribe to and publish invalidations
    ///
    /// # Errors
    /// Fails only if a versioned type's comparator cannot be resolved.
    pub fn new(
        name: &str,
        handle: Option<RegionClusterHandle<K, Ver>>,
        region: Option<&RegionDescriptor<Ver>>,
        use_topic: bool,
    ) -> Result<Self> {
        Self::build(name, handle, region, use_topic, None)
    }

    /// Creates a cache with an explicit eviction policy. The cluster's map
    /// configuration is never consulted.
    pub fn with_eviction_policy(
        name: &str,
        handle: Option<RegionClusterHandle<K, Ver>>,
        region: Option<&RegionDescriptor<Ver>>,
        use_topic: bool,
        policy: EvictionPolicy,
    ) -> Result<Self> {
        Self::build(name, handle, region, use_topic, Some(policy))
    }

    fn build(
        name: &str,
        handle: Option<RegionClusterHandle<K, Ver>>,
        region: Option<&RegionDescriptor<Ver>>,
        use_topic: bool,
        explicit: Option<EvictionPolicy>,
    ) -> Result<Self> {
        let (policy, handle) = resolve_policy(name, handle, explicit);
        let comparators = ComparatorRegistry::resolve(name, region)?;
        let store = Arc::new(Mutex::new(CacheStore::new(policy, comparators.effective())));

        let binding = match handle {
            Some(handle) if use_topic => {
                let gate = ListenerGate::new();
                let listener = InvalidationListener::new(
                    name,
                    Arc::clone(&store),
                    Arc::clone(&handle),
                    gate.clone(),
                );
                ChannelBinding::subscribe(name, handle.channels(), Arc::new(listener), gate)
            }
            _ => ChannelBinding::unsubscribed(name),
        };

        debug!(
            "Region '{}' created: max_size={:?}, ttl={:?}, versioned={}, subscribed={}",
            name,
            policy.max_size,
            policy.time_to_live,
            comparators.is_versioned(),
            binding.state() == BindingState::Subscribed
        );

        Ok(Self {
            name: name.to_string(),
            store,
            policy,
            comparators,
            binding,
        })
    }

    // == Reads ==
    /// Returns the cached value for `key` if present and within its TTL.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.store.lock().get(key)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.store.lock().contains_key(key)
    }

    // == Writes ==
    /// Stores `value` under `key` and tells peers to drop their copies.
    ///
    /// Returns false, without publishing, if the write was discarded because
    /// a newer version is already cached.
    pub fn put(&self, key: K, value: V, version: Option<Ver>) -> bool {
        let accepted = self.store.lock().put(key.clone(), value, version.clone());
        if accepted {
            self.binding.publish(InvalidationMessage::Single { key, version });
        } else {
            debug!("Region '{}' discarded stale write for {:?}", self.name, key);
        }
        accepted
    }

    /// Removes `key` locally and on every peer.
    pub fn remove<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        let removed = self.store.lock().remove(key);
        self.binding.publish(InvalidationMessage::single(key.to_owned()));
        removed
    }

    /// Drops every entry locally and on every peer.
    pub fn clear(&self) -> usize {
        let removed = self.store.lock().clear();
        self.binding.publish(InvalidationMessage::Clear);
        removed
    }

    /// Drops entries written before `cutoff_ms` (Unix milliseconds) locally
    /// and on every peer.
    pub fn evict_written_before(&self, cutoff_ms: u64) -> usize {
        let removed = self.store.lock().remove_written_before(cutoff_ms);
        self.binding.publish(InvalidationMessage::Timestamp { cutoff_ms });
        removed
    }

    // == Maintenance ==
    /// Physically removes TTL-expired entries. Local only.
    pub fn cleanup(&self) -> usize {
        self.store.lock().cleanup_expired()
    }

    /// Detaches from the invalidation channel. Later mutations stay local and
    /// later deliveries are ignored.
    pub fn dispose(&self) {
        if !self.detach() {
            debug!("Region '{}' had no channel subscription to detach", self.name);
        }
    }

    // == Accessors ==
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn eviction_policy(&self) -> &EvictionPolicy {
        &self.policy
    }

    pub fn is_versioned(&self) -> bool {
        self.comparators.is_versioned()
    }

    pub fn binding_state(&self) -> BindingState {
        self.binding.state()
    }

    pub fn is_subscribed(&self) -> bool {
        self.binding_state() == BindingState::Subscribed
    }

    pub fn stats(&self) -> CacheStats {
        self.store.lock().stats()
    }

    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.lock().is_empty()
    }
}

impl<K, V, Ver> LocalRegionCache<K, V, Ver> {
    fn detach(&self) -> bool {
        {
            // Deliveries check the gate under this lock, so none applies
            // after the gate closes
            let _store = self.store.lock();
            self.binding.close_gate();
        }
        self.binding.detach()
    }
}

impl<K, V, Ver> Drop for LocalRegionCache<K, V, Ver> {
    fn drop(&mut self) {
        self.detach();
    }
}

impl<K, V, Ver> fmt::Debug for LocalRegionCache<K, V, Ver> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalRegionCache")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("comparators", &self.comparators)
            .field("binding", &self.binding)
            .finish()
    }
}

/// Picks the eviction policy and reports whether the handle is usable.
///
/// An explicit policy wins without any lookup. A handle whose configuration
/// lookup is unsupported is treated as no handle at all.
fn resolve_policy<K, Ver>(
    name: &str,
    handle: Option<RegionClusterHandle<K, Ver>>,
    explicit: Option<EvictionPolicy>,
) -> (EvictionPolicy, Option<RegionClusterHandle<K, Ver>>) {
    if let Some(policy) = explicit {
        return (policy, handle);
    }
    let Some(handle) = handle else {
        return (EvictionPolicy::default(), None);
    };

    match handle.find_map_config(name) {
        ConfigLookup::Found(config) => (EvictionPolicy::from_map_config(&config), Some(handle)),
        ConfigLookup::Unsupported => {
            warn!(
                "Map configuration lookup unsupported for region '{}', using defaults",
                name
            );
            (EvictionPolicy::default(), None)
        }
    }
}
