//! Cache Store Module
//!
//! Entry storage combining a HashMap with write-order tracking, TTL expiry and
//! version-aware writes.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, WriteOrder};
use crate::config::EvictionPolicy;
use crate::version::VersionComparator;

// == Cache Store ==
/// Bounded key/entry store.
///
/// Not synchronized itself; the region cache shares it behind a mutex with the
/// invalidation listener, so every mutation and its size accounting happen
/// under one lock.
pub struct CacheStore<K, V, Ver> {
    /// Key-entry storage
    entries: HashMap<K, CacheEntry<V, Ver>>,
    /// Oldest-write-first eviction order
    order: WriteOrder<K>,
    stats: CacheStats,
    policy: EvictionPolicy,
    /// Applied when both the incoming write and the cached entry carry versions
    comparator: Option<VersionComparator<Ver>>,
    next_seq: u64,
}

impl<K, V, Ver> CacheStore<K, V, Ver>
where
    K: Eq + Hash + Clone,
    V: Clone,
    Ver: Clone,
{
    // == Constructor ==
    pub fn new(policy: EvictionPolicy, comparator: Option<VersionComparator<Ver>>) -> Self {
        Self {
            entries: HashMap::new(),
            order: WriteOrder::new(),
            stats: CacheStats::new(),
            policy,
            comparator,
            next_seq: 0,
        }
    }

    // == Put ==
    /// Inserts or replaces the entry for `key`, stamping the current write time.
    ///
    /// Returns false if the write was discarded because the cached entry holds
    /// a version the comparator orders after `version`. Evicts oldest writes
    /// until the store is back within its size limit.
    pub fn put(&mut self, key: K, value: V, version: Option<Ver>) -> bool {
        if let Some(existing) = self.entries.get(&key) {
            if !existing.is_expired(self.policy.time_to_live)
                && self.is_older(version.as_ref(), existing.version.as_ref())
            {
                self.stats.record_rejected_write();
                return false;
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;

        let entry = CacheEntry::new(value, version, seq);
        if let Some(previous) = self.entries.insert(key.clone(), entry) {
            self.order.remove(previous.seq);
        }
        self.order.record(seq, key);

        self.evict_overflow();
        true
    }

    // == Get ==
    /// Returns the value for `key` if present and within its TTL.
    ///
    /// Expired entries read as absent and are purged on the way out.
    pub fn get<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(self.policy.time_to_live),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if expired {
            self.remove_entry(key);
            self.stats.record_expirations(1);
            self.stats.record_miss();
            return None;
        }

        self.stats.record_hit();
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Version of the live entry for `key`, if any.
    pub fn version_of<Q>(&self, key: &Q) -> Option<Ver>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.live(key).and_then(|entry| entry.version.clone())
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.live(key).is_some()
    }

    // == Remove ==
    /// Deletes the entry for `key`; returns whether one was present.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.remove_entry(key)
    }

    // == Invalidate ==
    /// Drops the entry for `key` on behalf of a peer write at `version`.
    ///
    /// When a comparator is registered and both sides carry versions, the
    /// entry survives unless its version orders strictly before `version`.
    pub fn invalidate<Q>(&mut self, key: &Q, version: Option<&Ver>) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let current = self.entries.get(key).and_then(|entry| entry.version.as_ref());
        if let (Some(comparator), Some(incoming), Some(current)) =
            (self.comparator.as_ref(), version, current)
        {
            if comparator(current, incoming) != Ordering::Less {
                debug!("Keeping entry: cached version is not older than the invalidation");
                return false;
            }
        }
        self.remove_entry(key)
    }

    /// Removes every entry written before `cutoff_ms` (Unix milliseconds).
    pub fn remove_written_before(&mut self, cutoff_ms: u64) -> usize {
        let stale: Vec<K> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.written_before(cutoff_ms))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &stale {
            self.remove_entry(key);
        }
        stale.len()
    }

    // == Clear ==
    /// Deletes all entries; returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.order.clear();
        count
    }

    // == Cleanup Expired ==
    /// Physically removes all TTL-expired entries.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let ttl = self.policy.time_to_live;
        if ttl.is_none() {
            return 0;
        }

        let expired: Vec<K> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(ttl))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove_entry(key);
        }
        self.stats.record_expirations(expired.len());
        expired.len()
    }

    pub fn record_invalidations(&mut self, count: usize) {
        self.stats.record_invalidations(count);
    }

    /// Returns a snapshot of the store's counters.
    pub fn stats(&self) -> CacheStats {
        self.stats.clone()
    }

    /// Number of physically present entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn live<Q>(&self, key: &Q) -> Option<&CacheEntry<V, Ver>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired(self.policy.time_to_live))
    }

    fn remove_entry<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.entries.remove(key) {
            Some(entry) => {
                self.order.remove(entry.seq);
                true
            }
            None => false,
        }
    }

    fn is_older(&self, incoming: Option<&Ver>, current: Option<&Ver>) -> bool {
        match (self.comparator.as_ref(), incoming, current) {
            (Some(comparator), Some(incoming), Some(current)) => {
                comparator(incoming, current) == Ordering::Less
            }
            _ => false,
        }
    }

    fn evict_overflow(&mut self) {
        while self.policy.is_over_capacity(self.entries.len()) {
            let Some(oldest) = self.order.pop_oldest() else {
                panic!(
                    "write order is empty while {} entries exceed the size limit",
                    self.entries.len()
                );
            };
            self.entries.remove(&oldest);
            self.stats.record_eviction();
        }
        debug_assert_eq!(self.order.len(), self.entries.len());
    }
}

impl<K, V, Ver> fmt::Debug for CacheStore<K, V, Ver> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("len", &self.entries.len())
            .field("policy", &self.policy)
            .field("versioned", &self.comparator.is_some())
            .finish()
    }
}
