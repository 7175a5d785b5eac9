//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the store's invariants over arbitrary operation
//! sequences.

use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::cache::CacheStore;
use crate::config::EvictionPolicy;
use crate::version::natural_order;

// == Test Configuration ==
const TEST_MAX_SIZE: usize = 50;

// == Strategies ==
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,16}".prop_map(|s| s)
}

fn valid_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,64}".prop_map(|s| s)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Put { key: String, value: String },
    Get { key: String },
    Remove { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (valid_key_strategy(), valid_value_strategy())
            .prop_map(|(key, value)| CacheOp::Put { key, value }),
        valid_key_strategy().prop_map(|key| CacheOp::Get { key }),
        valid_key_strategy().prop_map(|key| CacheOp::Remove { key }),
    ]
}

fn bounded_store(max_size: usize) -> CacheStore<String, String, u64> {
    CacheStore::new(EvictionPolicy::new(Some(max_size), None), None)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Hit and miss counters match the outcome of every read.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let mut store = bounded_store(TEST_MAX_SIZE);
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Put { key, value } => {
                    store.put(key, value, None);
                }
                CacheOp::Get { key } => match store.get(&key) {
                    Some(_) => expected_hits += 1,
                    None => expected_misses += 1,
                },
                CacheOp::Remove { key } => {
                    store.remove(&key);
                }
            }
        }

        let stats = store.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
    }

    // A put followed by a get returns the stored value.
    #[test]
    fn prop_roundtrip_storage(key in valid_key_strategy(), value in valid_value_strategy()) {
        let mut store = bounded_store(TEST_MAX_SIZE);

        store.put(key.clone(), value.clone(), None);

        prop_assert_eq!(store.get(&key), Some(value));
    }

    // The store never holds more than its size limit after a write.
    #[test]
    fn prop_capacity_enforcement(
        entries in prop::collection::vec(
            (valid_key_strategy(), valid_value_strategy()),
            1..200
        )
    ) {
        let max_size = 20;
        let mut store = bounded_store(max_size);

        for (key, value) in entries {
            store.put(key, value, None);
            prop_assert!(
                store.len() <= max_size,
                "Store size {} exceeds max {}",
                store.len(),
                max_size
            );
        }
    }

    // Inserting N+1 distinct keys into a store of size N evicts exactly the
    // first key written.
    #[test]
    fn prop_oldest_write_evicted_first(
        keys in prop::collection::hash_set(valid_key_strategy(), 2..12),
        new_key in valid_key_strategy(),
    ) {
        prop_assume!(!keys.contains(&new_key));
        let keys: Vec<String> = keys.into_iter().collect();
        let capacity = keys.len();
        let mut store = bounded_store(capacity);

        for key in &keys {
            store.put(key.clone(), format!("value_{}", key), None);
        }
        // Reads must not change which key goes first
        for key in keys.iter().rev() {
            store.get(key);
        }

        store.put(new_key.clone(), "new".to_string(), None);

        prop_assert_eq!(store.len(), capacity);
        prop_assert!(!store.contains_key(&keys[0]), "Oldest key '{}' survived", keys[0]);
        prop_assert!(store.contains_key(&new_key));
        for key in keys.iter().skip(1) {
            prop_assert!(store.contains_key(key), "Key '{}' was evicted out of order", key);
        }
    }

    // With a comparator registered, the cached version never moves backwards.
    #[test]
    fn prop_versions_never_regress(versions in prop::collection::vec(0u64..20, 1..40)) {
        let mut store: CacheStore<String, u64, u64> =
            CacheStore::new(EvictionPolicy::unbounded(), Some(natural_order()));
        let mut highest = 0u64;

        for version in versions {
            let accepted = store.put("k".to_string(), version, Some(version));
            prop_assert_eq!(accepted, version >= highest);
            highest = highest.max(version);
            prop_assert_eq!(store.version_of("k"), Some(highest));
        }
    }
}

// Concurrent writers sharing the store behind a mutex keep the size invariant.
#[test]
fn test_concurrent_writers_respect_capacity() {
    let store = Arc::new(Mutex::new(bounded_store(TEST_MAX_SIZE)));
    let mut handles = Vec::new();

    for t in 0..8 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            for i in 0..200 {
                let mut guard = store.lock();
                guard.put(format!("t{}-{}", t, i), i.to_string(), None);
                assert!(guard.len() <= TEST_MAX_SIZE);
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let guard = store.lock();
    assert_eq!(guard.len(), TEST_MAX_SIZE);
    let unique: HashSet<_> = (0..8)
        .flat_map(|t| (0..200).map(move |i| format!("t{}-{}", t, i)))
        .filter(|k| guard.contains_key(k.as_str()))
        .collect();
    assert_eq!(unique.len(), TEST_MAX_SIZE);
}
