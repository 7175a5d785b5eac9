//! Write Order Module
//!
//! Tracks the order in which keys were last written, for oldest-write-first
//! eviction.

use std::collections::BTreeMap;

// == Write Order ==
/// Keys indexed by write sequence number.
///
/// Sequence numbers are handed out by the store in strictly increasing order,
/// so the smallest key in the map is the oldest write. Reads never touch it.
#[derive(Debug)]
pub struct WriteOrder<K> {
    by_seq: BTreeMap<u64, K>,
}

impl<K> WriteOrder<K> {
    pub fn new() -> Self {
        Self {
            by_seq: BTreeMap::new(),
        }
    }

    /// Records a write of `key` at `seq`.
    ///
    /// The caller removes the key's previous sequence number first.
    pub fn record(&mut self, seq: u64, key: K) {
        self.by_seq.insert(seq, key);
    }

    pub fn remove(&mut self, seq: u64) -> Option<K> {
        self.by_seq.remove(&seq)
    }

    // == Pop Oldest ==
    /// Returns and removes the earliest-written key.
    pub fn pop_oldest(&mut self) -> Option<K> {
        self.by_seq.pop_first().map(|(_, key)| key)
    }

    pub fn clear(&mut self) {
        self.by_seq.clear();
    }

    pub fn len(&self) -> usize {
        self.by_seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_seq.is_empty()
    }
}

impl<K> Default for WriteOrder<K> {
    fn default() -> Self {
        Self::new()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_new() {
        let order: WriteOrder<&str> = WriteOrder::new();
        assert!(order.is_empty());
        assert_eq!(order.len(), 0);
    }

    #[test]
    fn test_pop_oldest_follows_sequence() {
        let mut order = WriteOrder::new();
        order.record(2, "b");
        order.record(1, "a");
        order.record(3, "c");

        assert_eq!(order.pop_oldest(), Some("a"));
        assert_eq!(order.pop_oldest(), Some("b"));
        assert_eq!(order.len(), 1);
    }

    #[test]
    fn test_rewrite_moves_key_to_back() {
        let mut order = WriteOrder::new();
        order.record(1, "a");
        order.record(2, "b");

        // Rewrite "a": drop its old position, record the new one
        order.remove(1);
        order.record(3, "a");

        assert_eq!(order.pop_oldest(), Some("b"));
        assert_eq!(order.pop_oldest(), Some("a"));
    }

    #[test]
    fn test_pop_empty() {
        let mut order: WriteOrder<&str> = WriteOrder::new();
        assert_eq!(order.pop_oldest(), None);
    }

    #[test]
    fn test_remove_nonexistent_seq() {
        let mut order = WriteOrder::new();
        order.record(1, "a");

        assert_eq!(order.remove(42), None);
        assert_eq!(order.len(), 1);
    }
}
