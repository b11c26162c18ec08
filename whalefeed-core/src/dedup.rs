//! Bounded dedup ledger.

use std::collections::{HashSet, VecDeque};

/// Default number of transaction hashes retained.
pub const DEFAULT_LEDGER_CAPACITY: usize = 1000;

/// A bounded set of recently seen transaction hashes.
///
/// Insertion order is preserved so the oldest entry is evicted first once
/// the ledger exceeds its capacity. The bound trades recall for memory:
/// a duplicate older than the last `capacity` distinct hashes will be
/// re-admitted. That loss is deliberate.
#[derive(Debug)]
pub struct DedupLedger {
    capacity: usize,
    order: VecDeque<String>,
    seen: HashSet<String>,
}

impl DedupLedger {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
        }
    }

    /// Whether `hash` is currently marked as seen.
    ///
    /// Callers must check this before [`record`](Self::record) so an
    /// already-seen hash is not double counted in the insertion order.
    pub fn seen(&self, hash: &str) -> bool {
        self.seen.contains(hash)
    }

    /// Mark `hash` as seen, evicting the oldest entries past capacity.
    pub fn record(&mut self, hash: String) {
        if self.seen.contains(&hash) {
            return;
        }
        self.seen.insert(hash.clone());
        self.order.push_back(hash);
        self.evict_past_capacity();
    }

    /// Re-enforce the capacity bound, returning how many entries were
    /// evicted. Normally a no-op since [`record`](Self::record) evicts
    /// inline; the slow maintenance tick calls this as a backstop.
    pub fn prune_to_capacity(&mut self) -> usize {
        self.evict_past_capacity()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn evict_past_capacity(&mut self) -> usize {
        let mut evicted = 0;
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
                evicted += 1;
            }
        }
        evicted
    }
}

impl Default for DedupLedger {
    fn default() -> Self {
        Self::new(DEFAULT_LEDGER_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seen_after_record() {
        let mut ledger = DedupLedger::new(10);
        assert!(!ledger.seen("0xA"));
        ledger.record("0xA".to_string());
        assert!(ledger.seen("0xA"));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_recording_twice_does_not_double_count() {
        let mut ledger = DedupLedger::new(10);
        ledger.record("0xA".to_string());
        ledger.record("0xA".to_string());
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_oldest_entry_evicted_past_capacity() {
        let mut ledger = DedupLedger::new(3);
        for hash in ["0x1", "0x2", "0x3", "0x4"] {
            ledger.record(hash.to_string());
        }
        assert_eq!(ledger.len(), 3);
        assert!(!ledger.seen("0x1"));
        assert!(ledger.seen("0x2"));
        assert!(ledger.seen("0x3"));
        assert!(ledger.seen("0x4"));
    }

    #[test]
    fn test_full_capacity_sweep() {
        // After capacity + k distinct records, exactly the most recent
        // capacity-worth remain.
        let capacity = 100;
        let mut ledger = DedupLedger::new(capacity);
        for i in 0..capacity + 25 {
            ledger.record(format!("0x{i}"));
        }
        assert_eq!(ledger.len(), capacity);
        for i in 0..25 {
            assert!(!ledger.seen(&format!("0x{i}")));
        }
        for i in 25..capacity + 25 {
            assert!(ledger.seen(&format!("0x{i}")));
        }
    }

    #[test]
    fn test_prune_is_noop_within_capacity() {
        let mut ledger = DedupLedger::new(5);
        ledger.record("0xA".to_string());
        assert_eq!(ledger.prune_to_capacity(), 0);
        assert!(ledger.seen("0xA"));
    }
}
