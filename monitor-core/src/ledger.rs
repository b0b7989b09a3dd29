use std::collections::{HashSet, VecDeque};
use tracing::debug;

/// Identifiers of items already evaluated in this process, oldest first.
///
/// Membership lookups go through `seen`; `order` records insertion order so
/// pruning keeps exactly the most recently inserted identifiers.
#[derive(Debug, Clone)]
pub struct DedupLedger {
    seen: HashSet<String>,
    order: VecDeque<String>,
    soft_cap: usize,
    retain: usize,
}

impl DedupLedger {
    pub const DEFAULT_SOFT_CAP: usize = 1000;
    pub const DEFAULT_RETAIN: usize = 500;

    pub fn new() -> Self {
        Self::with_limits(Self::DEFAULT_SOFT_CAP, Self::DEFAULT_RETAIN)
    }

    /// `retain` is clamped to `soft_cap`.
    pub fn with_limits(soft_cap: usize, retain: usize) -> Self {
        Self {
            seen: HashSet::with_capacity(soft_cap + 1),
            order: VecDeque::with_capacity(soft_cap + 1),
            soft_cap,
            retain: retain.min(soft_cap),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Records `id`. Re-adding a known identifier is a no-op and does not
    /// refresh its position.
    pub fn add(&mut self, id: impl Into<String>) {
        let id = id.into();
        if self.seen.insert(id.clone()) {
            self.order.push_back(id);
        }
    }

    /// Drops the oldest identifiers down to `retain` once size exceeds `soft_cap`.
    /// Returns how many were evicted.
    pub fn prune_if_oversized(&mut self) -> usize {
        if self.order.len() <= self.soft_cap {
            return 0;
        }

        let evict = self.order.len() - self.retain;
        for id in self.order.drain(..evict) {
            self.seen.remove(&id);
        }

        debug!(
            "Pruned {} identifiers from dedup ledger, {} retained",
            evict,
            self.order.len()
        );
        evict
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for DedupLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_contains() {
        let mut ledger = DedupLedger::new();
        assert!(ledger.is_empty());
        assert!(!ledger.contains("t3_a"));

        ledger.add("t3_a");
        assert!(ledger.contains("t3_a"));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_duplicate_add_is_noop() {
        let mut ledger = DedupLedger::new();
        ledger.add("a");
        ledger.add("a");
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_no_prune_at_or_below_cap() {
        let mut ledger = DedupLedger::new();
        for i in 0..1000 {
            ledger.add(format!("id{}", i));
        }
        assert_eq!(ledger.prune_if_oversized(), 0);
        assert_eq!(ledger.len(), 1000);
    }

    #[test]
    fn test_prune_keeps_most_recent_500() {
        let mut ledger = DedupLedger::new();
        for i in 0..1001 {
            ledger.add(format!("id{}", i));
        }

        assert_eq!(ledger.prune_if_oversized(), 501);
        assert_eq!(ledger.len(), 500);

        for i in 0..501 {
            assert!(!ledger.contains(&format!("id{}", i)), "id{} kept", i);
        }
        for i in 501..1001 {
            assert!(ledger.contains(&format!("id{}", i)), "id{} evicted", i);
        }
    }

    #[test]
    fn test_readd_does_not_refresh_position() {
        let mut ledger = DedupLedger::with_limits(4, 2);
        for id in ["a", "b", "c", "d"] {
            ledger.add(id);
        }
        ledger.add("a");
        ledger.add("e");

        ledger.prune_if_oversized();
        assert!(!ledger.contains("a"));
        assert!(ledger.contains("d"));
        assert!(ledger.contains("e"));
    }

    #[test]
    fn test_evicted_identifier_can_be_added_again() {
        let mut ledger = DedupLedger::with_limits(2, 1);
        for id in ["a", "b", "c"] {
            ledger.add(id);
        }
        ledger.prune_if_oversized();
        assert!(!ledger.contains("a"));

        ledger.add("a");
        assert!(ledger.contains("a"));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_retain_clamped_to_cap() {
        let mut ledger = DedupLedger::with_limits(3, 10);
        for i in 0..5 {
            ledger.add(i.to_string());
        }
        ledger.prune_if_oversized();
        assert_eq!(ledger.len(), 3);
    }
}
