//! Process-local, advisory dedup cache.
//!
//! Bounded at `capacity` entries; on overflow, evicts the oldest ~10% to
//! make room. This cache prevents re-appending a duplicate event to the
//! *current buffer lifetime* only — it is not persisted and does not
//! protect against duplicates across a process restart.

use std::collections::VecDeque;

use dashmap::DashSet;

pub struct DedupCache {
    capacity: usize,
    seen: DashSet<String>,
    // Insertion order, used to pick eviction victims. Guarded implicitly by
    // being touched only from within the WAL buffer's single append path.
    order: std::sync::Mutex<VecDeque<String>>,
}

impl DedupCache {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, seen: DashSet::new(), order: std::sync::Mutex::new(VecDeque::with_capacity(capacity)) }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Inserts `id`, evicting the oldest ~10% of entries first if the
    /// cache is already at capacity.
    pub fn insert(&self, id: &str) {
        if self.seen.contains(id) {
            return;
        }
        if self.seen.len() >= self.capacity {
            self.evict_oldest_fraction();
        }
        self.seen.insert(id.to_string());
        self.order.lock().expect("dedup order mutex poisoned").push_back(id.to_string());
    }

    fn evict_oldest_fraction(&self) {
        let to_evict = (self.capacity / 10).max(1);
        let mut order = self.order.lock().expect("dedup order mutex poisoned");
        for _ in 0..to_evict {
            if let Some(oldest) = order.pop_front() {
                self.seen.remove(&oldest);
            } else {
                break;
            }
        }
    }

    pub fn clear(&self) {
        self.seen.clear();
        self.order.lock().expect("dedup order mutex poisoned").clear();
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_duplicates() {
        let cache = DedupCache::new(10);
        cache.insert("a");
        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
    }

    #[test]
    fn evicts_oldest_tenth_on_overflow() {
        let cache = DedupCache::new(10);
        for i in 0..10 {
            cache.insert(&format!("id-{i}"));
        }
        assert_eq!(cache.len(), 10);
        cache.insert("id-10");
        // one (10%) eviction plus the new insert: still bounded.
        assert!(cache.len() <= 10);
        assert!(!cache.contains("id-0"));
        assert!(cache.contains("id-10"));
    }

    #[test]
    fn clear_resets_state() {
        let cache = DedupCache::new(10);
        cache.insert("a");
        cache.clear();
        assert!(cache.is_empty());
    }
}
