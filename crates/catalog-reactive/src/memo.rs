//! Content-addressed cache for expensive derived objects.
//!
//! Renderers identify layers by object identity, so rebuilding an equivalent
//! object is visible downstream as a remove + add. `MemoCache` hands out the
//! same `Arc` for the same key. Keys must carry every input that affects
//! construction; the builder runs untracked and sees nothing but the key.

use std::fmt;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::debug;

use crate::tracking::untracked;

/// Statistics for a memo cache.
#[derive(Debug, Default)]
pub struct MemoStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub evictions: AtomicU64,
}

impl MemoStats {
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Cache hit rate as a percentage (0-100).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.misses();
        if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64) * 100.0
        }
    }
}

/// Bounded LRU map from key to shared value.
pub struct MemoCache<K: Hash + Eq, V> {
    name: String,
    entries: Mutex<LruCache<K, Arc<V>>>,
    stats: MemoStats,
}

impl<K: Hash + Eq + Clone, V> MemoCache<K, V> {
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            name: name.into(),
            entries: Mutex::new(LruCache::new(capacity)),
            stats: MemoStats::default(),
        }
    }

    /// Look up without building.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.entries.lock().get(key).cloned()
    }

    /// Return the cached value for `key`, building it on a miss.
    pub fn get_or_insert_with<F>(&self, key: K, build: F) -> Arc<V>
    where
        F: FnOnce(&K) -> V,
    {
        if let Some(existing) = self.entries.lock().get(&key) {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            return Arc::clone(existing);
        }
        self.stats.misses.fetch_add(1, Ordering::Relaxed);

        // Build outside the lock; the builder may be arbitrarily slow.
        let value = Arc::new(untracked(|| build(&key)));

        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get(&key) {
            return Arc::clone(existing);
        }
        if entries.push(key, Arc::clone(&value)).is_some() {
            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(cache = %self.name, "Evicted least recently used entry");
        }
        value
    }

    /// Drop every entry for which `keep` returns false. Returns the number
    /// removed.
    pub fn retain<F>(&self, keep: F) -> usize
    where
        F: Fn(&K, &V) -> bool,
    {
        let mut entries = self.entries.lock();
        let doomed: Vec<K> = entries
            .iter()
            .filter(|(k, v)| !keep(k, v))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &doomed {
            entries.pop(key);
        }
        if !doomed.is_empty() {
            self.stats
                .evictions
                .fetch_add(doomed.len() as u64, Ordering::Relaxed);
            debug!(cache = %self.name, removed = doomed.len(), "Invalidated entries");
        }
        doomed.len()
    }

    /// Remove one entry.
    pub fn invalidate(&self, key: &K) -> bool {
        self.entries.lock().pop(key).is_some()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    pub fn stats(&self) -> &MemoStats {
        &self.stats
    }
}

impl<K: Hash + Eq, V> fmt::Debug for MemoCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoCache")
            .field("name", &self.name)
            .field("len", &self.entries.lock().len())
            .field("hits", &self.stats.hits())
            .field("misses", &self.stats.misses())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_key_returns_same_instance() {
        let cache: MemoCache<(String, u32), String> = MemoCache::new("test", 4);
        let a = cache.get_or_insert_with(("url".into(), 1), |(u, t)| format!("{u}@{t}"));
        let b = cache.get_or_insert_with(("url".into(), 1), |_| unreachable!());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.stats().hits(), 1);
        assert_eq!(cache.stats().misses(), 1);
    }

    #[test]
    fn test_different_key_builds_new_instance() {
        let cache: MemoCache<u32, String> = MemoCache::new("test", 4);
        let a = cache.get_or_insert_with(1, |k| k.to_string());
        let b = cache.get_or_insert_with(2, |k| k.to_string());
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_retain_only_drops_matching_entries() {
        let cache: MemoCache<(u32, u32), u32> = MemoCache::new("test", 8);
        let kept = cache.get_or_insert_with((1, 1), |_| 11);
        cache.get_or_insert_with((2, 1), |_| 21);
        cache.get_or_insert_with((2, 2), |_| 22);

        assert_eq!(cache.retain(|(config, _), _| *config == 1), 2);
        assert_eq!(cache.len(), 1);
        let again = cache.get_or_insert_with((1, 1), |_| unreachable!());
        assert!(Arc::ptr_eq(&kept, &again));
    }

    #[test]
    fn test_capacity_evicts_least_recently_used() {
        let cache: MemoCache<u32, u32> = MemoCache::new("test", 2);
        cache.get_or_insert_with(1, |k| *k);
        cache.get_or_insert_with(2, |k| *k);
        cache.get_or_insert_with(1, |_| unreachable!());
        cache.get_or_insert_with(3, |k| *k);
        assert!(cache.get(&1).is_some());
        assert!(cache.get(&2).is_none());
        assert_eq!(cache.stats().evictions(), 1);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let cache: MemoCache<u32, u32> = MemoCache::new("test", 0);
        assert_eq!(cache.capacity(), 1);
    }
}
