//! LRU Cache Module
//!
//! Fixed-capacity cache with least-recently-used eviction.

use std::borrow::Borrow;
use std::hash::Hash;

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::{CacheStats, LruList};
use crate::config::DEFAULT_CAPACITY;
use crate::error::Result;
use crate::singleton::{ConstructorSingleton, KwArgs};

#[derive(Debug)]
struct LruState<K, V> {
    entries: LruList<K, V>,
    stats: CacheStats,
}

// == LRU Cache ==
/// Thread-safe LRU cache.
///
/// All operations take `&self`; a single mutex guards the recency list, so
/// instances can be shared through an `Arc`. A capacity of zero yields a
/// cache that never retains anything.
///
/// # Example
/// ```
/// use mini_cache::LruCache;
///
/// let cache = LruCache::new(2);
/// cache.put(1, "A");
/// cache.put(2, "B");
/// assert_eq!(cache.get(&1), Some("A"));
/// cache.put(3, "C"); // evicts 2
/// assert_eq!(cache.get(&2), None);
/// ```
#[derive(Debug)]
pub struct LruCache<K, V> {
    state: Mutex<LruState<K, V>>,
    capacity: usize,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    // == Constructor ==
    /// Creates an empty cache bounded to `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(LruState {
                entries: LruList::new(),
                stats: CacheStats::new(),
            }),
            capacity,
        }
    }

    // == Get ==
    /// Returns a clone of the value and marks the key most recently used.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut state = self.state.lock();
        let value = state.entries.get(key).cloned();
        state.stats.record_lookup(value.is_some());
        value
    }

    // == Put ==
    /// Inserts or overwrites a value and marks it most recently used.
    ///
    /// Returns the entry evicted to stay within capacity, if any. With a
    /// capacity of zero the new entry itself is handed straight back.
    pub fn put(&self, key: K, value: V) -> Option<(K, V)> {
        if self.capacity == 0 {
            return Some((key, value));
        }

        let mut state = self.state.lock();
        state.entries.insert(key, value);
        if state.entries.len() <= self.capacity {
            return None;
        }

        let evicted = state.entries.evict_oldest();
        if evicted.is_some() {
            state.stats.record_eviction();
            debug!(capacity = self.capacity, "LRU cache evicted least recently used entry");
        }
        evicted
    }

    // == Remove ==
    /// Removes a key, returning its value. Absent keys are a no-op.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.state.lock().entries.remove(key)
    }

    // == Peek ==
    /// Returns a clone of the value without refreshing its recency.
    pub fn peek<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.state.lock().entries.peek(key).cloned()
    }

    /// Checks membership without refreshing recency.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.state.lock().entries.contains(key)
    }

    /// Keys ordered from most to least recently used.
    pub fn keys(&self) -> Vec<K> {
        self.state
            .lock()
            .entries
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.state.lock().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // == Stats ==
    /// Returns a snapshot of the cache counters.
    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        state.stats.snapshot(state.entries.len())
    }
}

impl<K, V> ConstructorSingleton for LruCache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Reads `capacity` (default 50).
    fn construct(kwargs: &KwArgs) -> Result<Self> {
        Ok(Self::new(kwargs.usize_or("capacity", DEFAULT_CAPACITY)?))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_put_and_get() {
        let cache = LruCache::new(2);
        cache.put(1, "A");
        cache.put(2, "B");

        assert_eq!(cache.get(&1), Some("A"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_cache_evicts_least_recently_used() {
        let cache = LruCache::new(2);
        cache.put(1, "A");
        cache.put(2, "B");
        cache.get(&1);

        assert_eq!(cache.put(3, "C"), Some((2, "B")));
        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.get(&3), Some("C"));
        assert_eq!(cache.get(&1), Some("A"));
    }

    #[test]
    fn test_cache_put_existing_refreshes() {
        let cache = LruCache::new(2);
        cache.put("a", 1);
        cache.put("b", 2);
        cache.put("a", 10);

        assert_eq!(cache.put("c", 3), Some(("b", 2)));
        assert_eq!(cache.peek(&"a"), Some(10));
    }

    #[test]
    fn test_cache_zero_capacity_retains_nothing() {
        let cache = LruCache::new(0);
        assert_eq!(cache.put("a", 1), Some(("a", 1)));
        assert!(cache.is_empty());
        assert_eq!(cache.get(&"a"), None);
    }

    #[test]
    fn test_cache_remove_is_idempotent() {
        let cache = LruCache::new(4);
        cache.put("a", 1);

        assert_eq!(cache.remove(&"a"), Some(1));
        assert_eq!(cache.remove(&"a"), None);
        assert_eq!(cache.remove(&"missing"), None);
        assert!(!cache.contains_key(&"a"));
    }

    #[test]
    fn test_cache_contains_does_not_refresh() {
        let cache = LruCache::new(2);
        cache.put("a", 1);
        cache.put("b", 2);
        assert!(cache.contains_key(&"a"));

        assert_eq!(cache.put("c", 3), Some(("a", 1)));
    }

    #[test]
    fn test_cache_keys_most_recent_first() {
        let cache = LruCache::new(3);
        cache.put("a", 1);
        cache.put("b", 2);
        cache.put("c", 3);
        cache.get(&"a");

        assert_eq!(cache.keys(), vec!["a", "c", "b"]);
    }

    #[test]
    fn test_cache_clear() {
        let cache = LruCache::new(3);
        cache.put("a", 1);
        cache.put("b", 2);
        cache.clear();

        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 3);
    }

    #[test]
    fn test_cache_stats() {
        let cache = LruCache::new(1);
        cache.put("a", 1);
        cache.get(&"a");
        cache.get(&"missing");
        cache.put("b", 2);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.total_entries, 1);
    }

    #[test]
    fn test_cache_shared_across_threads() {
        use std::sync::Arc;
        use std::thread;

        let cache = Arc::new(LruCache::new(16));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..100 {
                        cache.put(t * 1000 + i, i);
                        assert!(cache.len() <= 16);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 16);
    }
}
