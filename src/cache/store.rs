//! Time Store Module
//!
//! Entry map with sliding expiry. Holds no lock itself; `TimeCache` wraps it
//! in a mutex and layers events and the sweep task on top.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use chrono::{DateTime, Duration, Utc};

use crate::cache::{CacheStats, TimedEntry};

// == Time Store ==
#[derive(Debug)]
pub struct TimeStore<K, V> {
    entries: HashMap<K, TimedEntry<V>>,
    lifetime: Duration,
    stats: CacheStats,
}

impl<K, V> TimeStore<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    pub fn new(lifetime: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            lifetime,
            stats: CacheStats::new(),
        }
    }

    pub fn set_lifetime(&mut self, lifetime: Duration) {
        self.lifetime = lifetime;
    }

    // == Get ==
    /// Returns the value and slides its expiry window.
    ///
    /// An expired entry is dropped and reported as a miss.
    pub fn get<Q>(&mut self, key: &Q, now: DateTime<Utc>) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let value = if self.drop_if_expired(key, now) {
            None
        } else {
            self.entries.get_mut(key).map(|entry| {
                entry.touch(now);
                entry.value.clone()
            })
        };
        self.stats.record_lookup(value.is_some());
        value
    }

    // == Contains ==
    /// Checks for a live entry without sliding its window.
    pub fn contains<Q>(&mut self, key: &Q, now: DateTime<Utc>) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        !self.drop_if_expired(key, now) && self.entries.contains_key(key)
    }

    // == Insert ==
    /// Stores a value touched at `now`, returning the previous value.
    pub fn insert(&mut self, key: K, value: V, now: DateTime<Utc>) -> Option<V> {
        let mut entry = TimedEntry::new(value);
        entry.touch(now);
        self.entries.insert(key, entry).map(|old| old.value)
    }

    /// Copies out the key and value of a live entry without sliding its
    /// window. An expired entry is dropped and reported as absent.
    pub fn peek<Q>(&mut self, key: &Q, now: DateTime<Utc>) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if self.drop_if_expired(key, now) {
            return None;
        }
        self.entries
            .get_key_value(key)
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
    }

    // == Remove ==
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.remove(key).map(|entry| entry.value)
    }

    // == Cleanup Expired ==
    /// Removes every entry whose age has reached the lifetime.
    ///
    /// Returns the removed keys.
    pub fn cleanup_expired(&mut self, now: DateTime<Utc>) -> Vec<K> {
        let lifetime = self.lifetime;
        let expired: Vec<K> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(lifetime, now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.entries.remove(key);
        }
        self.stats.record_expirations(expired.len());
        expired
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.entries.len())
    }

    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    fn drop_if_expired<Q>(&mut self, key: &Q, now: DateTime<Utc>) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let expired = self
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_expired_at(self.lifetime, now));
        if expired {
            self.entries.remove(key);
            self.stats.record_expirations(1);
        }
        expired
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> TimeStore<&'static str, i32> {
        TimeStore::new(Duration::seconds(10))
    }

    #[test]
    fn test_store_insert_and_get() {
        let mut store = store();
        let now = Utc::now();

        assert_eq!(store.insert("key1", 1, now), None);
        assert_eq!(store.get(&"key1", now), Some(1));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_overwrite() {
        let mut store = store();
        let now = Utc::now();

        store.insert("key1", 1, now);
        assert_eq!(store.insert("key1", 2, now), Some(1));
        assert_eq!(store.get(&"key1", now), Some(2));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_expired_is_miss() {
        let mut store = store();
        let now = Utc::now();
        store.insert("key1", 1, now);

        assert_eq!(store.get(&"key1", now + Duration::seconds(10)), None);
        assert!(store.is_empty());

        let stats = store.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.expirations, 1);
    }

    #[test]
    fn test_store_get_slides_window() {
        let mut store = store();
        let t0 = Utc::now();
        store.insert("key1", 1, t0);

        let t1 = t0 + Duration::seconds(8);
        assert_eq!(store.get(&"key1", t1), Some(1));
        assert_eq!(store.get(&"key1", t0 + Duration::seconds(15)), Some(1));
        assert_eq!(store.get(&"key1", t1 + Duration::seconds(20)), None);
    }

    #[test]
    fn test_store_contains_does_not_slide() {
        let mut store = store();
        let t0 = Utc::now();
        store.insert("key1", 1, t0);

        assert!(store.contains(&"key1", t0 + Duration::seconds(9)));
        assert!(!store.contains(&"key1", t0 + Duration::seconds(10)));
    }

    #[test]
    fn test_store_remove() {
        let mut store = store();
        store.insert("key1", 1, Utc::now());

        assert_eq!(store.remove(&"key1"), Some(1));
        assert_eq!(store.remove(&"key1"), None);
    }

    #[test]
    fn test_store_peek() {
        let mut store = store();
        let t0 = Utc::now();
        store.insert("key1", 1, t0);

        assert_eq!(store.peek(&"key1", t0), Some(("key1", 1)));
        assert_eq!(store.peek(&"missing", t0), None);

        // peek does not slide the window
        assert_eq!(store.peek(&"key1", t0 + Duration::seconds(10)), None);
        assert!(store.is_empty());
        assert_eq!(store.stats().expirations, 1);
    }

    #[test]
    fn test_store_cleanup_expired() {
        let mut store = store();
        let t0 = Utc::now();
        store.insert("old", 1, t0);
        store.insert("fresh", 2, t0 + Duration::seconds(5));

        let removed = store.cleanup_expired(t0 + Duration::seconds(10));
        assert_eq!(removed, vec!["old"]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.stats().expirations, 1);
    }

    #[test]
    fn test_store_cleanup_after_lifetime_change() {
        let mut store = store();
        let t0 = Utc::now();
        store.insert("key1", 1, t0);

        store.set_lifetime(Duration::seconds(1));
        assert_eq!(store.cleanup_expired(t0 + Duration::seconds(2)), vec!["key1"]);
    }
}
