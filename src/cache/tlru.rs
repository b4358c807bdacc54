//! TLRU Cache Module
//!
//! Time-aware LRU: bounds both entry count and staleness by composing an
//! `LruCache` with a `TimeCache`.

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use tracing::debug;

use crate::cache::{LruCache, TimeCache};
use crate::config::{DEFAULT_CAPACITY, DEFAULT_SECONDS};
use crate::error::Result;
use crate::events::CacheEventKind;
use crate::singleton::{ConstructorSingleton, KwArgs};

/// Longest sweep interval used for the time side, in seconds.
const MAX_SWEEP_INTERVAL: f64 = 10.0;

// == TLRU Cache ==
/// Values live in a `TimeCache`; an `LruCache` of unit markers tracks
/// recency and enforces the capacity.
///
/// A key is present only when both sides hold it. Any divergence is treated
/// as a miss and the stale side is cleaned up on that access. Sweeps of the
/// time side remove the matching LRU markers through an event handler.
///
/// # Example
/// ```
/// use mini_cache::TlruCache;
///
/// let cache = TlruCache::new(2, 60.0);
/// cache.put("x", "X");
/// assert_eq!(cache.get(&"x"), Some("X"));
/// ```
pub struct TlruCache<K, V> {
    lru: Arc<LruCache<K, ()>>,
    time: TimeCache<K, V>,
}

impl<K, V> TlruCache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a cache holding at most `capacity` entries, each living
    /// `seconds` after its last access. The time side is swept every
    /// `min(seconds, 10)` seconds.
    pub fn new(capacity: usize, seconds: f64) -> Self {
        let lru = Arc::new(LruCache::new(capacity));
        let time = TimeCache::new(seconds, seconds.min(MAX_SWEEP_INTERVAL));

        let tracker = Arc::clone(&lru);
        time.subscribe(CacheEventKind::ItemsExpired, move |event| {
            for key in event.expired_keys() {
                tracker.remove(key);
            }
            debug!(
                "TLRU dropped {} expired keys from recency tracking",
                event.expired_keys().len()
            );
        });

        Self { lru, time }
    }

    // == Put ==
    /// Stores the value and marks the key most recently used.
    ///
    /// When the capacity is exceeded the least recently used key is removed
    /// from both sides.
    pub fn put(&self, key: K, value: V) {
        self.time.put(key.clone(), value);
        if let Some((evicted, ())) = self.lru.put(key, ()) {
            self.time.remove(&evicted);
        }
    }

    // == Get ==
    /// Returns the value if both sides hold the key, refreshing recency.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if !self.lru.contains_key(key) {
            self.time.remove(key);
            return None;
        }

        match self.time.get(key) {
            Some(value) => {
                self.lru.get(key);
                Some(value)
            }
            None => {
                self.lru.remove(key);
                None
            }
        }
    }

    // == Remove ==
    /// Removes the key from both sides. Absent keys are a no-op.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let value = self.time.remove(key);
        self.lru.remove(key);
        value
    }

    /// Checks both sides without refreshing either.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.lru.contains_key(key) && self.time.contains_key(key)
    }

    /// Sweeps the time side now. Returns the expired keys.
    pub fn clear_expired(&self) -> Vec<K> {
        self.time.clear_expired()
    }

    pub fn clear(&self) {
        self.lru.clear();
        self.time.clear();
    }

    /// Number of keys present on both sides.
    pub fn len(&self) -> usize {
        self.lru
            .keys()
            .iter()
            .filter(|key| self.time.contains_key(*key))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lru.capacity()
    }

    pub fn seconds(&self) -> f64 {
        self.time.seconds()
    }
}

impl<K, V> fmt::Debug for TlruCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlruCache")
            .field("time", &self.time)
            .finish_non_exhaustive()
    }
}

impl<K, V> ConstructorSingleton for TlruCache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Reads `capacity` (default 50) and `seconds` (default 300).
    fn construct(kwargs: &KwArgs) -> Result<Self> {
        Ok(Self::new(
            kwargs.usize_or("capacity", DEFAULT_CAPACITY)?,
            kwargs.f64_or("seconds", DEFAULT_SECONDS)?,
        ))
    }
}
