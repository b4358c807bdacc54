//! Time Cache Module
//!
//! Sliding-expiry cache with a background sweep and lifecycle events.

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::cache::{lifetime_from_secs, CacheStats, TimeStore};
use crate::config::{DEFAULT_CLEANUP_INTERVAL, DEFAULT_SECONDS};
use crate::error::Result;
use crate::events::{CacheEvent, CacheEventKind, EventData, EventHub, SubscriptionId};
use crate::singleton::{ConstructorSingleton, KwArgs};
use crate::tasks::SweepTask;

const SOURCE: &str = "TimeCache";

#[derive(Debug, Clone, Copy)]
struct Settings {
    seconds: f64,
    cleanup_interval: f64,
}

impl Settings {
    fn sweep_enabled(&self) -> bool {
        self.seconds > 0.0 && self.cleanup_interval > 0.0
    }
}

/// State shared between the cache handle and its sweep thread.
struct Shared<K, V> {
    store: Mutex<TimeStore<K, V>>,
    settings: Mutex<Settings>,
    timer: Mutex<Option<SweepTask>>,
    events: EventHub<K, V>,
}

// == Time Cache ==
/// Cache whose entries expire `seconds` after their last access.
///
/// Every successful `get` slides the entry's deadline forward. With a
/// positive `cleanup_interval` a background thread sweeps expired entries
/// and raises `cache_items_expired`; otherwise expired entries are dropped
/// lazily when touched.
///
/// One mutex guards the entry map for every read and write. Event handlers
/// run outside that lock, so they may call back into the cache.
///
/// # Example
/// ```
/// use mini_cache::TimeCache;
///
/// let cache = TimeCache::new(10.0, 0.0);
/// cache.put("a", 1);
/// assert_eq!(cache.get(&"a"), Some(1));
/// cache.remove(&"a");
/// assert!(!cache.contains_key(&"a"));
/// ```
pub struct TimeCache<K, V> {
    shared: Arc<Shared<K, V>>,
}

impl<K, V> TimeCache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a cache and starts the sweep when both arguments are positive.
    ///
    /// # Arguments
    /// * `seconds` - Entry lifetime, negative values are clamped to 0
    /// * `cleanup_interval` - Seconds between sweeps, 0 disables the sweep
    pub fn new(seconds: f64, cleanup_interval: f64) -> Self {
        let seconds = clamp_secs(seconds);
        let cache = Self {
            shared: Arc::new(Shared {
                store: Mutex::new(TimeStore::new(lifetime_from_secs(seconds))),
                settings: Mutex::new(Settings {
                    seconds,
                    cleanup_interval,
                }),
                timer: Mutex::new(None),
                events: EventHub::new(),
            }),
        };
        cache.start_timer();
        cache
    }

    // == Get ==
    /// Returns the value and slides its expiry window. `None` on miss.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.shared.store.lock().get(key, Utc::now())
    }

    /// Checks for a live entry without sliding its window.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.shared.store.lock().contains(key, Utc::now())
    }

    // == Put ==
    /// Stores a value, raising add or update events.
    ///
    /// A new key raises `cache_item_adding` then `cache_item_added`; a live
    /// key raises `cache_item_updating` then `cache_item_updated`. Returns
    /// `false` when a handler cancelled the operation.
    pub fn put(&self, key: K, value: V) -> bool {
        let exists = self.shared.store.lock().contains(&key, Utc::now());
        let (before, after) = if exists {
            (CacheEventKind::ItemUpdating, CacheEventKind::ItemUpdated)
        } else {
            (CacheEventKind::ItemAdding, CacheEventKind::ItemAdded)
        };

        if self.shared.events.has_handlers(before) {
            let mut event = item_event(before, key.clone(), Some(value.clone()));
            self.shared.events.trigger(&mut event);
            if event.is_cancelled() {
                debug!("{} put cancelled by {} handler", SOURCE, before);
                return false;
            }
        }

        let has_after = self.shared.events.has_handlers(after);
        let notify = has_after.then(|| (key.clone(), value.clone()));
        self.shared.store.lock().insert(key, value, Utc::now());

        if let Some((key, value)) = notify {
            self.shared
                .events
                .trigger(&mut item_event(after, key, Some(value)));
        }
        true
    }

    // == Remove ==
    /// Removes a key, raising `cache_item_removing` then `cache_item_removed`.
    ///
    /// Absent or expired keys are a no-op and raise nothing. Returns the
    /// removed value, or `None` if absent, expired or cancelled.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let (stored_key, stored_value) = self.shared.store.lock().peek(key, Utc::now())?;

        if self.shared.events.has_handlers(CacheEventKind::ItemRemoving) {
            let mut event = item_event(
                CacheEventKind::ItemRemoving,
                stored_key.clone(),
                Some(stored_value),
            );
            self.shared.events.trigger(&mut event);
            if event.is_cancelled() {
                debug!("{} remove cancelled by handler", SOURCE);
                return None;
            }
        }

        let removed = self.shared.store.lock().remove(key)?;
        if self.shared.events.has_handlers(CacheEventKind::ItemRemoved) {
            self.shared.events.trigger(&mut item_event(
                CacheEventKind::ItemRemoved,
                stored_key,
                Some(removed.clone()),
            ));
        }
        Some(removed)
    }

    /// Drops every entry without raising item events.
    pub fn clear(&self) {
        self.shared.store.lock().clear();
    }

    // == Clear Expired ==
    /// Removes expired entries now and restarts the sweep countdown.
    ///
    /// Raises `cache_items_expired` on a worker thread (joined before
    /// returning) when anything expired. Returns the expired keys.
    pub fn clear_expired(&self) -> Vec<K> {
        let expired = self.shared.clear_expired();
        if let Some(task) = self.shared.timer.lock().as_ref() {
            task.reset();
        }
        expired
    }

    // == Timer ==
    /// Starts the background sweep.
    ///
    /// Returns `false` without doing anything if the sweep is already
    /// running or if `seconds` or `cleanup_interval` is not positive.
    pub fn start_timer(&self) -> bool {
        let settings = *self.shared.settings.lock();
        if !settings.sweep_enabled() {
            return false;
        }

        {
            let mut timer = self.shared.timer.lock();
            if timer.is_some() {
                return false;
            }

            let weak: Weak<Shared<K, V>> = Arc::downgrade(&self.shared);
            let interval = interval_from_secs(settings.cleanup_interval);
            let task = SweepTask::spawn(SOURCE, interval, move || match weak.upgrade() {
                Some(shared) => {
                    shared.clear_expired();
                    true
                }
                None => false,
            });

            match task {
                Ok(task) => *timer = Some(task),
                Err(err) => {
                    error!("Failed to spawn {} sweep thread: {}", SOURCE, err);
                    return false;
                }
            }
        }

        self.shared.events.trigger(&mut CacheEvent::new(
            SOURCE,
            CacheEventKind::TimerStarted,
            EventData::Timer {
                interval: settings.cleanup_interval,
            },
        ));
        true
    }

    /// Stops the background sweep. Returns `false` if it was not running.
    ///
    /// A sweep already in progress completes; no further sweep is scheduled.
    pub fn stop_timer(&self) -> bool {
        let Some(task) = self.shared.timer.lock().take() else {
            return false;
        };
        let interval = task.interval().as_secs_f64();
        task.cancel();

        self.shared.events.trigger(&mut CacheEvent::new(
            SOURCE,
            CacheEventKind::TimerStopped,
            EventData::Timer { interval },
        ));
        true
    }

    /// Whether a sweep thread is scheduled and still alive.
    pub fn is_timer_running(&self) -> bool {
        self.shared
            .timer
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    // == Settings ==
    /// Entry lifetime in seconds.
    pub fn seconds(&self) -> f64 {
        self.shared.settings.lock().seconds
    }

    /// Changes the entry lifetime and re-evaluates every entry against it.
    ///
    /// A non-positive lifetime stops the sweep; a positive one starts it
    /// again if the cleanup interval allows.
    pub fn set_seconds(&self, seconds: f64) {
        let seconds = clamp_secs(seconds);
        self.shared.settings.lock().seconds = seconds;
        self.shared
            .store
            .lock()
            .set_lifetime(lifetime_from_secs(seconds));

        self.clear_expired();
        if seconds > 0.0 {
            self.start_timer();
        } else {
            self.stop_timer();
        }
    }

    /// Seconds between background sweeps.
    pub fn cleanup_interval(&self) -> f64 {
        self.shared.settings.lock().cleanup_interval
    }

    /// Changes the sweep interval: positive (re)starts the sweep, zero or
    /// negative stops it.
    pub fn set_cleanup_interval(&self, cleanup_interval: f64) {
        self.shared.settings.lock().cleanup_interval = cleanup_interval;
        self.stop_timer();
        if cleanup_interval > 0.0 {
            self.start_timer();
        }
    }

    // == Events ==
    /// Registers a handler for one event kind.
    pub fn subscribe<F>(&self, kind: CacheEventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&mut CacheEvent<K, V>) + Send + Sync + 'static,
    {
        self.shared.events.subscribe(kind, handler)
    }

    /// Removes a handler. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.events.unsubscribe(id)
    }

    // == Size & Stats ==
    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.shared.store.lock().len()
    }

    /// Whether no entries are stored, expired or not.
    pub fn is_empty(&self) -> bool {
        self.shared.store.lock().is_empty()
    }

    /// Snapshot of hit, miss and expiration counters.
    pub fn stats(&self) -> CacheStats {
        self.shared.store.lock().stats()
    }

    /// Zeroes the counters. Entries are kept.
    pub fn reset_stats(&self) {
        self.shared.store.lock().reset_stats();
    }
}

impl<K, V> Shared<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// One sweep: delete under the lock, then notify outside it.
    fn clear_expired(&self) -> Vec<K> {
        let expired = self.store.lock().cleanup_expired(Utc::now());

        if expired.is_empty() {
            debug!("{} sweep: no expired entries found", SOURCE);
            return expired;
        }
        info!("{} sweep: removed {} expired entries", SOURCE, expired.len());

        if self.events.has_handlers(CacheEventKind::ItemsExpired) {
            self.dispatch_expired(expired.clone());
        }
        expired
    }

    /// Raises `cache_items_expired` on a worker thread and waits for it.
    ///
    /// A panicking handler is logged; it never escapes into the sweep.
    fn dispatch_expired(&self, keys: Vec<K>) {
        let mut event = CacheEvent::new(
            SOURCE,
            CacheEventKind::ItemsExpired,
            EventData::Expired { keys },
        );

        let dispatched = thread::scope(|scope| {
            let worker = thread::Builder::new()
                .name("time-cache-events".to_string())
                .spawn_scoped(scope, || self.events.trigger(&mut event));

            match worker {
                Ok(handle) => {
                    if handle.join().is_err() {
                        error!("{} handler panicked while handling expired items", SOURCE);
                    }
                    true
                }
                Err(err) => {
                    warn!("Failed to spawn {} event worker: {}", SOURCE, err);
                    false
                }
            }
        });

        if !dispatched {
            self.events.trigger(&mut event);
        }
    }
}

impl<K, V> Drop for TimeCache<K, V> {
    fn drop(&mut self) {
        // quiet shutdown: no timer event on drop
        if let Some(task) = self.shared.timer.lock().take() {
            task.cancel();
        }
    }
}

impl<K, V> fmt::Debug for TimeCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let settings = *self.shared.settings.lock();
        f.debug_struct("TimeCache")
            .field("seconds", &settings.seconds)
            .field("cleanup_interval", &settings.cleanup_interval)
            .field("timer", &self.shared.timer.lock().is_some())
            .finish()
    }
}

impl<K, V> ConstructorSingleton for TimeCache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Reads `seconds` (default 300) and `cleanup_interval` (default 300).
    fn construct(kwargs: &KwArgs) -> Result<Self> {
        Ok(Self::new(
            kwargs.f64_or("seconds", DEFAULT_SECONDS)?,
            kwargs.f64_or("cleanup_interval", DEFAULT_CLEANUP_INTERVAL)?,
        ))
    }
}

// == Utility Functions ==
fn item_event<K, V>(kind: CacheEventKind, key: K, value: Option<V>) -> CacheEvent<K, V> {
    CacheEvent::new(SOURCE, kind, EventData::Item { key, value })
}

fn clamp_secs(seconds: f64) -> f64 {
    if seconds.is_nan() || seconds < 0.0 {
        0.0
    } else {
        seconds
    }
}

fn interval_from_secs(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
}
