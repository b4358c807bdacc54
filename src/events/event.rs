//! Cache Event Types
//!
//! Named lifecycle events raised by the time-based caches.

use std::fmt;

// == Event Kind ==
/// Every lifecycle event a cache can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheEventKind {
    /// Before a new key is stored (cancellable)
    ItemAdding,
    /// After a new key was stored
    ItemAdded,
    /// Before an existing key is overwritten (cancellable)
    ItemUpdating,
    /// After an existing key was overwritten
    ItemUpdated,
    /// Before a key is removed (cancellable)
    ItemRemoving,
    /// After a key was removed
    ItemRemoved,
    /// After a sweep removed one or more expired keys
    ItemsExpired,
    /// The background sweep was scheduled
    TimerStarted,
    /// The background sweep was cancelled
    TimerStopped,
}

impl CacheEventKind {
    pub const ALL: [CacheEventKind; 9] = [
        CacheEventKind::ItemAdding,
        CacheEventKind::ItemAdded,
        CacheEventKind::ItemUpdating,
        CacheEventKind::ItemUpdated,
        CacheEventKind::ItemRemoving,
        CacheEventKind::ItemRemoved,
        CacheEventKind::ItemsExpired,
        CacheEventKind::TimerStarted,
        CacheEventKind::TimerStopped,
    ];

    /// Wire name of the event.
    pub fn name(self) -> &'static str {
        match self {
            CacheEventKind::ItemAdding => "cache_item_adding",
            CacheEventKind::ItemAdded => "cache_item_added",
            CacheEventKind::ItemUpdating => "cache_item_updating",
            CacheEventKind::ItemUpdated => "cache_item_updated",
            CacheEventKind::ItemRemoving => "cache_item_removing",
            CacheEventKind::ItemRemoved => "cache_item_removed",
            CacheEventKind::ItemsExpired => "cache_items_expired",
            CacheEventKind::TimerStarted => "time_cache_timer_started",
            CacheEventKind::TimerStopped => "time_cache_timer_stopped",
        }
    }

    /// Whether a handler may veto the operation.
    pub fn is_cancellable(self) -> bool {
        matches!(
            self,
            CacheEventKind::ItemAdding | CacheEventKind::ItemUpdating | CacheEventKind::ItemRemoving
        )
    }
}

impl fmt::Display for CacheEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// == Event Data ==
/// Payload carried by an event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventData<K, V> {
    /// Item events. `value` is the incoming value for add/update and the
    /// stored value for remove.
    Item { key: K, value: Option<V> },
    /// Keys dropped by one sweep
    Expired { keys: Vec<K> },
    /// Timer transitions, with the sweep interval in seconds
    Timer { interval: f64 },
}

// == Cache Event ==
/// An event passed to subscribers.
///
/// Handlers receive it mutably so cancellable events can be vetoed with
/// [`CacheEvent::cancel`].
#[derive(Debug, Clone)]
pub struct CacheEvent<K, V> {
    source: &'static str,
    kind: CacheEventKind,
    data: EventData<K, V>,
    cancelled: bool,
}

impl<K, V> CacheEvent<K, V> {
    pub fn new(source: &'static str, kind: CacheEventKind, data: EventData<K, V>) -> Self {
        Self {
            source,
            kind,
            data,
            cancelled: false,
        }
    }

    /// Name of the cache type that raised the event.
    pub fn source(&self) -> &'static str {
        self.source
    }

    pub fn kind(&self) -> CacheEventKind {
        self.kind
    }

    pub fn data(&self) -> &EventData<K, V> {
        &self.data
    }

    /// Key of an item event.
    pub fn key(&self) -> Option<&K> {
        match &self.data {
            EventData::Item { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Keys of an expiry event.
    pub fn expired_keys(&self) -> &[K] {
        match &self.data {
            EventData::Expired { keys } => keys,
            _ => &[],
        }
    }

    /// Requests cancellation. Ignored for events that cannot be cancelled;
    /// returns whether the request was honoured.
    pub fn cancel(&mut self) -> bool {
        if self.kind.is_cancellable() {
            self.cancelled = true;
        }
        self.cancelled
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}
