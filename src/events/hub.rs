//! Event Hub
//!
//! Ordered per-event handler lists with explicit subscription handles.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::events::{CacheEvent, CacheEventKind};

/// Callback invoked with the raised event.
pub type EventHandler<K, V> = Arc<dyn Fn(&mut CacheEvent<K, V>) + Send + Sync>;

/// Handle returned by [`EventHub::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription<K, V> {
    id: SubscriptionId,
    kind: CacheEventKind,
    handler: EventHandler<K, V>,
}

// == Event Hub ==
/// Handlers fire in subscription order. The handler list is copied before
/// dispatch, so handlers may subscribe or unsubscribe while running.
pub struct EventHub<K, V> {
    subscriptions: RwLock<Vec<Subscription<K, V>>>,
    next_id: AtomicU64,
}

impl<K, V> Default for EventHub<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for EventHub<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHub")
            .field("subscriptions", &self.subscriptions.read().len())
            .finish()
    }
}

impl<K, V> EventHub<K, V> {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn subscribe<F>(&self, kind: CacheEventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&mut CacheEvent<K, V>) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscriptions.write().push(Subscription {
            id,
            kind,
            handler: Arc::new(handler),
        });
        id
    }

    /// Returns `false` when the subscription was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.subscriptions.write();
        let before = subscriptions.len();
        subscriptions.retain(|sub| sub.id != id);
        subscriptions.len() != before
    }

    #[cfg(test)]
    fn handler_count(&self, kind: CacheEventKind) -> usize {
        self.subscriptions
            .read()
            .iter()
            .filter(|sub| sub.kind == kind)
            .count()
    }

    pub fn has_handlers(&self, kind: CacheEventKind) -> bool {
        self.subscriptions.read().iter().any(|sub| sub.kind == kind)
    }

    // == Trigger ==
    /// Runs every handler subscribed to the event's kind.
    pub fn trigger(&self, event: &mut CacheEvent<K, V>) {
        let handlers: Vec<EventHandler<K, V>> = self
            .subscriptions
            .read()
            .iter()
            .filter(|sub| sub.kind == event.kind())
            .map(|sub| Arc::clone(&sub.handler))
            .collect();

        for handler in handlers {
            handler(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventData;
    use parking_lot::Mutex;

    fn item_event(kind: CacheEventKind) -> CacheEvent<&'static str, i32> {
        CacheEvent::new("test", kind, EventData::Item { key: "k", value: Some(1) })
    }

    #[test]
    fn test_handlers_fire_in_order_for_matching_kind() {
        let hub: EventHub<&str, i32> = EventHub::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let seen = Arc::clone(&seen);
            hub.subscribe(CacheEventKind::ItemAdded, move |_| seen.lock().push(tag));
        }
        let other = Arc::clone(&seen);
        hub.subscribe(CacheEventKind::ItemRemoved, move |_| other.lock().push("removed"));

        hub.trigger(&mut item_event(CacheEventKind::ItemAdded));
        assert_eq!(*seen.lock(), vec!["first", "second"]);
    }

    #[test]
    fn test_unsubscribe() {
        let hub: EventHub<&str, i32> = EventHub::new();
        let id = hub.subscribe(CacheEventKind::ItemAdding, |event| {
            event.cancel();
        });
        assert_eq!(hub.handler_count(CacheEventKind::ItemAdding), 1);

        assert!(hub.unsubscribe(id));
        assert!(!hub.unsubscribe(id));
        assert!(!hub.has_handlers(CacheEventKind::ItemAdding));

        let mut event = item_event(CacheEventKind::ItemAdding);
        hub.trigger(&mut event);
        assert!(!event.is_cancelled());
    }

    #[test]
    fn test_handler_can_cancel() {
        let hub: EventHub<&str, i32> = EventHub::new();
        hub.subscribe(CacheEventKind::ItemRemoving, |event| {
            event.cancel();
        });

        let mut event = item_event(CacheEventKind::ItemRemoving);
        hub.trigger(&mut event);
        assert!(event.is_cancelled());
    }

    #[test]
    fn test_handler_may_subscribe_during_dispatch() {
        let hub: Arc<EventHub<&str, i32>> = Arc::new(EventHub::new());
        let inner = Arc::clone(&hub);
        hub.subscribe(CacheEventKind::ItemAdded, move |_| {
            inner.subscribe(CacheEventKind::ItemAdded, |_| {});
        });

        hub.trigger(&mut item_event(CacheEventKind::ItemAdded));
        assert_eq!(hub.handler_count(CacheEventKind::ItemAdded), 2);
    }
}
