//! Events Module
//!
//! Typed lifecycle events and the subscription hub the caches raise them on.
//!
//! # Events
//! - `cache_item_adding` / `cache_item_added`
//! - `cache_item_updating` / `cache_item_updated`
//! - `cache_item_removing` / `cache_item_removed`
//! - `cache_items_expired`
//! - `time_cache_timer_started` / `time_cache_timer_stopped`

mod event;
mod hub;

pub use event::{CacheEvent, CacheEventKind, EventData};
pub use hub::{EventHandler, EventHub, SubscriptionId};
