//! Mini Cache - in-process caching primitives
//!
//! Provides an LRU cache, a sliding-expiry time cache with background sweeps
//! and lifecycle events, a TLRU cache composed of both, a file cache, and a
//! registry that shares one instance per constructor configuration.

pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod singleton;
pub mod tasks;

pub use cache::{CacheStats, FileCache, LruCache, TimeCache, TlruCache};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use events::{CacheEvent, CacheEventKind, EventData, SubscriptionId};
pub use singleton::{ConstructorSingleton, CtorArgs, SingletonRegistry};
