//! Cache Module
//!
//! In-process caches: plain LRU, sliding-expiry time cache, the composite
//! TLRU cache, and a directory-backed file cache.

mod entry;
mod file_cache;
mod lru;
mod lru_cache;
mod stats;
mod store;
mod time_cache;
mod tlru;


// Re-export public types
pub use entry::{lifetime_from_secs, TimedEntry};
pub use file_cache::FileCache;
pub use lru::{Iter, LruList};
pub use lru_cache::LruCache;
pub use stats::CacheStats;
pub use store::TimeStore;
pub use time_cache::TimeCache;
pub use tlru::TlruCache;
