//! Configuration Module
//!
//! Cache sizing and lifetime settings, loadable from environment variables
//! or from a host application's serialized settings.

use std::env;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::cache::{LruCache, TimeCache, TlruCache};
use crate::error::Result;
use crate::singleton::CtorArgs;

/// Default maximum number of LRU entries
pub const DEFAULT_CAPACITY: usize = 50;

/// Default entry lifetime in seconds
pub const DEFAULT_SECONDS: f64 = 300.0;

/// Default interval between expiry sweeps in seconds
pub const DEFAULT_CLEANUP_INTERVAL: f64 = 300.0;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible
/// defaults. Missing fields in serialized form fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of entries an LRU-bounded cache can hold
    pub capacity: usize,
    /// Entry lifetime in seconds
    pub seconds: f64,
    /// Background sweep interval in seconds, 0 disables the sweep
    pub cleanup_interval: f64,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Maximum LRU entries (default: 50)
    /// - `CACHE_SECONDS` - Entry lifetime in seconds (default: 300)
    /// - `CACHE_CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 300)
    pub fn from_env() -> Self {
        Self {
            capacity: env::var("CACHE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CAPACITY),
            seconds: env::var("CACHE_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SECONDS),
            cleanup_interval: env::var("CACHE_CLEANUP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CLEANUP_INTERVAL),
        }
    }

    /// Parses a JSON settings fragment.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Canonical singleton arguments for this configuration.
    pub fn to_args(&self) -> CtorArgs {
        CtorArgs::new()
            .kwarg("capacity", self.capacity)
            .kwarg("cleanup_interval", self.cleanup_interval)
            .kwarg("seconds", self.seconds)
    }

    pub fn build_lru<K, V>(&self) -> LruCache<K, V>
    where
        K: Hash + Eq + Clone,
        V: Clone,
    {
        LruCache::new(self.capacity)
    }

    pub fn build_time_cache<K, V>(&self) -> TimeCache<K, V>
    where
        K: Hash + Eq + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        TimeCache::new(self.seconds, self.cleanup_interval)
    }

    pub fn build_tlru<K, V>(&self) -> TlruCache<K, V>
    where
        K: Hash + Eq + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        TlruCache::new(self.capacity, self.seconds)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            seconds: DEFAULT_SECONDS,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
        }
    }
}
