//! Background Tasks Module
//!
//! Contains background tasks that run periodically while a cache is alive.
//!
//! # Tasks
//! - Expiry sweep: removes expired time-cache entries at a configured interval

mod sweep;

pub use sweep::SweepTask;
