//! Timed Entry Module
//!
//! Value plus last-touched timestamp, used by the sliding-expiry cache.

use chrono::{DateTime, Duration, Utc};

// == Timed Entry ==
/// A stored value and the UTC instant it was last written or read.
#[derive(Debug, Clone)]
pub struct TimedEntry<V> {
    /// The stored value
    pub value: V,
    /// Last successful access (write or read)
    pub touched_at: DateTime<Utc>,
}

impl<V> TimedEntry<V> {
    /// Creates an entry touched now.
    pub fn new(value: V) -> Self {
        Self {
            value,
            touched_at: Utc::now(),
        }
    }

    /// Slides the expiry window forward to `now`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.touched_at = now;
    }

    // == Is Expired ==
    /// Checks the entry against `lifetime` at instant `now`.
    ///
    /// Boundary condition: an entry whose age equals its lifetime is expired.
    pub fn is_expired_at(&self, lifetime: Duration, now: DateTime<Utc>) -> bool {
        now - self.touched_at >= lifetime
    }
}

// == Utility Functions ==
/// Converts a lifetime in (fractional) seconds to a duration.
///
/// Negative and NaN inputs map to zero; huge inputs saturate.
pub fn lifetime_from_secs(seconds: f64) -> Duration {
    if seconds.is_nan() || seconds <= 0.0 {
        return Duration::zero();
    }
    // chrono durations are bounded to i64 milliseconds
    let max_micros = (i64::MAX / 1_000) as f64;
    let micros = (seconds * 1_000_000.0).min(max_micros);
    Duration::microseconds(micros as i64)
}
