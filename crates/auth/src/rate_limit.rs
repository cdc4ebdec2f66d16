//! Authentication attempt throttling.
//!
//! Checked before any credential lookup or hashing work so a credential
//! stuffing run cannot turn into a CPU-bound hashing run.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// Default attempts allowed per key per window.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default window length in seconds.
pub const DEFAULT_WINDOW_SECONDS: i64 = 60;

#[derive(Debug, Copy, Clone)]
struct Window {
    started_at: DateTime<Utc>,
    count: u32,
}

/// Fixed-window attempt counter keyed by client identifier (IP or account).
///
/// Counters reset independently per key once the key's window elapses; keys
/// never interfere with each other. Time is passed in explicitly so behavior
/// is deterministic under test.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    max_attempts: u32,
    window: Duration,
    slots: Mutex<HashMap<String, Window>>,
}

impl FixedWindowLimiter {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(
            DEFAULT_MAX_ATTEMPTS,
            Duration::seconds(DEFAULT_WINDOW_SECONDS),
        )
    }

    /// Register one attempt for `key`; returns whether it may proceed.
    ///
    /// Bounded-time: one map lookup under a short-lived lock.
    pub fn allow(&self, key: &str, now: DateTime<Utc>) -> bool {
        let mut slots = match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let window = slots.entry(key.to_string()).or_insert(Window {
            started_at: now,
            count: 0,
        });

        if now - window.started_at >= self.window {
            window.started_at = now;
            window.count = 0;
        }

        if window.count >= self.max_attempts {
            return false;
        }
        window.count += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
    }

    #[test]
    fn allows_up_to_threshold_then_blocks() {
        let limiter = FixedWindowLimiter::new(3, Duration::seconds(60));

        assert!(limiter.allow("10.0.0.1", ts(0)));
        assert!(limiter.allow("10.0.0.1", ts(1)));
        assert!(limiter.allow("10.0.0.1", ts(2)));
        assert!(!limiter.allow("10.0.0.1", ts(3)));
        assert!(!limiter.allow("10.0.0.1", ts(59)));
    }

    #[test]
    fn window_elapse_resets_the_counter() {
        let limiter = FixedWindowLimiter::new(2, Duration::seconds(60));

        assert!(limiter.allow("k", ts(0)));
        assert!(limiter.allow("k", ts(1)));
        assert!(!limiter.allow("k", ts(2)));

        assert!(limiter.allow("k", ts(60)));
        assert!(limiter.allow("k", ts(61)));
        assert!(!limiter.allow("k", ts(62)));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = FixedWindowLimiter::new(1, Duration::seconds(60));

        assert!(limiter.allow("a", ts(0)));
        assert!(!limiter.allow("a", ts(1)));
        assert!(limiter.allow("b", ts(2)));
        assert!(!limiter.allow("b", ts(3)));
    }
}
