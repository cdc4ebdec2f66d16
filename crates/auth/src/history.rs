use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of login timestamps retained per worker.
pub const LOGIN_HISTORY_CAPACITY: usize = 10;

/// Bounded record of a worker's most recent successful logins.
///
/// # Invariants
/// - Never holds more than [`LOGIN_HISTORY_CAPACITY`] entries; the oldest is
///   evicted at the write site, not truncated after the fact.
/// - Entries are kept in timestamp order even when appends arrive out of
///   order (concurrent logins racing on the commit).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginHistory {
    entries: VecDeque<DateTime<Utc>>,
}

impl LoginHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one successful login.
    ///
    /// Each call is a genuine login event; callers serialize concurrent calls
    /// for the same worker (per-row lock) so nothing is lost or duplicated.
    /// Once full, the history keeps exactly the most recent logins: an entry
    /// older than everything retained is dropped instead of evicting a newer
    /// one (late commits racing an already-full ring).
    pub fn record(&mut self, at: DateTime<Utc>) {
        if self.entries.len() == LOGIN_HISTORY_CAPACITY {
            match self.entries.front() {
                Some(&oldest) if at < oldest => return,
                _ => {
                    self.entries.pop_front();
                }
            }
        }

        // Insertion sort from the back: appends are almost always newest-last.
        let pos = self
            .entries
            .iter()
            .rposition(|&existing| existing <= at)
            .map_or(0, |p| p + 1);
        self.entries.insert(pos, at);
    }

    /// Logins in chronological order, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        self.entries.iter().copied()
    }

    pub fn latest(&self) -> Option<DateTime<Utc>> {
        self.entries.back().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
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
    fn record_appends_in_order() {
        let mut history = LoginHistory::new();
        history.record(ts(1));
        history.record(ts(2));
        history.record(ts(3));

        let got: Vec<_> = history.entries().collect();
        assert_eq!(got, vec![ts(1), ts(2), ts(3)]);
        assert_eq!(history.latest(), Some(ts(3)));
    }

    #[test]
    fn capacity_evicts_oldest_first() {
        let mut history = LoginHistory::new();
        for i in 0..15 {
            history.record(ts(i));
        }

        assert_eq!(history.len(), LOGIN_HISTORY_CAPACITY);
        let got: Vec<_> = history.entries().collect();
        let expected: Vec<_> = (5..15).map(ts).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn stale_entry_arriving_after_full_is_dropped() {
        let mut history = LoginHistory::new();
        for i in 10..20 {
            history.record(ts(i));
        }

        history.record(ts(3));

        assert_eq!(history.len(), LOGIN_HISTORY_CAPACITY);
        let got: Vec<_> = history.entries().collect();
        let expected: Vec<_> = (10..20).map(ts).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn out_of_order_appends_stay_chronological() {
        let mut history = LoginHistory::new();
        history.record(ts(10));
        history.record(ts(5));
        history.record(ts(7));

        let got: Vec<_> = history.entries().collect();
        assert_eq!(got, vec![ts(5), ts(7), ts(10)]);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: the history is always bounded and sorted, whatever
            /// the arrival order of timestamps.
            #[test]
            fn bounded_and_sorted(offsets in proptest::collection::vec(0i64..3600, 0..40)) {
                let mut history = LoginHistory::new();
                for o in &offsets {
                    history.record(ts(*o));
                }

                prop_assert!(history.len() <= LOGIN_HISTORY_CAPACITY);
                prop_assert_eq!(history.len(), offsets.len().min(LOGIN_HISTORY_CAPACITY));

                let got: Vec<_> = history.entries().collect();
                let mut sorted = got.clone();
                sorted.sort();
                prop_assert_eq!(got, sorted);
            }
        }
    }
}
