//! Sliding-window request log.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Arrival times of recent requests from one client, oldest first.
#[derive(Debug, Default)]
pub struct SlidingLog {
    timestamps: VecDeque<Instant>,
}

impl SlidingLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request at `now`, drop everything that fell out of `window`
    /// and return how many requests remain.
    ///
    /// The new timestamp is kept even if the caller ends up rejecting the
    /// request, so rejected traffic keeps counting against the client.
    pub fn record(&mut self, now: Instant, window: Duration) -> usize {
        self.timestamps.push_back(now);
        self.prune(now, window);
        self.timestamps.len()
    }

    /// Pop expired entries off the front.
    ///
    /// Stops at the first entry still inside the window. An entry later than
    /// `now` (the clock went backwards) has an age of zero and stops the scan.
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(&oldest) = self.timestamps.front() {
            if now.saturating_duration_since(oldest) <= window {
                break;
            }
            self.timestamps.pop_front();
        }
    }

    /// Number of retained timestamps.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Time of the most recently recorded request.
    pub fn last_recorded(&self) -> Option<Instant> {
        self.timestamps.back().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(60);

    #[test]
    fn test_record_counts_requests_in_window() {
        let start = Instant::now();
        let mut log = SlidingLog::new();

        assert_eq!(log.record(start, WINDOW), 1);
        assert_eq!(log.record(start + Duration::from_secs(10), WINDOW), 2);
        assert_eq!(log.record(start + Duration::from_secs(20), WINDOW), 3);
    }

    #[test]
    fn test_entry_exactly_window_old_is_kept() {
        let start = Instant::now();
        let mut log = SlidingLog::new();

        log.record(start, WINDOW);
        // Age equal to the window is not "older than" the window
        assert_eq!(log.record(start + WINDOW, WINDOW), 2);
        // One nanosecond later the first entry is gone
        assert_eq!(
            log.record(start + WINDOW + Duration::from_nanos(1), WINDOW),
            2
        );
    }

    #[test]
    fn test_prune_stops_at_first_live_entry() {
        let start = Instant::now();
        let mut log = SlidingLog::new();

        log.record(start, WINDOW);
        log.record(start + Duration::from_secs(30), WINDOW);
        log.record(start + Duration::from_secs(50), WINDOW);

        let count = log.record(start + Duration::from_secs(85), WINDOW);
        assert_eq!(count, 3);
        assert_eq!(log.last_recorded(), Some(start + Duration::from_secs(85)));
    }

    #[test]
    fn test_backward_clock_keeps_out_of_order_entry() {
        let start = Instant::now();
        let mut log = SlidingLog::new();

        log.record(start + Duration::from_secs(10), WINDOW);
        // Earlier than the newest entry: nothing is pruned, nothing panics
        assert_eq!(log.record(start, WINDOW), 2);
        assert_eq!(log.last_recorded(), Some(start));

        // A later in-order request clears the stale prefix again
        assert_eq!(log.record(start + Duration::from_secs(200), WINDOW), 1);
    }

    #[test]
    fn test_retained_never_exceeds_calls_in_trailing_window() {
        let start = Instant::now();
        let mut log = SlidingLog::new();
        let calls: Vec<Instant> = (0..200u64)
            .map(|i| start + Duration::from_secs(i * 7))
            .collect();

        for (i, &now) in calls.iter().enumerate() {
            let retained = log.record(now, WINDOW);
            let in_window = calls[..=i]
                .iter()
                .filter(|&&t| now.saturating_duration_since(t) <= WINDOW)
                .count();
            assert_eq!(retained, in_window);
        }
    }

    #[test]
    fn test_empty_log() {
        let log = SlidingLog::new();
        assert!(log.is_empty());
        assert_eq!(log.len(), 0);
        assert_eq!(log.last_recorded(), None);
    }
}
