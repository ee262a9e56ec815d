//! Fixed-window rate limit counter.

use std::time::{Duration, Instant};

/// A counter that tracks requests within a fixed time window.
///
/// The window opens at the first request and resets wholesale once it has
/// fully elapsed. It is not synchronised on its own; the limiter keeps it
/// behind the per-client lock.
#[derive(Debug, Default)]
pub struct FixedWindowCounter {
    /// Requests seen in the current window, rejected ones included
    count: usize,
    /// When the current window started
    window_start: Option<Instant>,
    /// Most recent request time
    last_seen: Option<Instant>,
}

impl FixedWindowCounter {
    /// Create a counter with no open window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a request at `now` and return the count for the current window.
    pub fn record(&mut self, now: Instant, window: Duration) -> usize {
        self.maybe_reset_window(now, window);
        self.count += 1;
        self.last_seen = Some(now);
        self.count
    }

    /// Get the current count.
    pub fn current_count(&self) -> usize {
        self.count
    }

    /// Time of the most recently counted request.
    pub fn last_seen(&self) -> Option<Instant> {
        self.last_seen
    }

    /// Start a new window if there is none or the current one has elapsed.
    ///
    /// A `now` earlier than the window start counts as zero elapsed time, so
    /// a backward clock never resets the window.
    fn maybe_reset_window(&mut self, now: Instant, window: Duration) {
        let expired = match self.window_start {
            Some(start) => now.saturating_duration_since(start) >= window,
            None => true,
        };

        if expired {
            self.count = 0;
            self.window_start = Some(now);
        }
    }
}
