//! Per-client window state.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::counter::FixedWindowCounter;
use super::sliding::SlidingLog;

/// Windowing algorithm used for every client of a limiter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Trailing window over a log of request timestamps
    #[default]
    SlidingLog,
    /// Counter that resets once per elapsed window
    FixedWindow,
}

#[derive(Debug)]
enum WindowState {
    Sliding(SlidingLog),
    Fixed(FixedWindowCounter),
}

/// Rate limit state for a single client key.
///
/// Always accessed through the limiter's per-key mutex.
#[derive(Debug)]
pub struct ClientWindow {
    state: WindowState,
    /// Set once the window has been evicted from the registry
    retired: bool,
}

impl ClientWindow {
    /// Create an empty window for the given algorithm.
    pub fn new(algorithm: Algorithm) -> Self {
        let state = match algorithm {
            Algorithm::SlidingLog => WindowState::Sliding(SlidingLog::new()),
            Algorithm::FixedWindow => WindowState::Fixed(FixedWindowCounter::new()),
        };
        Self {
            state,
            retired: false,
        }
    }

    /// Record a request and return the number of requests counted in the
    /// current window, this one included.
    pub fn record(&mut self, now: Instant, window: Duration) -> usize {
        match &mut self.state {
            WindowState::Sliding(log) => log.record(now, window),
            WindowState::Fixed(counter) => counter.record(now, window),
        }
    }

    /// Requests currently counted.
    pub fn len(&self) -> usize {
        match &self.state {
            WindowState::Sliding(log) => log.len(),
            WindowState::Fixed(counter) => counter.current_count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Time of the most recent request, if any.
    pub fn last_seen(&self) -> Option<Instant> {
        match &self.state {
            WindowState::Sliding(log) => log.last_recorded(),
            WindowState::Fixed(counter) => counter.last_seen(),
        }
    }

    pub fn is_retired(&self) -> bool {
        self.retired
    }

    pub(crate) fn retire(&mut self) {
        self.retired = true;
    }
}
