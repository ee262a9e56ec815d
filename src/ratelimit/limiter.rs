//! Core rate limiter implementation.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use super::window::{Algorithm, ClientWindow};

/// Default time window when no specific window is configured.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);
/// Default number of requests admitted per window.
pub const DEFAULT_MAX_REQUESTS: usize = 10;

/// Outcome of a single admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The request may continue down the pipeline
    Admit,
    /// The client is over its limit; the request must not be forwarded
    Reject,
}

impl Decision {
    pub fn is_admitted(self) -> bool {
        self == Decision::Admit
    }
}

/// Configuration for a rate limiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitConfig {
    /// Length of the window
    pub window: Duration,
    /// Maximum requests admitted per window
    pub max_requests: usize,
    /// How each client's window is kept
    pub algorithm: Algorithm,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            max_requests: DEFAULT_MAX_REQUESTS,
            algorithm: Algorithm::default(),
        }
    }
}

/// Per-client rate limiter.
///
/// Holds one window per client key. Lookups and first-time inserts go
/// through the sharded map; the append/prune/count step for a key runs
/// under that key's own mutex, so distinct clients never wait on each other.
///
/// The limiter is meant to be built once by the hosting process and shared
/// behind an `Arc`.
pub struct RateLimiter {
    /// Client windows indexed by client key
    windows: DashMap<String, Arc<Mutex<ClientWindow>>>,
    config: LimitConfig,
}

impl RateLimiter {
    /// Create a new rate limiter.
    pub fn new(config: LimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &LimitConfig {
        &self.config
    }

    /// Decide whether a request from `key` arriving at `now` is admitted.
    ///
    /// The request is recorded whatever the outcome. More than
    /// `max_requests` requests in the window means rejection; exactly
    /// `max_requests` is still admitted. An empty key is a key like any other.
    pub fn admit(&self, key: &str, now: Instant) -> Decision {
        let count = loop {
            let slot = self.window_for(key);
            let mut window = slot.lock();

            // Evicted between lookup and lock; the registry holds a fresh one.
            if window.is_retired() {
                continue;
            }

            break window.record(now, self.config.window);
        };

        if count > self.config.max_requests {
            debug!(
                key = %key,
                count = count,
                limit = self.config.max_requests,
                "Rate limit exceeded"
            );
            return Decision::Reject;
        }

        trace!(key = %key, count = count, "Request admitted");
        Decision::Admit
    }

    /// Fetch the window for `key`, creating it on first use.
    fn window_for(&self, key: &str) -> Arc<Mutex<ClientWindow>> {
        if let Some(existing) = self.windows.get(key) {
            return Arc::clone(existing.value());
        }

        let entry = self.windows.entry(key.to_owned()).or_insert_with(|| {
            debug!(
                key = %key,
                algorithm = ?self.config.algorithm,
                "Creating new client window"
            );
            Arc::new(Mutex::new(ClientWindow::new(self.config.algorithm)))
        });
        Arc::clone(entry.value())
    }

    /// Remove windows whose last request is more than `idle_after` before
    /// `now`. Returns how many were removed.
    ///
    /// Windows locked by an in-flight request are left alone.
    pub fn evict_idle(&self, now: Instant, idle_after: Duration) -> usize {
        let mut removed = 0;

        self.windows.retain(|_, slot| {
            let Some(mut window) = slot.try_lock() else {
                return true;
            };

            let idle = match window.last_seen() {
                Some(seen) => now.saturating_duration_since(seen) > idle_after,
                None => true,
            };
            if idle {
                window.retire();
                removed += 1;
            }
            !idle
        });

        removed
    }

    /// Get the number of requests counted for a key.
    ///
    /// Returns `None` if the key has no window.
    pub fn window_len(&self, key: &str) -> Option<usize> {
        let window = self.windows.get(key).map(|w| Arc::clone(w.value()))?;
        let len = window.lock().len();
        Some(len)
    }

    /// Get the number of tracked clients.
    pub fn client_count(&self) -> usize {
        self.windows.len()
    }

    /// Drop every window.
    pub fn clear(&self) {
        self.windows.retain(|_, slot| {
            slot.lock().retire();
            false
        });
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(LimitConfig::default())
    }
}
