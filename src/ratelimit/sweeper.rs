//! Background eviction of idle client windows.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use super::limiter::RateLimiter;

/// Periodically drop windows that have seen no traffic for `idle_after`.
///
/// Runs until the task is aborted. `every` must be non-zero.
pub async fn run_idle_sweeper(limiter: Arc<RateLimiter>, every: Duration, idle_after: Duration) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        interval = ?every,
        idle_after = ?idle_after,
        "Idle window sweeper started"
    );

    loop {
        ticker.tick().await;

        let removed = limiter.evict_idle(Instant::now(), idle_after);
        if removed > 0 {
            debug!(
                removed = removed,
                remaining = limiter.client_count(),
                "Evicted idle client windows"
            );
        }
    }
}
