//! Rate limiting logic and state management.

mod counter;
mod limiter;
mod sliding;
mod sweeper;
mod window;

pub use counter::FixedWindowCounter;
pub use limiter::{Decision, LimitConfig, RateLimiter, DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW};
pub use sliding::SlidingLog;
pub use sweeper::run_idle_sweeper;
pub use window::{Algorithm, ClientWindow};
