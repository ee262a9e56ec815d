//! HTTP surface: the rate limiting middleware stage and the server hosting it.

pub mod middleware;
mod server;

pub use middleware::{client_key, rate_limit, rate_limited, RateLimitState, REJECTION_BODY};
pub use server::{build_router, HttpServer};
