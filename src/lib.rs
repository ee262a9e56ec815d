//! Floodgate - Per-Client Rate Limiting
//!
//! This crate implements an in-memory, per-client sliding-window rate
//! limiter and an axum middleware stage that admits or rejects requests at
//! a service boundary. State is local to the process; nothing is shared
//! between replicas or persisted across restarts.

pub mod config;
pub mod error;
pub mod http;
pub mod ratelimit;
