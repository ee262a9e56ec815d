//! Rate limiting middleware.
//! Resolves the client key and short-circuits over-limit requests with 429.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

use crate::config::KeySource;
use crate::ratelimit::{Decision, RateLimiter};

/// Body returned with every 429 response.
pub const REJECTION_BODY: &str = "Rate Limit Exceeded";

/// State shared by every invocation of the middleware.
#[derive(Clone)]
pub struct RateLimitState {
    pub limiter: Arc<RateLimiter>,
    pub key_source: KeySource,
}

impl RateLimitState {
    pub fn new(limiter: Arc<RateLimiter>, key_source: KeySource) -> Self {
        Self {
            limiter,
            key_source,
        }
    }
}

/// Resolve the client key for a request.
///
/// Anything that cannot be resolved becomes the empty key, so all such
/// requests share a single window.
pub fn client_key(source: &KeySource, request: &Request) -> String {
    match source {
        KeySource::RemoteAddr => request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0.ip().to_string())
            .unwrap_or_default(),
        KeySource::Header { name } => request
            .headers()
            .get(name.as_str())
            .and_then(|value| value.to_str().ok())
            // X-Forwarded-For style lists: the first hop is the client
            .and_then(|value| value.split(',').next())
            .map(|value| value.trim().to_string())
            .unwrap_or_default(),
    }
}

pub async fn rate_limit(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_key(&state.key_source, &request);

    match state.limiter.admit(&key, Instant::now()) {
        Decision::Admit => next.run(request).await,
        Decision::Reject => {
            warn!(
                client = %key,
                method = %request.method(),
                path = %request.uri().path(),
                "Rejecting request over rate limit"
            );
            too_many_requests()
        }
    }
}

/// The response sent in place of a rejected request.
pub fn too_many_requests() -> Response {
    (StatusCode::TOO_MANY_REQUESTS, REJECTION_BODY).into_response()
}

/// Put every route and the fallback of `router` behind the limiter.
pub fn rate_limited(router: Router, state: RateLimitState) -> Router {
    router.layer(middleware::from_fn_with_state(state, rate_limit))
}
