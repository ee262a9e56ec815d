//! HTTP server implementation.

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use super::middleware::{rate_limited, RateLimitState};
use crate::config::KeySource;
use crate::error::{FloodgateError, Result};
use crate::ratelimit::RateLimiter;

/// HTTP front for the rate limiter.
pub struct HttpServer {
    /// Address to bind to
    addr: SocketAddr,
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server around a shared limiter.
    pub fn new(addr: SocketAddr, limiter: Arc<RateLimiter>, key_source: KeySource) -> Self {
        Self {
            addr,
            router: build_router(limiter, key_source),
        }
    }

    /// Start the HTTP server with graceful shutdown.
    ///
    /// The server will shut down when the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr).await?;

        info!(
            addr = %listener.local_addr()?,
            "Starting HTTP server with graceful shutdown"
        );

        axum::serve(
            listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(signal)
        .await
        .map_err(|e| {
            error!(error = %e, "HTTP server failed");
            FloodgateError::Io(e)
        })
    }
}

/// Build the service router.
///
/// `/healthz` bypasses the limiter. Everything else is rate limited and,
/// once admitted, handed to the downstream stage.
pub fn build_router(limiter: Arc<RateLimiter>, key_source: KeySource) -> Router {
    let state = RateLimitState::new(Arc::clone(&limiter), key_source);
    let limited = rate_limited(Router::new().fallback(downstream), state);

    Router::new()
        .route("/healthz", get(health))
        .with_state(limiter)
        .merge(limited)
        .layer(TraceLayer::new_for_http())
}

async fn health(State(limiter): State<Arc<RateLimiter>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "tracked_clients": limiter.client_count(),
    }))
}

/// Stand-in for the stage behind the limiter (proxying is done elsewhere).
async fn downstream() -> &'static str {
    "OK"
}
