use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use floodgate::config::{FloodgateConfig, LogFormat, LoggingConfig};
use floodgate::http::HttpServer;
use floodgate::ratelimit::{run_idle_sweeper, RateLimiter};

/// Per-client sliding-window rate limiter for HTTP services.
#[derive(Parser, Debug)]
#[command(name = "floodgate", version)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Listen address, overriding the configuration
    #[arg(short, long)]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = FloodgateConfig::load(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        config.server.listen_addr = listen;
    }

    init_tracing(&config.logging);

    info!("Starting Floodgate");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let rate_limiting = &config.rate_limiting;
    let rate_limiter = Arc::new(RateLimiter::new(rate_limiting.limit_config()));
    info!(
        window_secs = rate_limiting.window_secs,
        max_requests = rate_limiting.max_requests,
        algorithm = ?rate_limiting.algorithm,
        key_source = ?rate_limiting.key_source,
        "Rate limiter initialized"
    );

    let sweeper = if rate_limiting.eviction.enabled {
        Some(tokio::spawn(run_idle_sweeper(
            Arc::clone(&rate_limiter),
            rate_limiting.eviction.sweep_interval(),
            rate_limiting.idle_after()?,
        )))
    } else {
        None
    };

    let server = HttpServer::new(
        config.server.listen_addr,
        rate_limiter,
        rate_limiting.key_source.clone(),
    );

    // Serve until Ctrl+C or SIGTERM, then drain
    server.serve_with_shutdown(shutdown_signal()).await?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }

    info!("Floodgate stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true);

    match logging.format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Text => subscriber.init(),
    }
}

/// Resolves on the first of Ctrl+C or SIGTERM. A handler that cannot be
/// installed is logged and never fires.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let source = tokio::select! {
        _ = interrupt => "ctrl-c",
        _ = terminate => "sigterm",
    };

    info!(signal = source, "Draining connections before exit");
}
