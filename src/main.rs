//! Order service entry point.
//!
//! Startup order: configuration, logging, metrics, listener, server.
//! All limiter and breaker state starts fresh on every start.

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use order_service::config::{load_config, OrderServiceConfig};
use order_service::lifecycle::signals::shutdown_signal;
use order_service::observability::{logging, metrics};
use order_service::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "order-service")]
#[command(about = "Order orchestration with rate limiting and circuit breakers", long_about = None)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => OrderServiceConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability.log_level);
    tracing::info!("order-service v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        rate_limit = config.rate_limit.limit,
        window_secs = config.rate_limit.window_secs,
        breaker_timeout_ms = config.circuit_breaker.timeout_ms,
        error_threshold_percentage = config.circuit_breaker.error_threshold_percentage,
        reset_timeout_ms = config.circuit_breaker.reset_timeout_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.trigger();
    });

    HttpServer::new(config).run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
