//! pokerd - planning poker session hub.

use poker_hub::config::{Config, validate};
use poker_hub::metrics::{self, PrometheusMetrics};
use poker_hub::network::{AppState, Gateway};
use poker_hub::{http, telemetry};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = Config::load(&config_path).map_err(|e| {
        eprintln!("Failed to load config {config_path}: {e}");
        e
    })?;

    telemetry::init_tracing(&config.log);
    info!(path = %config_path, version = env!("CARGO_PKG_VERSION"), "Starting pokerd");

    if let Err(problems) = validate(&config) {
        for problem in &problems {
            error!(%problem, "Invalid configuration");
        }
        anyhow::bail!("{} configuration problem(s), refusing to start", problems.len());
    }
    if config.admin.api_key.is_none() {
        warn!("No admin.api_key configured, admin routes are disabled");
    }

    let shutdown = CancellationToken::new();

    // Convention: metrics_port = 0 disables the metrics endpoint.
    let metrics_port = config.server.metrics_port;
    if metrics_port == 0 {
        info!("Metrics disabled");
    } else {
        metrics::init();
        tokio::spawn(http::run_http_server(metrics_port, shutdown.clone()));
        info!(port = metrics_port, "Prometheus HTTP server started");
    }

    let state = AppState::build(&config, Arc::new(PrometheusMetrics), shutdown.clone()).await?;
    let gateway = Gateway::bind(config.server.listen, state).await?;

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
                return;
            }
            info!("Shutdown requested");
            shutdown.cancel();
        });
    }

    gateway.run().await?;
    info!("pokerd stopped");
    Ok(())
}
