//! Quote Bridge Binary
//!
//! Starts the market data streaming bridge.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin quote-bridge
//! ```
//!
//! # Environment Variables
//!
//! - `UPSTREAM_HOST`: upstream quote process host (default: localhost)
//! - `UPSTREAM_PORT`: upstream quote process port (default: 8889)
//! - `QUOTE_BRIDGE_VIEWER_PORT`: viewer WebSocket port (default: 8890)
//! - `QUOTE_BRIDGE_API_PORT`: management HTTP port (default: 8082)
//! - `QUOTE_BRIDGE_RECONNECT_BASE_MS` / `QUOTE_BRIDGE_RECONNECT_MAX_MS`:
//!   linear backoff step and cap (defaults: 5000 / 60000)
//! - `QUOTE_BRIDGE_HEALTH_CHECK_SECS`: silence check period (default: 15)
//! - `QUOTE_BRIDGE_SILENCE_TIMEOUT_SECS`: silence window (default: 60)
//! - `QUOTE_BRIDGE_PING_INTERVAL_SECS`: keepalive interval (default: 30)
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: true)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4318>)
//! - `OTEL_SERVICE_NAME`: Service name (default: quote-bridge)
//! - `RUST_LOG`: Log level (default: info)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use quote_bridge::infrastructure::telemetry;
use quote_bridge::{
    ApiServer, ApiState, BridgeConfig, BroadcastConfig, BroadcastHub, ConnectionStats,
    MessageRouter, SubscriptionFacade, UpstreamClient, UpstreamClientConfig, ViewerServer,
    init_metrics,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    // Initialize telemetry (OpenTelemetry + tracing)
    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting Quote Bridge");

    // Initialize Prometheus metrics
    let _metrics_handle = init_metrics();

    let config = BridgeConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    // Broadcast hub for message distribution
    let broadcast_config = BroadcastConfig::from(config.broadcast.clone());
    let broadcast_hub = Arc::new(BroadcastHub::new(broadcast_config));

    // Shared connection stats and the upstream connection actor
    let stats = Arc::new(ConnectionStats::new());
    let router = MessageRouter::new(Arc::clone(&broadcast_hub), Arc::clone(&stats));
    let upstream_config = UpstreamClientConfig::from_settings(&config.upstream);
    let (upstream_client, upstream_handle) = UpstreamClient::new(
        upstream_config,
        Arc::clone(&stats),
        router,
        shutdown_token.clone(),
    );

    let facade = SubscriptionFacade::new(upstream_handle);

    // Viewer WebSocket server
    let viewer_addr = SocketAddr::from(([0, 0, 0, 0], config.server.viewer_port));
    let viewer_server = ViewerServer::new(
        viewer_addr,
        Arc::clone(&broadcast_hub),
        facade.clone(),
        shutdown_token.clone(),
    );

    // Management HTTP server
    let api_state = Arc::new(ApiState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        facade,
        Arc::clone(&broadcast_hub),
    ));
    let api_server = ApiServer::new(config.server.api_port, api_state, shutdown_token.clone());

    let upstream_task = tokio::spawn(async move {
        upstream_client.run().await;
    });

    let viewer_task = tokio::spawn(async move {
        if let Err(e) = viewer_server.run().await {
            tracing::error!(error = %e, "Viewer server error");
        }
    });

    let api_task = tokio::spawn(async move {
        if let Err(e) = api_server.run().await {
            tracing::error!(error = %e, "API server error");
        }
    });

    tracing::info!("Quote bridge ready");

    await_shutdown(shutdown_token).await;

    let drained = tokio::time::timeout(SHUTDOWN_TIMEOUT, async {
        let _ = tokio::join!(upstream_task, viewer_task, api_task);
    })
    .await;
    if drained.is_err() {
        tracing::warn!(
            timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
            "Shutdown timeout elapsed with tasks still running"
        );
    }

    tracing::info!("Quote bridge stopped");
    Ok(())
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &BridgeConfig) {
    tracing::info!(
        upstream_url = %config.upstream.url(),
        viewer_port = config.server.viewer_port,
        api_port = config.server.api_port,
        "Configuration loaded"
    );
    tracing::debug!(
        reconnect_base_ms = config.upstream.reconnect_base.as_millis(),
        reconnect_max_ms = config.upstream.reconnect_max.as_millis(),
        health_check_secs = config.upstream.health_check_interval.as_secs(),
        silence_timeout_secs = config.upstream.silence_timeout.as_secs(),
        ping_interval_secs = config.upstream.ping_interval.as_secs(),
        "Upstream timing"
    );
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();
    tracing::info!("Graceful shutdown started");
}
