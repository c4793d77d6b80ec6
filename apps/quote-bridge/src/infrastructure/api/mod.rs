//! Management HTTP API
//!
//! HTTP surface for health checks, metrics, connection stats, and
//! subscription management. Used by container orchestrators and by
//! operators poking at the bridge.
//!
//! # Endpoints
//!
//! - `GET /health` - JSON health document
//! - `GET /healthz` - liveness probe (simple OK)
//! - `GET /readyz` - readiness probe (ready iff upstream connected)
//! - `GET /metrics` - Prometheus metrics in text format
//! - `GET /stream/stats` - connection stats snapshot
//! - `POST /stream/subscribe/{options,equities,futures}` - subscribe
//! - `POST /stream/unsubscribe/{options,futures}` - unsubscribe
//!
//! Subscribe/unsubscribe bodies carry `{"symbols": [...]}`; the option
//! routes additionally accept `{"positions": [...]}`, converted through
//! the OCC codec. Responses are `{"delivered": bool}` where the boolean
//! is the upstream send result; empty input yields HTTP 400.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::application::services::{FacadeError, SubscriptionFacade};
use crate::domain::occ::positions_to_occ_symbols;
use crate::domain::position::Position;
use crate::infrastructure::broadcast::SharedBroadcastHub;
use crate::infrastructure::metrics::get_metrics_handle;
use crate::infrastructure::upstream::ConnectionState;

// =============================================================================
// Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status: "healthy" or "unhealthy".
    pub status: HealthStatus,
    /// Bridge version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Upstream connection info.
    pub upstream: UpstreamInfo,
    /// Attached viewer count.
    pub viewers: usize,
}

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// The upstream connection is established.
    Healthy,
    /// The upstream connection is down.
    Unhealthy,
}

/// Upstream connection summary for the health document.
#[derive(Debug, Clone, Serialize)]
pub struct UpstreamInfo {
    /// Connection state.
    pub state: ConnectionState,
    /// Whether the upstream socket is established.
    pub connected: bool,
    /// Total inbound messages.
    pub messages_received: u64,
    /// Failed connect cycles since the last successful connect.
    pub reconnect_attempts: u32,
    /// Established connections lost.
    pub total_disconnects: u64,
}

/// Result body for subscription routes.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryResponse {
    /// Whether the command was handed to the upstream socket.
    pub delivered: bool,
}

/// Error body for rejected requests.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Human-readable reason.
    pub error: String,
}

/// Body for subscription routes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionRequest {
    /// Symbols to act on directly.
    #[serde(default)]
    pub symbols: Vec<String>,
    /// Positions to convert through the OCC codec (option routes only).
    #[serde(default)]
    pub positions: Vec<Position>,
}

impl SubscriptionRequest {
    /// Resolve the request to OCC/ticker symbols, converting positions.
    fn resolve_symbols(self) -> Vec<String> {
        let mut symbols = self.symbols;
        symbols.extend(positions_to_occ_symbols(&self.positions));
        symbols
    }
}

// =============================================================================
// Server
// =============================================================================

/// Shared state for the API server.
pub struct ApiState {
    version: String,
    started_at: Instant,
    facade: SubscriptionFacade,
    hub: SharedBroadcastHub,
}

impl ApiState {
    /// Create new API server state.
    #[must_use]
    pub fn new(version: String, facade: SubscriptionFacade, hub: SharedBroadcastHub) -> Self {
        Self {
            version,
            started_at: Instant::now(),
            facade,
            hub,
        }
    }
}

/// API server errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

/// Management HTTP server.
pub struct ApiServer {
    port: u16,
    state: Arc<ApiState>,
    cancel: CancellationToken,
}

impl ApiServer {
    /// Create a new API server.
    #[must_use]
    pub const fn new(port: u16, state: Arc<ApiState>, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Run the API server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`ApiServerError`] if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), ApiServerError> {
        let app = Self::router(self.state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ApiServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| ApiServerError::ServerFailed(e.to_string()))?;

        tracing::info!("API server stopped");
        Ok(())
    }

    /// Build the route table.
    #[must_use]
    pub fn router(state: Arc<ApiState>) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/healthz", get(liveness_handler))
            .route("/readyz", get(readiness_handler))
            .route("/metrics", get(metrics_handler))
            .route("/stream/stats", get(stats_handler))
            .route("/stream/subscribe/options", post(subscribe_options_handler))
            .route("/stream/subscribe/equities", post(subscribe_equities_handler))
            .route("/stream/subscribe/futures", post(subscribe_futures_handler))
            .route(
                "/stream/unsubscribe/options",
                post(unsubscribe_options_handler),
            )
            .route(
                "/stream/unsubscribe/futures",
                post(unsubscribe_futures_handler),
            )
            .with_state(state)
    }
}

// =============================================================================
// Handlers
// =============================================================================

async fn health_handler(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let response = build_health_response(&state);
    let status_code = match response.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(response))
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn readiness_handler(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    if state.facade.stats_snapshot().state == ConnectionState::Connected {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            let body = handle.render();
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                body,
            )
        },
    )
}

async fn stats_handler(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Json(state.facade.stats_snapshot())
}

async fn subscribe_options_handler(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<SubscriptionRequest>,
) -> impl IntoResponse {
    delivery_response(state.facade.subscribe_options(request.resolve_symbols()))
}

async fn subscribe_equities_handler(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<SubscriptionRequest>,
) -> impl IntoResponse {
    delivery_response(state.facade.subscribe_equities(request.symbols))
}

async fn subscribe_futures_handler(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<SubscriptionRequest>,
) -> impl IntoResponse {
    delivery_response(state.facade.subscribe_futures(request.symbols))
}

async fn unsubscribe_options_handler(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<SubscriptionRequest>,
) -> impl IntoResponse {
    delivery_response(state.facade.unsubscribe_options(request.resolve_symbols()))
}

async fn unsubscribe_futures_handler(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<SubscriptionRequest>,
) -> impl IntoResponse {
    delivery_response(state.facade.unsubscribe_futures(request.symbols))
}

fn delivery_response(result: Result<bool, FacadeError>) -> impl IntoResponse {
    match result {
        Ok(delivered) => (StatusCode::OK, Json(DeliveryResponse { delivered })).into_response(),
        Err(e @ FacadeError::EmptySymbolList) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

fn build_health_response(state: &ApiState) -> HealthResponse {
    let snapshot = state.facade.stats_snapshot();
    let connected = snapshot.state == ConnectionState::Connected;

    HealthResponse {
        status: if connected {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        },
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: Utc::now(),
        upstream: UpstreamInfo {
            state: snapshot.state,
            connected,
            messages_received: snapshot.messages_received,
            reconnect_attempts: snapshot.reconnect_attempts,
            total_disconnects: snapshot.total_disconnects,
        },
        viewers: state.hub.viewer_count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_status_serialization() {
        assert_eq!(
            serde_json::to_string(&HealthStatus::Healthy).unwrap(),
            "\"healthy\""
        );
        assert_eq!(
            serde_json::to_string(&HealthStatus::Unhealthy).unwrap(),
            "\"unhealthy\""
        );
    }

    #[test]
    fn subscription_request_symbols_pass_through() {
        let request: SubscriptionRequest =
            serde_json::from_str(r#"{"symbols": ["AAPL", "MSFT"]}"#).unwrap();
        assert_eq!(request.resolve_symbols(), vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn subscription_request_converts_positions() {
        let request: SubscriptionRequest = serde_json::from_str(
            r#"{"positions": [{"ticker": "AAPL", "type": "long_call", "expiry": "2026-02-20", "strike": 230.0}]}"#,
        )
        .unwrap();
        assert_eq!(request.resolve_symbols(), vec!["AAPL  260220C00230000"]);
    }

    #[test]
    fn subscription_request_defaults_empty() {
        let request: SubscriptionRequest = serde_json::from_str("{}").unwrap();
        assert!(request.resolve_symbols().is_empty());
    }
}
