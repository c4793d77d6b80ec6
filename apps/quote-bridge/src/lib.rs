#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::default_trait_access
    )
)]

//! Quote Bridge - Market Data Streaming Bridge
//!
//! Maintains a single persistent WebSocket connection to an upstream
//! quote-streaming process and fans its events out to any number of
//! downstream viewer connections, while exposing an HTTP surface for
//! health, stats, and subscription management.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Pure logic with no external dependencies
//!   - `occ`: OCC option symbol codec
//!   - `position`: trading-position model
//!
//! - **Application**: Use cases
//!   - `services`: subscription façade over the upstream connection
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `upstream`: upstream WebSocket client, reconnect, health monitor
//!   - `broadcast`: channel-based fan-out
//!   - `viewer`: downstream viewer WebSocket server
//!   - `api`: management/health HTTP endpoint
//!   - `config`, `metrics`, `telemetry`
//!
//! # Data Flow
//!
//! ```text
//! Upstream WS ──► Router ──► Broadcast ──► Viewer WS ──► Viewer 1..N
//!       ▲                    Channels
//!       │
//!   commands ◄── Façade ◄── HTTP API / viewer commands
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Pure types with no external dependencies.
pub mod domain;

/// Application layer - Use cases.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::occ::{
    OCC_SYMBOL_LEN, OccContract, OccError, OptionKind, parse_occ, position_to_occ,
    positions_to_occ_symbols,
};
pub use domain::position::Position;

// Application services
pub use application::services::{FacadeError, SubscriptionFacade};

// Infrastructure config
pub use infrastructure::config::{
    BridgeConfig, BroadcastSettings, ConfigError, ServerSettings, UpstreamSettings,
};

// Upstream connection (for integration tests)
pub use infrastructure::upstream::{
    Command, ConnectionState, ConnectionStats, MessageRouter, StatsSnapshot, StreamMessage,
    UpstreamClient, UpstreamClientConfig, UpstreamHandle,
};

// Broadcast hub (for integration tests)
pub use infrastructure::broadcast::{BroadcastConfig, BroadcastHub, SharedBroadcastHub};

// Servers
pub use infrastructure::api::{ApiServer, ApiServerError, ApiState};
pub use infrastructure::viewer::{ViewerServer, ViewerServerError};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
