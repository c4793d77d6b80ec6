//! Infrastructure Layer
//!
//! Adapters for external systems: the upstream WebSocket feed, the
//! downstream viewer server, the HTTP management surface, configuration,
//! metrics, and telemetry.

pub mod api;
pub mod broadcast;
pub mod config;
pub mod metrics;
pub mod telemetry;
pub mod upstream;
pub mod viewer;
