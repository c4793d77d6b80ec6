//! Prometheus Metrics Module
//!
//! Exposes bridge metrics in Prometheus format.
//!
//! # Metrics
//!
//! - `quote_bridge_messages_total` — inbound upstream messages by type
//! - `quote_bridge_commands_total` — outbound commands by name
//! - `quote_bridge_frame_errors_total` — malformed upstream frames
//! - `quote_bridge_disconnects_total` — lost established connections
//! - `quote_bridge_reconnect_attempts_total` — failed connect cycles
//! - `quote_bridge_connected` — 1 while the upstream socket is up
//! - `quote_bridge_viewers` — attached viewer connections
//!
//! # Integration
//!
//! Metrics are rendered at `GET /metrics` on the API server port.

use std::sync::OnceLock;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if the recorder cannot be installed.
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let builder = PrometheusBuilder::new();
            let handle = builder
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

fn register_metrics() {
    describe_counter!(
        "quote_bridge_messages_total",
        "Inbound upstream messages by type"
    );
    describe_counter!(
        "quote_bridge_commands_total",
        "Outbound commands sent upstream by name"
    );
    describe_counter!(
        "quote_bridge_frame_errors_total",
        "Upstream frames dropped as malformed"
    );
    describe_counter!(
        "quote_bridge_disconnects_total",
        "Established upstream connections lost"
    );
    describe_counter!(
        "quote_bridge_reconnect_attempts_total",
        "Failed upstream connect cycles"
    );
    describe_gauge!(
        "quote_bridge_connected",
        "1 while the upstream connection is established"
    );
    describe_gauge!("quote_bridge_viewers", "Attached viewer connections");
}

/// Record one outbound command.
pub fn record_command_sent(name: &'static str) {
    counter!("quote_bridge_commands_total", "command" => name).increment(1);
}

/// Record a malformed upstream frame.
pub fn record_frame_error() {
    counter!("quote_bridge_frame_errors_total").increment(1);
}

/// Record the loss of an established connection.
pub fn record_disconnect(reason: &str) {
    counter!("quote_bridge_disconnects_total", "reason" => reason.to_string()).increment(1);
}

/// Record one failed connect cycle.
pub fn record_reconnect_attempt() {
    counter!("quote_bridge_reconnect_attempts_total").increment(1);
}

/// Update the upstream connected gauge.
pub fn set_connected(connected: bool) {
    gauge!("quote_bridge_connected").set(if connected { 1.0 } else { 0.0 });
}
