//! Upstream WebSocket Adapters
//!
//! Everything that talks to the upstream quote-streaming process:
//!
//! - **client**: the connection actor (dial, pump, backoff)
//! - **codec** / **messages**: the JSON wire protocol
//! - **monitor**: silence detection and application keepalive
//! - **reconnect**: linear backoff schedule
//! - **router**: dispatch of inbound messages to the broadcast hub
//! - **stats**: shared connection bookkeeping

pub mod client;
pub mod codec;
pub mod messages;
pub mod monitor;
pub mod reconnect;
pub mod router;
pub mod stats;

pub use client::{
    REASON_SILENCE_TIMEOUT, UpstreamClient, UpstreamClientConfig, UpstreamError, UpstreamHandle,
};
pub use codec::{CodecError, decode_frame, encode_command};
pub use messages::*;
pub use monitor::{HealthMonitor, MonitorConfig, MonitorEvent};
pub use reconnect::ReconnectPolicy;
pub use router::MessageRouter;
pub use stats::{ConnectionState, ConnectionStats, StatsSnapshot};
