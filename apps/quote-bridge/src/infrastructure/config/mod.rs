//! Configuration module.
//!
//! Environment-derived settings for the bridge.

mod settings;

pub use settings::{
    BridgeConfig, BroadcastSettings, ConfigError, ServerSettings, UpstreamSettings,
};
