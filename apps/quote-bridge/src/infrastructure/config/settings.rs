//! Bridge Configuration Settings
//!
//! Configuration types for the streaming bridge, loaded from environment
//! variables.

use std::time::Duration;

/// Upstream connection settings.
#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    /// Host of the upstream quote-streaming process.
    pub host: String,
    /// Port of the upstream quote-streaming process.
    pub port: u16,
    /// Base interval for linear reconnect backoff.
    pub reconnect_base: Duration,
    /// Cap on the reconnect backoff delay.
    pub reconnect_max: Duration,
    /// Period of the connection health check.
    pub health_check_interval: Duration,
    /// Inbound silence duration after which an open connection is presumed dead.
    pub silence_timeout: Duration,
    /// Interval between application-level ping commands.
    pub ping_interval: Duration,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8889,
            reconnect_base: Duration::from_secs(5),
            reconnect_max: Duration::from_secs(60),
            health_check_interval: Duration::from_secs(15),
            silence_timeout: Duration::from_secs(60),
            ping_interval: Duration::from_secs(30),
        }
    }
}

impl UpstreamSettings {
    /// WebSocket URL of the upstream quote process.
    #[must_use]
    pub fn url(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }
}

/// Broadcast channel settings.
#[derive(Debug, Clone)]
pub struct BroadcastSettings {
    /// Capacity of the option quote broadcast channel.
    pub option_quotes_capacity: usize,
    /// Capacity of the equity quote broadcast channel.
    pub equity_quotes_capacity: usize,
    /// Capacity of the futures quote broadcast channel.
    pub futures_quotes_capacity: usize,
    /// Capacity of the account activity broadcast channel.
    pub account_activity_capacity: usize,
    /// Capacity of the connectivity status broadcast channel.
    pub status_capacity: usize,
}

impl Default for BroadcastSettings {
    fn default() -> Self {
        Self {
            option_quotes_capacity: 10_000,
            equity_quotes_capacity: 10_000,
            futures_quotes_capacity: 1_000,
            account_activity_capacity: 1_000,
            status_capacity: 256,
        }
    }
}

/// Server port settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Downstream viewer WebSocket port.
    pub viewer_port: u16,
    /// Management/health HTTP port.
    pub api_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            viewer_port: 8890,
            api_port: 8082,
        }
    }
}

/// Complete bridge configuration.
#[derive(Debug, Clone, Default)]
pub struct BridgeConfig {
    /// Upstream connection settings.
    pub upstream: UpstreamSettings,
    /// Server port settings.
    pub server: ServerSettings,
    /// Broadcast channel settings.
    pub broadcast: BroadcastSettings,
}

impl BridgeConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `UPSTREAM_PORT` is present but not a valid port.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host =
            std::env::var("UPSTREAM_HOST").unwrap_or_else(|_| UpstreamSettings::default().host);

        let port = match std::env::var("UPSTREAM_PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue("UPSTREAM_PORT".to_string(), raw))?,
            Err(_) => UpstreamSettings::default().port,
        };

        let upstream = UpstreamSettings {
            host,
            port,
            reconnect_base: parse_env_duration_millis(
                "QUOTE_BRIDGE_RECONNECT_BASE_MS",
                UpstreamSettings::default().reconnect_base,
            ),
            reconnect_max: parse_env_duration_millis(
                "QUOTE_BRIDGE_RECONNECT_MAX_MS",
                UpstreamSettings::default().reconnect_max,
            ),
            health_check_interval: parse_env_duration_secs(
                "QUOTE_BRIDGE_HEALTH_CHECK_SECS",
                UpstreamSettings::default().health_check_interval,
            ),
            silence_timeout: parse_env_duration_secs(
                "QUOTE_BRIDGE_SILENCE_TIMEOUT_SECS",
                UpstreamSettings::default().silence_timeout,
            ),
            ping_interval: parse_env_duration_secs(
                "QUOTE_BRIDGE_PING_INTERVAL_SECS",
                UpstreamSettings::default().ping_interval,
            ),
        };

        let server = ServerSettings {
            viewer_port: parse_env_u16(
                "QUOTE_BRIDGE_VIEWER_PORT",
                ServerSettings::default().viewer_port,
            ),
            api_port: parse_env_u16("QUOTE_BRIDGE_API_PORT", ServerSettings::default().api_port),
        };

        let broadcast = BroadcastSettings {
            option_quotes_capacity: parse_env_usize(
                "QUOTE_BRIDGE_OPTION_QUOTES_CAPACITY",
                BroadcastSettings::default().option_quotes_capacity,
            ),
            equity_quotes_capacity: parse_env_usize(
                "QUOTE_BRIDGE_EQUITY_QUOTES_CAPACITY",
                BroadcastSettings::default().equity_quotes_capacity,
            ),
            futures_quotes_capacity: parse_env_usize(
                "QUOTE_BRIDGE_FUTURES_QUOTES_CAPACITY",
                BroadcastSettings::default().futures_quotes_capacity,
            ),
            account_activity_capacity: parse_env_usize(
                "QUOTE_BRIDGE_ACCOUNT_ACTIVITY_CAPACITY",
                BroadcastSettings::default().account_activity_capacity,
            ),
            status_capacity: parse_env_usize(
                "QUOTE_BRIDGE_STATUS_CAPACITY",
                BroadcastSettings::default().status_capacity,
            ),
        };

        Ok(Self {
            upstream,
            server,
            broadcast,
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable is present but could not be parsed.
    #[error("environment variable {0} has invalid value: {1}")]
    InvalidValue(String, String),
}

fn parse_env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_env_duration_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}
