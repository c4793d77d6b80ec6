//! Connection Health Monitor
//!
//! Watches the upstream connection for silence and drives the
//! application-level keepalive. One monitor task runs per established
//! connection; it asks the connection loop to send pings on a fixed
//! interval and forces a disconnect when no frame of any kind has
//! arrived within the silence window.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::stats::ConnectionStats;

/// Configuration for connection health monitoring.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Interval between silence checks.
    pub check_interval: Duration,
    /// Maximum time without any inbound frame before the connection is
    /// declared dead.
    pub silence_timeout: Duration,
    /// Interval between application-level pings.
    pub ping_interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(15),
            silence_timeout: Duration::from_secs(60),
            ping_interval: Duration::from_secs(30),
        }
    }
}

/// Events emitted by the health monitor.
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// Request to send an application-level ping command.
    SendPing,
    /// No inbound frame within the silence window; the connection should
    /// be torn down and re-established.
    SilenceTimeout {
        /// How long the connection had been silent when detected.
        silent_for: Duration,
    },
}

/// Health monitor for one upstream connection.
///
/// Silence is measured against the stats' last-inbound-frame instant.
/// A connection that has never produced a frame is measured from the
/// monitor's own start, so a totally dead socket still times out.
pub struct HealthMonitor {
    config: MonitorConfig,
    stats: Arc<ConnectionStats>,
    event_tx: mpsc::Sender<MonitorEvent>,
    cancel: CancellationToken,
}

impl HealthMonitor {
    /// Create a monitor for a freshly established connection.
    #[must_use]
    pub const fn new(
        config: MonitorConfig,
        stats: Arc<ConnectionStats>,
        event_tx: mpsc::Sender<MonitorEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            stats,
            event_tx,
            cancel,
        }
    }

    /// Run the monitoring loop until cancelled or a timeout is detected.
    pub async fn run(self) {
        let started_at = Instant::now();
        let mut check = tokio::time::interval(self.config.check_interval);
        check.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut ping = tokio::time::interval(self.config.ping_interval);
        ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // Both intervals fire immediately on the first tick; consume those
        // so the first real ping and check happen one period in.
        check.tick().await;
        ping.tick().await;

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    tracing::debug!("Health monitor cancelled");
                    break;
                }
                _ = check.tick() => {
                    if self.check_silence(started_at).await.is_err() {
                        break;
                    }
                }
                _ = ping.tick() => {
                    if self.event_tx.send(MonitorEvent::SendPing).await.is_err() {
                        tracing::debug!("Event channel closed, stopping health monitor");
                        break;
                    }
                }
            }
        }
    }

    /// Returns `Err(())` when silence exceeded the timeout and the loop
    /// should exit.
    async fn check_silence(&self, started_at: Instant) -> Result<(), ()> {
        let last_seen = self.stats.last_message_at().unwrap_or(started_at);
        let silent_for = last_seen.elapsed();
        if silent_for > self.config.silence_timeout {
            tracing::warn!(
                silent_secs = silent_for.as_secs(),
                timeout_secs = self.config.silence_timeout.as_secs(),
                "No upstream traffic within silence window"
            );
            let _ = self
                .event_tx
                .send(MonitorEvent::SilenceTimeout { silent_for })
                .await;
            return Err(());
        }
        Ok(())
    }
}
