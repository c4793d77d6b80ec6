//! Upstream WebSocket Client
//!
//! Maintains the single persistent connection to the upstream
//! quote-streaming process.
//!
//! # Lifecycle
//!
//! One actor task owns the connection. Each cycle it dials the upstream,
//! requests a status snapshot, and pumps frames until the socket drops,
//! the health monitor declares silence, or shutdown is requested. Failed
//! cycles back off linearly before the next dial; only the actor ever
//! reconnects, so at most one attempt is pending at any time.
//!
//! Outbound commands are accepted through an [`UpstreamHandle`] only
//! while connected. Nothing is queued across connections: commands
//! rejected while disconnected are the caller's problem, and anything
//! left in the channel when a connection dies is discarded before the
//! next dial.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use super::codec;
use super::messages::Command;
use super::monitor::{HealthMonitor, MonitorConfig, MonitorEvent};
use super::reconnect::ReconnectPolicy;
use super::router::MessageRouter;
use super::stats::ConnectionStats;
use crate::UpstreamSettings;
use crate::infrastructure::metrics;

/// Capacity of the outbound command channel. Commands are accepted only
/// while connected and drained continuously, so this only needs to absorb
/// short bursts.
const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Disconnect reason recorded when the health monitor forces a teardown.
pub const REASON_SILENCE_TIMEOUT: &str = "silence_timeout";

/// Errors that end one connection cycle.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// WebSocket error from the transport.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The upstream closed the connection or the stream ended.
    #[error("connection closed by upstream")]
    ConnectionClosed,

    /// The health monitor saw no traffic within the silence window.
    #[error("no upstream traffic within silence window")]
    SilenceTimeout,
}

fn is_connection_refused(error: &UpstreamError) -> bool {
    matches!(
        error,
        UpstreamError::WebSocket(tokio_tungstenite::tungstenite::Error::Io(io))
            if io.kind() == std::io::ErrorKind::ConnectionRefused
    )
}

/// Configuration for the upstream client.
#[derive(Debug, Clone)]
pub struct UpstreamClientConfig {
    /// WebSocket URL of the upstream process.
    pub url: String,
    /// Backoff schedule between failed cycles.
    pub reconnect: ReconnectPolicy,
    /// Health monitoring windows.
    pub monitor: MonitorConfig,
}

impl UpstreamClientConfig {
    /// Build client configuration from upstream settings.
    #[must_use]
    pub fn from_settings(settings: &UpstreamSettings) -> Self {
        Self {
            url: settings.url(),
            reconnect: ReconnectPolicy::new(settings.reconnect_base, settings.reconnect_max),
            monitor: MonitorConfig {
                check_interval: settings.health_check_interval,
                silence_timeout: settings.silence_timeout,
                ping_interval: settings.ping_interval,
            },
        }
    }
}

/// Command-sending side of the upstream connection.
///
/// Cheap to clone; held by the HTTP API and the viewer server.
#[derive(Debug, Clone)]
pub struct UpstreamHandle {
    stats: Arc<ConnectionStats>,
    command_tx: mpsc::Sender<Command>,
}

impl UpstreamHandle {
    /// Hand a command to the connection actor for delivery.
    ///
    /// Returns `true` when the command was accepted for the current
    /// connection. Returns `false` when disconnected or when the command
    /// channel is full; the command is dropped either way, never queued
    /// for a future connection.
    #[must_use]
    pub fn send(&self, command: Command) -> bool {
        if !self.stats.is_connected() {
            tracing::debug!(command = command.name(), "Dropping command while disconnected");
            return false;
        }
        self.command_tx.try_send(command).is_ok()
    }

    /// Shared connection stats.
    #[must_use]
    pub fn stats(&self) -> Arc<ConnectionStats> {
        Arc::clone(&self.stats)
    }
}

/// The connection actor. Owns the socket and all reconnect decisions.
pub struct UpstreamClient {
    config: UpstreamClientConfig,
    stats: Arc<ConnectionStats>,
    router: MessageRouter,
    command_rx: mpsc::Receiver<Command>,
    cancel: CancellationToken,
}

impl UpstreamClient {
    /// Create the actor and its command handle.
    #[must_use]
    pub fn new(
        config: UpstreamClientConfig,
        stats: Arc<ConnectionStats>,
        router: MessageRouter,
        cancel: CancellationToken,
    ) -> (Self, UpstreamHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let handle = UpstreamHandle {
            stats: Arc::clone(&stats),
            command_tx,
        };
        let client = Self {
            config,
            stats,
            router,
            command_rx,
            cancel,
        };
        (client, handle)
    }

    /// Run the connect/read/backoff loop until shutdown.
    pub async fn run(mut self) {
        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("Upstream client cancelled");
                return;
            }

            // Discard commands accepted for a previous connection.
            while self.command_rx.try_recv().is_ok() {}

            self.stats.mark_connecting();
            match self.connect_and_run().await {
                Ok(()) => {
                    // A clean exit is not a lost connection.
                    self.stats.mark_disconnected(false, "shutdown");
                    metrics::set_connected(false);
                    tracing::info!("Upstream connection closed for shutdown");
                    return;
                }
                Err(e) => {
                    let was_established = self.stats.is_connected();
                    let reason = match e {
                        UpstreamError::SilenceTimeout => REASON_SILENCE_TIMEOUT.to_string(),
                        ref other => other.to_string(),
                    };
                    if is_connection_refused(&e) {
                        // Expected whenever the upstream process is down.
                        tracing::debug!(error = %e, "Upstream not accepting connections");
                    } else {
                        tracing::warn!(error = %e, was_established, "Upstream connection lost");
                    }
                    self.stats.mark_disconnected(was_established, &reason);
                    metrics::set_connected(false);
                    if was_established {
                        metrics::record_disconnect(&reason);
                        self.router.announce_connection(false, Some(&reason));
                    }
                }
            }

            let attempts = self.stats.increment_reconnect_attempts();
            metrics::record_reconnect_attempt();
            let delay = self.config.reconnect.delay_for(attempts);
            tracing::info!(
                attempt = attempts,
                delay_ms = delay.as_millis(),
                "Reconnecting to upstream"
            );

            tokio::select! {
                () = self.cancel.cancelled() => {
                    tracing::info!("Upstream client cancelled during backoff");
                    return;
                }
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Dial the upstream and pump frames until the cycle ends.
    ///
    /// `Ok(())` means shutdown was requested; any other exit is an error.
    async fn connect_and_run(&mut self) -> Result<(), UpstreamError> {
        tracing::info!(url = %self.config.url, "Connecting to upstream");

        let (ws_stream, _response) = tokio_tungstenite::connect_async(&self.config.url).await?;
        let (mut write, mut read) = ws_stream.split();

        self.stats.mark_connected();
        metrics::set_connected(true);
        tracing::info!("Upstream connection established");
        self.router.announce_connection(true, None);

        let (monitor_tx, mut monitor_rx) = mpsc::channel::<MonitorEvent>(10);
        let monitor_cancel = CancellationToken::new();
        let monitor = HealthMonitor::new(
            self.config.monitor.clone(),
            Arc::clone(&self.stats),
            monitor_tx,
            monitor_cancel.clone(),
        );
        let _monitor_handle = tokio::spawn(monitor.run());

        // Ask for a status snapshot so the subscription view repopulates.
        // Data subscriptions themselves are not replayed; upstream retains
        // its own subscription state across our reconnects.
        let result = match self.send_command(&mut write, &Command::GetStatus).await {
            Ok(()) => self.pump(&mut write, &mut read, &mut monitor_rx).await,
            Err(e) => Err(e),
        };
        monitor_cancel.cancel();
        result
    }

    /// Frame-pumping loop for one established connection.
    async fn pump<W, R>(
        &mut self,
        write: &mut W,
        read: &mut R,
        monitor_rx: &mut mpsc::Receiver<MonitorEvent>,
    ) -> Result<(), UpstreamError>
    where
        W: SinkExt<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
        R: StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
    {
        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(());
                }
                monitor_event = monitor_rx.recv() => {
                    match monitor_event {
                        Some(MonitorEvent::SendPing) => {
                            self.send_command(write, &Command::Ping).await?;
                        }
                        Some(MonitorEvent::SilenceTimeout { silent_for }) => {
                            tracing::warn!(
                                silent_secs = silent_for.as_secs(),
                                "Forcing disconnect after silence"
                            );
                            return Err(UpstreamError::SilenceTimeout);
                        }
                        None => {
                            tracing::debug!("Monitor channel closed");
                        }
                    }
                }
                command = self.command_rx.recv() => {
                    if let Some(command) = command {
                        self.send_command(write, &command).await?;
                    }
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.stats.record_message_received();
                            self.handle_text_frame(&text);
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!("Upstream sent close frame");
                            return Err(UpstreamError::ConnectionClosed);
                        }
                        Some(Ok(_)) => {
                            // Binary and pong frames carry nothing for us.
                        }
                        Some(Err(e)) => return Err(e.into()),
                        None => {
                            tracing::info!("Upstream stream ended");
                            return Err(UpstreamError::ConnectionClosed);
                        }
                    }
                }
            }
        }
    }

    /// Decode and route one inbound text frame. Malformed frames are
    /// logged and dropped without ending the connection.
    fn handle_text_frame(&self, text: &str) {
        match codec::decode_frame(text) {
            Ok(message) => self.router.route(message),
            Err(e) => {
                metrics::record_frame_error();
                tracing::warn!(error = %e, "Dropping malformed upstream frame");
            }
        }
    }

    /// Serialize and send one command frame.
    async fn send_command<W>(&self, write: &mut W, command: &Command) -> Result<(), UpstreamError>
    where
        W: SinkExt<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
    {
        match codec::encode_command(command) {
            Ok(json) => {
                write.send(Message::Text(json.into())).await?;
                self.stats.record_message_sent();
                metrics::record_command_sent(command.name());
                tracing::debug!(command = command.name(), "Command sent upstream");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, command = command.name(), "Failed to encode command");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::infrastructure::broadcast::BroadcastHub;

    fn make_client() -> (UpstreamClient, UpstreamHandle, Arc<ConnectionStats>) {
        let stats = Arc::new(ConnectionStats::new());
        let hub = Arc::new(BroadcastHub::with_defaults());
        let router = MessageRouter::new(hub, Arc::clone(&stats));
        let config = UpstreamClientConfig {
            url: "ws://localhost:8889".to_string(),
            reconnect: ReconnectPolicy::default(),
            monitor: MonitorConfig::default(),
        };
        let (client, handle) =
            UpstreamClient::new(config, Arc::clone(&stats), router, CancellationToken::new());
        (client, handle, stats)
    }

    #[test]
    fn handle_rejects_commands_while_disconnected() {
        let (_client, handle, stats) = make_client();
        assert_eq!(stats.state(), super::super::stats::ConnectionState::Disconnected);
        assert!(!handle.send(Command::GetStatus));
    }

    #[test]
    fn handle_accepts_commands_while_connected() {
        let (_client, handle, stats) = make_client();
        stats.mark_connected();
        assert!(handle.send(Command::GetStatus));
    }

    #[test]
    fn handle_rejects_when_channel_full() {
        let (_client, handle, stats) = make_client();
        stats.mark_connected();
        for _ in 0..COMMAND_CHANNEL_CAPACITY {
            assert!(handle.send(Command::Ping));
        }
        assert!(!handle.send(Command::Ping));
    }

    #[test]
    fn config_from_settings() {
        let settings = UpstreamSettings {
            host: "quotehost".to_string(),
            port: 9001,
            reconnect_base: Duration::from_secs(5),
            reconnect_max: Duration::from_secs(60),
            health_check_interval: Duration::from_secs(15),
            silence_timeout: Duration::from_secs(60),
            ping_interval: Duration::from_secs(30),
        };
        let config = UpstreamClientConfig::from_settings(&settings);
        assert_eq!(config.url, "ws://quotehost:9001");
        assert_eq!(config.monitor.silence_timeout, Duration::from_secs(60));
        assert_eq!(config.reconnect.delay_for(2), Duration::from_secs(10));
    }
}
