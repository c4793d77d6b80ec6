//! Connection State Tracking
//!
//! A single shared [`ConnectionStats`] instance tracks the upstream
//! connection's lifecycle and message counters. The connection actor is
//! the only writer; the HTTP API, the viewer server, and the health
//! endpoints read snapshots concurrently.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Upstream connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No connection and no handshake in progress.
    Disconnected,
    /// A connect attempt is in flight.
    Connecting,
    /// The WebSocket is established and frames flow.
    Connected,
}

/// Shared bookkeeping for the upstream connection.
#[derive(Debug)]
pub struct ConnectionStats {
    state: parking_lot::RwLock<ConnectionState>,
    connected_at: parking_lot::RwLock<Option<DateTime<Utc>>>,
    last_message_at: parking_lot::RwLock<Option<Instant>>,
    subscribed_symbols: parking_lot::RwLock<Vec<String>>,
    last_error: parking_lot::RwLock<Option<String>>,
    messages_received: AtomicU64,
    quotes_received: AtomicU64,
    messages_sent: AtomicU64,
    reconnect_attempts: AtomicU32,
    total_disconnects: AtomicU64,
}

impl Default for ConnectionStats {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionStats {
    /// Create stats in the disconnected state with zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: parking_lot::RwLock::new(ConnectionState::Disconnected),
            connected_at: parking_lot::RwLock::new(None),
            last_message_at: parking_lot::RwLock::new(None),
            subscribed_symbols: parking_lot::RwLock::new(Vec::new()),
            last_error: parking_lot::RwLock::new(None),
            messages_received: AtomicU64::new(0),
            quotes_received: AtomicU64::new(0),
            messages_sent: AtomicU64::new(0),
            reconnect_attempts: AtomicU32::new(0),
            total_disconnects: AtomicU64::new(0),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Whether the connection is currently established.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Mark a connect attempt as in flight.
    pub fn mark_connecting(&self) {
        *self.state.write() = ConnectionState::Connecting;
    }

    /// Mark the connection established. Resets the reconnect counter and
    /// stamps `connected_at`.
    pub fn mark_connected(&self) {
        *self.state.write() = ConnectionState::Connected;
        *self.connected_at.write() = Some(Utc::now());
        *self.last_error.write() = None;
        self.reconnect_attempts.store(0, Ordering::Relaxed);
    }

    /// Mark the connection lost. `was_established` distinguishes a dropped
    /// live connection (counted in `total_disconnects`) from a connect
    /// attempt that never completed.
    pub fn mark_disconnected(&self, was_established: bool, reason: &str) {
        *self.state.write() = ConnectionState::Disconnected;
        *self.connected_at.write() = None;
        *self.last_error.write() = Some(reason.to_string());
        if was_established {
            self.total_disconnects.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record one more failed connect/read cycle. Returns the new attempt
    /// count, which drives the backoff delay.
    pub fn increment_reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Current failed-cycle count since the last successful connect.
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts.load(Ordering::Relaxed)
    }

    /// Record an inbound frame and refresh the liveness timestamp.
    pub fn record_message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
        *self.last_message_at.write() = Some(Instant::now());
    }

    /// Record one routed option quote.
    pub fn record_quote_received(&self) {
        self.quotes_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an outbound command delivered to the socket.
    pub fn record_message_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Instant of the most recent inbound frame, if any.
    pub fn last_message_at(&self) -> Option<Instant> {
        *self.last_message_at.read()
    }

    /// Replace the subscribed-symbol list from an upstream status report.
    pub fn set_subscribed_symbols(&self, symbols: Vec<String>) {
        *self.subscribed_symbols.write() = symbols;
    }

    /// Symbols the upstream last reported itself subscribed to.
    pub fn subscribed_symbols(&self) -> Vec<String> {
        self.subscribed_symbols.read().clone()
    }

    /// Point-in-time copy of all stats for serialization.
    pub fn snapshot(&self) -> StatsSnapshot {
        let last_message_age_secs = self
            .last_message_at()
            .map(|at| at.elapsed().as_secs_f64());
        StatsSnapshot {
            state: self.state(),
            connected_at: *self.connected_at.read(),
            last_message_age_secs,
            messages_received: self.messages_received.load(Ordering::Relaxed),
            quotes_received: self.quotes_received.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            reconnect_attempts: self.reconnect_attempts(),
            total_disconnects: self.total_disconnects.load(Ordering::Relaxed),
            subscribed_symbols: self.subscribed_symbols(),
            last_error: self.last_error.read().clone(),
        }
    }
}

/// Serializable point-in-time view of [`ConnectionStats`].
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    /// Lifecycle state at capture time.
    pub state: ConnectionState,
    /// When the current connection was established, if connected.
    pub connected_at: Option<DateTime<Utc>>,
    /// Seconds since the last inbound frame, if any frame has arrived.
    pub last_message_age_secs: Option<f64>,
    /// Total inbound frames across all connections.
    pub messages_received: u64,
    /// Option quotes routed across all connections.
    pub quotes_received: u64,
    /// Total outbound commands across all connections.
    pub messages_sent: u64,
    /// Failed connect/read cycles since the last successful connect.
    pub reconnect_attempts: u32,
    /// Established connections that have been lost.
    pub total_disconnects: u64,
    /// Symbols from the upstream's most recent status report.
    pub subscribed_symbols: Vec<String>,
    /// Reason recorded for the most recent disconnect, if any.
    pub last_error: Option<String>,
}
