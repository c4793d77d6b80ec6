//! Broadcast Channel Adapters
//!
//! Fan-out of upstream messages to viewer connections using tokio
//! broadcast channels.
//!
//! # Architecture
//!
//! The `BroadcastHub` provides a separate channel per message class:
//! option quotes, equity quotes, futures quotes, account activity, and
//! status snapshots. Every viewer subscribes to every channel, so each
//! broadcast reaches each connected viewer. Slow viewers that fall more
//! than a channel's capacity behind observe a lag error and skip ahead
//! rather than stalling the feed.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::BroadcastSettings;
use crate::infrastructure::upstream::messages::{
    EquityQuoteData, FuturesQuoteData, OptionQuoteData, StatusData,
};

// =============================================================================
// Broadcast Messages
// =============================================================================

/// Option quote broadcast message.
#[derive(Debug, Clone)]
pub struct OptionQuoteBroadcast {
    /// Upstream timestamp, relayed verbatim.
    pub timestamp: Option<String>,
    /// The quote data.
    pub quote: OptionQuoteData,
}

/// Equity quote broadcast message.
#[derive(Debug, Clone)]
pub struct EquityQuoteBroadcast {
    /// Upstream timestamp, relayed verbatim.
    pub timestamp: Option<String>,
    /// The quote data.
    pub quote: EquityQuoteData,
}

/// Futures quote broadcast message.
#[derive(Debug, Clone)]
pub struct FuturesQuoteBroadcast {
    /// Upstream timestamp, relayed verbatim.
    pub timestamp: Option<String>,
    /// The quote data.
    pub quote: FuturesQuoteData,
}

/// Account activity broadcast message.
#[derive(Debug, Clone)]
pub struct AccountActivityBroadcast {
    /// Upstream timestamp, relayed verbatim.
    pub timestamp: Option<String>,
    /// Opaque activity payload.
    pub data: serde_json::Value,
}

/// Status snapshot broadcast message.
#[derive(Debug, Clone)]
pub struct StatusBroadcast {
    /// Upstream timestamp, relayed verbatim.
    pub timestamp: Option<String>,
    /// The status data.
    pub status: StatusData,
}

// =============================================================================
// Broadcast Hub
// =============================================================================

/// Configuration for broadcast channel capacities.
#[derive(Debug, Clone, Copy)]
pub struct BroadcastConfig {
    /// Capacity for the option quote channel.
    pub option_quotes_capacity: usize,
    /// Capacity for the equity quote channel.
    pub equity_quotes_capacity: usize,
    /// Capacity for the futures quote channel.
    pub futures_quotes_capacity: usize,
    /// Capacity for the account activity channel.
    pub account_activity_capacity: usize,
    /// Capacity for the status channel.
    pub status_capacity: usize,
}

impl Default for BroadcastConfig {
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

impl From<BroadcastSettings> for BroadcastConfig {
    fn from(settings: BroadcastSettings) -> Self {
        Self {
            option_quotes_capacity: settings.option_quotes_capacity,
            equity_quotes_capacity: settings.equity_quotes_capacity,
            futures_quotes_capacity: settings.futures_quotes_capacity,
            account_activity_capacity: settings.account_activity_capacity,
            status_capacity: settings.status_capacity,
        }
    }
}

/// Central hub for all broadcast channels.
#[derive(Debug)]
pub struct BroadcastHub {
    option_quotes_tx: broadcast::Sender<OptionQuoteBroadcast>,
    equity_quotes_tx: broadcast::Sender<EquityQuoteBroadcast>,
    futures_quotes_tx: broadcast::Sender<FuturesQuoteBroadcast>,
    account_activity_tx: broadcast::Sender<AccountActivityBroadcast>,
    status_tx: broadcast::Sender<StatusBroadcast>,
}

impl BroadcastHub {
    /// Create a new broadcast hub with the given configuration.
    #[must_use]
    pub fn new(config: BroadcastConfig) -> Self {
        Self {
            option_quotes_tx: broadcast::channel(config.option_quotes_capacity).0,
            equity_quotes_tx: broadcast::channel(config.equity_quotes_capacity).0,
            futures_quotes_tx: broadcast::channel(config.futures_quotes_capacity).0,
            account_activity_tx: broadcast::channel(config.account_activity_capacity).0,
            status_tx: broadcast::channel(config.status_capacity).0,
        }
    }

    /// Create a new broadcast hub with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(BroadcastConfig::default())
    }

    /// Send an option quote to all subscribers.
    ///
    /// Returns the number of receivers that got the message, or `None`
    /// when no viewer is listening.
    pub fn send_option_quote(&self, message: OptionQuoteBroadcast) -> Option<usize> {
        self.option_quotes_tx.send(message).ok()
    }

    /// Get a new receiver for option quotes.
    #[must_use]
    pub fn option_quotes_rx(&self) -> broadcast::Receiver<OptionQuoteBroadcast> {
        self.option_quotes_tx.subscribe()
    }

    /// Send an equity quote to all subscribers.
    pub fn send_equity_quote(&self, message: EquityQuoteBroadcast) -> Option<usize> {
        self.equity_quotes_tx.send(message).ok()
    }

    /// Get a new receiver for equity quotes.
    #[must_use]
    pub fn equity_quotes_rx(&self) -> broadcast::Receiver<EquityQuoteBroadcast> {
        self.equity_quotes_tx.subscribe()
    }

    /// Send a futures quote to all subscribers.
    pub fn send_futures_quote(&self, message: FuturesQuoteBroadcast) -> Option<usize> {
        self.futures_quotes_tx.send(message).ok()
    }

    /// Get a new receiver for futures quotes.
    #[must_use]
    pub fn futures_quotes_rx(&self) -> broadcast::Receiver<FuturesQuoteBroadcast> {
        self.futures_quotes_tx.subscribe()
    }

    /// Send an account activity event to all subscribers.
    pub fn send_account_activity(&self, message: AccountActivityBroadcast) -> Option<usize> {
        self.account_activity_tx.send(message).ok()
    }

    /// Get a new receiver for account activity.
    #[must_use]
    pub fn account_activity_rx(&self) -> broadcast::Receiver<AccountActivityBroadcast> {
        self.account_activity_tx.subscribe()
    }

    /// Send a status snapshot to all subscribers.
    pub fn send_status(&self, message: StatusBroadcast) -> Option<usize> {
        self.status_tx.send(message).ok()
    }

    /// Get a new receiver for status snapshots.
    #[must_use]
    pub fn status_rx(&self) -> broadcast::Receiver<StatusBroadcast> {
        self.status_tx.subscribe()
    }

    /// Number of viewers currently subscribed to the option quote channel.
    ///
    /// Every viewer subscribes to every channel, so this doubles as the
    /// connected-viewer count.
    #[must_use]
    pub fn viewer_count(&self) -> usize {
        self.option_quotes_tx.receiver_count()
    }
}

/// Shared broadcast hub reference.
pub type SharedBroadcastHub = Arc<BroadcastHub>;

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn make_option_quote() -> OptionQuoteBroadcast {
        OptionQuoteBroadcast {
            timestamp: Some("2026-02-20T14:30:00".to_string()),
            quote: OptionQuoteData {
                symbol: "AAPL  260220C00230000".to_string(),
                bid: Some(Decimal::new(525, 2)),
                ask: Some(Decimal::new(535, 2)),
                ..Default::default()
            },
        }
    }

    #[test]
    fn hub_starts_with_no_viewers() {
        let hub = BroadcastHub::with_defaults();
        assert_eq!(hub.viewer_count(), 0);
    }

    #[test]
    fn send_with_no_receivers_returns_none() {
        let hub = BroadcastHub::with_defaults();
        assert!(hub.send_option_quote(make_option_quote()).is_none());
    }

    #[tokio::test]
    async fn send_and_receive_option_quote() {
        let hub = BroadcastHub::with_defaults();
        let mut rx = hub.option_quotes_rx();

        let delivered = hub.send_option_quote(make_option_quote());
        assert_eq!(delivered, Some(1));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.quote.symbol, "AAPL  260220C00230000");
    }

    #[tokio::test]
    async fn every_receiver_gets_every_message() {
        let hub = BroadcastHub::with_defaults();
        let mut rx1 = hub.status_rx();
        let mut rx2 = hub.status_rx();

        let _ = hub.send_status(StatusBroadcast {
            timestamp: None,
            status: StatusData {
                connected: Some(true),
                ..Default::default()
            },
        });

        let r1 = rx1.recv().await.unwrap();
        let r2 = rx2.recv().await.unwrap();
        assert_eq!(r1.status.connected, r2.status.connected);
    }

    #[test]
    fn viewer_count_tracks_receivers() {
        let hub = BroadcastHub::with_defaults();
        let _rx1 = hub.option_quotes_rx();
        assert_eq!(hub.viewer_count(), 1);
        {
            let _rx2 = hub.option_quotes_rx();
            assert_eq!(hub.viewer_count(), 2);
        }
        assert_eq!(hub.viewer_count(), 1);
    }
}
