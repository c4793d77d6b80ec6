//! Application Services
//!
//! The subscription façade sits between the outer surfaces (HTTP API,
//! viewer commands) and the upstream connection. It validates symbol
//! lists, converts positions to OCC symbols where needed, and forwards
//! subscription commands. The boolean it returns is the delivery result
//! for the current connection; nothing is queued for later.

use thiserror::Error;

use crate::domain::occ::positions_to_occ_symbols;
use crate::domain::position::Position;
use crate::infrastructure::upstream::messages::Command;
use crate::infrastructure::upstream::{StatsSnapshot, UpstreamHandle};

/// Errors surfaced by the subscription façade.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FacadeError {
    /// The request resolved to zero symbols.
    #[error("no symbols to act on")]
    EmptySymbolList,
}

/// Subscription façade over the upstream connection.
#[derive(Debug, Clone)]
pub struct SubscriptionFacade {
    upstream: UpstreamHandle,
}

impl SubscriptionFacade {
    /// Create a façade over the given upstream handle.
    #[must_use]
    pub const fn new(upstream: UpstreamHandle) -> Self {
        Self { upstream }
    }

    /// Subscribe to option quotes by OCC symbol.
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError::EmptySymbolList`] when `symbols` is empty;
    /// no command is sent in that case.
    pub fn subscribe_options(&self, symbols: Vec<String>) -> Result<bool, FacadeError> {
        self.forward(symbols, |symbols| Command::SubscribeOptions { symbols })
    }

    /// Unsubscribe from option quotes by OCC symbol.
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError::EmptySymbolList`] when `symbols` is empty.
    pub fn unsubscribe_options(&self, symbols: Vec<String>) -> Result<bool, FacadeError> {
        self.forward(symbols, |symbols| Command::UnsubscribeOptions { symbols })
    }

    /// Subscribe to equity quotes by ticker.
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError::EmptySymbolList`] when `symbols` is empty.
    pub fn subscribe_equities(&self, symbols: Vec<String>) -> Result<bool, FacadeError> {
        self.forward(symbols, |symbols| Command::SubscribeEquities { symbols })
    }

    /// Subscribe to futures quotes.
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError::EmptySymbolList`] when `symbols` is empty.
    pub fn subscribe_futures(&self, symbols: Vec<String>) -> Result<bool, FacadeError> {
        self.forward(symbols, |symbols| Command::SubscribeFutures { symbols })
    }

    /// Unsubscribe from futures quotes.
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError::EmptySymbolList`] when `symbols` is empty.
    pub fn unsubscribe_futures(&self, symbols: Vec<String>) -> Result<bool, FacadeError> {
        self.forward(symbols, |symbols| Command::UnsubscribeFutures { symbols })
    }

    /// Subscribe to option quotes for a batch of positions.
    ///
    /// Positions are converted through the OCC codec; stock holdings and
    /// unconvertible entries are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError::EmptySymbolList`] when no position yields a
    /// symbol.
    pub fn subscribe_option_positions(&self, positions: &[Position]) -> Result<bool, FacadeError> {
        self.subscribe_options(positions_to_occ_symbols(positions))
    }

    /// Unsubscribe from option quotes for a batch of positions.
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError::EmptySymbolList`] when no position yields a
    /// symbol.
    pub fn unsubscribe_option_positions(
        &self,
        positions: &[Position],
    ) -> Result<bool, FacadeError> {
        self.unsubscribe_options(positions_to_occ_symbols(positions))
    }

    /// Forward an arbitrary viewer command verbatim. Subscription commands
    /// go through the same empty-list validation as the typed operations.
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError::EmptySymbolList`] for a subscription command
    /// with no symbols.
    pub fn forward_command(&self, command: Command) -> Result<bool, FacadeError> {
        match &command {
            Command::SubscribeOptions { symbols }
            | Command::UnsubscribeOptions { symbols }
            | Command::SubscribeEquities { symbols }
            | Command::SubscribeFutures { symbols }
            | Command::UnsubscribeFutures { symbols }
                if symbols.is_empty() =>
            {
                Err(FacadeError::EmptySymbolList)
            }
            _ => Ok(self.upstream.send(command)),
        }
    }

    /// Current connection stats snapshot.
    #[must_use]
    pub fn stats_snapshot(&self) -> StatsSnapshot {
        self.upstream.stats().snapshot()
    }

    fn forward(
        &self,
        symbols: Vec<String>,
        build: impl FnOnce(Vec<String>) -> Command,
    ) -> Result<bool, FacadeError> {
        if symbols.is_empty() {
            return Err(FacadeError::EmptySymbolList);
        }
        Ok(self.upstream.send(build(symbols)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio_test::{assert_err, assert_ok};
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::infrastructure::broadcast::BroadcastHub;
    use crate::infrastructure::upstream::monitor::MonitorConfig;
    use crate::infrastructure::upstream::reconnect::ReconnectPolicy;
    use crate::infrastructure::upstream::{
        ConnectionStats, MessageRouter, UpstreamClient, UpstreamClientConfig,
    };

    fn make_facade(connected: bool) -> (UpstreamClient, SubscriptionFacade) {
        let stats = Arc::new(ConnectionStats::new());
        if connected {
            stats.mark_connected();
        }
        let hub = Arc::new(BroadcastHub::with_defaults());
        let router = MessageRouter::new(hub, Arc::clone(&stats));
        let config = UpstreamClientConfig {
            url: "ws://localhost:8889".to_string(),
            reconnect: ReconnectPolicy::default(),
            monitor: MonitorConfig::default(),
        };
        let (client, handle) =
            UpstreamClient::new(config, stats, router, CancellationToken::new());
        (client, SubscriptionFacade::new(handle))
    }

    #[test]
    fn empty_symbol_list_is_rejected_before_sending() {
        let (_client, facade) = make_facade(true);
        assert_eq!(
            facade.subscribe_options(vec![]),
            Err(FacadeError::EmptySymbolList)
        );
        assert_eq!(
            facade.unsubscribe_futures(vec![]),
            Err(FacadeError::EmptySymbolList)
        );
    }

    #[test]
    fn disconnected_send_returns_false_not_error() {
        let (_client, facade) = make_facade(false);
        let delivered = assert_ok!(facade.subscribe_equities(vec!["AAPL".to_string()]));
        assert!(!delivered);
    }

    #[test]
    fn connected_send_is_delivered() {
        let (_client, facade) = make_facade(true);
        let delivered =
            assert_ok!(facade.subscribe_options(vec!["AAPL  260220C00230000".to_string()]));
        assert!(delivered);
    }

    #[test]
    fn positions_without_symbols_are_rejected() {
        let (_client, facade) = make_facade(true);
        let stock = Position {
            ticker: "AAPL".to_string(),
            position_type: Some("stock".to_string()),
            expiry: None,
            strike: None,
            buy_strike: None,
            sell_strike: None,
        };
        assert_eq!(
            facade.subscribe_option_positions(&[stock]),
            Err(FacadeError::EmptySymbolList)
        );
    }

    #[test]
    fn forward_validates_subscription_commands() {
        let (_client, facade) = make_facade(true);
        assert_err!(facade.forward_command(Command::SubscribeFutures { symbols: vec![] }));
        assert_eq!(facade.forward_command(Command::GetStatus), Ok(true));
    }
}
