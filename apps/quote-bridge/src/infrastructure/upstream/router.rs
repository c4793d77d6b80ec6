//! Inbound Message Router
//!
//! Dispatches classified upstream messages: quotes and account activity
//! fan out through the broadcast hub, status snapshots additionally
//! refresh the subscribed-symbol list, and keepalives (heartbeat, pong)
//! refresh liveness only. Unrecognized messages are counted and dropped.

use std::sync::Arc;

use metrics::counter;

use super::messages::StreamMessage;
use super::stats::ConnectionStats;
use crate::infrastructure::broadcast::{
    AccountActivityBroadcast, EquityQuoteBroadcast, FuturesQuoteBroadcast, OptionQuoteBroadcast,
    SharedBroadcastHub, StatusBroadcast,
};

/// Routes decoded upstream messages to the broadcast hub and stats.
#[derive(Debug, Clone)]
pub struct MessageRouter {
    hub: SharedBroadcastHub,
    stats: Arc<ConnectionStats>,
}

impl MessageRouter {
    /// Create a router over the given hub and stats.
    #[must_use]
    pub const fn new(hub: SharedBroadcastHub, stats: Arc<ConnectionStats>) -> Self {
        Self { hub, stats }
    }

    /// Broadcast a synthetic status event announcing the bridge's own
    /// connect/disconnect, so viewers learn about upstream outages without
    /// waiting for an upstream status report. Disconnection notices carry
    /// the closure reason.
    pub fn announce_connection(&self, connected: bool, reason: Option<&str>) {
        let _ = self.hub.send_status(StatusBroadcast {
            timestamp: None,
            status: crate::infrastructure::upstream::messages::StatusData {
                connected: Some(connected),
                reason: reason.map(ToString::to_string),
                ..Default::default()
            },
        });
    }

    /// Dispatch one message. Liveness bookkeeping is the caller's job;
    /// this only routes.
    pub fn route(&self, message: StreamMessage) {
        match message {
            StreamMessage::OptionQuote { timestamp, quote } => {
                counter!("quote_bridge_messages_total", "type" => "option_quote").increment(1);
                self.stats.record_quote_received();
                let _ = self
                    .hub
                    .send_option_quote(OptionQuoteBroadcast { timestamp, quote });
            }
            StreamMessage::EquityQuote { timestamp, quote } => {
                counter!("quote_bridge_messages_total", "type" => "equity_quote").increment(1);
                let _ = self
                    .hub
                    .send_equity_quote(EquityQuoteBroadcast { timestamp, quote });
            }
            StreamMessage::FuturesQuote { timestamp, quote } => {
                counter!("quote_bridge_messages_total", "type" => "futures_quote").increment(1);
                let _ = self
                    .hub
                    .send_futures_quote(FuturesQuoteBroadcast { timestamp, quote });
            }
            StreamMessage::AccountActivity { timestamp, data } => {
                counter!("quote_bridge_messages_total", "type" => "account_activity").increment(1);
                let _ = self
                    .hub
                    .send_account_activity(AccountActivityBroadcast { timestamp, data });
            }
            StreamMessage::Status { timestamp, status } => {
                counter!("quote_bridge_messages_total", "type" => "status").increment(1);
                self.stats.set_subscribed_symbols(status.all_symbols());
                tracing::debug!(
                    options = status.subscribed_options.len(),
                    equities = status.subscribed_equities.len(),
                    futures = status.subscribed_futures.len(),
                    "Upstream status received"
                );
                let _ = self.hub.send_status(StatusBroadcast { timestamp, status });
            }
            StreamMessage::Heartbeat { .. } => {
                counter!("quote_bridge_messages_total", "type" => "heartbeat").increment(1);
            }
            StreamMessage::Pong => {
                counter!("quote_bridge_messages_total", "type" => "pong").increment(1);
            }
            StreamMessage::Unknown { message_type } => {
                counter!("quote_bridge_messages_total", "type" => "unknown").increment(1);
                tracing::debug!(
                    message_type = message_type.as_deref().unwrap_or("<missing>"),
                    "Dropping unrecognized upstream message"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::broadcast::BroadcastHub;
    use crate::infrastructure::upstream::messages::{OptionQuoteData, StatusData};

    fn make_router() -> (MessageRouter, SharedBroadcastHub, Arc<ConnectionStats>) {
        let hub = Arc::new(BroadcastHub::with_defaults());
        let stats = Arc::new(ConnectionStats::new());
        (
            MessageRouter::new(Arc::clone(&hub), Arc::clone(&stats)),
            hub,
            stats,
        )
    }

    #[tokio::test]
    async fn option_quote_reaches_subscribers_and_is_counted() {
        let (router, hub, stats) = make_router();
        let mut rx = hub.option_quotes_rx();

        router.route(StreamMessage::OptionQuote {
            timestamp: Some("t".to_string()),
            quote: OptionQuoteData {
                symbol: "SPY   260320P00500000".to_string(),
                ..Default::default()
            },
        });

        let received = rx.recv().await.unwrap();
        assert_eq!(received.quote.symbol, "SPY   260320P00500000");
        assert_eq!(stats.snapshot().quotes_received, 1);
    }

    #[tokio::test]
    async fn only_option_quotes_bump_the_quote_counter() {
        let (router, hub, stats) = make_router();
        let _keep_open = hub.equity_quotes_rx();

        router.route(StreamMessage::EquityQuote {
            timestamp: None,
            quote: crate::infrastructure::upstream::messages::EquityQuoteData::default(),
        });

        assert_eq!(stats.snapshot().quotes_received, 0);
    }

    #[tokio::test]
    async fn status_updates_symbols_and_broadcasts() {
        let (router, hub, stats) = make_router();
        let mut rx = hub.status_rx();

        router.route(StreamMessage::Status {
            timestamp: None,
            status: StatusData {
                connected: Some(true),
                subscribed_options: vec!["AAPL  260220C00230000".to_string()],
                subscribed_equities: vec!["AAPL".to_string()],
                ..Default::default()
            },
        });

        assert_eq!(
            stats.subscribed_symbols(),
            vec!["AAPL  260220C00230000", "AAPL"]
        );
        assert!(rx.recv().await.unwrap().status.connected.unwrap());
    }

    #[tokio::test]
    async fn keepalives_are_not_broadcast() {
        let (router, hub, _stats) = make_router();
        let mut rx = hub.status_rx();

        router.route(StreamMessage::Heartbeat {
            timestamp: Some("t".to_string()),
        });
        router.route(StreamMessage::Pong);

        assert!(matches!(
            rx.try_recv(),
            Err(tokio::sync::broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn connection_announcement_does_not_touch_symbols() {
        let (router, hub, stats) = make_router();
        stats.set_subscribed_symbols(vec!["AAPL".to_string()]);
        let mut rx = hub.status_rx();

        router.announce_connection(false, None);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.status.connected, Some(false));
        assert_eq!(stats.subscribed_symbols(), vec!["AAPL"]);
    }

    #[tokio::test]
    async fn disconnection_notice_carries_the_reason() {
        let (router, hub, _stats) = make_router();
        let mut rx = hub.status_rx();

        router.announce_connection(false, Some("silence_timeout"));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.status.connected, Some(false));
        assert_eq!(received.status.reason.as_deref(), Some("silence_timeout"));
    }

    #[test]
    fn unknown_message_is_dropped_quietly() {
        let (router, _hub, stats) = make_router();
        router.route(StreamMessage::Unknown {
            message_type: Some("order_book".to_string()),
        });
        assert!(stats.subscribed_symbols().is_empty());
    }
}
