//! Upstream Wire Message Types
//!
//! Wire format types for the upstream quote-streaming process. Inbound
//! events are UTF-8 JSON text frames of the shape `{type, timestamp, data}`;
//! outbound requests are `{command, ...args}`.
//!
//! The upstream `timestamp` is an opaque ISO-8601 string produced by the
//! remote process's own clock; it is relayed downstream, never parsed.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Outbound Commands
// =============================================================================

/// Outbound command to the upstream quote process.
///
/// # Wire Format (JSON)
/// ```json
/// {"command": "get_status"}
/// {"command": "subscribe_options", "symbols": ["AAPL  260220C00230000"]}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Request a status snapshot.
    GetStatus,
    /// Application-level keepalive; upstream answers with `pong`.
    Ping,
    /// Subscribe to option quotes by OCC symbol.
    SubscribeOptions {
        /// OCC symbols to subscribe.
        symbols: Vec<String>,
    },
    /// Unsubscribe from option quotes.
    UnsubscribeOptions {
        /// OCC symbols to unsubscribe.
        symbols: Vec<String>,
    },
    /// Subscribe to equity quotes by ticker.
    SubscribeEquities {
        /// Ticker symbols to subscribe.
        symbols: Vec<String>,
    },
    /// Subscribe to futures quotes.
    SubscribeFutures {
        /// Futures symbols to subscribe.
        symbols: Vec<String>,
    },
    /// Unsubscribe from futures quotes.
    UnsubscribeFutures {
        /// Futures symbols to unsubscribe.
        symbols: Vec<String>,
    },
}

impl Command {
    /// The wire name of this command.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::GetStatus => "get_status",
            Self::Ping => "ping",
            Self::SubscribeOptions { .. } => "subscribe_options",
            Self::UnsubscribeOptions { .. } => "unsubscribe_options",
            Self::SubscribeEquities { .. } => "subscribe_equities",
            Self::SubscribeFutures { .. } => "subscribe_futures",
            Self::UnsubscribeFutures { .. } => "unsubscribe_futures",
        }
    }
}

// =============================================================================
// Inbound Quote Payloads
// =============================================================================

/// Level 1 option quote payload.
///
/// All value fields are optional: the upstream process omits fields it has
/// no data for, and the bridge relays whatever subset arrived.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionQuoteData {
    /// OCC symbol of the contract.
    pub symbol: String,
    /// Bid price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid: Option<Decimal>,
    /// Ask price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ask: Option<Decimal>,
    /// Last trade price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<Decimal>,
    /// Mark price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mark: Option<Decimal>,
    /// Bid size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid_size: Option<i64>,
    /// Ask size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ask_size: Option<i64>,
    /// Total volume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<i64>,
    /// Open interest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_interest: Option<i64>,
    /// Delta greek.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<f64>,
    /// Gamma greek.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gamma: Option<f64>,
    /// Theta greek.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theta: Option<f64>,
    /// Vega greek.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vega: Option<f64>,
    /// Rho greek.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rho: Option<f64>,
    /// Implied volatility.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iv: Option<f64>,
    /// Price of the underlying.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underlying_price: Option<Decimal>,
    /// Days until expiration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_to_expiration: Option<i64>,
    /// Extrinsic value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_value: Option<Decimal>,
    /// Model value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theoretical_value: Option<Decimal>,
    /// Quote time in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_time: Option<i64>,
    /// Trade time in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_time: Option<i64>,
}

/// Level 1 equity quote payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquityQuoteData {
    /// Ticker symbol.
    pub symbol: String,
    /// Bid price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid: Option<Decimal>,
    /// Ask price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ask: Option<Decimal>,
    /// Last trade price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<Decimal>,
    /// Mark price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mark: Option<Decimal>,
    /// Bid size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid_size: Option<i64>,
    /// Ask size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ask_size: Option<i64>,
    /// Total volume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<i64>,
    /// Session high.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<Decimal>,
    /// Session low.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<Decimal>,
    /// Session open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open: Option<Decimal>,
    /// Previous close.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close: Option<Decimal>,
    /// Net change from previous close.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_change: Option<Decimal>,
    /// Net change percentage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_change_percent: Option<f64>,
    /// 52-week high.
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "high52Week")]
    pub high_52_week: Option<Decimal>,
    /// 52-week low.
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "low52Week")]
    pub low_52_week: Option<Decimal>,
    /// Quote time in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_time: Option<i64>,
    /// Trade time in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_time: Option<i64>,
}

/// Level 1 futures quote payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuturesQuoteData {
    /// Futures contract symbol (e.g. "/ES").
    pub symbol: String,
    /// Bid price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid: Option<Decimal>,
    /// Ask price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ask: Option<Decimal>,
    /// Last trade price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<Decimal>,
    /// Mark price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mark: Option<Decimal>,
    /// Bid size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid_size: Option<i64>,
    /// Ask size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ask_size: Option<i64>,
    /// Total volume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<i64>,
    /// Open interest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_interest: Option<i64>,
    /// Quote time in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_time: Option<i64>,
}

/// Status payload reported by the upstream process.
///
/// # Wire Format (JSON)
/// ```json
/// {
///   "connected": true,
///   "subscribed_options": ["AAPL  260220C00230000"],
///   "subscribed_equities": ["AAPL"],
///   "subscribed_futures": []
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusData {
    /// Whether the upstream process reports itself connected to its feed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected: Option<bool>,
    /// Closure reason on a synthetic disconnection notice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Currently subscribed OCC option symbols.
    #[serde(default)]
    pub subscribed_options: Vec<String>,
    /// Currently subscribed equity tickers.
    #[serde(default)]
    pub subscribed_equities: Vec<String>,
    /// Currently subscribed futures symbols.
    #[serde(default)]
    pub subscribed_futures: Vec<String>,
}

impl StatusData {
    /// All subscribed symbols in upstream-reported order
    /// (options, then equities, then futures).
    #[must_use]
    pub fn all_symbols(&self) -> Vec<String> {
        let mut symbols = Vec::with_capacity(
            self.subscribed_options.len()
                + self.subscribed_equities.len()
                + self.subscribed_futures.len(),
        );
        symbols.extend_from_slice(&self.subscribed_options);
        symbols.extend_from_slice(&self.subscribed_equities);
        symbols.extend_from_slice(&self.subscribed_futures);
        symbols
    }
}

// =============================================================================
// Inbound Message Union
// =============================================================================

/// A classified inbound message from the upstream process.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    /// Real-time option quote.
    OptionQuote {
        /// Upstream-reported timestamp, relayed verbatim.
        timestamp: Option<String>,
        /// Quote payload.
        quote: OptionQuoteData,
    },
    /// Real-time equity quote.
    EquityQuote {
        /// Upstream-reported timestamp, relayed verbatim.
        timestamp: Option<String>,
        /// Quote payload.
        quote: EquityQuoteData,
    },
    /// Real-time futures quote.
    FuturesQuote {
        /// Upstream-reported timestamp, relayed verbatim.
        timestamp: Option<String>,
        /// Quote payload.
        quote: FuturesQuoteData,
    },
    /// Account activity (order fills, etc.), relayed as-is.
    AccountActivity {
        /// Upstream-reported timestamp, relayed verbatim.
        timestamp: Option<String>,
        /// Opaque activity payload.
        data: serde_json::Value,
    },
    /// Status snapshot with the upstream's subscription lists.
    Status {
        /// Upstream-reported timestamp, relayed verbatim.
        timestamp: Option<String>,
        /// Status payload.
        status: StatusData,
    },
    /// Upstream keepalive; refreshes liveness, never broadcast.
    Heartbeat {
        /// Upstream-reported timestamp.
        timestamp: Option<String>,
    },
    /// Acknowledgment of a `ping` command; never broadcast.
    Pong,
    /// Message with an unrecognized or missing `type` field.
    Unknown {
        /// The unrecognized type, if one was present.
        message_type: Option<String>,
    },
}

impl StreamMessage {
    /// The wire `type` of this message, if it has a recognized one.
    #[must_use]
    pub fn type_name(&self) -> Option<&str> {
        match self {
            Self::OptionQuote { .. } => Some("option_quote"),
            Self::EquityQuote { .. } => Some("equity_quote"),
            Self::FuturesQuote { .. } => Some("futures_quote"),
            Self::AccountActivity { .. } => Some("account_activity"),
            Self::Status { .. } => Some("status"),
            Self::Heartbeat { .. } => Some("heartbeat"),
            Self::Pong => Some("pong"),
            Self::Unknown { message_type } => message_type.as_deref(),
        }
    }
}
