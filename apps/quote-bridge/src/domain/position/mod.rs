//! Trading Position Model
//!
//! Positions as supplied by callers of the management surface. A position is
//! either a plain stock holding (no option leg), a single-leg option, or a
//! two-leg spread carrying `buyStrike`/`sellStrike`.

use serde::{Deserialize, Serialize};

/// A trading position to be converted into market-data subscriptions.
///
/// # Wire Format (JSON)
/// ```json
/// {"ticker": "AAPL", "type": "short_put", "expiry": "2026-02-20", "strike": 230.0}
/// {"ticker": "PLTR", "type": "put_spread", "expiry": "2026-03-20",
///  "buyStrike": 80.0, "sellStrike": 85.0}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Underlying ticker symbol (e.g. "AAPL").
    pub ticker: String,

    /// Position type: "stock", "holding", "put", "call", "short_put",
    /// "covered_call", "put_spread", "call_spread", ...
    #[serde(rename = "type", default)]
    pub position_type: Option<String>,

    /// Option expiration date as YYYY-MM-DD.
    #[serde(default)]
    pub expiry: Option<String>,

    /// Strike price for single-leg positions.
    #[serde(default)]
    pub strike: Option<f64>,

    /// Long-leg strike for spread positions.
    #[serde(default)]
    pub buy_strike: Option<f64>,

    /// Short-leg strike for spread positions.
    #[serde(default)]
    pub sell_strike: Option<f64>,
}

impl Position {
    /// Check if this position carries no option leg at all.
    #[must_use]
    pub fn is_stock(&self) -> bool {
        match self.position_type.as_deref() {
            None | Some("stock" | "holding") => true,
            Some(_) => false,
        }
    }

    /// Check if this position is a two-leg spread.
    #[must_use]
    pub fn is_spread(&self) -> bool {
        self.position_type
            .as_deref()
            .is_some_and(|t| t.contains("_spread"))
    }
}
