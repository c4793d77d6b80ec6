//! OCC Option Symbol Codec
//!
//! Converts between trading positions and the fixed-width OCC option symbols
//! used by the upstream quote-streaming service.
//!
//! Layout: 6-char ticker (space-padded right) + 6-digit date (YYMMDD) +
//! 1-char kind (`P`/`C`) + 8-digit strike (price x 1000, zero-padded).
//! Example: `AAPL  260220C00230000` = AAPL Feb 20 2026 $230 Call.

use chrono::NaiveDate;

use crate::domain::position::Position;

/// Total length of a well-formed OCC symbol.
pub const OCC_SYMBOL_LEN: usize = 21;

/// Option kind carried in the 13th character of the symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// Put option (`P`).
    Put,
    /// Call option (`C`).
    Call,
}

impl OptionKind {
    /// Derive the kind from a position-type string.
    ///
    /// Any type containing "put" (case-insensitive) is a put; everything
    /// else, including bare "call" and spread variants, is a call.
    #[must_use]
    pub fn from_position_type(position_type: &str) -> Self {
        if position_type.to_lowercase().contains("put") {
            Self::Put
        } else {
            Self::Call
        }
    }

    /// Single-character wire representation.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Put => 'P',
            Self::Call => 'C',
        }
    }
}

/// Errors produced by OCC symbol conversion.
#[derive(Debug, thiserror::Error)]
pub enum OccError {
    /// Expiry string did not parse as a YYYY-MM-DD calendar date.
    #[error("invalid expiry date: {0}, expected YYYY-MM-DD")]
    InvalidExpiry(String),

    /// Symbol is shorter than the fixed 21-char layout.
    #[error("invalid OCC symbol length: {0}")]
    InvalidSymbolLength(String),

    /// Symbol contains characters outside the ASCII layout.
    #[error("invalid character in OCC symbol: {0}")]
    InvalidSymbolCharset(String),

    /// Date field of a symbol did not parse as YYMMDD.
    #[error("invalid date in OCC symbol: {0}")]
    InvalidSymbolDate(String),

    /// Kind field of a symbol was neither `P` nor `C`.
    #[error("invalid option kind in OCC symbol: {0}")]
    InvalidSymbolKind(char),

    /// Strike field of a symbol was not an 8-digit number.
    #[error("invalid strike in OCC symbol: {0}")]
    InvalidSymbolStrike(String),

    /// Position is missing a field required for conversion.
    #[error("position missing {0}")]
    MissingField(&'static str),
}

/// Convert a single option leg to its OCC symbol.
///
/// # Errors
///
/// Returns `OccError::InvalidExpiry` if `expiry` is not a YYYY-MM-DD date.
pub fn position_to_occ(
    ticker: &str,
    expiry: &str,
    strike: f64,
    position_type: &str,
) -> Result<String, OccError> {
    let date = NaiveDate::parse_from_str(expiry, "%Y-%m-%d")
        .map_err(|_| OccError::InvalidExpiry(expiry.to_string()))?;

    let kind = OptionKind::from_position_type(position_type);

    #[allow(clippy::cast_possible_truncation)]
    let strike_thousandths = (strike * 1000.0).round() as i64;

    Ok(format!(
        "{:<6}{}{}{:08}",
        ticker.to_uppercase(),
        date.format("%y%m%d"),
        kind.as_char(),
        strike_thousandths
    ))
}

/// A parsed OCC option contract.
#[derive(Debug, Clone, PartialEq)]
pub struct OccContract {
    /// Underlying ticker, trimmed of padding.
    pub ticker: String,
    /// Expiration date.
    pub expiry: NaiveDate,
    /// Strike price.
    pub strike: f64,
    /// Put or call.
    pub kind: OptionKind,
}

/// Parse an OCC symbol back into its components.
///
/// # Errors
///
/// Returns an `OccError` if the symbol is shorter than 21 characters,
/// contains non-ASCII characters, or any field fails to parse.
pub fn parse_occ(symbol: &str) -> Result<OccContract, OccError> {
    let occ = symbol.trim().to_uppercase();
    if !occ.is_ascii() {
        return Err(OccError::InvalidSymbolCharset(occ));
    }
    if occ.len() < OCC_SYMBOL_LEN {
        return Err(OccError::InvalidSymbolLength(occ));
    }

    // ASCII-only from here, so byte indices are char boundaries.
    let ticker = occ[..6].trim().to_string();
    let date_str = &occ[6..12];
    let kind_char = occ
        .chars()
        .nth(12)
        .ok_or_else(|| OccError::InvalidSymbolLength(occ.clone()))?;
    let strike_str = &occ[13..21];

    let expiry = NaiveDate::parse_from_str(date_str, "%y%m%d")
        .map_err(|_| OccError::InvalidSymbolDate(date_str.to_string()))?;

    let kind = match kind_char {
        'P' => OptionKind::Put,
        'C' => OptionKind::Call,
        other => return Err(OccError::InvalidSymbolKind(other)),
    };

    let strike_thousandths: i64 = strike_str
        .parse()
        .map_err(|_| OccError::InvalidSymbolStrike(strike_str.to_string()))?;

    #[allow(clippy::cast_precision_loss)]
    let strike = strike_thousandths as f64 / 1000.0;

    Ok(OccContract {
        ticker,
        expiry,
        strike,
        kind,
    })
}

/// Convert one position into its OCC symbols.
///
/// Spreads contribute one symbol per present leg; single-leg options
/// contribute one symbol; stock/holding positions contribute none.
///
/// # Errors
///
/// Returns an `OccError` if a required field is missing or the expiry does
/// not parse.
pub fn position_symbols(position: &Position) -> Result<Vec<String>, OccError> {
    if position.is_stock() {
        return Ok(vec![]);
    }

    let position_type = position
        .position_type
        .as_deref()
        .ok_or(OccError::MissingField("type"))?;
    let expiry = position
        .expiry
        .as_deref()
        .ok_or(OccError::MissingField("expiry"))?;

    if position.is_spread() {
        let mut symbols = Vec::with_capacity(2);
        if let Some(buy) = position.buy_strike {
            symbols.push(position_to_occ(&position.ticker, expiry, buy, position_type)?);
        }
        if let Some(sell) = position.sell_strike {
            symbols.push(position_to_occ(
                &position.ticker,
                expiry,
                sell,
                position_type,
            )?);
        }
        Ok(symbols)
    } else {
        let strike = position.strike.ok_or(OccError::MissingField("strike"))?;
        Ok(vec![position_to_occ(
            &position.ticker,
            expiry,
            strike,
            position_type,
        )?])
    }
}

/// Convert a batch of positions into OCC subscription symbols.
///
/// A conversion failure for one position is logged and does not abort
/// conversion of the remaining positions.
#[must_use]
pub fn positions_to_occ_symbols(positions: &[Position]) -> Vec<String> {
    let mut symbols = Vec::new();

    for position in positions {
        match position_symbols(position) {
            Ok(mut converted) => symbols.append(&mut converted),
            Err(e) => {
                tracing::warn!(
                    ticker = %position.ticker,
                    error = %e,
                    "Skipping position during OCC conversion"
                );
            }
        }
    }

    symbols
}
