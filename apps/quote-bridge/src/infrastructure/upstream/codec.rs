//! Upstream Frame Codec
//!
//! Decodes inbound JSON text frames into [`StreamMessage`] values and
//! encodes outbound [`Command`]s. Classification is driven by the frame's
//! top-level `type` field; a missing or unrecognized `type` decodes to
//! [`StreamMessage::Unknown`] rather than an error, so callers can count
//! and drop such frames without treating them as protocol failures.

use serde_json::Value;
use thiserror::Error;

use super::messages::{Command, StreamMessage};

/// Errors produced while decoding or encoding upstream frames.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The frame was not valid JSON.
    #[error("malformed JSON frame: {0}")]
    MalformedJson(#[from] serde_json::Error),

    /// The frame's JSON root was not an object.
    #[error("frame root is not a JSON object")]
    NotAnObject,

    /// A typed frame carried a `data` payload that does not match its type.
    #[error("invalid {message_type} payload: {source}")]
    InvalidPayload {
        /// The frame's declared `type`.
        message_type: String,
        /// The underlying deserialization error.
        source: serde_json::Error,
    },
}

/// Decode one inbound text frame.
///
/// # Errors
///
/// Returns [`CodecError`] when the frame is not a JSON object or when a
/// recognized `type` carries a payload that fails to deserialize. Frames
/// with an unrecognized `type` are not errors; they decode to
/// [`StreamMessage::Unknown`].
pub fn decode_frame(text: &str) -> Result<StreamMessage, CodecError> {
    let root: Value = serde_json::from_str(text)?;
    let Value::Object(mut frame) = root else {
        return Err(CodecError::NotAnObject);
    };

    let message_type = frame
        .get("type")
        .and_then(Value::as_str)
        .map(str::to_string);
    let timestamp = frame
        .get("timestamp")
        .and_then(Value::as_str)
        .map(str::to_string);
    let data = frame.remove("data").unwrap_or(Value::Null);

    let Some(message_type) = message_type else {
        return Ok(StreamMessage::Unknown { message_type: None });
    };

    match message_type.as_str() {
        "option_quote" => Ok(StreamMessage::OptionQuote {
            timestamp,
            quote: payload(&message_type, data)?,
        }),
        "equity_quote" => Ok(StreamMessage::EquityQuote {
            timestamp,
            quote: payload(&message_type, data)?,
        }),
        "futures_quote" => Ok(StreamMessage::FuturesQuote {
            timestamp,
            quote: payload(&message_type, data)?,
        }),
        "account_activity" => Ok(StreamMessage::AccountActivity { timestamp, data }),
        "status" => Ok(StreamMessage::Status {
            timestamp,
            status: payload(&message_type, data)?,
        }),
        "heartbeat" => Ok(StreamMessage::Heartbeat { timestamp }),
        "pong" => Ok(StreamMessage::Pong),
        _ => Ok(StreamMessage::Unknown {
            message_type: Some(message_type),
        }),
    }
}

fn payload<T: serde::de::DeserializeOwned>(
    message_type: &str,
    data: Value,
) -> Result<T, CodecError> {
    serde_json::from_value(data).map_err(|source| CodecError::InvalidPayload {
        message_type: message_type.to_string(),
        source,
    })
}

/// Encode an outbound command as a JSON text frame.
///
/// # Errors
///
/// Returns [`CodecError::MalformedJson`] if serialization fails, which for
/// these types does not happen in practice.
pub fn encode_command(command: &Command) -> Result<String, CodecError> {
    Ok(serde_json::to_string(command)?)
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(r#"{"type": "option_quote", "data": {"symbol": "SPY   260320P00500000"}}"#, "option_quote")]
    #[test_case(r#"{"type": "equity_quote", "data": {"symbol": "SPY"}}"#, "equity_quote")]
    #[test_case(r#"{"type": "futures_quote", "data": {"symbol": "/ES"}}"#, "futures_quote")]
    #[test_case(r#"{"type": "account_activity", "data": {"event": "fill"}}"#, "account_activity")]
    #[test_case(r#"{"type": "status", "data": {}}"#, "status")]
    #[test_case(r#"{"type": "heartbeat"}"#, "heartbeat")]
    #[test_case(r#"{"type": "pong"}"#, "pong")]
    #[test_case(r#"{"type": "order_book", "data": {}}"#, "order_book")]
    fn classifies_frame_by_type(frame: &str, expected: &str) {
        assert_eq!(decode_frame(frame).unwrap().type_name(), Some(expected));
    }

    #[test]
    fn decodes_option_quote() {
        let frame = r#"{
            "type": "option_quote",
            "timestamp": "2026-02-20T14:30:00.123456",
            "data": {"symbol": "AAPL  260220C00230000", "bid": 5.25, "ask": 5.35, "delta": 0.52}
        }"#;
        let msg = decode_frame(frame).unwrap();
        match msg {
            StreamMessage::OptionQuote { timestamp, quote } => {
                assert_eq!(timestamp.as_deref(), Some("2026-02-20T14:30:00.123456"));
                assert_eq!(quote.symbol, "AAPL  260220C00230000");
                assert_eq!(quote.delta, Some(0.52));
            }
            other => panic!("expected option quote, got {other:?}"),
        }
    }

    #[test]
    fn decodes_status_with_subscription_lists() {
        let frame = r#"{
            "type": "status",
            "timestamp": "2026-02-20T14:30:00",
            "data": {
                "connected": true,
                "subscribed_options": ["AAPL  260220C00230000"],
                "subscribed_equities": ["AAPL"],
                "subscribed_futures": []
            }
        }"#;
        match decode_frame(frame).unwrap() {
            StreamMessage::Status { status, .. } => {
                assert_eq!(status.connected, Some(true));
                assert_eq!(status.subscribed_options.len(), 1);
            }
            other => panic!("expected status, got {other:?}"),
        }
    }

    #[test]
    fn decodes_heartbeat_ignoring_payload() {
        let frame = r#"{"type": "heartbeat", "timestamp": "t", "data": {"subscribed_options": 3}}"#;
        assert!(matches!(
            decode_frame(frame).unwrap(),
            StreamMessage::Heartbeat { .. }
        ));
    }

    #[test]
    fn decodes_pong() {
        assert!(matches!(
            decode_frame(r#"{"type": "pong"}"#).unwrap(),
            StreamMessage::Pong
        ));
    }

    #[test]
    fn unrecognized_type_is_unknown_not_error() {
        match decode_frame(r#"{"type": "order_book", "data": {}}"#).unwrap() {
            StreamMessage::Unknown { message_type } => {
                assert_eq!(message_type.as_deref(), Some("order_book"));
            }
            other => panic!("expected unknown, got {other:?}"),
        }
    }

    #[test]
    fn missing_type_is_unknown() {
        match decode_frame(r#"{"timestamp": "t", "data": {}}"#).unwrap() {
            StreamMessage::Unknown { message_type } => assert!(message_type.is_none()),
            other => panic!("expected unknown, got {other:?}"),
        }
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            decode_frame("{not json"),
            Err(CodecError::MalformedJson(_))
        ));
    }

    #[test]
    fn non_object_root_is_an_error() {
        assert!(matches!(
            decode_frame(r#"["option_quote"]"#),
            Err(CodecError::NotAnObject)
        ));
    }

    #[test]
    fn quote_with_wrong_payload_shape_is_an_error() {
        let frame = r#"{"type": "equity_quote", "data": {"bid": 1.0}}"#;
        assert!(matches!(
            decode_frame(frame),
            Err(CodecError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn encodes_subscribe_command() {
        let json = encode_command(&Command::SubscribeFutures {
            symbols: vec!["/ES".to_string()],
        })
        .unwrap();
        assert_eq!(json, r#"{"command":"subscribe_futures","symbols":["/ES"]}"#);
    }
}
