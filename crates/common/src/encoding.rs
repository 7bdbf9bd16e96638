// Decoding rules for values announced by the ledger.
//
// Identity fields arrive as `0x`-prefixed hex of a UTF-8 string (the wire
// mirrors account addresses); timestamps arrive as integer epoch seconds,
// either as a JSON number or a decimal string.

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Prefix carried by every hex-encoded wire value.
pub const HEX_PREFIX_LEN: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("`{field}` must start with a 0x prefix")]
    MissingHexPrefix { field: &'static str },
    #[error("`{field}` is not valid hex: {reason}")]
    InvalidHex { field: &'static str, reason: String },
    #[error("`{field}` does not decode to UTF-8 text")]
    InvalidUtf8 { field: &'static str },
    #[error("`{field}` is not an integer epoch timestamp")]
    InvalidTimestamp { field: &'static str },
    #[error("`{field}` is out of the representable time range")]
    TimestampOutOfRange { field: &'static str },
}

/// Decodes a `0x<hex>` value into the UTF-8 string it encodes.
///
/// Odd-length payloads and non-hex characters are rejected rather than
/// truncated.
pub fn decode_hex_text(field: &'static str, value: &str) -> Result<String, DecodeError> {
    let payload = strip_hex_prefix(field, value)?;
    let bytes = hex::decode(payload)
        .map_err(|error| DecodeError::InvalidHex { field, reason: error.to_string() })?;

    String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8 { field })
}

fn strip_hex_prefix<'a>(field: &'static str, value: &'a str) -> Result<&'a str, DecodeError> {
    match value.get(..HEX_PREFIX_LEN) {
        Some("0x") | Some("0X") => Ok(&value[HEX_PREFIX_LEN..]),
        _ => Err(DecodeError::MissingHexPrefix { field }),
    }
}

/// Parses an integer epoch (seconds) into an absolute instant.
pub fn parse_epoch_seconds(field: &'static str, value: &Value) -> Result<DateTime<Utc>, DecodeError> {
    let seconds = match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or(DecodeError::InvalidTimestamp { field })?;

    DateTime::<Utc>::from_timestamp(seconds, 0).ok_or(DecodeError::TimestampOutOfRange { field })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{decode_hex_text, parse_epoch_seconds, DecodeError};

    #[test]
    fn decodes_prefixed_hex_identity() {
        assert_eq!(decode_hex_text("subjectAccount", "0x7573657231"), Ok("user1".to_owned()));
        assert_eq!(decode_hex_text("grantedByAccount", "0X61646D696E"), Ok("admin".to_owned()));
        assert_eq!(decode_hex_text("documentMetadata", "0x"), Ok(String::new()));
    }

    #[test]
    fn rejects_odd_length_hex() {
        let error = decode_hex_text("subjectAccount", "0x757").expect_err("odd length must fail");
        assert!(matches!(error, DecodeError::InvalidHex { field: "subjectAccount", .. }));
    }

    #[test]
    fn rejects_non_hex_characters() {
        let error = decode_hex_text("sender", "0x75zz").expect_err("non-hex must fail");
        assert!(matches!(error, DecodeError::InvalidHex { field: "sender", .. }));
    }

    #[test]
    fn rejects_missing_prefix() {
        assert_eq!(
            decode_hex_text("sender", "7573"),
            Err(DecodeError::MissingHexPrefix { field: "sender" })
        );
        assert_eq!(
            decode_hex_text("sender", "x"),
            Err(DecodeError::MissingHexPrefix { field: "sender" })
        );
    }

    #[test]
    fn rejects_invalid_utf8_payload() {
        assert_eq!(
            decode_hex_text("sender", "0xff"),
            Err(DecodeError::InvalidUtf8 { field: "sender" })
        );
    }

    #[test]
    fn parses_numeric_and_string_epochs() {
        let from_number = parse_epoch_seconds("timestamp", &json!(1_700_000_000)).expect("number");
        let from_string = parse_epoch_seconds("timestamp", &json!("1700000000")).expect("string");
        assert_eq!(from_number, from_string);
        assert_eq!(from_number.to_rfc3339(), "2023-11-14T22:13:20+00:00");
    }

    #[test]
    fn rejects_non_integer_epochs() {
        assert_eq!(
            parse_epoch_seconds("timestamp", &json!("yesterday")),
            Err(DecodeError::InvalidTimestamp { field: "timestamp" })
        );
        assert_eq!(
            parse_epoch_seconds("timestamp", &json!(1.5)),
            Err(DecodeError::InvalidTimestamp { field: "timestamp" })
        );
        assert_eq!(
            parse_epoch_seconds("timestamp", &json!(i64::MAX)),
            Err(DecodeError::TimestampOutOfRange { field: "timestamp" })
        );
    }
}
