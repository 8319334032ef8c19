//! Lenient field decoders for event payloads.
//!
//! The exchange is not consistent about quoting numbers: the same field can
//! arrive as `"67000.1"` on one channel and `67000.1` on another. Prices and
//! sizes are kept as strings to avoid losing precision.

use serde::de::Error;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

fn scalar_to_string<E: Error>(value: Value) -> Result<Option<String>, E> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        other => Err(E::custom(format!("expected a string or number, got {other}"))),
    }
}

/// String or number into `Option<String>`.
pub(crate) fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(d)? {
        Some(value) => scalar_to_string(value),
        None => Ok(None),
    }
}

/// Integer or numeric string into `Option<i64>`.
pub(crate) fn opt_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    match Option::<Value>::deserialize(d)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("{n} does not fit in i64"))),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("expected an integer, got {s:?}"))),
        Some(other) => Err(D::Error::custom(format!("expected an integer, got {other}"))),
    }
}

/// Boolean, or the strings `"true"`/`"false"`.
pub(crate) fn opt_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    match Option::<Value>::deserialize(d)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(b)),
        Some(Value::String(s)) => s
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("expected a boolean, got {s:?}"))),
        Some(other) => Err(D::Error::custom(format!("expected a boolean, got {other}"))),
    }
}

/// Flat list of strings or numbers, e.g. a candle.
pub(crate) fn string_vec<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let values = Option::<Vec<Value>>::deserialize(d)?.unwrap_or_default();
    values
        .into_iter()
        .map(|v| scalar_to_string(v).map(Option::unwrap_or_default))
        .collect()
}

/// Order book side: `[[price, size, ...], ...]` with string or number cells.
pub(crate) fn levels<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Vec<String>>, D::Error> {
    let rows = Option::<Vec<Vec<Value>>>::deserialize(d)?.unwrap_or_default();
    rows.into_iter()
        .map(|row| {
            row.into_iter()
                .map(|v| scalar_to_string(v).map(Option::unwrap_or_default))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize, Debug, Default)]
    struct Sample {
        #[serde(default, deserialize_with = "opt_string")]
        price: Option<String>,
        #[serde(default, deserialize_with = "opt_i64")]
        sequence: Option<i64>,
        #[serde(default, deserialize_with = "opt_bool")]
        trading: Option<bool>,
        #[serde(default, deserialize_with = "levels")]
        asks: Vec<Vec<String>>,
        #[serde(default, deserialize_with = "string_vec")]
        candles: Vec<String>,
    }

    #[test]
    fn test_numbers_and_strings() {
        let quoted: Sample = serde_json::from_value(json!({
            "price": "67000.1", "sequence": "1545896669145", "trading": "true"
        }))
        .unwrap();
        let bare: Sample = serde_json::from_value(json!({
            "price": 67000.1, "sequence": 1545896669145_i64, "trading": true
        }))
        .unwrap();

        assert_eq!(quoted.price.as_deref(), Some("67000.1"));
        assert_eq!(bare.price.as_deref(), Some("67000.1"));
        assert_eq!(quoted.sequence, Some(1545896669145));
        assert_eq!(bare.sequence, Some(1545896669145));
        assert_eq!(quoted.trading, Some(true));
        assert_eq!(bare.trading, Some(true));
    }

    #[test]
    fn test_missing_and_null() {
        let sample: Sample = serde_json::from_value(json!({"price": null})).unwrap();
        assert!(sample.price.is_none());
        assert!(sample.sequence.is_none());
        assert!(sample.asks.is_empty());
    }

    #[test]
    fn test_levels_mixed_cells() {
        let sample: Sample = serde_json::from_value(json!({
            "asks": [["9989", "8"], [9990, 0.5]],
            "candles": ["1589968800", 9786.9, "9740.8"]
        }))
        .unwrap();
        assert_eq!(sample.asks, vec![vec!["9989", "8"], vec!["9990", "0.5"]]);
        assert_eq!(sample.candles, vec!["1589968800", "9786.9", "9740.8"]);
    }

    #[test]
    fn test_rejects_objects() {
        let err = serde_json::from_value::<Sample>(json!({"price": {"a": 1}})).unwrap_err();
        assert!(err.to_string().contains("expected a string or number"));
    }
}
