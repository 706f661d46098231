//! Serde helpers for transaction documents.
//!
//! Amounts are stored as JSON numbers by every client of the collection, so
//! `Decimal` values are written as numbers and read back from either numbers
//! or numeric strings.

use serde::{Deserialize, Deserializer};

/// Serde adapter for `Decimal` amounts encoded as JSON numbers.
pub mod amount {
    use std::str::FromStr;

    use rust_decimal::prelude::ToPrimitive;
    use rust_decimal::Decimal;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value.to_f64() {
            Some(number) => serializer.serialize_f64(number),
            None => Err(serde::ser::Error::custom(format!(
                "amount {value} cannot be represented as a number"
            ))),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        match &value {
            Value::Number(number) => decimal_from_number(number).ok_or_else(|| {
                serde::de::Error::custom(format!("invalid amount: {number}"))
            }),
            Value::String(s) => Decimal::from_str(s.trim())
                .map_err(|_| serde::de::Error::custom(format!("invalid amount: {s}"))),
            other => Err(serde::de::Error::custom(format!(
                "invalid amount type: {other}"
            ))),
        }
    }

    /// Converts a JSON number to a `Decimal` without going through `f64`
    /// when the textual form is exact.
    pub fn decimal_from_number(number: &serde_json::Number) -> Option<Decimal> {
        let text = number.to_string();
        Decimal::from_str(&text)
            .or_else(|_| Decimal::from_scientific(&text))
            .ok()
            .or_else(|| number.as_f64().and_then(Decimal::from_f64_retain))
    }
}

/// Deserialize an optional string, treating blank strings as None.
pub fn deserialize_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use serde::Serialize;
    use std::str::FromStr;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Amounted {
        #[serde(with = "amount")]
        amount: Decimal,
        #[serde(default, deserialize_with = "deserialize_optional_string")]
        note: Option<String>,
    }

    #[test]
    fn test_amount_from_integer() {
        let parsed: Amounted = serde_json::from_str(r#"{"amount": 42}"#).unwrap();
        assert_eq!(parsed.amount, Decimal::from(42));
    }

    #[test]
    fn test_amount_from_decimal_number_is_exact() {
        let parsed: Amounted = serde_json::from_str(r#"{"amount": 0.1}"#).unwrap();
        assert_eq!(parsed.amount, Decimal::from_str("0.1").unwrap());
    }

    #[test]
    fn test_amount_from_numeric_string() {
        let parsed: Amounted = serde_json::from_str(r#"{"amount": " 19.99 "}"#).unwrap();
        assert_eq!(parsed.amount, Decimal::from_str("19.99").unwrap());
    }

    #[test]
    fn test_amount_rejects_garbage() {
        let result: Result<Amounted, _> = serde_json::from_str(r#"{"amount": "abc"}"#);
        assert!(result.is_err());

        let result: Result<Amounted, _> = serde_json::from_str(r#"{"amount": true}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_amount_serializes_as_number() {
        let value = Amounted {
            amount: Decimal::from_str("1234.56").unwrap(),
            note: None,
        };
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["amount"], 1234.56);
    }

    #[test]
    fn test_optional_string_blank_is_none() {
        let parsed: Amounted = serde_json::from_str(r#"{"amount": 1, "note": "   "}"#).unwrap();
        assert_eq!(parsed.note, None);
    }

    #[test]
    fn test_optional_string_is_trimmed() {
        let parsed: Amounted = serde_json::from_str(r#"{"amount": 1, "note": " hola "}"#).unwrap();
        assert_eq!(parsed.note.as_deref(), Some("hola"));
    }
}
