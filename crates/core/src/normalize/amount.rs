use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

use super::{NormalizeError, Result};
use crate::serde::amount::decimal_from_number;

/// Parses an amount stored either as a JSON number or as text.
///
/// Text may carry a currency symbol, whitespace and comma thousands
/// separators (`"$ 1,234.50"`). A leading `-` or parentheses mark a
/// negative amount.
pub fn parse_amount(value: &Value) -> Result<Decimal> {
    match value {
        Value::Number(number) => decimal_from_number(number)
            .ok_or_else(|| NormalizeError::InvalidAmount(number.to_string())),
        Value::String(s) => parse_amount_str(s),
        other => Err(NormalizeError::InvalidAmount(other.to_string())),
    }
}

/// Parses an amount from text; see [`parse_amount`].
pub fn parse_amount_str(raw: &str) -> Result<Decimal> {
    let trimmed = raw.trim();
    let (negative, body) = match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };

    let cleaned: String = body
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    if cleaned.is_empty() || !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return Err(NormalizeError::InvalidAmount(raw.to_string()));
    }

    let amount =
        Decimal::from_str(&cleaned).map_err(|_| NormalizeError::InvalidAmount(raw.to_string()))?;
    Ok(if negative { -amount } else { amount })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_number_is_taken_exactly() {
        assert_eq!(parse_amount(&json!(150)).unwrap(), dec("150"));
        assert_eq!(parse_amount(&json!(19.99)).unwrap(), dec("19.99"));
    }

    #[test]
    fn test_string_with_thousands_separator() {
        assert_eq!(parse_amount(&json!("1,234.50")).unwrap(), dec("1234.50"));
    }

    #[test]
    fn test_string_with_currency_symbol() {
        assert_eq!(parse_amount(&json!("$ 2,000")).unwrap(), dec("2000"));
        assert_eq!(parse_amount(&json!("  -45.10 ")).unwrap(), dec("-45.10"));
    }

    #[test]
    fn test_accounting_negative() {
        assert_eq!(parse_amount(&json!("(300.00)")).unwrap(), dec("-300.00"));
    }

    #[test]
    fn test_invalid_amounts() {
        assert_eq!(
            parse_amount(&json!("n/a")),
            Err(NormalizeError::InvalidAmount("n/a".to_string()))
        );
        assert!(parse_amount(&json!("1.2.3")).is_err());
        assert!(parse_amount(&json!(null)).is_err());
        assert!(parse_amount(&json!("")).is_err());
    }
}
