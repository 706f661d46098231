//! Display formatting of money amounts.

use rust_decimal::{Decimal, RoundingStrategy};

/// Formats an amount as `"$ 1,234.50"`: symbol, space, two decimals and
/// comma thousands separators.
pub fn format_currency(amount: Decimal, symbol: &str) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (integer, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if negative { "-" } else { "" };
    format!("{symbol} {sign}{grouped}.{fraction}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(dec("1234.5"), "$"), "$ 1,234.50");
        assert_eq!(format_currency(dec("0"), "$"), "$ 0.00");
        assert_eq!(format_currency(dec("999"), "$"), "$ 999.00");
        assert_eq!(format_currency(dec("1000000"), "US$"), "US$ 1,000,000.00");
    }

    #[test]
    fn test_format_currency_rounds_half_away_from_zero() {
        assert_eq!(format_currency(dec("2.005"), "$"), "$ 2.01");
        assert_eq!(format_currency(dec("-2.005"), "$"), "$ -2.01");
    }

    #[test]
    fn test_format_currency_negative_zero() {
        assert_eq!(format_currency(dec("-0.001"), "$"), "$ 0.00");
    }
}
