use std::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Money is represented as integer cents to avoid floating-point precision issues.
/// For ARS/EUR/USD, 1 unit = 100 cents, so $50.00 = 5000 cents.
pub type Cents = i64;

/// Format cents as a human-readable currency string.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs_cents / 100, abs_cents % 100)
}

/// Parse a decimal string into cents.
/// Example: "50.00" -> 5000, "12.5" -> 1250, "100" -> 10000
///
/// Digits past the second decimal place are truncated.
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim();
    let (negative, digits) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };

    let (units_str, decimals_str) = match digits.split_once('.') {
        Some((units, decimals)) => (units, decimals),
        None => (digits, ""),
    };

    if units_str.is_empty() && decimals_str.is_empty() {
        return Err(ParseCentsError::InvalidFormat);
    }
    if !units_str.bytes().all(|b| b.is_ascii_digit())
        || !decimals_str.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(ParseCentsError::InvalidFormat);
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str
            .parse()
            .map_err(|_| ParseCentsError::InvalidFormat)?
    };

    let decimal_cents: i64 = match decimals_str.len() {
        0 => 0,
        1 => {
            decimals_str
                .parse::<i64>()
                .map_err(|_| ParseCentsError::InvalidFormat)?
                * 10
        }
        _ => decimals_str[..2]
            .parse()
            .map_err(|_| ParseCentsError::InvalidFormat)?,
    };

    let cents = units
        .checked_mul(100)
        .and_then(|c| c.checked_add(decimal_cents))
        .ok_or(ParseCentsError::Overflow)?;
    Ok(if negative { -cents } else { cents })
}

/// Multiply an amount by an exact decimal factor, rounding to the nearest cent
/// (midpoint away from zero). Returns `None` on overflow.
pub fn scale_cents(cents: Cents, factor: Decimal) -> Option<Cents> {
    Decimal::from(cents)
        .checked_mul(factor)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// `percent` of `cents`, rounded to the nearest cent.
/// Example: percent_of(10000, 21) -> 2100
pub fn percent_of(cents: Cents, percent: Decimal) -> Option<Cents> {
    scale_cents(cents, percent.checked_div(Decimal::ONE_HUNDRED)?)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCentsError {
    InvalidFormat,
    Overflow,
}

impl fmt::Display for ParseCentsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCentsError::InvalidFormat => write!(f, "invalid money format"),
            ParseCentsError::Overflow => write!(f, "amount is too large"),
        }
    }
}

impl std::error::Error for ParseCentsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(5000), "50.00");
        assert_eq!(format_cents(1234), "12.34");
        assert_eq!(format_cents(1), "0.01");
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(-5000), "-50.00");
        assert_eq!(format_cents(-1), "-0.01");
    }

    #[test]
    fn test_parse_cents() {
        assert_eq!(parse_cents("50.00"), Ok(5000));
        assert_eq!(parse_cents("50"), Ok(5000));
        assert_eq!(parse_cents("12.5"), Ok(1250));
        assert_eq!(parse_cents(".50"), Ok(50));
        assert_eq!(parse_cents("-50.00"), Ok(-5000));
        assert_eq!(parse_cents("100.999"), Ok(10099));
    }

    #[test]
    fn test_parse_cents_invalid() {
        assert!(parse_cents("abc").is_err());
        assert!(parse_cents("12.34.56").is_err());
        assert!(parse_cents(".").is_err());
        assert_eq!(parse_cents("1.aé"), Err(ParseCentsError::InvalidFormat));
        assert_eq!(parse_cents("é.50"), Err(ParseCentsError::InvalidFormat));
        assert_eq!(parse_cents("1.-5"), Err(ParseCentsError::InvalidFormat));
        assert_eq!(parse_cents("1.+5"), Err(ParseCentsError::InvalidFormat));
        assert_eq!(parse_cents("+1.50"), Err(ParseCentsError::InvalidFormat));
        assert_eq!(parse_cents("--1"), Err(ParseCentsError::InvalidFormat));
        assert_eq!(
            parse_cents("99999999999999999999"),
            Err(ParseCentsError::InvalidFormat)
        );
        assert_eq!(
            parse_cents("999999999999999999"),
            Err(ParseCentsError::Overflow)
        );
    }

    #[test]
    fn test_scale_cents_rounds_half_away_from_zero() {
        // 0.5 cent rounds up
        assert_eq!(scale_cents(1, Decimal::new(15, 1)), Some(2));
        assert_eq!(scale_cents(-1, Decimal::new(15, 1)), Some(-2));
        assert_eq!(scale_cents(10000, Decimal::new(125, 2)), Some(12500));
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(10000, Decimal::from(21)), Some(2100));
        assert_eq!(percent_of(333, Decimal::from(10)), Some(33));
        assert_eq!(percent_of(i64::MAX, Decimal::from(200)), None);
    }
}
