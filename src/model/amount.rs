//! Parsing for the dollar-formatted cells of the balance sheet.
//!
//! Cells look like `$12,345.67`, `-$50.00` or `1234`. Every `$` and `,` is removed and what remains
//! must be a plain decimal number: an optional `-`, digits, and optionally `.` followed by digits.
//! Anything else is an error; an unparseable cell is never treated as zero.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::error::Error;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

/// An error that can occur when parsing a currency cell.
#[derive(Clone, PartialEq, Eq)]
pub enum AmountError {
    /// Nothing was left after removing `$`, `,` and whitespace.
    Empty,
    /// The remaining text is not a plain decimal number.
    Malformed(String),
}

impl Debug for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AmountError::Empty => write!(f, "no digits in currency cell"),
            AmountError::Malformed(s) => write!(f, "'{s}' is not a currency amount"),
        }
    }
}

impl Error for AmountError {}

/// Parses a currency cell into the float the table stores.
///
/// # Examples
///
/// ```
/// # use balance_sheet::model::parse_currency;
/// assert_eq!(parse_currency("-$1,234.50").unwrap(), -1234.5);
/// assert_eq!(parse_currency("$-50").unwrap(), -50.0);
/// ```
///
/// Blank cells and anything outside the plain `-digits.digits` form are errors:
/// ```
/// # use balance_sheet::model::parse_currency;
/// assert!(parse_currency("$").is_err());
/// assert!(parse_currency("1e3").is_err());
/// ```
pub fn parse_currency(s: &str) -> Result<f64, AmountError> {
    let stripped: String = s.chars().filter(|&c| c != '$' && c != ',').collect();
    let stripped = stripped.trim();
    if stripped.is_empty() {
        return Err(AmountError::Empty);
    }
    if !is_plain_decimal(stripped) {
        return Err(AmountError::Malformed(s.trim().to_string()));
    }
    // Decimal overflows past 28 digits.
    match Decimal::from_str(stripped).ok().and_then(|d| d.to_f64()) {
        Some(value) => Ok(value),
        None => stripped
            .parse::<f64>()
            .map_err(|_| AmountError::Malformed(s.trim().to_string())),
    }
}

fn is_plain_decimal(s: &str) -> bool {
    let unsigned = s.strip_prefix('-').unwrap_or(s);
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (unsigned, None),
    };
    let digits = |part: &str| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit());
    digits(whole) && fraction.map_or(true, digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_dollar_and_commas() {
        assert_eq!(parse_currency("$1,234.56").unwrap(), 1234.56);
    }

    #[test]
    fn test_parse_negative_with_dollar_sign() {
        assert_eq!(parse_currency("-$5.00").unwrap(), -5.0);
    }

    #[test]
    fn test_parse_dollar_before_minus() {
        assert_eq!(parse_currency("$-50.00").unwrap(), -50.0);
    }

    #[test]
    fn test_parse_plain_integer() {
        assert_eq!(parse_currency("1234").unwrap(), 1234.0);
    }

    #[test]
    fn test_parse_multiple_commas() {
        assert_eq!(parse_currency("$1,234,567.89").unwrap(), 1234567.89);
    }

    #[test]
    fn test_parse_whitespace() {
        assert_eq!(parse_currency("  $50.00  ").unwrap(), 50.0);
    }

    #[test]
    fn test_parse_letters_is_an_error() {
        assert_eq!(
            parse_currency("abc"),
            Err(AmountError::Malformed("abc".to_string()))
        );
    }

    #[test]
    fn test_parse_empty_is_an_error() {
        assert_eq!(parse_currency(""), Err(AmountError::Empty));
        assert_eq!(parse_currency(" $ "), Err(AmountError::Empty));
        assert_eq!(parse_currency(",,"), Err(AmountError::Empty));
    }

    #[test]
    fn test_parse_rejects_parenthesised_negative() {
        assert!(parse_currency("($5.00)").is_err());
    }

    #[test]
    fn test_parse_rejects_nan_and_infinity() {
        assert!(parse_currency("NaN").is_err());
        assert!(parse_currency("inf").is_err());
    }

    #[test]
    fn test_parse_rejects_exponent_and_underscores() {
        for cell in ["1e3", "$1E3", "1_000", "$1__0", "1.5e-2"] {
            assert!(
                matches!(parse_currency(cell), Err(AmountError::Malformed(_))),
                "{cell} should not parse"
            );
        }
    }

    #[test]
    fn test_parse_rejects_loose_signs_and_points() {
        for cell in ["+5", ".5", "5.", "--5", "5-", "1.2.3", "- 5", "1 000"] {
            assert!(parse_currency(cell).is_err(), "{cell} should not parse");
        }
    }

    #[test]
    fn test_parse_beyond_decimal_precision() {
        let cell = "$123,456,789,012,345,678,901,234,567,890.50";
        let expected: f64 = "123456789012345678901234567890.50".parse().unwrap();
        assert_eq!(parse_currency(cell).unwrap(), expected);
    }

    #[test]
    fn test_malformed_message_names_the_cell() {
        let err = parse_currency(" 1e3 ").unwrap_err();
        assert_eq!(err.to_string(), "'1e3' is not a currency amount");
    }
}
