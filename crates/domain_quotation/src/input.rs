//! Parsing of raw monetary input
//!
//! Amounts reach the engine as loosely typed JSON (form posts send numbers as
//! strings). These helpers turn a `serde_json::Value` into an exact decimal or
//! a field-named [`QuotationError::InvalidInput`].

use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

use crate::error::QuotationError;

/// Parses an optional amount
///
/// `null` and blank strings are absent. Numbers and numeric strings are
/// accepted; anything else is rejected as non-numeric.
pub fn parse_amount(field: &str, value: &Value) -> Result<Option<Decimal>, QuotationError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => decimal_from_str(&n.to_string())
            .map(Some)
            .ok_or_else(|| not_numeric(field)),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            decimal_from_str(trimmed)
                .map(Some)
                .ok_or_else(|| not_numeric(field))
        }
        _ => Err(not_numeric(field)),
    }
}

/// Parses an optional amount that must not be negative
pub fn parse_non_negative(field: &str, value: &Value) -> Result<Option<Decimal>, QuotationError> {
    match parse_amount(field, value)? {
        Some(amount) if amount < Decimal::ZERO => Err(
            QuotationError::invalid_input(field, "must not be negative"),
        ),
        other => Ok(other),
    }
}

fn decimal_from_str(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

fn not_numeric(field: &str) -> QuotationError {
    QuotationError::invalid_input(field, "must be a number")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_numbers_and_strings() {
        assert_eq!(parse_amount("vehicle", &json!(500000)).unwrap(), Some(dec!(500000)));
        assert_eq!(parse_amount("vehicle", &json!(1250.75)).unwrap(), Some(dec!(1250.75)));
        assert_eq!(parse_amount("vehicle", &json!(" 20000 ")).unwrap(), Some(dec!(20000)));
        assert_eq!(parse_amount("vehicle", &json!("1e3")).unwrap(), Some(dec!(1000)));
    }

    #[test]
    fn test_absent_values() {
        assert_eq!(parse_amount("trailer", &Value::Null).unwrap(), None);
        assert_eq!(parse_amount("trailer", &json!("  ")).unwrap(), None);
    }

    #[test]
    fn test_non_numeric_names_field() {
        for raw in [json!("abc"), json!(true), json!([1]), json!({"v": 1})] {
            match parse_amount("cng_lpg_kit", &raw) {
                Err(QuotationError::InvalidInput { field, .. }) => assert_eq!(field, "cng_lpg_kit"),
                other => panic!("expected InvalidInput, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_negative_rejected() {
        assert!(matches!(
            parse_non_negative("trailer", &json!(-1)),
            Err(QuotationError::InvalidInput { .. })
        ));
        assert_eq!(parse_non_negative("trailer", &json!(0)).unwrap(), Some(Decimal::ZERO));
        assert_eq!(parse_non_negative("trailer", &json!("-0")).unwrap(), Some(Decimal::ZERO));
    }
}
