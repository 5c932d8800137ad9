//! Tests for core_kernel error types

use core_kernel::error::CoreError;
use core_kernel::money::MoneyError;
use core_kernel::{Currency, PortError};

#[test]
fn test_core_error_validation() {
    let error = CoreError::validation("Invalid input");

    match error {
        CoreError::Validation(msg) => assert_eq!(msg, "Invalid input"),
        _ => panic!("Expected Validation error"),
    }
}

#[test]
fn test_core_error_not_found() {
    let error = CoreError::not_found("Quotation not found");

    match error {
        CoreError::NotFound(msg) => assert_eq!(msg, "Quotation not found"),
        _ => panic!("Expected NotFound error"),
    }
}

#[test]
fn test_core_error_from_money_error() {
    let money_error = MoneyError::CurrencyMismatch("INR".to_string(), "USD".to_string());
    let core_error: CoreError = money_error.into();

    assert!(matches!(core_error, CoreError::Money(_)));
}

#[test]
fn test_unsupported_currency_is_validation_error() {
    let error = "JPY".parse::<Currency>().unwrap_err();
    assert!(matches!(error, CoreError::Validation(_)));
    assert!(error.to_string().contains("JPY"));
}

#[test]
fn test_port_error_field_is_kept() {
    let error = PortError::validation_field("must be positive", "final_premium");

    match error {
        PortError::Validation { field, .. } => assert_eq!(field.as_deref(), Some("final_premium")),
        _ => panic!("Expected Validation error"),
    }
}
