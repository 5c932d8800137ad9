//! Custom Test Assertions
//!
//! Assertion helpers for ranked quote sets with messages that show the
//! offending ranks and names.

use core_kernel::Money;
use domain_quotation::{ranking, CompanyQuote};
use rust_decimal::Decimal;

/// Asserts that ranks run 1..=n with no gaps or duplicates
pub fn assert_ranks_contiguous(quotes: &[CompanyQuote]) {
    let ranks: Vec<u32> = quotes.iter().map(|q| q.rank).collect();
    let expected: Vec<u32> = (1..=quotes.len() as u32).collect();
    assert_eq!(ranks, expected, "ranks are not contiguous from 1");
}

/// Asserts that quotes are in ranking order and ranked by position
pub fn assert_consistently_ranked(quotes: &[CompanyQuote]) {
    assert!(
        ranking::is_consistently_ranked(quotes),
        "quotes are not in ranking order: {:?}",
        quotes
            .iter()
            .map(|q| (q.rank, q.company_name.as_str(), q.final_premium.amount()))
            .collect::<Vec<_>>()
    );
}

/// Asserts the company names in rank order
pub fn assert_company_order(quotes: &[CompanyQuote], expected: &[&str]) {
    let names: Vec<&str> = quotes.iter().map(|q| q.company_name.as_str()).collect();
    assert_eq!(names, expected, "unexpected company order");
}

/// Asserts a money amount exactly
pub fn assert_amount(money: &Money, expected: Decimal) {
    assert_eq!(
        money.amount(),
        expected,
        "expected {} {}, got {}",
        money.currency().symbol(),
        expected,
        money
    );
}
