//! Property-Based Test Generators
//!
//! Proptest strategies producing data that respects the domain invariants.

use core_kernel::{Currency, Money};
use domain_quotation::{CompanyQuote, InsuranceCompany, InsuredValueComponents};
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Non-negative amount with two decimal places, up to 10 million
pub fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000_000i64).prop_map(|minor| Decimal::new(minor, 2))
}

/// Strictly positive amount with two decimal places
pub fn positive_amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|minor| Decimal::new(minor, 2))
}

/// Amount with up to six decimal places, never rounded by the generator
pub fn fractional_amount_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000_000_000i64).prop_map(|micro| Decimal::new(micro, 6))
}

/// Valid insured value components
pub fn components_strategy() -> impl Strategy<Value = InsuredValueComponents> {
    (
        amount_strategy(),
        amount_strategy(),
        amount_strategy(),
        amount_strategy(),
        amount_strategy(),
    )
        .prop_map(|(vehicle, trailer, cng_lpg_kit, electrical, non_electrical)| {
            InsuredValueComponents {
                vehicle,
                trailer,
                cng_lpg_kit,
                electrical_accessories: electrical,
                non_electrical_accessories: non_electrical,
            }
        })
}

/// Strictly negative amount
pub fn negative_amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000_000i64).prop_map(|minor| -Decimal::new(minor, 2))
}

/// Company names drawn from a small alphabet so ties on name happen
pub fn company_name_strategy() -> impl Strategy<Value = String> {
    "[A-D]{1,2}"
}

/// Unranked quotes from distinct companies; premiums collide often
pub fn company_quotes_strategy(max: usize) -> impl Strategy<Value = Vec<CompanyQuote>> {
    prop::collection::vec((company_name_strategy(), 1i64..20i64), 0..=max).prop_map(|rows| {
        rows.into_iter()
            .filter_map(|(name, thousands)| {
                let premium = Money::new(Decimal::from(thousands * 1_000), Currency::INR);
                CompanyQuote::new(&InsuranceCompany::new(name), premium, premium).ok()
            })
            .collect()
    })
}
