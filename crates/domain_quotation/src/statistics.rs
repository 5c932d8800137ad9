//! Quotation statistics
//!
//! Read-only aggregation over loaded quotations. Every rate with a zero
//! denominator is reported as zero.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use core_kernel::{Currency, Money};

use crate::aggregate::{Quotation, QuotationState};

/// Count of quotations per lifecycle state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub draft: usize,
    pub quoted: usize,
    pub sent: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotationStatistics {
    pub total: usize,
    pub by_status: StatusCounts,
    /// Quotations holding at least one company quote
    pub with_company_quotes: usize,
    pub total_company_quotes: usize,
    /// Over quotations with at least one company quote
    pub average_quotes_per_quoted: Decimal,
    /// Percentage of quotations with at least one company quote
    pub quoted_rate: Decimal,
    /// Percentage of sent among quoted or sent
    pub dispatch_rate: Decimal,
    pub average_best_premium: Money,
    pub total_insured_value: Money,
    /// Company name to the number of quotations it leads
    pub best_offer_wins_by_company: BTreeMap<String, usize>,
}

/// Aggregates statistics over `quotations`
///
/// Amounts in a currency other than `currency` are left out of the money
/// totals.
pub fn compute_statistics(quotations: &[Quotation], currency: Currency) -> QuotationStatistics {
    let mut by_status = StatusCounts::default();
    let mut with_company_quotes = 0usize;
    let mut total_company_quotes = 0usize;
    let mut best_premium_sum = Decimal::ZERO;
    let mut best_premium_count = 0usize;
    let mut insured_value_sum = Decimal::ZERO;
    let mut wins = BTreeMap::new();

    for quotation in quotations {
        match quotation.state() {
            QuotationState::Draft => by_status.draft += 1,
            QuotationState::Quoted => by_status.quoted += 1,
            QuotationState::Sent => by_status.sent += 1,
        }

        if quotation.currency() == currency {
            insured_value_sum += quotation.insured_value().total.amount();
        }

        let quotes = quotation.company_quotes();
        if quotes.is_empty() {
            continue;
        }
        with_company_quotes += 1;
        total_company_quotes += quotes.len();

        if let Some(best) = quotation.best_quote() {
            *wins.entry(best.company_name.clone()).or_insert(0) += 1;
            if best.final_premium.currency() == currency {
                best_premium_sum += best.final_premium.amount();
                best_premium_count += 1;
            }
        }
    }

    let total = quotations.len();
    let average_best_premium = if best_premium_count == 0 {
        Money::zero(currency)
    } else {
        Money::new(best_premium_sum / Decimal::from(best_premium_count), currency).round_to_currency()
    };

    QuotationStatistics {
        total,
        by_status,
        with_company_quotes,
        total_company_quotes,
        average_quotes_per_quoted: ratio(total_company_quotes, with_company_quotes),
        quoted_rate: percentage(with_company_quotes, total),
        dispatch_rate: percentage(by_status.sent, by_status.quoted + by_status.sent),
        average_best_premium,
        total_insured_value: Money::new(insured_value_sum, currency).round_to_currency(),
        best_offer_wins_by_company: wins,
    }
}

fn ratio(numerator: usize, denominator: usize) -> Decimal {
    if denominator == 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(numerator) / Decimal::from(denominator))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn percentage(numerator: usize, denominator: usize) -> Decimal {
    if denominator == 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(numerator) * dec!(100) / Decimal::from(denominator))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_collection() {
        let stats = compute_statistics(&[], Currency::INR);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.by_status, StatusCounts::default());
        assert_eq!(stats.quoted_rate, Decimal::ZERO);
        assert_eq!(stats.dispatch_rate, Decimal::ZERO);
        assert_eq!(stats.average_quotes_per_quoted, Decimal::ZERO);
        assert!(stats.average_best_premium.is_zero());
        assert!(stats.best_offer_wins_by_company.is_empty());
    }

    #[test]
    fn test_percentage_rounds_to_two_places() {
        assert_eq!(percentage(1, 3), dec!(33.33));
        assert_eq!(percentage(2, 3), dec!(66.67));
        assert_eq!(percentage(0, 0), Decimal::ZERO);
        assert_eq!(ratio(5, 2), dec!(2.5));
    }
}
