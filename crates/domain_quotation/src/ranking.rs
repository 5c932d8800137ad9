//! Quote ranking
//!
//! Company quotes are totally ordered by final premium (cheapest first), then
//! company name, then company id. Ranks are the 1-based position in that
//! order, so equal premiums rank the same way regardless of insertion order.

use std::cmp::Ordering;

use crate::company_quote::CompanyQuote;

/// Ranking order of two quotes
pub fn compare(a: &CompanyQuote, b: &CompanyQuote) -> Ordering {
    a.final_premium
        .amount()
        .cmp(&b.final_premium.amount())
        .then_with(|| a.company_name.cmp(&b.company_name))
        .then_with(|| a.company_id.cmp(&b.company_id))
}

/// Sorts quotes and assigns contiguous ranks starting at 1
pub fn rank(mut quotes: Vec<CompanyQuote>) -> Vec<CompanyQuote> {
    quotes.sort_by(compare);
    for (position, quote) in quotes.iter_mut().enumerate() {
        quote.rank = position as u32 + 1;
    }
    quotes
}

/// The cheapest quote, if any
pub fn best_quote(quotes: &[CompanyQuote]) -> Option<&CompanyQuote> {
    quotes.iter().min_by(|a, b| compare(a, b))
}

/// True when ranks are exactly `1..=n` in ranking order
pub fn is_consistently_ranked(quotes: &[CompanyQuote]) -> bool {
    let ranks_contiguous = quotes
        .iter()
        .enumerate()
        .all(|(position, quote)| quote.rank == position as u32 + 1);
    let ordered = quotes
        .windows(2)
        .all(|pair| compare(&pair[0], &pair[1]) != Ordering::Greater);
    ranks_contiguous && ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InsuranceCompany;
    use core_kernel::{Currency, Money};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn quote(name: &str, premium: Decimal) -> CompanyQuote {
        let company = InsuranceCompany::new(name);
        let premium = Money::new(premium, Currency::INR);
        CompanyQuote::new(&company, premium, premium).unwrap()
    }

    #[test]
    fn test_tie_broken_by_company_name() {
        let ranked = rank(vec![
            quote("A", dec!(18000)),
            quote("C", dec!(15500)),
            quote("B", dec!(15500)),
        ]);

        let order: Vec<_> = ranked.iter().map(|q| (q.company_name.as_str(), q.rank)).collect();
        assert_eq!(order, vec![("B", 1), ("C", 2), ("A", 3)]);
        assert!(ranked[0].is_best());
        assert!(is_consistently_ranked(&ranked));
    }

    #[test]
    fn test_rank_is_idempotent() {
        let once = rank(vec![quote("X", dec!(9000)), quote("Y", dec!(8000))]);
        let twice = rank(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_best_quote() {
        let quotes = vec![quote("X", dec!(9000)), quote("Y", dec!(8000))];
        assert_eq!(best_quote(&quotes).map(|q| q.company_name.as_str()), Some("Y"));
        assert!(best_quote(&[]).is_none());
    }

    #[test]
    fn test_gapped_ranks_detected() {
        let mut ranked = rank(vec![quote("X", dec!(1)), quote("Y", dec!(2))]);
        ranked[1].rank = 3;
        assert!(!is_consistently_ranked(&ranked));
    }
}
