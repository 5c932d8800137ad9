//! Property tests for insured value and ranking

use proptest::prelude::*;
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};

use core_kernel::Currency;
use domain_quotation::{compute_from_raw, compute_insured_value, ranking, QuotationError};
use test_utils::{
    company_quotes_strategy, components_strategy, fractional_amount_strategy,
    negative_amount_strategy,
};

fn raw(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

proptest! {
    #[test]
    fn total_is_sum_of_defaulted_components(components in components_strategy()) {
        let value = compute_insured_value(&components, Currency::INR).unwrap();
        let sum: Decimal = components.parts().iter().map(|(_, amount)| *amount).sum();
        prop_assert_eq!(value.total.amount(), sum);
        prop_assert!(value.total.amount() >= Decimal::ZERO);
        prop_assert_eq!(value.breakdown, components);
    }

    #[test]
    fn rounding_happens_once_on_the_total(a in fractional_amount_strategy(), b in fractional_amount_strategy()) {
        let map = raw(&[("vehicle", json!(a.to_string())), ("trailer", json!(b.to_string()))]);
        let value = compute_from_raw(&map, Currency::INR).unwrap();
        let expected = (a + b).round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero);
        prop_assert_eq!(value.total.amount(), expected);
    }

    #[test]
    fn negative_component_is_invalid_input(amount in negative_amount_strategy(), field in prop::sample::select(vec![
        "vehicle", "trailer", "cng_lpg_kit", "electrical_accessories", "non_electrical_accessories",
    ])) {
        let mut map = raw(&[("vehicle", json!(100000))]);
        map.insert(field.to_string(), json!(amount.to_string()));
        let err = compute_from_raw(&map, Currency::INR).unwrap_err();
        let matched = matches!(err, QuotationError::InvalidInput { field: ref f, .. } if f == field);
        prop_assert!(matched);
    }

    #[test]
    fn non_numeric_component_is_invalid_input(text in "[a-z]{1,8}") {
        let map = raw(&[("vehicle", json!(100000)), ("trailer", json!(text))]);
        prop_assert!(
            matches!(compute_from_raw(&map, Currency::INR), Err(QuotationError::InvalidInput { .. })),
            "non-numeric trailer must be rejected"
        );
    }

    #[test]
    fn ranking_is_ordered_and_idempotent(quotes in company_quotes_strategy(12)) {
        let ranked = ranking::rank(quotes);
        prop_assert!(ranking::is_consistently_ranked(&ranked));
        for pair in ranked.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!(
                a.final_premium.amount() < b.final_premium.amount()
                    || (a.final_premium.amount() == b.final_premium.amount() && a.company_name <= b.company_name)
            );
        }

        let again = ranking::rank(ranked.clone());
        prop_assert_eq!(again, ranked);
    }

    #[test]
    fn ranking_ignores_insertion_order(quotes in company_quotes_strategy(8)) {
        let mut reversed = quotes.clone();
        reversed.reverse();
        prop_assert_eq!(ranking::rank(quotes), ranking::rank(reversed));
    }
}
