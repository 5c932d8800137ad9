//! Unit tests for the identifier newtypes

use core_kernel::{
    AddonCoverId, CompanyQuoteId, CustomerId, DeliveryId, InsuranceCompanyId, QuotationId,
};
use uuid::Uuid;

mod quotation_id_tests {
    use super::*;

    #[test]
    fn test_new_generates_unique_ids() {
        assert_ne!(QuotationId::new(), QuotationId::new());
    }

    #[test]
    fn test_new_v7_generates_time_ordered_ids() {
        let id1 = QuotationId::new_v7();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = QuotationId::new_v7();
        assert!(id1 < id2);
    }

    #[test]
    fn test_from_str_with_prefix() {
        let original = QuotationId::new();
        let parsed: QuotationId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_from_str_rejects_garbage() {
        assert!("QTN-not-a-uuid".parse::<QuotationId>().is_err());
    }

    #[test]
    fn test_json_serialization_is_bare_uuid() {
        let uuid = Uuid::new_v4();
        let id = QuotationId::from_uuid(uuid);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", uuid));
        let back: QuotationId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}

#[test]
fn test_prefixes_are_distinct() {
    let prefixes = [
        QuotationId::prefix(),
        CompanyQuoteId::prefix(),
        DeliveryId::prefix(),
        InsuranceCompanyId::prefix(),
        AddonCoverId::prefix(),
        CustomerId::prefix(),
    ];
    let mut unique = prefixes.to_vec();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), prefixes.len());
}
