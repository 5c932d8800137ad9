//! Bulk replacement of company quotes

use rust_decimal_macros::dec;
use serde_json::{json, Value};

use domain_quotation::ports::mock::InMemoryQuotationRepository;
use domain_quotation::{
    AddonInput, CompanyQuoteInput, GenerateOptions, QuotationError, QuotationState,
};
use test_utils::{
    assert_company_order, assert_ranks_contiguous, CatalogFixtures, TestHarnessBuilder,
    TestQuotationBuilder,
};

fn row(company: &domain_quotation::InsuranceCompany, basic: Value, final_premium: Value) -> CompanyQuoteInput {
    CompanyQuoteInput {
        company_id: company.id,
        basic_premium: basic,
        final_premium,
        addons: Vec::new(),
    }
}

#[tokio::test]
async fn test_replace_ranks_and_counts() {
    let harness = TestHarnessBuilder::new().build();
    let quotation = harness
        .service
        .create_quotation(TestQuotationBuilder::new().build())
        .await
        .unwrap();

    let mut a = row(&CatalogFixtures::company_a(), json!(12000), json!("16000.50"));
    a.addons.push(AddonInput {
        addon_id: CatalogFixtures::zero_depreciation().id,
        premium: json!(2080),
    });
    a.addons.push(AddonInput {
        addon_id: CatalogFixtures::roadside_assistance().id,
        premium: json!(199),
    });
    let b = row(&CatalogFixtures::company_b(), json!(11000), json!(14999.99));

    let outcome = harness
        .service
        .replace_company_quotes(quotation.id(), vec![a, b])
        .await
        .unwrap();

    assert_eq!(outcome.count, 2);
    assert_eq!(outcome.state, QuotationState::Quoted);
    assert_company_order(&outcome.quotes, &["B", "A"]);
    let names: Vec<_> = outcome.quotes[1].addons.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["Zero Depreciation", "Roadside Assistance"]);
}

#[tokio::test]
async fn test_malformed_rows_are_all_reported_without_mutation() {
    let harness = TestHarnessBuilder::new().build();
    let quotation = harness
        .service
        .create_quotation(TestQuotationBuilder::new().build())
        .await
        .unwrap();
    harness
        .service
        .generate_quotes(quotation.id(), GenerateOptions::default())
        .await
        .unwrap();

    let rows = vec![
        row(&CatalogFixtures::company_a(), json!(-5), json!(100)),
        row(&CatalogFixtures::company_b(), json!(10), json!("abc")),
        row(&CatalogFixtures::company_c(), json!(10), json!(0)),
    ];
    let err = harness
        .service
        .replace_company_quotes(quotation.id(), rows)
        .await
        .unwrap_err();

    match err {
        QuotationError::Validation(errors) => {
            let rows: Vec<usize> = errors.iter().map(|e| e.row).collect();
            assert_eq!(rows, vec![0, 1, 2]);
        }
        other => panic!("expected validation error, got {:?}", other),
    }

    let stored = harness.service.company_quotes(quotation.id()).await.unwrap();
    assert_company_order(&stored, &["B", "C", "A"]);
}

#[tokio::test]
async fn test_unknown_company_is_not_found() {
    let harness = TestHarnessBuilder::new().build();
    let quotation = harness
        .service
        .create_quotation(TestQuotationBuilder::new().build())
        .await
        .unwrap();
    let stranger = domain_quotation::InsuranceCompany::new("Stranger");

    let err = harness
        .service
        .replace_company_quotes(quotation.id(), vec![row(&stranger, json!(1), json!(2))])
        .await
        .unwrap_err();
    assert!(matches!(err, QuotationError::NotFound { .. }));
}

#[tokio::test]
async fn test_placeholder_rows_only_return_to_draft() {
    let harness = TestHarnessBuilder::new().build();
    let quotation = harness
        .service
        .create_quotation(TestQuotationBuilder::new().build())
        .await
        .unwrap();
    harness
        .service
        .generate_quotes(quotation.id(), GenerateOptions::default())
        .await
        .unwrap();

    let outcome = harness
        .service
        .replace_company_quotes(
            quotation.id(),
            vec![
                row(&CatalogFixtures::company_a(), Value::Null, Value::Null),
                row(&CatalogFixtures::company_b(), json!(100), Value::Null),
            ],
        )
        .await
        .unwrap();

    assert_eq!(outcome.count, 0);
    assert_eq!(outcome.state, QuotationState::Draft);
    assert!(harness.service.company_quotes(quotation.id()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failure_between_delete_and_insert_restores_previous_set() {
    let harness = TestHarnessBuilder::new()
        .repository(InMemoryQuotationRepository::new())
        .build();
    let quotation = harness
        .service
        .create_quotation(TestQuotationBuilder::new().build())
        .await
        .unwrap();
    harness
        .service
        .generate_quotes(quotation.id(), GenerateOptions::default())
        .await
        .unwrap();

    harness.repository.fail_next_replace_after_delete();
    let result = harness
        .service
        .replace_company_quotes(
            quotation.id(),
            vec![row(&CatalogFixtures::company_a(), json!(1000), json!(1200))],
        )
        .await;
    assert!(result.is_err());

    let stored = harness.service.company_quotes(quotation.id()).await.unwrap();
    assert_company_order(&stored, &["B", "C", "A"]);
    assert_ranks_contiguous(&stored);

    // The lock was released by the failed attempt
    let outcome = harness
        .service
        .replace_company_quotes(
            quotation.id(),
            vec![row(&CatalogFixtures::company_a(), json!(1000), json!(dec!(1200).to_string()))],
        )
        .await
        .unwrap();
    assert_eq!(outcome.count, 1);
    let stored = harness.service.company_quotes(quotation.id()).await.unwrap();
    assert_company_order(&stored, &["A"]);
}
