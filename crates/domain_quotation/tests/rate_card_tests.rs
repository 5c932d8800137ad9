//! Generation priced by rate cards

use std::sync::Arc;

use rust_decimal_macros::dec;

use domain_quotation::ports::mock::{
    InMemoryCatalog, InMemoryQuotationRepository, MockDocumentRenderer, MockMessagingChannel,
};
use domain_quotation::{
    GenerateOptions, QuotationPorts, QuotationService, QuotationServiceConfig, RateCardModel,
    SkipReason,
};
use test_utils::{assert_amount, CatalogFixtures, CustomerFixtures, TestQuotationBuilder};

#[tokio::test]
async fn test_reference_rate_card_prices_14742_92() {
    let company = CatalogFixtures::company_a();
    let uncovered = CatalogFixtures::company_b();
    let catalog = InMemoryCatalog::new()
        .with_companies(vec![company.clone(), uncovered.clone()])
        .with_addons(CatalogFixtures::addons())
        .with_customer(CustomerFixtures::with_mobile());
    let rate_model = RateCardModel::new(vec![CatalogFixtures::reference_rate_card(&company)]);

    let service = QuotationService::new(
        QuotationPorts {
            repository: Arc::new(InMemoryQuotationRepository::new()),
            catalog: Arc::new(catalog),
            rate_model: Arc::new(rate_model),
            renderer: Arc::new(MockDocumentRenderer::new()),
            messaging: Arc::new(MockMessagingChannel::new()),
        },
        QuotationServiceConfig::default(),
    );

    let quotation = service
        .create_quotation(
            TestQuotationBuilder::new()
                .addons(vec![CatalogFixtures::zero_depreciation().id])
                .ncb_percentage(dec!(20))
                .build(),
        )
        .await
        .unwrap();
    let outcome = service
        .generate_quotes(quotation.id(), GenerateOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.generated, 1);
    assert_eq!(outcome.skipped[0].company_id, uncovered.id);
    assert_eq!(outcome.skipped[0].reason, SkipReason::Unavailable);

    let quote = &outcome.quotes[0];
    assert_amount(&quote.basic_premium, dec!(10414));
    assert_amount(&quote.final_premium, dec!(14742.92));
    let breakdown = quote.breakdown.unwrap();
    assert_amount(&breakdown.own_damage, dec!(10400));
    assert_amount(&breakdown.ncb_discount, dec!(2080));
    assert_amount(&breakdown.addons, dec!(2080));
    assert_amount(&breakdown.gst, dec!(2248.92));
    assert_eq!(quote.addons.len(), 1);
    assert_eq!(quote.addons[0].name, "Zero Depreciation");
}

#[test]
fn test_rate_cards_load_from_json() {
    let company = CatalogFixtures::company_a();
    let json = serde_json::to_string(&vec![CatalogFixtures::reference_rate_card(&company)]).unwrap();
    let model = RateCardModel::from_json(&json).unwrap();
    assert_eq!(model.len(), 1);
}
