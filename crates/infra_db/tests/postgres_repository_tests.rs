//! PostgreSQL repository tests
//!
//! These run against the database named by `TEST_DATABASE_URL` and are
//! skipped when it is not set.

use rust_decimal_macros::dec;
use uuid::Uuid;

use core_kernel::Currency;
use domain_quotation::{
    CatalogPort, CompanyQuote, FuelType, InsuranceCompany, InsuredValueComponents, Quotation,
    QuotationBuilder, QuotationRepository, QuotationState, VehicleDetails,
};
use infra_db::{create_pool_from_url, run_migrations, DatabasePool, PgCatalog, PgQuotationRepository};
use test_utils::{CatalogFixtures, CustomerFixtures, MoneyFixtures};

async fn connect() -> Option<DatabasePool> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let pool = create_pool_from_url(&url).await.expect("database reachable");
    run_migrations(&pool).await.expect("migrations apply");
    Some(pool)
}

async fn seed(pool: &DatabasePool) -> PgCatalog {
    let catalog = PgCatalog::new(pool.clone());
    for company in CatalogFixtures::companies() {
        catalog.store().upsert_company(&company).await.unwrap();
    }
    for addon in CatalogFixtures::addons() {
        catalog.store().upsert_addon(&addon).await.unwrap();
    }
    catalog
        .store()
        .upsert_customer(&CustomerFixtures::with_mobile())
        .await
        .unwrap();
    catalog
}

fn draft() -> Quotation {
    QuotationBuilder::new()
        .customer(CustomerFixtures::with_mobile().id)
        .vehicle(VehicleDetails::new("Maruti Swift", FuelType::Petrol))
        .components(InsuredValueComponents {
            vehicle: dec!(500000),
            trailer: dec!(20000),
            ..Default::default()
        })
        .currency(Currency::INR)
        .build()
        .unwrap()
}

fn quote(company: &InsuranceCompany, premium: rust_decimal::Decimal) -> CompanyQuote {
    CompanyQuote::new(company, MoneyFixtures::inr(premium), MoneyFixtures::inr(premium)).unwrap()
}

#[tokio::test]
async fn test_insert_and_load_round_trip() {
    let Some(pool) = connect().await else { return };
    seed(&pool).await;
    let repository = PgQuotationRepository::new(pool);

    let quotation = draft();
    repository.insert(&quotation).await.unwrap();

    let loaded = repository.load(quotation.id()).await.unwrap();
    assert_eq!(loaded.quote_number(), quotation.quote_number());
    assert_eq!(loaded.insured_value().total.amount(), dec!(520000));
    assert_eq!(loaded.state(), QuotationState::Draft);

    repository.delete(quotation.id()).await.unwrap();
}

#[tokio::test]
async fn test_replace_stores_ranked_set_and_moves_state() {
    let Some(pool) = connect().await else { return };
    seed(&pool).await;
    let repository = PgQuotationRepository::new(pool);
    let quotation = draft();
    repository.insert(&quotation).await.unwrap();

    let a = CatalogFixtures::company_a();
    let b = CatalogFixtures::company_b();
    let c = CatalogFixtures::company_c();
    let set = vec![quote(&a, dec!(18000)), quote(&b, dec!(15500)), quote(&c, dec!(15500))];

    let stored = repository
        .replace_company_quotes(quotation.id(), &set, QuotationState::Quoted)
        .await
        .unwrap();
    assert_eq!(stored, 3);

    let quotes = repository.company_quotes(quotation.id()).await.unwrap();
    let ids: Vec<_> = quotes.iter().map(|q| q.company_id).collect();
    assert_eq!(ids, vec![b.id, c.id, a.id]);
    assert_eq!(quotes.iter().map(|q| q.rank).collect::<Vec<_>>(), vec![1, 2, 3]);

    let loaded = repository.load(quotation.id()).await.unwrap();
    assert_eq!(loaded.state(), QuotationState::Quoted);

    repository.delete(quotation.id()).await.unwrap();
    assert!(repository.load(quotation.id()).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_failed_replace_keeps_previous_set() {
    let Some(pool) = connect().await else { return };
    seed(&pool).await;
    let repository = PgQuotationRepository::new(pool);
    let quotation = draft();
    repository.insert(&quotation).await.unwrap();

    let a = CatalogFixtures::company_a();
    repository
        .replace_company_quotes(quotation.id(), &[quote(&a, dec!(18000))], QuotationState::Quoted)
        .await
        .unwrap();

    // Not in insurance_companies, so the insert phase violates the foreign key
    let unknown = InsuranceCompany::new("Unlisted Mutual");
    let result = repository
        .replace_company_quotes(
            quotation.id(),
            &[quote(&CatalogFixtures::company_b(), dec!(15000)), quote(&unknown, dec!(9000))],
            QuotationState::Quoted,
        )
        .await;
    assert!(result.is_err());

    let quotes = repository.company_quotes(quotation.id()).await.unwrap();
    assert_eq!(quotes.len(), 1);
    assert_eq!(quotes[0].company_id, a.id);

    repository.delete(quotation.id()).await.unwrap();
}

#[tokio::test]
async fn test_replace_while_row_locked_is_a_conflict() {
    let Some(pool) = connect().await else { return };
    seed(&pool).await;
    let repository = PgQuotationRepository::new(pool.clone());
    let quotation = draft();
    repository.insert(&quotation).await.unwrap();

    let mut holder = pool.begin().await.unwrap();
    sqlx::query("SELECT id FROM quotations WHERE id = $1 FOR UPDATE")
        .bind(Uuid::from(quotation.id()))
        .execute(&mut *holder)
        .await
        .unwrap();

    let error = repository
        .replace_company_quotes(
            quotation.id(),
            &[quote(&CatalogFixtures::company_a(), dec!(18000))],
            QuotationState::Quoted,
        )
        .await
        .unwrap_err();
    assert!(error.is_conflict());

    holder.rollback().await.unwrap();
    repository.delete(quotation.id()).await.unwrap();
}

#[tokio::test]
async fn test_catalog_reads() {
    let Some(pool) = connect().await else { return };
    let catalog = seed(&pool).await;

    let active = catalog.list_active_companies().await.unwrap();
    assert!(active.iter().all(|c| c.is_active));
    assert!(active.iter().any(|c| c.id == CatalogFixtures::company_a().id));

    let addons = catalog.list_addons().await.unwrap();
    let orders: Vec<_> = addons.iter().map(|a| a.display_order).collect();
    let mut sorted = orders.clone();
    sorted.sort();
    assert_eq!(orders, sorted);

    let customer = catalog
        .get_customer(CustomerFixtures::with_mobile().id)
        .await
        .unwrap();
    assert_eq!(customer.mobile_number.as_deref(), Some(CustomerFixtures::MOBILE));
}

#[tokio::test]
async fn test_sub_paise_components_still_add_up_after_reload() {
    let Some(pool) = connect().await else { return };
    seed(&pool).await;
    let repository = PgQuotationRepository::new(pool);

    let quotation = QuotationBuilder::new()
        .customer(CustomerFixtures::with_mobile().id)
        .vehicle(VehicleDetails::new("Maruti Swift", FuelType::Petrol))
        .components(InsuredValueComponents {
            vehicle: dec!(100.004),
            trailer: dec!(0.004),
            ..Default::default()
        })
        .currency(Currency::INR)
        .build()
        .unwrap();
    repository.insert(&quotation).await.unwrap();

    let loaded = repository.load(quotation.id()).await.unwrap();
    let value = loaded.insured_value();
    assert_eq!(value.total.amount(), dec!(100.01));
    assert_eq!(value.breakdown.vehicle, dec!(100.004));
    assert_eq!(value.breakdown.trailer, dec!(0.004));
    assert_eq!(value.breakdown, quotation.insured_value().breakdown);

    repository.delete(quotation.id()).await.unwrap();
}
