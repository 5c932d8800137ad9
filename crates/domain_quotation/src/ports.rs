//! Quotation Domain Ports
//!
//! Port interfaces the engine needs from the outside world. Adapters live in
//! `infra_db` (PostgreSQL), [`crate::adapters`] (HTTP collaborators) and the
//! [`mock`] module (in-memory, for tests).
//!
//! | Port | Role |
//! |---|---|
//! | [`QuotationRepository`] | Stores quotations; replaces company quotes atomically |
//! | [`CatalogPort`] | Read-only companies, addon covers and customers |
//! | [`RateModel`] | Prices one company for one request |
//! | [`DocumentRenderer`] | Turns a quotation into a binary document |
//! | [`MessagingChannel`] | Sends a message with a document to a destination |

use async_trait::async_trait;

use core_kernel::{CustomerId, DomainPort, HealthCheckable, PortError, QuotationId};

use crate::aggregate::{DeliveryChannel, DeliveryRecord, Quotation, QuotationState};
use crate::catalog::{AddonCover, Customer, InsuranceCompany};
use crate::company_quote::CompanyQuote;
use crate::delivery::{DeliveryReceipt, DispatchMessage, QuotationDocument, RenderedDocument};
use crate::rating::{PricedQuote, PricingRequest};

/// Persistence of quotation aggregates
///
/// Reads return a consistent snapshot: a concurrent replacement is either
/// fully visible or not visible at all.
#[async_trait]
pub trait QuotationRepository: DomainPort + HealthCheckable {
    /// Stores a new quotation
    async fn insert(&self, quotation: &Quotation) -> Result<(), PortError>;

    /// Loads a quotation with its company quotes in rank order
    async fn load(&self, id: QuotationId) -> Result<Quotation, PortError>;

    /// Loads every quotation, newest first
    async fn list(&self) -> Result<Vec<Quotation>, PortError>;

    /// Persists descriptive fields, leaving company quotes untouched
    async fn update(&self, quotation: &Quotation) -> Result<(), PortError>;

    /// Deletes the current company quotes and inserts `quotes` in one unit
    ///
    /// On any failure the previous set stays in place. Returns the number
    /// of quotes stored.
    async fn replace_company_quotes(
        &self,
        id: QuotationId,
        quotes: &[CompanyQuote],
        state: QuotationState,
    ) -> Result<usize, PortError>;

    /// Company quotes of a quotation in rank order
    async fn company_quotes(&self, id: QuotationId) -> Result<Vec<CompanyQuote>, PortError>;

    /// Appends a delivery record, optionally moving the quotation state
    async fn record_delivery(
        &self,
        id: QuotationId,
        record: &DeliveryRecord,
        state: Option<QuotationState>,
    ) -> Result<(), PortError>;

    /// Deletes a quotation and its company quotes
    async fn delete(&self, id: QuotationId) -> Result<(), PortError>;
}

/// Read-only catalogs owned by the administration system
#[async_trait]
pub trait CatalogPort: DomainPort + HealthCheckable {
    /// Companies that take part in generation
    async fn list_active_companies(&self) -> Result<Vec<InsuranceCompany>, PortError>;

    /// Every company, active or not
    async fn list_companies(&self) -> Result<Vec<InsuranceCompany>, PortError>;

    /// Active addon covers in display order
    async fn list_addons(&self) -> Result<Vec<AddonCover>, PortError>;

    async fn get_customer(&self, id: CustomerId) -> Result<Customer, PortError>;
}

/// Per-company pricing capability
#[async_trait]
pub trait RateModel: DomainPort + HealthCheckable {
    /// Prices one company
    ///
    /// `ServiceUnavailable` means the company cannot be priced right now and
    /// is skipped by the generator.
    async fn price(
        &self,
        company: &InsuranceCompany,
        request: &PricingRequest,
    ) -> Result<PricedQuote, PortError>;
}

/// External document renderer
#[async_trait]
pub trait DocumentRenderer: DomainPort + HealthCheckable {
    async fn render(&self, document: &QuotationDocument) -> Result<RenderedDocument, PortError>;
}

/// External messaging channel
#[async_trait]
pub trait MessagingChannel: DomainPort + HealthCheckable {
    /// Channel this adapter delivers through
    fn channel(&self) -> DeliveryChannel;

    async fn send(&self, message: &DispatchMessage) -> Result<DeliveryReceipt, PortError>;
}

#[cfg(any(test, feature = "mock"))]
pub mod mock {
    //! In-memory adapters for tests

    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::{Mutex, RwLock};

    use core_kernel::{HealthCheckResult, InsuranceCompanyId, Money};

    /// In-memory quotation store
    ///
    /// Replacement is staged on a copy and swapped in under the write lock,
    /// so readers never observe a half-replaced set. A failure can be
    /// injected between the delete and insert phases.
    #[derive(Debug, Default)]
    pub struct InMemoryQuotationRepository {
        quotations: Arc<RwLock<HashMap<QuotationId, Quotation>>>,
        fail_after_delete: AtomicBool,
        replace_delay: std::sync::Mutex<Option<Duration>>,
        replace_calls: AtomicUsize,
    }

    impl InMemoryQuotationRepository {
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes the next replacement fail after its delete phase
        pub fn fail_next_replace_after_delete(&self) {
            self.fail_after_delete.store(true, Ordering::SeqCst);
        }

        /// Slows every replacement down between delete and insert
        pub fn with_replace_delay(self, delay: Duration) -> Self {
            if let Ok(mut slot) = self.replace_delay.lock() {
                *slot = Some(delay);
            }
            self
        }

        /// Number of replacements attempted
        pub fn replace_calls(&self) -> usize {
            self.replace_calls.load(Ordering::SeqCst)
        }

        fn delay(&self) -> Option<Duration> {
            self.replace_delay.lock().ok().and_then(|slot| *slot)
        }
    }

    impl DomainPort for InMemoryQuotationRepository {}

    #[async_trait]
    impl HealthCheckable for InMemoryQuotationRepository {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("in-memory-quotation-repository")
        }
    }

    #[async_trait]
    impl QuotationRepository for InMemoryQuotationRepository {
        async fn insert(&self, quotation: &Quotation) -> Result<(), PortError> {
            let mut store = self.quotations.write().await;
            if store.contains_key(&quotation.id()) {
                return Err(PortError::conflict(format!(
                    "quotation {} already exists",
                    quotation.id()
                )));
            }
            let mut stored = quotation.clone();
            stored.take_events();
            store.insert(quotation.id(), stored);
            Ok(())
        }

        async fn load(&self, id: QuotationId) -> Result<Quotation, PortError> {
            self.quotations
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Quotation", id))
        }

        async fn list(&self) -> Result<Vec<Quotation>, PortError> {
            let store = self.quotations.read().await;
            let mut quotations: Vec<Quotation> = store.values().cloned().collect();
            quotations.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
            Ok(quotations)
        }

        async fn update(&self, quotation: &Quotation) -> Result<(), PortError> {
            let mut store = self.quotations.write().await;
            let stored = store
                .get(&quotation.id())
                .ok_or_else(|| PortError::not_found("Quotation", quotation.id()))?;

            // Company quotes and deliveries are owned by their own operations
            let mut updated = quotation.clone();
            updated.take_events();
            updated.install_persisted_children(stored);
            store.insert(quotation.id(), updated);
            Ok(())
        }

        async fn replace_company_quotes(
            &self,
            id: QuotationId,
            quotes: &[CompanyQuote],
            state: QuotationState,
        ) -> Result<usize, PortError> {
            self.replace_calls.fetch_add(1, Ordering::SeqCst);

            if !self.quotations.read().await.contains_key(&id) {
                return Err(PortError::not_found("Quotation", id));
            }

            if let Some(delay) = self.delay() {
                tokio::time::sleep(delay).await;
            }
            if self.fail_after_delete.swap(false, Ordering::SeqCst) {
                return Err(PortError::internal(
                    "injected failure between delete and insert",
                ));
            }

            // Deliveries recorded meanwhile belong to the current entry
            let mut store = self.quotations.write().await;
            match store.get_mut(&id) {
                Some(current) => {
                    current.install_company_quotes(quotes.to_vec(), state);
                    current.bump_version();
                    Ok(current.company_quotes().len())
                }
                None => Err(PortError::not_found("Quotation", id)),
            }
        }

        async fn company_quotes(&self, id: QuotationId) -> Result<Vec<CompanyQuote>, PortError> {
            self.quotations
                .read()
                .await
                .get(&id)
                .map(|q| q.company_quotes().to_vec())
                .ok_or_else(|| PortError::not_found("Quotation", id))
        }

        async fn record_delivery(
            &self,
            id: QuotationId,
            record: &DeliveryRecord,
            state: Option<QuotationState>,
        ) -> Result<(), PortError> {
            let mut store = self.quotations.write().await;
            let quotation = store
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found("Quotation", id))?;
            quotation.install_delivery(record.clone(), state);
            Ok(())
        }

        async fn delete(&self, id: QuotationId) -> Result<(), PortError> {
            self.quotations
                .write()
                .await
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| PortError::not_found("Quotation", id))
        }
    }

    /// Fixed catalog of companies, addons and customers
    #[derive(Debug, Default)]
    pub struct InMemoryCatalog {
        companies: RwLock<Vec<InsuranceCompany>>,
        addons: RwLock<Vec<AddonCover>>,
        customers: RwLock<HashMap<CustomerId, Customer>>,
    }

    impl InMemoryCatalog {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_companies(self, companies: Vec<InsuranceCompany>) -> Self {
            if let Ok(mut slot) = self.companies.try_write() {
                *slot = companies;
            }
            self
        }

        pub fn with_addons(self, mut addons: Vec<AddonCover>) -> Self {
            crate::catalog::sort_by_display_order(&mut addons);
            if let Ok(mut slot) = self.addons.try_write() {
                *slot = addons;
            }
            self
        }

        pub fn with_customer(self, customer: Customer) -> Self {
            if let Ok(mut slot) = self.customers.try_write() {
                slot.insert(customer.id, customer);
            }
            self
        }

        pub async fn add_company(&self, company: InsuranceCompany) {
            self.companies.write().await.push(company);
        }

        pub async fn remove_customer(&self, id: CustomerId) {
            self.customers.write().await.remove(&id);
        }
    }

    impl DomainPort for InMemoryCatalog {}

    #[async_trait]
    impl HealthCheckable for InMemoryCatalog {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("in-memory-catalog")
        }
    }

    #[async_trait]
    impl CatalogPort for InMemoryCatalog {
        async fn list_active_companies(&self) -> Result<Vec<InsuranceCompany>, PortError> {
            Ok(self
                .companies
                .read()
                .await
                .iter()
                .filter(|c| c.is_active)
                .cloned()
                .collect())
        }

        async fn list_companies(&self) -> Result<Vec<InsuranceCompany>, PortError> {
            Ok(self.companies.read().await.clone())
        }

        async fn list_addons(&self) -> Result<Vec<AddonCover>, PortError> {
            Ok(self
                .addons
                .read()
                .await
                .iter()
                .filter(|a| a.is_active)
                .cloned()
                .collect())
        }

        async fn get_customer(&self, id: CustomerId) -> Result<Customer, PortError> {
            self.customers
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Customer", id))
        }
    }

    /// Scripted outcome of pricing one company
    #[derive(Debug, Clone)]
    pub enum MockPricing {
        /// Returns basic and final premium
        Premium { basic: Money, final_premium: Money },
        /// Answers after a delay
        Delayed {
            delay: Duration,
            basic: Money,
            final_premium: Money,
        },
        /// Fails with `ServiceUnavailable`
        Unavailable,
    }

    /// Rate model answering from a per-company script
    ///
    /// Companies without a script are unavailable.
    #[derive(Debug, Default)]
    pub struct MockRateModel {
        script: RwLock<HashMap<InsuranceCompanyId, MockPricing>>,
        calls: AtomicUsize,
    }

    impl MockRateModel {
        pub fn new() -> Self {
            Self::default()
        }

        /// Prices a company with basic equal to final premium
        pub fn with_premium(self, company: InsuranceCompanyId, premium: Money) -> Self {
            self.with_pricing(
                company,
                MockPricing::Premium {
                    basic: premium,
                    final_premium: premium,
                },
            )
        }

        pub fn with_pricing(self, company: InsuranceCompanyId, pricing: MockPricing) -> Self {
            if let Ok(mut script) = self.script.try_write() {
                script.insert(company, pricing);
            }
            self
        }

        pub async fn set_pricing(&self, company: InsuranceCompanyId, pricing: MockPricing) {
            self.script.write().await.insert(company, pricing);
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl DomainPort for MockRateModel {}

    #[async_trait]
    impl HealthCheckable for MockRateModel {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("mock-rate-model")
        }
    }

    #[async_trait]
    impl RateModel for MockRateModel {
        async fn price(
            &self,
            company: &InsuranceCompany,
            _request: &PricingRequest,
        ) -> Result<PricedQuote, PortError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let pricing = self.script.read().await.get(&company.id).cloned();
            let (basic, final_premium) = match pricing {
                Some(MockPricing::Premium { basic, final_premium }) => (basic, final_premium),
                Some(MockPricing::Delayed { delay, basic, final_premium }) => {
                    tokio::time::sleep(delay).await;
                    (basic, final_premium)
                }
                Some(MockPricing::Unavailable) | None => {
                    return Err(PortError::unavailable(format!("pricing for {}", company.name)))
                }
            };
            Ok(PricedQuote {
                basic_premium: basic,
                final_premium,
                addons: Vec::new(),
                breakdown: None,
            })
        }
    }

    /// Renderer producing a fixed PDF-like payload
    #[derive(Debug, Default)]
    pub struct MockDocumentRenderer {
        fail: AtomicBool,
        renders: AtomicUsize,
    }

    impl MockDocumentRenderer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing() -> Self {
            let renderer = Self::default();
            renderer.fail.store(true, Ordering::SeqCst);
            renderer
        }

        pub fn renders(&self) -> usize {
            self.renders.load(Ordering::SeqCst)
        }
    }

    impl DomainPort for MockDocumentRenderer {}

    #[async_trait]
    impl HealthCheckable for MockDocumentRenderer {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("mock-document-renderer")
        }
    }

    #[async_trait]
    impl DocumentRenderer for MockDocumentRenderer {
        async fn render(&self, document: &QuotationDocument) -> Result<RenderedDocument, PortError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(PortError::unavailable("document renderer"));
            }
            self.renders.fetch_add(1, Ordering::SeqCst);
            let body = format!(
                "%PDF-1.4\n% {} for {} ({} offers)\n",
                document.quote_number,
                document.customer.name,
                document.company_quotes.len()
            );
            Ok(RenderedDocument::pdf(
                format!("{}.pdf", document.quote_number),
                body.into_bytes(),
            ))
        }
    }

    /// Messaging channel that records what it was asked to send
    #[derive(Debug, Default)]
    pub struct MockMessagingChannel {
        sent: Mutex<Vec<DispatchMessage>>,
        fail: AtomicBool,
    }

    impl MockMessagingChannel {
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes every send fail until reset
        pub fn set_failing(&self, failing: bool) {
            self.fail.store(failing, Ordering::SeqCst);
        }

        pub async fn sent(&self) -> Vec<DispatchMessage> {
            self.sent.lock().await.clone()
        }
    }

    impl DomainPort for MockMessagingChannel {}

    #[async_trait]
    impl HealthCheckable for MockMessagingChannel {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("mock-messaging-channel")
        }
    }

    #[async_trait]
    impl MessagingChannel for MockMessagingChannel {
        fn channel(&self) -> DeliveryChannel {
            DeliveryChannel::WhatsApp
        }

        async fn send(&self, message: &DispatchMessage) -> Result<DeliveryReceipt, PortError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(PortError::rejected("whatsapp", "destination not reachable"));
            }
            let mut sent = self.sent.lock().await;
            sent.push(message.clone());
            Ok(DeliveryReceipt {
                reference: format!("mock-{}", sent.len()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::*;
    use super::*;
    use crate::aggregate::{FuelType, QuotationBuilder, VehicleDetails};
    use crate::insured_value::InsuredValueComponents;
    use core_kernel::{Currency, Money};
    use rust_decimal_macros::dec;

    fn quotation() -> Quotation {
        QuotationBuilder::new()
            .customer(CustomerId::new())
            .vehicle(VehicleDetails::new("Hyundai Creta", FuelType::Diesel))
            .components(InsuredValueComponents::vehicle_only(dec!(900000)))
            .build()
            .unwrap()
    }

    fn quotes() -> Vec<CompanyQuote> {
        ["A", "B"]
            .iter()
            .zip([dec!(18000), dec!(15500)])
            .map(|(name, premium)| {
                let premium = Money::new(premium, Currency::INR);
                CompanyQuote::new(&InsuranceCompany::new(*name), premium, premium).unwrap()
            })
            .collect()
    }

    #[tokio::test]
    async fn test_replace_and_read_back() {
        let repository = InMemoryQuotationRepository::new();
        let quotation = quotation();
        repository.insert(&quotation).await.unwrap();

        let count = repository
            .replace_company_quotes(quotation.id(), &quotes(), QuotationState::Quoted)
            .await
            .unwrap();
        assert_eq!(count, 2);

        let stored = repository.company_quotes(quotation.id()).await.unwrap();
        assert_eq!(stored[0].company_name, "B");
        assert_eq!(stored[0].rank, 1);
        let loaded = repository.load(quotation.id()).await.unwrap();
        assert_eq!(loaded.state(), QuotationState::Quoted);
        assert_eq!(loaded.version(), quotation.version() + 1);
    }

    #[tokio::test]
    async fn test_injected_failure_keeps_previous_set() {
        let repository = InMemoryQuotationRepository::new();
        let quotation = quotation();
        repository.insert(&quotation).await.unwrap();
        repository
            .replace_company_quotes(quotation.id(), &quotes(), QuotationState::Quoted)
            .await
            .unwrap();

        repository.fail_next_replace_after_delete();
        let result = repository
            .replace_company_quotes(quotation.id(), &quotes()[..1], QuotationState::Quoted)
            .await;
        assert!(result.is_err());

        let stored = repository.company_quotes(quotation.id()).await.unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn test_catalog_filters_inactive() {
        let active = InsuranceCompany::new("Active");
        let inactive = InsuranceCompany::new("Dormant").deactivated();
        let catalog = InMemoryCatalog::new().with_companies(vec![active.clone(), inactive]);

        assert_eq!(catalog.list_active_companies().await.unwrap(), vec![active]);
        assert_eq!(catalog.list_companies().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_quotation() {
        let repository = InMemoryQuotationRepository::new();
        let err = repository.load(QuotationId::new()).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(repository.delete(QuotationId::new()).await.unwrap_err().is_not_found());
    }
}
