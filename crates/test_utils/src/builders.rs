//! Test Data Builders
//!
//! Builders with sensible defaults so tests only spell out what matters.
//! [`TestHarness`] wires a [`QuotationService`] to the in-memory adapters and
//! keeps handles on them for inspection.

use std::sync::Arc;
use std::time::Duration;

use core_kernel::{AddonCoverId, CustomerId, Money};
use domain_quotation::ports::mock::{
    InMemoryCatalog, InMemoryQuotationRepository, MockDocumentRenderer, MockMessagingChannel,
    MockRateModel,
};
use domain_quotation::{
    AddonCover, Customer, FuelType, GenerationConfig, InsuranceCompany, InsuredValueComponents,
    LockPolicy, NewQuotation, PolicyType, QuotationPorts, QuotationService, QuotationServiceConfig,
    VehicleDetails,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::fixtures::{CatalogFixtures, CustomerFixtures, MoneyFixtures};

/// Builder for [`NewQuotation`] requests
pub struct TestQuotationBuilder {
    customer_id: CustomerId,
    vehicle: VehicleDetails,
    components: InsuredValueComponents,
    whatsapp_number: Option<String>,
    addon_ids: Vec<AddonCoverId>,
    policy_type: PolicyType,
    ncb_percentage: Decimal,
}

impl Default for TestQuotationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestQuotationBuilder {
    /// Reference scenario: vehicle 500000, trailer 20000, no kit
    pub fn new() -> Self {
        Self {
            customer_id: CustomerFixtures::with_mobile().id,
            vehicle: VehicleDetails {
                registration_number: Some("MH12AB1234".to_string()),
                variant: Some("VXI".to_string()),
                manufacturing_year: Some(2022),
                rto_location: Some("Pune".to_string()),
                ..VehicleDetails::new("Maruti Swift", FuelType::Petrol)
            },
            components: InsuredValueComponents {
                vehicle: dec!(500000),
                trailer: dec!(20000),
                ..Default::default()
            },
            whatsapp_number: None,
            addon_ids: Vec::new(),
            policy_type: PolicyType::Comprehensive,
            ncb_percentage: Decimal::ZERO,
        }
    }

    pub fn customer(mut self, customer_id: CustomerId) -> Self {
        self.customer_id = customer_id;
        self
    }

    pub fn components(mut self, components: InsuredValueComponents) -> Self {
        self.components = components;
        self
    }

    pub fn whatsapp_number(mut self, number: impl Into<String>) -> Self {
        self.whatsapp_number = Some(number.into());
        self
    }

    pub fn addons(mut self, addon_ids: Vec<AddonCoverId>) -> Self {
        self.addon_ids = addon_ids;
        self
    }

    pub fn policy_type(mut self, policy_type: PolicyType) -> Self {
        self.policy_type = policy_type;
        self
    }

    pub fn ncb_percentage(mut self, ncb: Decimal) -> Self {
        self.ncb_percentage = ncb;
        self
    }

    pub fn build(self) -> NewQuotation {
        NewQuotation {
            customer_id: self.customer_id,
            vehicle: self.vehicle,
            components: self.components,
            whatsapp_number: self.whatsapp_number,
            addon_ids: self.addon_ids,
            policy_type: self.policy_type,
            ncb_percentage: self.ncb_percentage,
            notes: None,
        }
    }
}

/// A service wired to in-memory adapters
pub struct TestHarness {
    pub service: Arc<QuotationService>,
    pub repository: Arc<InMemoryQuotationRepository>,
    pub catalog: Arc<InMemoryCatalog>,
    pub rate_model: Arc<MockRateModel>,
    pub renderer: Arc<MockDocumentRenderer>,
    pub messaging: Arc<MockMessagingChannel>,
}

/// Builder for [`TestHarness`]
///
/// Defaults to companies A, B and C priced at 18000, 15500 and 15500, both
/// fixture customers and the fixture addon catalog.
pub struct TestHarnessBuilder {
    companies: Vec<InsuranceCompany>,
    addons: Vec<AddonCover>,
    customers: Vec<Customer>,
    rate_model: MockRateModel,
    repository: InMemoryQuotationRepository,
    renderer: MockDocumentRenderer,
    lock_policy: LockPolicy,
    pricing_timeout: Duration,
}

impl Default for TestHarnessBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarnessBuilder {
    pub fn new() -> Self {
        let rate_model = MockRateModel::new()
            .with_premium(CatalogFixtures::company_a().id, MoneyFixtures::premium_a())
            .with_premium(CatalogFixtures::company_b().id, MoneyFixtures::premium_b_c())
            .with_premium(CatalogFixtures::company_c().id, MoneyFixtures::premium_b_c());
        Self {
            companies: CatalogFixtures::companies(),
            addons: CatalogFixtures::addons(),
            customers: vec![CustomerFixtures::with_mobile(), CustomerFixtures::without_mobile()],
            rate_model,
            repository: InMemoryQuotationRepository::new(),
            renderer: MockDocumentRenderer::new(),
            lock_policy: LockPolicy::FailFast,
            pricing_timeout: Duration::from_millis(200),
        }
    }

    pub fn companies(mut self, companies: Vec<InsuranceCompany>) -> Self {
        self.companies = companies;
        self
    }

    pub fn rate_model(mut self, rate_model: MockRateModel) -> Self {
        self.rate_model = rate_model;
        self
    }

    /// Prices `company` at `premium`, adding to the default script
    pub fn premium(mut self, company: &InsuranceCompany, premium: Money) -> Self {
        self.rate_model = self.rate_model.with_premium(company.id, premium);
        self
    }

    pub fn repository(mut self, repository: InMemoryQuotationRepository) -> Self {
        self.repository = repository;
        self
    }

    pub fn failing_renderer(mut self) -> Self {
        self.renderer = MockDocumentRenderer::failing();
        self
    }

    pub fn lock_policy(mut self, policy: LockPolicy) -> Self {
        self.lock_policy = policy;
        self
    }

    pub fn pricing_timeout(mut self, timeout: Duration) -> Self {
        self.pricing_timeout = timeout;
        self
    }

    pub fn build(self) -> TestHarness {
        let mut catalog = InMemoryCatalog::new()
            .with_companies(self.companies)
            .with_addons(self.addons);
        for customer in self.customers {
            catalog = catalog.with_customer(customer);
        }

        let repository = Arc::new(self.repository);
        let catalog = Arc::new(catalog);
        let rate_model = Arc::new(self.rate_model);
        let renderer = Arc::new(self.renderer);
        let messaging = Arc::new(MockMessagingChannel::new());

        let service = QuotationService::new(
            QuotationPorts {
                repository: repository.clone(),
                catalog: catalog.clone(),
                rate_model: rate_model.clone(),
                renderer: renderer.clone(),
                messaging: messaging.clone(),
            },
            QuotationServiceConfig {
                generation: GenerationConfig {
                    pricing_timeout: self.pricing_timeout,
                },
                lock_policy: self.lock_policy,
                ..Default::default()
            },
        );

        TestHarness {
            service: Arc::new(service),
            repository,
            catalog,
            rate_model,
            renderer,
            messaging,
        }
    }
}
