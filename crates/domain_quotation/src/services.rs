//! Quotation application service
//!
//! Orchestrates the aggregate, the catalogs, the rate model and the delivery
//! collaborators. Every mutating operation holds the quotation's lock from
//! load to persist; reads never lock.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use core_kernel::{AddonCoverId, Currency, CustomerId, Money, QuotationId};

use crate::aggregate::{
    DeliveryChannel, DeliveryRecord, Quotation, QuotationBuilder, QuotationState, QuotationUpdate,
    VehicleDetails,
};
use crate::catalog::{AddonCover, Customer};
use crate::company_quote::{validate_replacement, CompanyQuote, CompanyQuoteInput};
use crate::delivery::{DeliveryConfirmation, DeliveryGatekeeper, DispatchMessage, RenderedDocument};
use crate::error::QuotationError;
use crate::events::QuotationEvent;
use crate::generator::{GenerationConfig, QuoteGenerator, SkippedCompany};
use crate::insured_value::{compute_from_raw, InsuredValue, InsuredValueComponents};
use crate::locks::{LockPolicy, QuotationLockGuard, QuotationLocks};
use crate::ports::{CatalogPort, DocumentRenderer, MessagingChannel, QuotationRepository, RateModel};
use crate::rating::{PolicyType, PricingRequest};
use crate::statistics::{compute_statistics, QuotationStatistics};

/// Adapters the service runs against
#[derive(Clone)]
pub struct QuotationPorts {
    pub repository: Arc<dyn QuotationRepository>,
    pub catalog: Arc<dyn CatalogPort>,
    pub rate_model: Arc<dyn RateModel>,
    pub renderer: Arc<dyn DocumentRenderer>,
    pub messaging: Arc<dyn MessagingChannel>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QuotationServiceConfig {
    pub generation: GenerationConfig,
    pub lock_policy: LockPolicy,
    /// Currency of new quotations and statistics
    pub currency: Currency,
}

/// Input for a new quotation
#[derive(Debug, Clone)]
pub struct NewQuotation {
    pub customer_id: CustomerId,
    pub vehicle: VehicleDetails,
    pub components: InsuredValueComponents,
    pub whatsapp_number: Option<String>,
    pub addon_ids: Vec<AddonCoverId>,
    pub policy_type: PolicyType,
    pub ncb_percentage: Decimal,
    pub notes: Option<String>,
}

/// Ad-hoc overrides for one generation round
///
/// Overrides are priced but never stored on the quotation itself.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Insured value to price instead of the stored one
    pub insured_value: Option<Decimal>,
    /// Addon selection to price instead of the stored one
    pub addon_ids: Option<Vec<AddonCoverId>>,
}

/// Result of a generation round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOutcome {
    pub quotation_id: QuotationId,
    pub state: QuotationState,
    /// Ranked, cheapest first
    pub quotes: Vec<CompanyQuote>,
    pub generated: usize,
    pub attempted: usize,
    pub skipped: Vec<SkippedCompany>,
}

/// Result of a bulk replace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplaceOutcome {
    pub quotation_id: QuotationId,
    pub state: QuotationState,
    pub count: usize,
    pub quotes: Vec<CompanyQuote>,
}

/// Entry point for every quotation operation
pub struct QuotationService {
    repository: Arc<dyn QuotationRepository>,
    catalog: Arc<dyn CatalogPort>,
    renderer: Arc<dyn DocumentRenderer>,
    messaging: Arc<dyn MessagingChannel>,
    generator: QuoteGenerator,
    locks: QuotationLocks,
    currency: Currency,
}

impl QuotationService {
    pub fn new(ports: QuotationPorts, config: QuotationServiceConfig) -> Self {
        Self {
            repository: ports.repository,
            catalog: ports.catalog,
            renderer: ports.renderer,
            messaging: ports.messaging,
            generator: QuoteGenerator::new(ports.rate_model, config.generation),
            locks: QuotationLocks::new(config.lock_policy),
            currency: config.currency,
        }
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn locks(&self) -> &QuotationLocks {
        &self.locks
    }

    pub fn repository(&self) -> &Arc<dyn QuotationRepository> {
        &self.repository
    }

    /// Computes an insured value from raw JSON components
    pub fn compute_insured_value(&self, raw: &Map<String, Value>) -> Result<InsuredValue, QuotationError> {
        compute_from_raw(raw, self.currency)
    }

    #[tracing::instrument(skip(self, input), fields(customer_id = %input.customer_id))]
    pub async fn create_quotation(&self, input: NewQuotation) -> Result<Quotation, QuotationError> {
        self.catalog.get_customer(input.customer_id).await?;
        let catalog_addons = self.catalog.list_addons().await?;
        validate_addon_ids(&catalog_addons, &input.addon_ids)?;

        let mut builder = QuotationBuilder::new()
            .customer(input.customer_id)
            .vehicle(input.vehicle)
            .components(input.components)
            .currency(self.currency)
            .addons(input.addon_ids)
            .policy_type(input.policy_type)
            .ncb_percentage(input.ncb_percentage);
        if let Some(number) = input.whatsapp_number {
            builder = builder.whatsapp_number(number);
        }
        if let Some(notes) = input.notes {
            builder = builder.notes(notes);
        }

        let mut quotation = builder.build()?;
        self.repository.insert(&quotation).await?;
        publish(quotation.take_events());
        Ok(quotation)
    }

    pub async fn get(&self, id: QuotationId) -> Result<Quotation, QuotationError> {
        Ok(self.repository.load(id).await?)
    }

    pub async fn list(&self) -> Result<Vec<Quotation>, QuotationError> {
        Ok(self.repository.list().await?)
    }

    /// Changes descriptive fields and recomputes the insured value
    ///
    /// Existing company quotes are kept even when the insured value changed.
    #[tracing::instrument(skip(self, update), fields(quotation_id = %id))]
    pub async fn update(&self, id: QuotationId, update: QuotationUpdate) -> Result<Quotation, QuotationError> {
        let _guard = self.locks.acquire(id).await?;
        let mut quotation = self.repository.load(id).await?;

        if let Some(addon_ids) = &update.addon_ids {
            let catalog_addons = self.catalog.list_addons().await?;
            validate_addon_ids(&catalog_addons, addon_ids)?;
        }

        let insured_value_changed = quotation.apply_update(update)?;
        self.repository.update(&quotation).await?;

        if insured_value_changed && quotation.has_company_quotes() {
            tracing::info!(
                quotation_id = %id,
                company_quotes = quotation.company_quotes().len(),
                "insured value changed; existing company quotes kept"
            );
        }
        publish(quotation.take_events());
        Ok(quotation)
    }

    #[tracing::instrument(skip(self), fields(quotation_id = %id))]
    pub async fn delete(&self, id: QuotationId) -> Result<(), QuotationError> {
        {
            let _guard = self.locks.acquire(id).await?;
            let mut quotation = self.repository.load(id).await?;
            quotation.mark_deleted();
            self.repository.delete(id).await?;
            publish(quotation.take_events());
        }
        self.locks.forget(id);
        Ok(())
    }

    /// Prices every active company and replaces the company quote set
    #[tracing::instrument(skip(self, options), fields(quotation_id = %id))]
    pub async fn generate_quotes(
        &self,
        id: QuotationId,
        options: GenerateOptions,
    ) -> Result<GenerationOutcome, QuotationError> {
        let guard = self.locks.acquire(id).await?;
        let mut quotation = self.repository.load(id).await?;

        let insured_value = match options.insured_value {
            Some(amount) => Money::new(amount, quotation.currency()).round_to_currency(),
            None => quotation.insured_value().total,
        };
        if !insured_value.is_positive() {
            return Err(QuotationError::invalid_input(
                "insured_value",
                "must be greater than zero to generate quotes",
            ));
        }

        let catalog_addons = self.catalog.list_addons().await?;
        let addons = match &options.addon_ids {
            Some(ids) => {
                validate_addon_ids(&catalog_addons, ids)?;
                selected_addons(&catalog_addons, ids)
            }
            None => selected_addons(&catalog_addons, quotation.addon_ids()),
        };

        let companies = self.catalog.list_active_companies().await?;
        let request = PricingRequest {
            quotation_id: id,
            insured_value,
            addons,
            policy_type: quotation.policy_type(),
            ncb_percentage: quotation.ncb_percentage(),
        };

        let report = self.generator.generate(&companies, &request).await;
        let attempted = report.attempted;
        let skipped = report.skipped;

        quotation.replace_company_quotes(report.quotes)?;
        let generated = self.persist_company_quotes(guard, &quotation).await?;
        publish(quotation.take_events());

        Ok(GenerationOutcome {
            quotation_id: id,
            state: quotation.state(),
            quotes: quotation.company_quotes().to_vec(),
            generated,
            attempted,
            skipped,
        })
    }

    pub async fn company_quotes(&self, id: QuotationId) -> Result<Vec<CompanyQuote>, QuotationError> {
        Ok(self.repository.company_quotes(id).await?)
    }

    /// Replaces the company quote set with caller-supplied rows
    #[tracing::instrument(skip(self, rows), fields(quotation_id = %id, rows = rows.len()))]
    pub async fn replace_company_quotes(
        &self,
        id: QuotationId,
        rows: Vec<CompanyQuoteInput>,
    ) -> Result<ReplaceOutcome, QuotationError> {
        let guard = self.locks.acquire(id).await?;
        let mut quotation = self.repository.load(id).await?;

        let companies = self.catalog.list_companies().await?;
        let addons = self.catalog.list_addons().await?;
        let quotes = validate_replacement(&rows, &companies, &addons, quotation.currency())?;

        quotation.replace_company_quotes(quotes)?;
        let count = self.persist_company_quotes(guard, &quotation).await?;
        publish(quotation.take_events());

        Ok(ReplaceOutcome {
            quotation_id: id,
            state: quotation.state(),
            count,
            quotes: quotation.company_quotes().to_vec(),
        })
    }

    /// Renders the quotation document
    #[tracing::instrument(skip(self), fields(quotation_id = %id))]
    pub async fn export_document(&self, id: QuotationId) -> Result<RenderedDocument, QuotationError> {
        let mut quotation = self.repository.load(id).await?;
        DeliveryGatekeeper::can_export(&quotation).map_err(QuotationError::Blocked)?;
        let customer = self.catalog.get_customer(quotation.customer_id()).await?;

        let document = DeliveryGatekeeper::document(&quotation, &customer);
        let rendered = match self.renderer.render(&document).await {
            Ok(rendered) => rendered,
            Err(error) => {
                let record = DeliveryRecord::failed(DeliveryChannel::Document, None, error.to_string());
                self.record_attempt(&mut quotation, record).await;
                return Err(QuotationError::upstream("document renderer", &error));
            }
        };

        let file_name = DeliveryGatekeeper::file_name(&quotation);
        let record = DeliveryRecord::succeeded(DeliveryChannel::Document, None, Some(file_name.clone()));
        self.record_attempt(&mut quotation, record).await;

        Ok(RenderedDocument { file_name, ..rendered })
    }

    /// Sends the quotation document through the messaging channel
    #[tracing::instrument(skip(self), fields(quotation_id = %id))]
    pub async fn dispatch(&self, id: QuotationId) -> Result<DeliveryConfirmation, QuotationError> {
        let _guard = self.locks.acquire(id).await?;
        let mut quotation = self.repository.load(id).await?;
        let channel = self.messaging.channel();

        let customer = match self.catalog.get_customer(quotation.customer_id()).await {
            Ok(customer) => Some(customer),
            Err(error) if error.is_not_found() => None,
            Err(error) => return Err(error.into()),
        };

        let destination = DeliveryGatekeeper::can_dispatch(&quotation, customer.as_ref(), channel)
            .map_err(QuotationError::Blocked)?;
        let customer = customer.unwrap_or_else(|| Customer::unknown(quotation.customer_id()));

        let document = DeliveryGatekeeper::document(&quotation, &customer);
        let rendered = match self.renderer.render(&document).await {
            Ok(rendered) => rendered,
            Err(error) => {
                let record = DeliveryRecord::failed(channel, Some(destination), error.to_string());
                self.record_attempt(&mut quotation, record).await;
                return Err(QuotationError::upstream("document renderer", &error));
            }
        };

        let message = DispatchMessage {
            destination: destination.clone(),
            text: DeliveryGatekeeper::dispatch_text(&quotation, &customer),
            document: RenderedDocument {
                file_name: DeliveryGatekeeper::file_name(&quotation),
                ..rendered
            },
        };

        match self.messaging.send(&message).await {
            Ok(receipt) => {
                let record = DeliveryRecord::succeeded(
                    channel,
                    Some(destination.clone()),
                    Some(receipt.reference.clone()),
                );
                let delivery_id = record.id;
                quotation.record_delivery(record.clone());
                self.repository
                    .record_delivery(id, &record, Some(quotation.state()))
                    .await?;
                publish(quotation.take_events());

                Ok(DeliveryConfirmation {
                    quotation_id: id,
                    delivery_id,
                    channel,
                    destination,
                    reference: receipt.reference,
                    state: quotation.state(),
                })
            }
            Err(error) => {
                let record = DeliveryRecord::failed(channel, Some(destination), error.to_string());
                self.record_attempt(&mut quotation, record).await;
                Err(QuotationError::upstream(channel.as_str(), &error))
            }
        }
    }

    pub async fn statistics(&self) -> Result<QuotationStatistics, QuotationError> {
        let quotations = self.repository.list().await?;
        Ok(compute_statistics(&quotations, self.currency))
    }

    /// Persists the aggregate's company quotes on a detached task
    ///
    /// The task owns the lock guard, so dropping the caller's future cannot
    /// interrupt a replacement that has started.
    async fn persist_company_quotes(
        &self,
        guard: QuotationLockGuard,
        quotation: &Quotation,
    ) -> Result<usize, QuotationError> {
        let repository = Arc::clone(&self.repository);
        let id = quotation.id();
        let quotes = quotation.company_quotes().to_vec();
        let state = quotation.state();

        let task = tokio::spawn(async move {
            let _guard = guard;
            repository.replace_company_quotes(id, &quotes, state).await
        });

        let stored = task
            .await
            .map_err(|e| QuotationError::Internal(format!("persist task for {} failed: {}", id, e)))??;
        Ok(stored)
    }

    /// Appends a delivery record, logging instead of failing when the store refuses
    async fn record_attempt(&self, quotation: &mut Quotation, record: DeliveryRecord) {
        if !record.succeeded {
            tracing::warn!(
                quotation_id = %quotation.id(),
                channel = record.channel.as_str(),
                reason = record.failure_reason.as_deref().unwrap_or_default(),
                "delivery attempt failed"
            );
        }
        quotation.record_delivery(record.clone());
        if let Err(error) = self.repository.record_delivery(quotation.id(), &record, None).await {
            tracing::error!(quotation_id = %quotation.id(), %error, "delivery record not stored");
        }
        publish(quotation.take_events());
    }
}

fn validate_addon_ids(catalog: &[AddonCover], ids: &[AddonCoverId]) -> Result<(), QuotationError> {
    match ids.iter().find(|id| !catalog.iter().any(|a| a.id == **id)) {
        Some(unknown) => Err(QuotationError::invalid_input(
            "addon_ids",
            format!("unknown addon cover {}", unknown),
        )),
        None => Ok(()),
    }
}

/// Selected covers in catalog display order; ids no longer in the catalog are dropped
fn selected_addons(catalog: &[AddonCover], ids: &[AddonCoverId]) -> Vec<AddonCover> {
    catalog.iter().filter(|a| ids.contains(&a.id)).cloned().collect()
}

fn publish(events: Vec<QuotationEvent>) {
    for event in events {
        tracing::info!(
            event = event.name(),
            quotation_id = %event.quotation_id(),
            "domain event"
        );
    }
}
