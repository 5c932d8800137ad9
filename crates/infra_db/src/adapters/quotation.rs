//! PostgreSQL quotation adapter
//!
//! Implements the domain's `QuotationRepository` port on top of
//! [`QuotationStore`], translating `DatabaseError` into `PortError`.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{
    AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable, PortError, QuotationId,
};
use domain_quotation::{CompanyQuote, DeliveryRecord, Quotation, QuotationRepository, QuotationState};

use crate::repositories::QuotationStore;

/// PostgreSQL-backed implementation of the quotation repository port
#[derive(Debug, Clone)]
pub struct PgQuotationRepository {
    store: QuotationStore,
}

impl PgQuotationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            store: QuotationStore::new(pool),
        }
    }

    /// Underlying store, for operations not exposed through the port
    pub fn store(&self) -> &QuotationStore {
        &self.store
    }
}

impl DomainPort for PgQuotationRepository {}

#[async_trait]
impl HealthCheckable for PgQuotationRepository {
    async fn health_check(&self) -> HealthCheckResult {
        database_health("postgres-quotation-repository", self.store.pool()).await
    }
}

/// Runs `SELECT 1` and reports the latency
pub(crate) async fn database_health(adapter_id: &str, pool: &PgPool) -> HealthCheckResult {
    let start = std::time::Instant::now();
    let result = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await;
    let latency_ms = start.elapsed().as_millis() as u64;

    let (status, message) = match result {
        Ok(_) => (AdapterHealth::Healthy, None),
        Err(e) => (AdapterHealth::Unhealthy, Some(format!("Database error: {}", e))),
    };
    HealthCheckResult {
        adapter_id: adapter_id.to_string(),
        status,
        latency_ms,
        message,
        checked_at: Utc::now(),
    }
}

#[async_trait]
impl QuotationRepository for PgQuotationRepository {
    #[instrument(skip(self, quotation), fields(quotation_id = %quotation.id()))]
    async fn insert(&self, quotation: &Quotation) -> Result<(), PortError> {
        self.store.insert(quotation).await?;
        debug!("quotation inserted");
        Ok(())
    }

    #[instrument(skip(self), fields(quotation_id = %id))]
    async fn load(&self, id: QuotationId) -> Result<Quotation, PortError> {
        Ok(self.store.load(id).await?)
    }

    async fn list(&self) -> Result<Vec<Quotation>, PortError> {
        Ok(self.store.list().await?)
    }

    #[instrument(skip(self, quotation), fields(quotation_id = %quotation.id()))]
    async fn update(&self, quotation: &Quotation) -> Result<(), PortError> {
        Ok(self.store.update(quotation).await?)
    }

    #[instrument(skip(self, quotes), fields(quotation_id = %id, count = quotes.len()))]
    async fn replace_company_quotes(
        &self,
        id: QuotationId,
        quotes: &[CompanyQuote],
        state: QuotationState,
    ) -> Result<usize, PortError> {
        let stored = self.store.replace_company_quotes(id, quotes, state).await?;
        debug!(stored, "company quotes replaced");
        Ok(stored)
    }

    async fn company_quotes(&self, id: QuotationId) -> Result<Vec<CompanyQuote>, PortError> {
        Ok(self.store.company_quotes(id).await?)
    }

    #[instrument(skip(self, record), fields(quotation_id = %id, channel = %record.channel.as_str()))]
    async fn record_delivery(
        &self,
        id: QuotationId,
        record: &DeliveryRecord,
        state: Option<QuotationState>,
    ) -> Result<(), PortError> {
        Ok(self.store.record_delivery(id, record, state).await?)
    }

    #[instrument(skip(self), fields(quotation_id = %id))]
    async fn delete(&self, id: QuotationId) -> Result<(), PortError> {
        Ok(self.store.delete(id).await?)
    }
}
