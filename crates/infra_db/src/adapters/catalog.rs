//! PostgreSQL catalog adapter

use async_trait::async_trait;
use sqlx::PgPool;

use core_kernel::{CustomerId, DomainPort, HealthCheckResult, HealthCheckable, PortError};
use domain_quotation::{AddonCover, CatalogPort, Customer, InsuranceCompany};

use crate::adapters::quotation::database_health;
use crate::repositories::CatalogStore;

/// PostgreSQL-backed implementation of the catalog port
#[derive(Debug, Clone)]
pub struct PgCatalog {
    store: CatalogStore,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self {
            store: CatalogStore::new(pool),
        }
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }
}

impl DomainPort for PgCatalog {}

#[async_trait]
impl HealthCheckable for PgCatalog {
    async fn health_check(&self) -> HealthCheckResult {
        database_health("postgres-catalog", self.store.pool()).await
    }
}

#[async_trait]
impl CatalogPort for PgCatalog {
    async fn list_active_companies(&self) -> Result<Vec<InsuranceCompany>, PortError> {
        Ok(self.store.companies(true).await?)
    }

    async fn list_companies(&self) -> Result<Vec<InsuranceCompany>, PortError> {
        Ok(self.store.companies(false).await?)
    }

    async fn list_addons(&self) -> Result<Vec<AddonCover>, PortError> {
        Ok(self.store.active_addons().await?)
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Customer, PortError> {
        Ok(self.store.customer(id).await?)
    }
}
