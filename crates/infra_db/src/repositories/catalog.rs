//! Catalog repository implementation
//!
//! Read-only access to the insurance company, addon cover and customer
//! tables maintained by the administration system.

use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use core_kernel::{AddonCoverId, CustomerId, InsuranceCompanyId};
use domain_quotation::{AddonCover, Customer, InsuranceCompany};

use crate::error::DatabaseError;

#[derive(Debug, Clone, FromRow)]
pub struct InsuranceCompanyRow {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
}

impl From<InsuranceCompanyRow> for InsuranceCompany {
    fn from(row: InsuranceCompanyRow) -> Self {
        InsuranceCompany {
            id: InsuranceCompanyId::from_uuid(row.id),
            name: row.name,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct AddonCoverRow {
    pub id: Uuid,
    pub name: String,
    pub display_order: i32,
    pub is_active: bool,
}

impl From<AddonCoverRow> for AddonCover {
    fn from(row: AddonCoverRow) -> Self {
        AddonCover {
            id: AddonCoverId::from_uuid(row.id),
            name: row.name,
            display_order: row.display_order,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct CustomerRow {
    pub id: Uuid,
    pub name: String,
    pub mobile_number: Option<String>,
    pub email: Option<String>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: CustomerId::from_uuid(row.id),
            name: row.name,
            mobile_number: row.mobile_number,
            email: row.email,
        }
    }
}

/// Repository for the read-only catalogs
#[derive(Debug, Clone)]
pub struct CatalogStore {
    pool: PgPool,
}

impl CatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Companies ordered by name, optionally only the active ones
    pub async fn companies(&self, active_only: bool) -> Result<Vec<InsuranceCompany>, DatabaseError> {
        let rows = sqlx::query_as::<_, InsuranceCompanyRow>(
            r#"
            SELECT id, name, is_active
            FROM insurance_companies
            WHERE ($1 = FALSE OR is_active)
            ORDER BY name, id
            "#,
        )
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(InsuranceCompany::from).collect())
    }

    /// Active addon covers in display order
    pub async fn active_addons(&self) -> Result<Vec<AddonCover>, DatabaseError> {
        let rows = sqlx::query_as::<_, AddonCoverRow>(
            r#"
            SELECT id, name, display_order, is_active
            FROM addon_covers
            WHERE is_active
            ORDER BY display_order, name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AddonCover::from).collect())
    }

    pub async fn customer(&self, id: CustomerId) -> Result<Customer, DatabaseError> {
        sqlx::query_as::<_, CustomerRow>(
            "SELECT id, name, mobile_number, email FROM customers WHERE id = $1",
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await?
        .map(Customer::from)
        .ok_or_else(|| DatabaseError::not_found("Customer", id))
    }

    /// Upserts a company, used when seeding a database
    pub async fn upsert_company(&self, company: &InsuranceCompany) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO insurance_companies (id, name, is_active)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, is_active = EXCLUDED.is_active
            "#,
        )
        .bind(Uuid::from(company.id))
        .bind(&company.name)
        .bind(company.is_active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn upsert_addon(&self, addon: &AddonCover) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO addon_covers (id, name, display_order, is_active)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                display_order = EXCLUDED.display_order,
                is_active = EXCLUDED.is_active
            "#,
        )
        .bind(Uuid::from(addon.id))
        .bind(&addon.name)
        .bind(addon.display_order)
        .bind(addon.is_active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn upsert_customer(&self, customer: &Customer) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO customers (id, name, mobile_number, email)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                mobile_number = EXCLUDED.mobile_number,
                email = EXCLUDED.email
            "#,
        )
        .bind(Uuid::from(customer.id))
        .bind(&customer.name)
        .bind(customer.mobile_number.as_deref())
        .bind(customer.email.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_row_conversion_keeps_activity() {
        let id = Uuid::new_v4();
        let company = InsuranceCompany::from(InsuranceCompanyRow {
            id,
            name: "Acme General".to_string(),
            is_active: false,
        });
        assert_eq!(Uuid::from(company.id), id);
        assert!(!company.is_active);
    }

    #[test]
    fn test_customer_row_conversion() {
        let customer = Customer::from(CustomerRow {
            id: Uuid::new_v4(),
            name: "Asha Verma".to_string(),
            mobile_number: Some("9998887777".to_string()),
            email: None,
        });
        assert_eq!(customer.mobile_number.as_deref(), Some("9998887777"));
    }
}
