//! Quotation repository implementation
//!
//! Database access for quotations, their company quotes and their delivery
//! history. Company quotes are replaced as a set inside one transaction that
//! also holds a `NOWAIT` row lock on the owning quotation, so a concurrent
//! replacement in another process fails fast instead of interleaving.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use core_kernel::{
    AddonCoverId, CompanyQuoteId, Currency, CustomerId, DeliveryId, InsuranceCompanyId, Money,
    QuotationId,
};
use domain_quotation::{
    ranking, AddonSelection, CompanyQuote, DeliveryChannel, DeliveryRecord, FuelType,
    InsuredValue, InsuredValueComponents, PolicyType, PremiumBreakdown, Quotation,
    QuotationRecord, QuotationState, VehicleDetails,
};

use crate::error::DatabaseError;

const QUOTATION_COLUMNS: &str = r#"
    id, quote_number, customer_id,
    registration_number, make_model, variant, fuel_type, manufacturing_year, rto_location,
    vehicle_value, trailer_value, cng_lpg_kit_value,
    electrical_accessories, non_electrical_accessories, insured_value, currency,
    whatsapp_number, addon_ids, policy_type, ncb_percentage, notes,
    state, version, created_at, updated_at
"#;

const COMPANY_QUOTE_COLUMNS: &str = r#"
    id, quotation_id, company_id, company_name, basic_premium, final_premium,
    currency, rank, insured_value, addons, breakdown, created_at
"#;

const DELIVERY_COLUMNS: &str = r#"
    id, quotation_id, channel, destination, succeeded, reference, failure_reason, recorded_at
"#;

/// Row in the `quotations` table
#[derive(Debug, Clone, FromRow)]
pub struct QuotationRow {
    pub id: Uuid,
    pub quote_number: String,
    pub customer_id: Uuid,
    pub registration_number: Option<String>,
    pub make_model: String,
    pub variant: Option<String>,
    pub fuel_type: String,
    pub manufacturing_year: Option<i32>,
    pub rto_location: Option<String>,
    pub vehicle_value: Decimal,
    pub trailer_value: Decimal,
    pub cng_lpg_kit_value: Decimal,
    pub electrical_accessories: Decimal,
    pub non_electrical_accessories: Decimal,
    pub insured_value: Decimal,
    pub currency: String,
    pub whatsapp_number: Option<String>,
    pub addon_ids: Vec<Uuid>,
    pub policy_type: String,
    pub ncb_percentage: Decimal,
    pub notes: Option<String>,
    pub state: String,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row in the `company_quotes` table
#[derive(Debug, Clone, FromRow)]
pub struct CompanyQuoteRow {
    pub id: Uuid,
    pub quotation_id: Uuid,
    pub company_id: Uuid,
    pub company_name: String,
    pub basic_premium: Decimal,
    pub final_premium: Decimal,
    pub currency: String,
    pub rank: i32,
    pub insured_value: Option<Decimal>,
    pub addons: Json<Vec<AddonSelection>>,
    pub breakdown: Option<Json<PremiumBreakdown>>,
    pub created_at: DateTime<Utc>,
}

/// Row in the `quotation_deliveries` table
#[derive(Debug, Clone, FromRow)]
pub struct DeliveryRow {
    pub id: Uuid,
    pub quotation_id: Uuid,
    pub channel: String,
    pub destination: Option<String>,
    pub succeeded: bool,
    pub reference: Option<String>,
    pub failure_reason: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

fn parse_currency(value: &str) -> Result<Currency, DatabaseError> {
    value
        .trim()
        .parse::<Currency>()
        .map_err(|_| DatabaseError::corrupt("currency", value))
}

impl CompanyQuoteRow {
    pub fn into_domain(self) -> Result<CompanyQuote, DatabaseError> {
        let currency = parse_currency(&self.currency)?;
        let rank = u32::try_from(self.rank).map_err(|_| DatabaseError::corrupt("rank", self.rank))?;
        Ok(CompanyQuote {
            id: CompanyQuoteId::from_uuid(self.id),
            company_id: InsuranceCompanyId::from_uuid(self.company_id),
            company_name: self.company_name,
            basic_premium: Money::new(self.basic_premium, currency),
            final_premium: Money::new(self.final_premium, currency),
            rank,
            addons: self.addons.0,
            breakdown: self.breakdown.map(|b| b.0),
            insured_value: self.insured_value.map(|v| Money::new(v, currency)),
            created_at: self.created_at,
        })
    }
}

impl DeliveryRow {
    pub fn into_domain(self) -> Result<DeliveryRecord, DatabaseError> {
        let channel = DeliveryChannel::parse(&self.channel)
            .ok_or_else(|| DatabaseError::corrupt("channel", &self.channel))?;
        Ok(DeliveryRecord {
            id: DeliveryId::from_uuid(self.id),
            channel,
            destination: self.destination,
            succeeded: self.succeeded,
            reference: self.reference,
            failure_reason: self.failure_reason,
            recorded_at: self.recorded_at,
        })
    }
}

impl QuotationRow {
    /// Rebuilds the aggregate from the header row and its children
    pub fn into_domain(
        self,
        company_quotes: Vec<CompanyQuote>,
        deliveries: Vec<DeliveryRecord>,
    ) -> Result<Quotation, DatabaseError> {
        let currency = parse_currency(&self.currency)?;
        let fuel_type = FuelType::parse(&self.fuel_type)
            .ok_or_else(|| DatabaseError::corrupt("fuel_type", &self.fuel_type))?;
        let policy_type = PolicyType::parse(&self.policy_type)
            .ok_or_else(|| DatabaseError::corrupt("policy_type", &self.policy_type))?;
        let state = QuotationState::parse(&self.state)
            .ok_or_else(|| DatabaseError::corrupt("state", &self.state))?;
        let version =
            u32::try_from(self.version).map_err(|_| DatabaseError::corrupt("version", self.version))?;

        let record = QuotationRecord {
            id: QuotationId::from_uuid(self.id),
            quote_number: self.quote_number,
            customer_id: CustomerId::from_uuid(self.customer_id),
            vehicle: VehicleDetails {
                registration_number: self.registration_number,
                make_model: self.make_model,
                variant: self.variant,
                fuel_type,
                manufacturing_year: self.manufacturing_year,
                rto_location: self.rto_location,
            },
            insured_value: InsuredValue {
                total: Money::new(self.insured_value, currency),
                breakdown: InsuredValueComponents {
                    vehicle: self.vehicle_value,
                    trailer: self.trailer_value,
                    cng_lpg_kit: self.cng_lpg_kit_value,
                    electrical_accessories: self.electrical_accessories,
                    non_electrical_accessories: self.non_electrical_accessories,
                },
            },
            whatsapp_number: self.whatsapp_number,
            addon_ids: self.addon_ids.into_iter().map(AddonCoverId::from_uuid).collect(),
            policy_type,
            ncb_percentage: self.ncb_percentage,
            notes: self.notes,
            state,
            company_quotes,
            deliveries,
            currency,
            version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        Ok(Quotation::restore(record))
    }
}

/// Repository for quotations and their owned children
#[derive(Debug, Clone)]
pub struct QuotationStore {
    pool: PgPool,
}

impl QuotationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Inserts a quotation header together with any children it already owns
    pub async fn insert(&self, quotation: &Quotation) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let components = &quotation.insured_value().breakdown;
        let vehicle = quotation.vehicle();
        let addon_ids: Vec<Uuid> = quotation.addon_ids().iter().map(|id| Uuid::from(*id)).collect();

        sqlx::query(&format!(
            "INSERT INTO quotations ({QUOTATION_COLUMNS}) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
              $17, $18, $19, $20, $21, $22, $23, $24, $25)"
        ))
        .bind(Uuid::from(quotation.id()))
        .bind(quotation.quote_number())
        .bind(Uuid::from(quotation.customer_id()))
        .bind(vehicle.registration_number.as_deref())
        .bind(&vehicle.make_model)
        .bind(vehicle.variant.as_deref())
        .bind(vehicle.fuel_type.as_str())
        .bind(vehicle.manufacturing_year)
        .bind(vehicle.rto_location.as_deref())
        .bind(components.vehicle)
        .bind(components.trailer)
        .bind(components.cng_lpg_kit)
        .bind(components.electrical_accessories)
        .bind(components.non_electrical_accessories)
        .bind(quotation.insured_value().total.amount())
        .bind(quotation.currency().code())
        .bind(quotation.whatsapp_number())
        .bind(addon_ids)
        .bind(quotation.policy_type().as_str())
        .bind(quotation.ncb_percentage())
        .bind(quotation.notes())
        .bind(quotation.state().as_str())
        .bind(version_column(quotation.version()))
        .bind(quotation.created_at())
        .bind(quotation.updated_at())
        .execute(&mut *tx)
        .await?;

        insert_company_quotes(&mut tx, quotation.id(), quotation.company_quotes()).await?;
        for record in quotation.deliveries() {
            insert_delivery(&mut tx, quotation.id(), record).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Loads one quotation from a single repeatable-read snapshot
    pub async fn load(&self, id: QuotationId) -> Result<Quotation, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query_as::<_, QuotationRow>(&format!(
            "SELECT {QUOTATION_COLUMNS} FROM quotations WHERE id = $1"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Quotation", id))?;

        let quotes = fetch_company_quotes(&mut tx, &[row.id]).await?;
        let deliveries = fetch_deliveries(&mut tx, &[row.id]).await?;
        tx.commit().await?;

        let quotes = quotes
            .into_iter()
            .map(CompanyQuoteRow::into_domain)
            .collect::<Result<Vec<_>, _>>()?;
        let deliveries = deliveries
            .into_iter()
            .map(DeliveryRow::into_domain)
            .collect::<Result<Vec<_>, _>>()?;
        row.into_domain(quotes, deliveries)
    }

    /// Loads every quotation, newest first
    pub async fn list(&self) -> Result<Vec<Quotation>, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let rows = sqlx::query_as::<_, QuotationRow>(&format!(
            "SELECT {QUOTATION_COLUMNS} FROM quotations ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&mut *tx)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let quote_rows = fetch_company_quotes(&mut tx, &ids).await?;
        let delivery_rows = fetch_deliveries(&mut tx, &ids).await?;
        tx.commit().await?;

        let mut quotes_by_quotation: HashMap<Uuid, Vec<CompanyQuote>> = HashMap::new();
        for row in quote_rows {
            let owner = row.quotation_id;
            quotes_by_quotation.entry(owner).or_default().push(row.into_domain()?);
        }
        let mut deliveries_by_quotation: HashMap<Uuid, Vec<DeliveryRecord>> = HashMap::new();
        for row in delivery_rows {
            let owner = row.quotation_id;
            deliveries_by_quotation.entry(owner).or_default().push(row.into_domain()?);
        }

        rows.into_iter()
            .map(|row| {
                let quotes = quotes_by_quotation.remove(&row.id).unwrap_or_default();
                let deliveries = deliveries_by_quotation.remove(&row.id).unwrap_or_default();
                row.into_domain(quotes, deliveries)
            })
            .collect()
    }

    /// Updates the descriptive header columns
    pub async fn update(&self, quotation: &Quotation) -> Result<(), DatabaseError> {
        let components = &quotation.insured_value().breakdown;
        let vehicle = quotation.vehicle();
        let addon_ids: Vec<Uuid> = quotation.addon_ids().iter().map(|id| Uuid::from(*id)).collect();

        let result = sqlx::query(
            r#"
            UPDATE quotations SET
                registration_number = $2,
                make_model = $3,
                variant = $4,
                fuel_type = $5,
                manufacturing_year = $6,
                rto_location = $7,
                vehicle_value = $8,
                trailer_value = $9,
                cng_lpg_kit_value = $10,
                electrical_accessories = $11,
                non_electrical_accessories = $12,
                insured_value = $13,
                whatsapp_number = $14,
                addon_ids = $15,
                policy_type = $16,
                ncb_percentage = $17,
                notes = $18,
                version = $19,
                updated_at = $20
            WHERE id = $1
            "#,
        )
        .bind(Uuid::from(quotation.id()))
        .bind(vehicle.registration_number.as_deref())
        .bind(&vehicle.make_model)
        .bind(vehicle.variant.as_deref())
        .bind(vehicle.fuel_type.as_str())
        .bind(vehicle.manufacturing_year)
        .bind(vehicle.rto_location.as_deref())
        .bind(components.vehicle)
        .bind(components.trailer)
        .bind(components.cng_lpg_kit)
        .bind(components.electrical_accessories)
        .bind(components.non_electrical_accessories)
        .bind(quotation.insured_value().total.amount())
        .bind(quotation.whatsapp_number())
        .bind(addon_ids)
        .bind(quotation.policy_type().as_str())
        .bind(quotation.ncb_percentage())
        .bind(quotation.notes())
        .bind(version_column(quotation.version()))
        .bind(quotation.updated_at())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Quotation", quotation.id()));
        }
        Ok(())
    }

    /// Swaps the company quote set of a quotation in one transaction
    ///
    /// The quotation row is locked with `FOR UPDATE NOWAIT`; a held lock
    /// surfaces as `LockNotAvailable`. Any failure rolls the whole swap back.
    pub async fn replace_company_quotes(
        &self,
        id: QuotationId,
        quotes: &[CompanyQuote],
        state: QuotationState,
    ) -> Result<usize, DatabaseError> {
        let ranked = ranking::rank(quotes.to_vec());
        let state = if ranked.is_empty() {
            QuotationState::Draft
        } else {
            state
        };

        let mut tx = self.pool.begin().await?;

        let locked: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM quotations WHERE id = $1 FOR UPDATE NOWAIT")
                .bind(Uuid::from(id))
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(DatabaseError::not_found("Quotation", id));
        }

        sqlx::query("DELETE FROM company_quotes WHERE quotation_id = $1")
            .bind(Uuid::from(id))
            .execute(&mut *tx)
            .await?;

        insert_company_quotes(&mut tx, id, &ranked).await?;

        sqlx::query(
            "UPDATE quotations SET state = $2, version = version + 1, updated_at = now() WHERE id = $1",
        )
        .bind(Uuid::from(id))
        .bind(state.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ranked.len())
    }

    /// Company quotes of a quotation in rank order
    pub async fn company_quotes(&self, id: QuotationId) -> Result<Vec<CompanyQuote>, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM quotations WHERE id = $1")
            .bind(Uuid::from(id))
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(DatabaseError::not_found("Quotation", id));
        }
        let rows = fetch_company_quotes(&mut tx, &[Uuid::from(id)]).await?;
        tx.commit().await?;

        rows.into_iter().map(CompanyQuoteRow::into_domain).collect()
    }

    /// Appends a delivery record and optionally moves the quotation state
    pub async fn record_delivery(
        &self,
        id: QuotationId,
        record: &DeliveryRecord,
        state: Option<QuotationState>,
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let new_state = state.map(|s| s.as_str());
        let result = sqlx::query(
            "UPDATE quotations SET state = COALESCE($2, state), updated_at = now() WHERE id = $1",
        )
        .bind(Uuid::from(id))
        .bind(new_state)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Quotation", id));
        }

        insert_delivery(&mut tx, id, record).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Deletes a quotation; company quotes and deliveries cascade
    pub async fn delete(&self, id: QuotationId) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM quotations WHERE id = $1")
            .bind(Uuid::from(id))
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Quotation", id));
        }
        Ok(())
    }
}

fn version_column(version: u32) -> i32 {
    i32::try_from(version).unwrap_or(i32::MAX)
}

async fn fetch_company_quotes(
    conn: &mut PgConnection,
    quotation_ids: &[Uuid],
) -> Result<Vec<CompanyQuoteRow>, DatabaseError> {
    let rows = sqlx::query_as::<_, CompanyQuoteRow>(&format!(
        "SELECT {COMPANY_QUOTE_COLUMNS} FROM company_quotes \
         WHERE quotation_id = ANY($1) ORDER BY quotation_id, rank"
    ))
    .bind(quotation_ids.to_vec())
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

async fn fetch_deliveries(
    conn: &mut PgConnection,
    quotation_ids: &[Uuid],
) -> Result<Vec<DeliveryRow>, DatabaseError> {
    let rows = sqlx::query_as::<_, DeliveryRow>(&format!(
        "SELECT {DELIVERY_COLUMNS} FROM quotation_deliveries \
         WHERE quotation_id = ANY($1) ORDER BY quotation_id, recorded_at, id"
    ))
    .bind(quotation_ids.to_vec())
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

async fn insert_company_quotes(
    conn: &mut PgConnection,
    quotation_id: QuotationId,
    quotes: &[CompanyQuote],
) -> Result<(), DatabaseError> {
    for quote in quotes {
        let rank = i32::try_from(quote.rank).map_err(|_| DatabaseError::corrupt("rank", quote.rank))?;
        sqlx::query(&format!(
            "INSERT INTO company_quotes ({COMPANY_QUOTE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
        ))
        .bind(Uuid::from(quote.id))
        .bind(Uuid::from(quotation_id))
        .bind(Uuid::from(quote.company_id))
        .bind(&quote.company_name)
        .bind(quote.basic_premium.amount())
        .bind(quote.final_premium.amount())
        .bind(quote.final_premium.currency().code())
        .bind(rank)
        .bind(quote.insured_value.map(|v| v.amount()))
        .bind(Json(&quote.addons))
        .bind(quote.breakdown.as_ref().map(Json))
        .bind(quote.created_at)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn insert_delivery(
    conn: &mut PgConnection,
    quotation_id: QuotationId,
    record: &DeliveryRecord,
) -> Result<(), DatabaseError> {
    sqlx::query(&format!(
        "INSERT INTO quotation_deliveries ({DELIVERY_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
    ))
    .bind(Uuid::from(record.id))
    .bind(Uuid::from(quotation_id))
    .bind(record.channel.as_str())
    .bind(record.destination.as_deref())
    .bind(record.succeeded)
    .bind(record.reference.as_deref())
    .bind(record.failure_reason.as_deref())
    .bind(record.recorded_at)
    .execute(conn)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn quote_row(currency: &str, rank: i32) -> CompanyQuoteRow {
        CompanyQuoteRow {
            id: Uuid::new_v4(),
            quotation_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            company_name: "Acme General".to_string(),
            basic_premium: dec!(12000),
            final_premium: dec!(14742.92),
            currency: currency.to_string(),
            rank,
            insured_value: Some(dec!(520000)),
            addons: Json(Vec::new()),
            breakdown: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_company_quote_row_into_domain() {
        let quote = quote_row("INR", 1).into_domain().unwrap();
        assert_eq!(quote.rank, 1);
        assert_eq!(quote.final_premium, Money::new(dec!(14742.92), Currency::INR));
        assert_eq!(quote.insured_value, Some(Money::new(dec!(520000), Currency::INR)));
    }

    #[test]
    fn test_padded_currency_column_is_accepted() {
        // CHAR(3) columns may come back space padded
        assert!(quote_row("INR ", 1).into_domain().is_ok());
    }

    #[test]
    fn test_corrupt_rows_are_rejected() {
        assert!(matches!(
            quote_row("XYZ", 1).into_domain(),
            Err(DatabaseError::SerializationError(_))
        ));
        assert!(matches!(
            quote_row("INR", -1).into_domain(),
            Err(DatabaseError::SerializationError(_))
        ));
    }

    #[test]
    fn test_delivery_row_unknown_channel() {
        let row = DeliveryRow {
            id: Uuid::new_v4(),
            quotation_id: Uuid::new_v4(),
            channel: "fax".to_string(),
            destination: None,
            succeeded: true,
            reference: None,
            failure_reason: None,
            recorded_at: Utc::now(),
        };
        assert!(row.into_domain().is_err());
    }

    #[test]
    fn test_quotation_row_without_quotes_restores_as_draft() {
        let row = QuotationRow {
            id: Uuid::new_v4(),
            quote_number: "QT-202401-000001".to_string(),
            customer_id: Uuid::new_v4(),
            registration_number: None,
            make_model: "Maruti Swift".to_string(),
            variant: None,
            fuel_type: "petrol".to_string(),
            manufacturing_year: Some(2022),
            rto_location: None,
            vehicle_value: dec!(500000),
            trailer_value: dec!(20000),
            cng_lpg_kit_value: Decimal::ZERO,
            electrical_accessories: Decimal::ZERO,
            non_electrical_accessories: Decimal::ZERO,
            insured_value: dec!(520000),
            currency: "INR".to_string(),
            whatsapp_number: None,
            addon_ids: Vec::new(),
            policy_type: "comprehensive".to_string(),
            ncb_percentage: Decimal::ZERO,
            notes: None,
            state: "quoted".to_string(),
            version: 3,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let quotation = row.into_domain(Vec::new(), Vec::new()).unwrap();
        assert_eq!(quotation.state(), QuotationState::Draft);
        assert_eq!(quotation.version(), 3);
        assert_eq!(quotation.insured_value().total.amount(), dec!(520000));
    }
}
