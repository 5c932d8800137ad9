//! Quotation DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use core_kernel::{AddonCoverId, CustomerId};
use domain_quotation::{
    AddonSelection, CompanyQuote, CompanyQuoteInput, DeliveryConfirmation, DeliveryRecord,
    FuelType, GenerationOutcome, InsuredValue, InsuredValueComponents, PolicyType,
    PremiumBreakdown, Quotation, QuotationState, ReplaceOutcome, SkippedCompany, VehicleDetails,
};

/// Accepts an empty string (clears the field) or 10 to 15 digits with an optional `+`
fn validate_phone(value: &str) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(());
    }
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if (10..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        let mut error = ValidationError::new("phone");
        error.message = Some("must be 10 to 15 digits".into());
        Err(error)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VehicleRequest {
    #[validate(length(max = 20))]
    pub registration_number: Option<String>,
    #[validate(length(min = 1, max = 120, message = "is required"))]
    pub make_model: String,
    #[validate(length(max = 80))]
    pub variant: Option<String>,
    #[serde(default)]
    pub fuel_type: FuelType,
    #[validate(range(min = 1900, max = 2100))]
    pub manufacturing_year: Option<i32>,
    #[validate(length(max = 80))]
    pub rto_location: Option<String>,
}

impl From<VehicleRequest> for VehicleDetails {
    fn from(request: VehicleRequest) -> Self {
        VehicleDetails {
            registration_number: request.registration_number,
            make_model: request.make_model,
            variant: request.variant,
            fuel_type: request.fuel_type,
            manufacturing_year: request.manufacturing_year,
            rto_location: request.rto_location,
        }
    }
}

/// Raw insured value components; values may be numbers or numeric strings
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct ComponentsRequest(pub Map<String, Value>);

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuotationRequest {
    pub customer_id: Uuid,
    #[validate(nested)]
    pub vehicle: VehicleRequest,
    pub components: ComponentsRequest,
    #[validate(custom(function = "validate_phone"))]
    pub whatsapp_number: Option<String>,
    #[serde(default)]
    pub addon_ids: Vec<Uuid>,
    #[serde(default)]
    pub policy_type: PolicyType,
    pub ncb_percentage: Option<Decimal>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

impl CreateQuotationRequest {
    pub fn customer(&self) -> CustomerId {
        CustomerId::from_uuid(self.customer_id)
    }

    pub fn addons(&self) -> Vec<AddonCoverId> {
        self.addon_ids.iter().copied().map(AddonCoverId::from_uuid).collect()
    }
}

/// Changes to a quotation; absent fields are left as they are
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateQuotationRequest {
    #[validate(nested)]
    pub vehicle: Option<VehicleRequest>,
    pub components: Option<ComponentsRequest>,
    /// An empty string clears the override
    #[validate(custom(function = "validate_phone"))]
    pub whatsapp_number: Option<String>,
    pub addon_ids: Option<Vec<Uuid>>,
    pub policy_type: Option<PolicyType>,
    pub ncb_percentage: Option<Decimal>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Optional body of a generation request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateRequest {
    /// Prices this insured value instead of the stored one
    pub insured_value: Option<Decimal>,
    /// Prices this addon selection instead of the stored one
    pub addon_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReplaceCompanyQuotesRequest {
    #[validate(length(max = 200, message = "at most 200 rows per request"))]
    pub company_quotes: Vec<CompanyQuoteInput>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InsuredValueResponse {
    pub total: Decimal,
    pub currency: String,
    pub breakdown: InsuredValueComponents,
}

impl From<&InsuredValue> for InsuredValueResponse {
    fn from(value: &InsuredValue) -> Self {
        Self {
            total: value.total.amount(),
            currency: value.total.currency().code().to_string(),
            breakdown: value.breakdown,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanyQuoteResponse {
    pub id: Uuid,
    pub company_id: Uuid,
    pub company_name: String,
    pub rank: u32,
    pub is_best: bool,
    pub basic_premium: Decimal,
    pub final_premium: Decimal,
    pub currency: String,
    pub insured_value: Option<Decimal>,
    pub addons: Vec<AddonSelection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<PremiumBreakdown>,
    pub created_at: DateTime<Utc>,
}

impl From<&CompanyQuote> for CompanyQuoteResponse {
    fn from(quote: &CompanyQuote) -> Self {
        Self {
            id: quote.id.into(),
            company_id: quote.company_id.into(),
            company_name: quote.company_name.clone(),
            rank: quote.rank,
            is_best: quote.is_best(),
            basic_premium: quote.basic_premium.amount(),
            final_premium: quote.final_premium.amount(),
            currency: quote.final_premium.currency().code().to_string(),
            insured_value: quote.insured_value.map(|v| v.amount()),
            addons: quote.addons.clone(),
            breakdown: quote.breakdown,
            created_at: quote.created_at,
        }
    }
}

fn quote_responses(quotes: &[CompanyQuote]) -> Vec<CompanyQuoteResponse> {
    quotes.iter().map(CompanyQuoteResponse::from).collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryResponse {
    pub id: Uuid,
    pub channel: String,
    pub destination: Option<String>,
    pub succeeded: bool,
    pub reference: Option<String>,
    pub failure_reason: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl From<&DeliveryRecord> for DeliveryResponse {
    fn from(record: &DeliveryRecord) -> Self {
        Self {
            id: record.id.into(),
            channel: record.channel.as_str().to_string(),
            destination: record.destination.clone(),
            succeeded: record.succeeded,
            reference: record.reference.clone(),
            failure_reason: record.failure_reason.clone(),
            recorded_at: record.recorded_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuotationResponse {
    pub id: Uuid,
    pub quote_number: String,
    pub customer_id: Uuid,
    pub state: QuotationState,
    pub vehicle: VehicleDetails,
    pub insured_value: InsuredValueResponse,
    pub whatsapp_number: Option<String>,
    pub addon_ids: Vec<Uuid>,
    pub policy_type: PolicyType,
    pub ncb_percentage: Decimal,
    pub notes: Option<String>,
    pub company_quote_count: usize,
    pub company_quotes: Vec<CompanyQuoteResponse>,
    pub deliveries: Vec<DeliveryResponse>,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Quotation> for QuotationResponse {
    fn from(quotation: &Quotation) -> Self {
        Self {
            id: quotation.id().into(),
            quote_number: quotation.quote_number().to_string(),
            customer_id: quotation.customer_id().into(),
            state: quotation.state(),
            vehicle: quotation.vehicle().clone(),
            insured_value: quotation.insured_value().into(),
            whatsapp_number: quotation.whatsapp_number().map(str::to_string),
            addon_ids: quotation.addon_ids().iter().map(|id| (*id).into()).collect(),
            policy_type: quotation.policy_type(),
            ncb_percentage: quotation.ncb_percentage(),
            notes: quotation.notes().map(str::to_string),
            company_quote_count: quotation.company_quotes().len(),
            company_quotes: quote_responses(quotation.company_quotes()),
            deliveries: quotation.deliveries().iter().map(DeliveryResponse::from).collect(),
            version: quotation.version(),
            created_at: quotation.created_at(),
            updated_at: quotation.updated_at(),
        }
    }
}

/// Listing entry without the nested children
#[derive(Debug, Clone, Serialize)]
pub struct QuotationSummary {
    pub id: Uuid,
    pub quote_number: String,
    pub customer_id: Uuid,
    pub state: QuotationState,
    pub make_model: String,
    pub insured_value: Decimal,
    pub company_quote_count: usize,
    pub best_final_premium: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

impl From<&Quotation> for QuotationSummary {
    fn from(quotation: &Quotation) -> Self {
        Self {
            id: quotation.id().into(),
            quote_number: quotation.quote_number().to_string(),
            customer_id: quotation.customer_id().into(),
            state: quotation.state(),
            make_model: quotation.vehicle().make_model.clone(),
            insured_value: quotation.insured_value().total.amount(),
            company_quote_count: quotation.company_quotes().len(),
            best_final_premium: quotation.best_quote().map(|q| q.final_premium.amount()),
            created_at: quotation.created_at(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanyQuotesResponse {
    pub quotation_id: Uuid,
    pub count: usize,
    pub company_quotes: Vec<CompanyQuoteResponse>,
}

impl CompanyQuotesResponse {
    pub fn new(quotation_id: Uuid, quotes: &[CompanyQuote]) -> Self {
        Self {
            quotation_id,
            count: quotes.len(),
            company_quotes: quote_responses(quotes),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationResponse {
    pub quotation_id: Uuid,
    pub state: QuotationState,
    pub generated: usize,
    pub attempted: usize,
    /// Set when at least one company was skipped
    pub partial: bool,
    pub skipped: Vec<SkippedCompany>,
    pub company_quotes: Vec<CompanyQuoteResponse>,
}

impl From<GenerationOutcome> for GenerationResponse {
    fn from(outcome: GenerationOutcome) -> Self {
        Self {
            quotation_id: outcome.quotation_id.into(),
            state: outcome.state,
            generated: outcome.generated,
            attempted: outcome.attempted,
            partial: !outcome.skipped.is_empty(),
            company_quotes: quote_responses(&outcome.quotes),
            skipped: outcome.skipped,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplaceResponse {
    pub quotation_id: Uuid,
    pub state: QuotationState,
    pub count: usize,
    pub company_quotes: Vec<CompanyQuoteResponse>,
}

impl From<ReplaceOutcome> for ReplaceResponse {
    fn from(outcome: ReplaceOutcome) -> Self {
        Self {
            quotation_id: outcome.quotation_id.into(),
            state: outcome.state,
            count: outcome.count,
            company_quotes: quote_responses(&outcome.quotes),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchResponse {
    pub quotation_id: Uuid,
    pub delivery_id: Uuid,
    pub channel: String,
    pub destination: String,
    pub reference: String,
    pub state: QuotationState,
}

impl From<DeliveryConfirmation> for DispatchResponse {
    fn from(confirmation: DeliveryConfirmation) -> Self {
        Self {
            quotation_id: confirmation.quotation_id.into(),
            delivery_id: confirmation.delivery_id.into(),
            channel: confirmation.channel.as_str().to_string(),
            destination: confirmation.destination,
            reference: confirmation.reference,
            state: confirmation.state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_validation() {
        assert!(validate_phone("").is_ok());
        assert!(validate_phone("9998887777").is_ok());
        assert!(validate_phone("+919998887777").is_ok());
        assert!(validate_phone("99988").is_err());
        assert!(validate_phone("99988-87777").is_err());
    }

    #[test]
    fn test_create_request_requires_make_model() {
        let request: CreateQuotationRequest = serde_json::from_value(serde_json::json!({
            "customer_id": Uuid::new_v4(),
            "vehicle": { "make_model": "" },
            "components": { "vehicle": 500000 }
        }))
        .unwrap();
        let errors = request.validate().unwrap_err();
        match crate::error::ApiError::from(errors) {
            crate::error::ApiError::InvalidInput { details, .. } => {
                assert_eq!(details, vec!["vehicle.make_model: is required"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_update_request_defaults_to_no_change() {
        let request: UpdateQuotationRequest = serde_json::from_str("{}").unwrap();
        assert!(request.validate().is_ok());
        assert!(request.vehicle.is_none());
        assert!(request.components.is_none());
    }
}
