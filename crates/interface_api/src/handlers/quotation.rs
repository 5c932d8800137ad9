//! Quotation handlers

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use uuid::Uuid;

use core_kernel::{AddonCoverId, QuotationId};
use domain_quotation::{GenerateOptions, NewQuotation, QuotationStatistics, QuotationUpdate};

use crate::dto::quotation::*;
use crate::error::ApiError;
use crate::extract::{rejection_to_error, ValidatedJson};
use crate::AppState;

fn addon_ids(ids: Vec<Uuid>) -> Vec<AddonCoverId> {
    ids.into_iter().map(AddonCoverId::from_uuid).collect()
}

/// Computes an insured value without storing anything
pub async fn compute_insured_value(
    State(state): State<AppState>,
    payload: Result<Json<ComponentsRequest>, JsonRejection>,
) -> Result<Json<InsuredValueResponse>, ApiError> {
    let Json(request) = payload.map_err(rejection_to_error)?;
    let value = state
        .service
        .compute_insured_value(&request.0)
        .map_err(|e| state.errors.render(e))?;
    Ok(Json(InsuredValueResponse::from(&value)))
}

/// Creates a draft quotation
pub async fn create_quotation(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateQuotationRequest>,
) -> Result<(StatusCode, Json<QuotationResponse>), ApiError> {
    let components = state
        .service
        .compute_insured_value(&request.components.0)
        .map_err(|e| state.errors.render(e))?
        .breakdown;

    let input = NewQuotation {
        customer_id: request.customer(),
        addon_ids: request.addons(),
        vehicle: request.vehicle.into(),
        components,
        whatsapp_number: request.whatsapp_number,
        policy_type: request.policy_type,
        ncb_percentage: request.ncb_percentage.unwrap_or(Decimal::ZERO),
        notes: request.notes,
    };

    let quotation = state
        .service
        .create_quotation(input)
        .await
        .map_err(|e| state.errors.render(e))?;
    Ok((StatusCode::CREATED, Json(QuotationResponse::from(&quotation))))
}

/// Lists quotations, newest first
pub async fn list_quotations(
    State(state): State<AppState>,
) -> Result<Json<Vec<QuotationSummary>>, ApiError> {
    let quotations = state.service.list().await.map_err(|e| state.errors.render(e))?;
    Ok(Json(quotations.iter().map(QuotationSummary::from).collect()))
}

/// Gets a quotation with its company quotes and deliveries
pub async fn get_quotation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<QuotationResponse>, ApiError> {
    let quotation = state
        .service
        .get(QuotationId::from_uuid(id))
        .await
        .map_err(|e| state.errors.render(e))?;
    Ok(Json(QuotationResponse::from(&quotation)))
}

/// Updates the descriptive fields of a quotation
pub async fn update_quotation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateQuotationRequest>,
) -> Result<Json<QuotationResponse>, ApiError> {
    let components = match &request.components {
        Some(raw) => Some(
            state
                .service
                .compute_insured_value(&raw.0)
                .map_err(|e| state.errors.render(e))?
                .breakdown,
        ),
        None => None,
    };

    let update = QuotationUpdate {
        vehicle: request.vehicle.map(Into::into),
        components,
        whatsapp_number: request.whatsapp_number,
        addon_ids: request.addon_ids.map(addon_ids),
        policy_type: request.policy_type,
        ncb_percentage: request.ncb_percentage,
        notes: request.notes,
    };

    let quotation = state
        .service
        .update(QuotationId::from_uuid(id), update)
        .await
        .map_err(|e| state.errors.render(e))?;
    Ok(Json(QuotationResponse::from(&quotation)))
}

pub async fn delete_quotation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .service
        .delete(QuotationId::from_uuid(id))
        .await
        .map_err(|e| state.errors.render(e))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Generates company quotes from the rate model
///
/// The body is optional; an empty body prices the stored quotation as is.
pub async fn generate_quotes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<GenerationResponse>, ApiError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        GenerateRequest::default()
    } else {
        serde_json::from_slice::<GenerateRequest>(&body).map_err(|e| {
            if e.is_data() {
                ApiError::InvalidInput {
                    message: "request body has the wrong shape".to_string(),
                    details: vec![e.to_string()],
                }
            } else {
                ApiError::BadRequest(e.to_string())
            }
        })?
    };

    let options = GenerateOptions {
        insured_value: request.insured_value,
        addon_ids: request.addon_ids.map(addon_ids),
    };

    let outcome = state
        .service
        .generate_quotes(QuotationId::from_uuid(id), options)
        .await
        .map_err(|e| state.errors.render(e))?;
    Ok(Json(GenerationResponse::from(outcome)))
}

/// Gets the ranked company quotes of a quotation
pub async fn get_company_quotes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CompanyQuotesResponse>, ApiError> {
    let quotes = state
        .service
        .company_quotes(QuotationId::from_uuid(id))
        .await
        .map_err(|e| state.errors.render(e))?;
    Ok(Json(CompanyQuotesResponse::new(id, &quotes)))
}

/// Replaces every company quote of a quotation in one step
pub async fn replace_company_quotes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<ReplaceCompanyQuotesRequest>,
) -> Result<Json<ReplaceResponse>, ApiError> {
    let outcome = state
        .service
        .replace_company_quotes(QuotationId::from_uuid(id), request.company_quotes)
        .await
        .map_err(|e| state.errors.render(e))?;
    Ok(Json(ReplaceResponse::from(outcome)))
}

/// Renders the quotation document
pub async fn export_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let document = state
        .service
        .export_document(QuotationId::from_uuid(id))
        .await
        .map_err(|e| state.errors.render(e))?;

    let headers = [
        (header::CONTENT_TYPE, document.content_type),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", document.file_name),
        ),
    ];
    Ok((headers, document.bytes).into_response())
}

/// Sends the quotation document over WhatsApp
pub async fn dispatch_quotation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DispatchResponse>, ApiError> {
    let confirmation = state
        .service
        .dispatch(QuotationId::from_uuid(id))
        .await
        .map_err(|e| state.errors.render(e))?;
    Ok(Json(DispatchResponse::from(confirmation)))
}

pub async fn statistics(
    State(state): State<AppState>,
) -> Result<Json<QuotationStatistics>, ApiError> {
    let statistics = state.service.statistics().await.map_err(|e| state.errors.render(e))?;
    Ok(Json(statistics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_quotation::CompanyQuoteInput;
    use validator::Validate;

    #[test]
    fn test_generate_request_accepts_partial_body() {
        let request: GenerateRequest =
            serde_json::from_str(r#"{"insured_value": "600000"}"#).unwrap();
        assert_eq!(request.insured_value, Some(Decimal::new(600000, 0)));
        assert!(request.addon_ids.is_none());
    }

    fn rows(count: usize) -> Vec<CompanyQuoteInput> {
        (0..count)
            .map(|_| CompanyQuoteInput {
                company_id: core_kernel::InsuranceCompanyId::new(),
                basic_premium: serde_json::Value::Null,
                final_premium: serde_json::json!(15000),
                addons: Vec::new(),
            })
            .collect()
    }

    #[test]
    fn test_replace_request_row_limit() {
        let empty = ReplaceCompanyQuotesRequest {
            company_quotes: Vec::new(),
        };
        assert!(empty.validate().is_ok());

        let at_limit = ReplaceCompanyQuotesRequest {
            company_quotes: rows(200),
        };
        assert!(at_limit.validate().is_ok());

        let over_limit = ReplaceCompanyQuotesRequest {
            company_quotes: rows(201),
        };
        let errors = over_limit.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("company_quotes"));
    }
}
