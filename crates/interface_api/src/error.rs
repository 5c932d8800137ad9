//! API error handling
//!
//! Domain errors are turned into [`ApiError`] through [`ErrorDetailConfig`],
//! which decides whether internal detail reaches the response body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

use domain_quotation::{BlockReason, QuotationError};

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        details: Vec<String>,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Blocked: {0}")]
    Blocked(BlockReason),

    #[error("Upstream unavailable: {0}")]
    Upstream(String),

    /// `detail` is logged; it is rendered only when `exposed` is set
    #[error("Internal server error: {detail}")]
    Internal { detail: String, exposed: bool },
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// How much internal detail reaches API clients
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorDetailConfig {
    pub expose_internal_errors: bool,
}

impl ErrorDetailConfig {
    /// Converts a domain error into its HTTP representation
    pub fn render(&self, error: QuotationError) -> ApiError {
        match error {
            QuotationError::InvalidInput { field, message } => ApiError::InvalidInput {
                message: format!("invalid value for '{}'", field),
                details: vec![format!("{}: {}", field, message)],
            },
            QuotationError::Validation(rows) => ApiError::InvalidInput {
                message: format!("{} company quote row(s) are invalid", rows.len()),
                details: rows.iter().map(ToString::to_string).collect(),
            },
            QuotationError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{} {} not found", entity, id))
            }
            QuotationError::Conflict(message) => ApiError::Conflict(message),
            QuotationError::Blocked(reason) => ApiError::Blocked(reason),
            QuotationError::UpstreamUnavailable { service, message } => {
                ApiError::Upstream(format!("{}: {}", service, message))
            }
            other @ (QuotationError::Money(_) | QuotationError::Internal(_)) => ApiError::Internal {
                detail: other.to_string(),
                exposed: self.expose_internal_errors,
            },
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut details = Vec::new();
        collect_validation_details("", &errors, &mut details);
        details.sort();
        ApiError::InvalidInput {
            message: "request validation failed".to_string(),
            details,
        }
    }
}

/// Flattens nested validation errors into `path: message` lines
fn collect_validation_details(prefix: &str, errors: &ValidationErrors, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    match &error.message {
                        Some(message) => out.push(format!("{}: {}", path, message)),
                        None => out.push(format!("{}: {}", path, error.code)),
                    }
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_validation_details(&path, nested, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_validation_details(&format!("{}[{}]", path, index), nested, out);
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message, details, reason) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None, None),
            ApiError::InvalidInput { message, details } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                message,
                Some(details),
                None,
            ),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None, None),
            ApiError::Blocked(reason) => (
                StatusCode::CONFLICT,
                "blocked",
                reason.to_string(),
                None,
                Some(reason.code().to_string()),
            ),
            ApiError::Upstream(msg) => {
                tracing::warn!(error = %msg, "upstream collaborator failed");
                (StatusCode::BAD_GATEWAY, "upstream_unavailable", msg, None, None)
            }
            ApiError::Internal { detail, exposed } => {
                tracing::error!(error = %detail, "internal error");
                let message = if exposed {
                    detail
                } else {
                    "internal error".to_string()
                };
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message, None, None)
            }
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            details,
            reason,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_quotation::RowError;

    async fn body_of(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_blocked_renders_reason() {
        let response = ErrorDetailConfig::default()
            .render(QuotationError::Blocked(BlockReason::NoDestination))
            .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_of(response).await;
        assert_eq!(body["reason"], "NoDestination");
    }

    #[tokio::test]
    async fn test_internal_detail_hidden_by_default() {
        let response = ErrorDetailConfig::default()
            .render(QuotationError::Internal("pool poisoned".to_string()))
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_of(response).await;
        assert_eq!(body["message"], "internal error");
    }

    #[tokio::test]
    async fn test_internal_detail_exposed_when_configured() {
        let config = ErrorDetailConfig {
            expose_internal_errors: true,
        };
        let response = config
            .render(QuotationError::Internal("pool poisoned".to_string()))
            .into_response();
        let body = body_of(response).await;
        assert!(body["message"].as_str().unwrap().contains("pool poisoned"));
    }

    #[test]
    fn test_status_mapping() {
        let config = ErrorDetailConfig::default();
        let status = |e: QuotationError| config.render(e).into_response().status();

        assert_eq!(
            status(QuotationError::invalid_input("vehicle", "must be a number")),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status(QuotationError::Validation(vec![RowError::new(0, "final_premium", "must be positive")])),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(status(QuotationError::not_found("Quotation", "x")), StatusCode::NOT_FOUND);
        assert_eq!(status(QuotationError::conflict("locked")), StatusCode::CONFLICT);
        assert_eq!(
            status(QuotationError::UpstreamUnavailable {
                service: "whatsapp".to_string(),
                message: "down".to_string(),
            }),
            StatusCode::BAD_GATEWAY
        );
    }
}
