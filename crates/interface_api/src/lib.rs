//! HTTP API Layer
//!
//! REST API for the quotation engine using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: Request handlers for quotations and health
//! - **Middleware**: Request ids, tracing, audit logging
//! - **DTOs**: Request/Response data transfer objects
//! - **Error Handling**: Consistent error responses
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let app = create_router(AppState::new(service, config.error_detail()));
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::{
    http::HeaderName,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use domain_quotation::QuotationService;

use crate::error::ErrorDetailConfig;
use crate::handlers::{health, quotation};
use crate::middleware::audit_middleware;

/// Header carrying the per-request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<QuotationService>,
    pub errors: ErrorDetailConfig,
}

impl AppState {
    pub fn new(service: Arc<QuotationService>, errors: ErrorDetailConfig) -> Self {
        Self { service, errors }
    }
}

/// Creates the main API router
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let quotation_routes = Router::new()
        .route("/", post(quotation::create_quotation).get(quotation::list_quotations))
        .route("/statistics", get(quotation::statistics))
        .route(
            "/:id",
            get(quotation::get_quotation)
                .put(quotation::update_quotation)
                .delete(quotation::delete_quotation),
        )
        .route("/:id/generate", post(quotation::generate_quotes))
        .route(
            "/:id/company-quotes",
            get(quotation::get_company_quotes).put(quotation::replace_company_quotes),
        )
        .route("/:id/document", get(quotation::export_document))
        .route("/:id/dispatch", post(quotation::dispatch_quotation));

    let api_routes = Router::new()
        .route("/insured-value", post(quotation::compute_insured_value))
        .nest("/quotations", quotation_routes)
        .layer(axum_middleware::from_fn(audit_middleware));

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(request_id)),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
