//! Health check handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use core_kernel::{AdapterHealth, HealthCheckable};

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_latency_ms: Option<u64>,
}

/// Liveness endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        repository_latency_ms: None,
    })
}

/// Readiness check (includes the quotation repository)
pub async fn readiness_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, StatusCode> {
    let result = state.service.repository().health_check().await;
    if matches!(result.status, AdapterHealth::Unhealthy | AdapterHealth::Unknown) {
        tracing::warn!(
            adapter = %result.adapter_id,
            message = result.message.as_deref().unwrap_or_default(),
            "repository not ready"
        );
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(Json(HealthResponse {
        status: "ready".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        repository_latency_ms: Some(result.latency_ms),
    }))
}
