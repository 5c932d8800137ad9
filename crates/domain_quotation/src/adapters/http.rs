//! Shared HTTP plumbing for the delivery adapters
//!
//! Transport and status failures are mapped to `PortError`:
//! - timeouts -> `Timeout`
//! - connect failures -> `Connection`
//! - 429 -> `RateLimited`
//! - 5xx -> `ServiceUnavailable`
//! - other non-success statuses -> `Rejected`

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use core_kernel::{CircuitBreakerConfig, PortError};

/// Connection settings of an external HTTP collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpCollaboratorConfig {
    /// Base URL without trailing slash
    pub base_url: String,
    /// Sent as a bearer token when set
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl HttpCollaboratorConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            timeout_ms: default_timeout_ms(),
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }

    /// Joins the base URL and a path
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Builds a client with the configured timeout and authorization header
pub fn build_client(service: &str, config: &HttpCollaboratorConfig) -> Result<Client, PortError> {
    let mut headers = HeaderMap::new();
    if let Some(key) = &config.api_key {
        let value = HeaderValue::from_str(&format!("Bearer {}", key))
            .map_err(|_| PortError::validation_field("api key is not a valid header value", "api_key"))?;
        headers.insert(AUTHORIZATION, value);
    }

    Client::builder()
        .timeout(Duration::from_millis(config.timeout_ms))
        .default_headers(headers)
        .build()
        .map_err(|e| PortError::internal(format!("failed to create {} client: {}", service, e)))
}

pub fn map_reqwest_error(service: &str, error: reqwest::Error, timeout_ms: u64) -> PortError {
    if error.is_timeout() {
        PortError::Timeout {
            operation: service.to_string(),
            duration_ms: timeout_ms,
        }
    } else if error.is_connect() {
        PortError::connection(format!("{}: connection failed: {}", service, error))
    } else if error.is_decode() {
        PortError::rejected(service, format!("unreadable response: {}", error))
    } else {
        PortError::connection(format!("{}: request failed: {}", service, error))
    }
}

pub fn map_status_error(service: &str, status: StatusCode, retry_after: Option<u64>, body: &str) -> PortError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => PortError::RateLimited {
            retry_after_secs: retry_after.unwrap_or(1),
        },
        status if status.is_server_error() => PortError::unavailable(format!("{} ({})", service, status)),
        status => PortError::rejected(service, format!("HTTP {}: {}", status, body)),
    }
}

/// Returns the response when successful, otherwise the mapped error
pub async fn ensure_success(service: &str, response: Response) -> Result<Response, PortError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok());
    let body = response.text().await.unwrap_or_default();
    Err(map_status_error(service, status, retry_after, &body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_join() {
        let config = HttpCollaboratorConfig::new("https://render.example.com/api/");
        assert_eq!(config.url("/documents"), "https://render.example.com/api/documents");
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            map_status_error("renderer", StatusCode::TOO_MANY_REQUESTS, Some(7), ""),
            PortError::RateLimited { retry_after_secs: 7 }
        ));
        assert!(matches!(
            map_status_error("renderer", StatusCode::BAD_GATEWAY, None, ""),
            PortError::ServiceUnavailable { .. }
        ));
        assert!(matches!(
            map_status_error("whatsapp", StatusCode::BAD_REQUEST, None, "invalid number"),
            PortError::Rejected { ref message, .. } if message.contains("invalid number")
        ));
    }

    #[test]
    fn test_client_builds_with_key() {
        let mut config = HttpCollaboratorConfig::new("http://localhost:9000");
        config.api_key = Some("secret".to_string());
        assert!(build_client("renderer", &config).is_ok());
    }
}
