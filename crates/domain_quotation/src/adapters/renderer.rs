//! HTTP document renderer
//!
//! Posts the quotation document as JSON to `{base_url}/documents` and reads
//! the rendered PDF from the response body.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{CONTENT_TYPE, ACCEPT};
use reqwest::Client;
use std::time::Instant;

use core_kernel::{AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable, PortError};

use super::circuit_breaker::CircuitBreaker;
use super::http::{build_client, ensure_success, map_reqwest_error, HttpCollaboratorConfig};
use crate::delivery::{QuotationDocument, RenderedDocument};
use crate::ports::DocumentRenderer;

const SERVICE: &str = "document renderer";

#[derive(Debug)]
pub struct HttpDocumentRenderer {
    config: HttpCollaboratorConfig,
    client: Client,
    circuit_breaker: CircuitBreaker,
}

impl HttpDocumentRenderer {
    pub fn new(config: HttpCollaboratorConfig) -> Result<Self, PortError> {
        let client = build_client(SERVICE, &config)?;
        let circuit_breaker = CircuitBreaker::new(config.circuit_breaker.clone());
        Ok(Self {
            config,
            client,
            circuit_breaker,
        })
    }

    async fn post_document(&self, document: &QuotationDocument) -> Result<RenderedDocument, PortError> {
        let response = self
            .client
            .post(self.config.url("documents"))
            .header(ACCEPT, "application/pdf")
            .json(document)
            .send()
            .await
            .map_err(|e| map_reqwest_error(SERVICE, e, self.config.timeout_ms))?;
        let response = ensure_success(SERVICE, response).await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/pdf")
            .to_string();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| map_reqwest_error(SERVICE, e, self.config.timeout_ms))?;
        if bytes.is_empty() {
            return Err(PortError::rejected(SERVICE, "empty document"));
        }

        Ok(RenderedDocument {
            file_name: format!("{}.pdf", document.quote_number),
            content_type,
            bytes: bytes.to_vec(),
        })
    }
}

impl DomainPort for HttpDocumentRenderer {}

#[async_trait]
impl HealthCheckable for HttpDocumentRenderer {
    async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();
        let (status, message) = if self.circuit_breaker.is_open() {
            (AdapterHealth::Degraded, Some("Circuit breaker is open".to_string()))
        } else {
            match self.client.get(self.config.url("health")).send().await {
                Ok(response) if response.status().is_success() => (AdapterHealth::Healthy, None),
                Ok(response) => (AdapterHealth::Degraded, Some(format!("HTTP {}", response.status()))),
                Err(e) => (AdapterHealth::Unhealthy, Some(e.to_string())),
            }
        };
        HealthCheckResult {
            adapter_id: "http-document-renderer".to_string(),
            status,
            latency_ms: start.elapsed().as_millis() as u64,
            message,
            checked_at: Utc::now(),
        }
    }
}

#[async_trait]
impl DocumentRenderer for HttpDocumentRenderer {
    #[tracing::instrument(skip(self, document), fields(quotation_id = %document.quotation_id))]
    async fn render(&self, document: &QuotationDocument) -> Result<RenderedDocument, PortError> {
        if !self.circuit_breaker.is_available().await {
            return Err(PortError::unavailable("document renderer (circuit open)"));
        }

        match self.post_document(document).await {
            Ok(rendered) => {
                self.circuit_breaker.record_success();
                tracing::debug!(bytes = rendered.bytes.len(), "document rendered");
                Ok(rendered)
            }
            Err(error) => {
                if error.is_transient() {
                    self.circuit_breaker.record_failure().await;
                }
                tracing::warn!(%error, "document rendering failed");
                Err(error)
            }
        }
    }
}
