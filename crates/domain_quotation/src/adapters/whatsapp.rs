//! WhatsApp gateway client
//!
//! Dispatch is two calls against the gateway:
//!
//! 1. `POST {base_url}/media` with the raw document bytes, answered with a media id
//! 2. `POST {base_url}/messages` naming the destination, the text and the media id
//!
//! The gateway owns retries. A failed call is reported once.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use core_kernel::{AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable, PortError};

use super::circuit_breaker::CircuitBreaker;
use super::http::{build_client, ensure_success, map_reqwest_error, HttpCollaboratorConfig};
use crate::aggregate::DeliveryChannel;
use crate::delivery::{DeliveryReceipt, DispatchMessage};
use crate::ports::MessagingChannel;

const SERVICE: &str = "whatsapp";

#[derive(Debug, Deserialize)]
struct MediaUploaded {
    id: String,
}

#[derive(Debug, Serialize)]
struct DocumentMessage<'a> {
    from: &'a str,
    to: &'a str,
    text: &'a str,
    media_id: &'a str,
    file_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessageAccepted {
    message_id: String,
}

pub struct WhatsAppGateway {
    config: HttpCollaboratorConfig,
    sender_id: String,
    client: Client,
    circuit_breaker: CircuitBreaker,
}

impl WhatsAppGateway {
    pub fn new(config: HttpCollaboratorConfig, sender_id: impl Into<String>) -> Result<Self, PortError> {
        let client = build_client(SERVICE, &config)?;
        let circuit_breaker = CircuitBreaker::new(config.circuit_breaker.clone());
        Ok(Self {
            config,
            sender_id: sender_id.into(),
            client,
            circuit_breaker,
        })
    }

    async fn upload(&self, message: &DispatchMessage) -> Result<String, PortError> {
        let response = self
            .client
            .post(self.config.url("media"))
            .header(CONTENT_TYPE, message.document.content_type.as_str())
            .query(&[("file_name", message.document.file_name.as_str())])
            .body(message.document.bytes.clone())
            .send()
            .await
            .map_err(|e| map_reqwest_error(SERVICE, e, self.config.timeout_ms))?;
        let uploaded: MediaUploaded = ensure_success(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(|e| map_reqwest_error(SERVICE, e, self.config.timeout_ms))?;
        Ok(uploaded.id)
    }

    async fn deliver(&self, message: &DispatchMessage) -> Result<DeliveryReceipt, PortError> {
        let media_id = self.upload(message).await?;
        let body = DocumentMessage {
            from: &self.sender_id,
            to: &message.destination,
            text: &message.text,
            media_id: &media_id,
            file_name: &message.document.file_name,
        };
        let response = self
            .client
            .post(self.config.url("messages"))
            .json(&body)
            .send()
            .await
            .map_err(|e| map_reqwest_error(SERVICE, e, self.config.timeout_ms))?;
        let accepted: MessageAccepted = ensure_success(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(|e| map_reqwest_error(SERVICE, e, self.config.timeout_ms))?;
        Ok(DeliveryReceipt {
            reference: accepted.message_id,
        })
    }
}

impl DomainPort for WhatsAppGateway {}

#[async_trait]
impl HealthCheckable for WhatsAppGateway {
    async fn health_check(&self) -> HealthCheckResult {
        let (status, message) = if self.circuit_breaker.is_open() {
            (AdapterHealth::Degraded, Some("Circuit breaker is open".to_string()))
        } else {
            (AdapterHealth::Healthy, None)
        };
        HealthCheckResult {
            adapter_id: "whatsapp-gateway".to_string(),
            status,
            latency_ms: 0,
            message,
            checked_at: Utc::now(),
        }
    }
}

#[async_trait]
impl MessagingChannel for WhatsAppGateway {
    fn channel(&self) -> DeliveryChannel {
        DeliveryChannel::WhatsApp
    }

    #[tracing::instrument(skip(self, message), fields(destination = %message.destination))]
    async fn send(&self, message: &DispatchMessage) -> Result<DeliveryReceipt, PortError> {
        if !self.circuit_breaker.is_available().await {
            return Err(PortError::unavailable("whatsapp gateway (circuit open)"));
        }

        match self.deliver(message).await {
            Ok(receipt) => {
                self.circuit_breaker.record_success();
                tracing::info!(reference = %receipt.reference, "whatsapp message accepted");
                Ok(receipt)
            }
            Err(error) => {
                if error.is_transient() {
                    self.circuit_breaker.record_failure().await;
                }
                tracing::warn!(%error, "whatsapp dispatch failed");
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_body_shape() {
        let body = DocumentMessage {
            from: "insurer-desk",
            to: "9998887777",
            text: "Your quotation",
            media_id: "media-1",
            file_name: "QT-202601-000001.pdf",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["to"], "9998887777");
        assert_eq!(json["media_id"], "media-1");
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_reported() {
        let mut config = HttpCollaboratorConfig::new("http://127.0.0.1:9");
        config.timeout_ms = 500;
        let gateway = WhatsAppGateway::new(config, "desk").unwrap();
        let message = DispatchMessage {
            destination: "9998887777".to_string(),
            text: "hi".to_string(),
            document: crate::delivery::RenderedDocument::pdf("q.pdf", b"%PDF".to_vec()),
        };
        let error = gateway.send(&message).await.unwrap_err();
        assert!(error.is_transient());
    }
}
