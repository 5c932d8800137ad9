//! API configuration
//!
//! Loaded from `API_`-prefixed environment variables, with `__` separating
//! nested keys (`API_SERVER__PORT=9000`, `API_GENERATION__LOCK_POLICY=wait`).
//! Every field has a default.

use serde::Deserialize;
use std::time::Duration;

use core_kernel::Currency;
use domain_quotation::adapters::HttpCollaboratorConfig;
use domain_quotation::{GenerationConfig, LockPolicy, QuotationServiceConfig};

use crate::error::ErrorDetailConfig;

/// API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub server: ServerConfig,
    /// Database URL
    pub database_url: String,
    /// Log level, used when `RUST_LOG` is not set
    pub log_level: String,
    pub log_format: LogFormat,
    /// Render internal error detail in responses instead of a generic message
    pub expose_internal_errors: bool,
    pub generation: GenerationSettings,
    /// Currency of new quotations and statistics
    pub currency: Currency,
    pub renderer: HttpCollaboratorConfig,
    pub whatsapp: WhatsAppSettings,
    /// JSON file holding the rate cards
    pub rate_cards_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockPolicyKind {
    #[default]
    FailFast,
    Wait,
}

/// Company quote generation settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub pricing_timeout_ms: u64,
    pub lock_policy: LockPolicyKind,
    /// Upper bound for the `wait` lock policy
    pub lock_wait_ms: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            pricing_timeout_ms: 5_000,
            lock_policy: LockPolicyKind::FailFast,
            lock_wait_ms: 2_000,
        }
    }
}

/// WhatsApp gateway settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WhatsAppSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_ms: u64,
    /// Business sender the gateway sends as
    pub sender_id: String,
}

impl Default for WhatsAppSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9200".to_string(),
            api_key: None,
            timeout_ms: 10_000,
            sender_id: "quotations".to_string(),
        }
    }
}

impl WhatsAppSettings {
    /// Connection settings for the HTTP client
    pub fn http(&self) -> HttpCollaboratorConfig {
        HttpCollaboratorConfig {
            api_key: self.api_key.clone(),
            timeout_ms: self.timeout_ms,
            ..HttpCollaboratorConfig::new(self.base_url.clone())
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database_url: "postgres://localhost/quotations".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            expose_internal_errors: false,
            generation: GenerationSettings::default(),
            currency: Currency::INR,
            renderer: HttpCollaboratorConfig::new("http://localhost:9100"),
            whatsapp: WhatsAppSettings::default(),
            rate_cards_path: None,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_source(
            config::Environment::with_prefix("API")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
    }

    /// Loads configuration from any `config` source, defaulting missing keys
    pub fn from_source<S>(source: S) -> Result<Self, config::ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn error_detail(&self) -> ErrorDetailConfig {
        ErrorDetailConfig {
            expose_internal_errors: self.expose_internal_errors,
        }
    }

    /// Service settings derived from this configuration
    pub fn service_config(&self) -> QuotationServiceConfig {
        let lock_policy = match self.generation.lock_policy {
            LockPolicyKind::FailFast => LockPolicy::FailFast,
            LockPolicyKind::Wait => LockPolicy::Wait {
                timeout_ms: self.generation.lock_wait_ms,
            },
        };
        QuotationServiceConfig {
            generation: GenerationConfig {
                pricing_timeout: Duration::from_millis(self.generation.pricing_timeout_ms),
            },
            lock_policy,
            currency: self.currency,
        }
    }
}
