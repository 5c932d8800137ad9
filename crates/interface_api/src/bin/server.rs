//! Quotation Engine - API Server Binary
//!
//! # Usage
//!
//! ```bash
//! API_SERVER__PORT=8080 API_DATABASE_URL=postgres://... cargo run --bin quotation-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_SERVER__HOST` / `API_SERVER__PORT` - Bind address (default: 0.0.0.0:8080)
//! * `API_DATABASE_URL` - PostgreSQL connection string
//! * `API_LOG_LEVEL` - Log level used when `RUST_LOG` is unset (default: info)
//! * `API_LOG_FORMAT` - `text` or `json`
//! * `API_RATE_CARDS_PATH` - JSON rate cards file
//! * `API_RENDERER__BASE_URL`, `API_WHATSAPP__BASE_URL` - Collaborator endpoints

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use domain_quotation::adapters::{HttpDocumentRenderer, WhatsAppGateway};
use domain_quotation::{QuotationPorts, QuotationService, RateCardModel};
use infra_db::{create_pool, run_migrations, DatabaseConfig, PgCatalog, PgQuotationRepository};
use interface_api::config::{ApiConfig, LogFormat};
use interface_api::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("loading configuration")?;

    init_tracing(&config.log_level, config.log_format);

    tracing::info!(
        addr = %config.server_addr(),
        currency = %config.currency.code(),
        "Starting quotation API server"
    );

    let pool = create_pool(DatabaseConfig::new(config.database_url.clone()))
        .await
        .context("connecting to database")?;
    run_migrations(&pool).await.context("running migrations")?;

    let rate_model = match &config.rate_cards_path {
        Some(path) => RateCardModel::from_path(path).context("loading rate cards")?,
        None => {
            tracing::warn!("no rate cards configured; generation will skip every company");
            RateCardModel::new(Vec::new())
        }
    };

    let ports = QuotationPorts {
        repository: Arc::new(PgQuotationRepository::new(pool.clone())),
        catalog: Arc::new(PgCatalog::new(pool)),
        rate_model: Arc::new(rate_model),
        renderer: Arc::new(
            HttpDocumentRenderer::new(config.renderer.clone()).context("building renderer client")?,
        ),
        messaging: Arc::new(
            WhatsAppGateway::new(config.whatsapp.http(), config.whatsapp.sender_id.clone())
                .context("building WhatsApp client")?,
        ),
    };
    let service = Arc::new(QuotationService::new(ports, config.service_config()));

    let app = create_router(AppState::new(service, config.error_detail()));

    let addr: SocketAddr = config.server_addr().parse().context("parsing bind address")?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(log_level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let (json, text) = match format {
        LogFormat::Json => (Some(tracing_subscriber::fmt::layer().json()), None),
        LogFormat::Text => (None, Some(tracing_subscriber::fmt::layer().with_target(true))),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text)
        .init();
}

/// Waits for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
