use anyhow::Context;
use merx_api::{app, AppState};
use merx_catalog::PricingConfig;
use merx_core::{EventPublisher, LogPublisher};
use merx_order::LedgerEngine;
use merx_store::app_config::Config;
use merx_store::{DbClient, KafkaEventPublisher, PgLedgerStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "merx_api=debug,merx_order=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("failed to load config")?;
    tracing::info!("Starting Merx ledger API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url, config.database.max_connections)
        .await
        .context("failed to connect to Postgres")?;
    db.migrate().await.context("failed to run migrations")?;

    let rules = db
        .fetch_ledger_rules(config.ledger.clone())
        .await
        .context("failed to read ledger rules")?;
    let pricing = PricingConfig {
        tax_rate: rules.tax_rate,
        currency: rules.currency,
    };
    tracing::info!(tax_rate = %pricing.tax_rate, currency = %pricing.currency, "ledger rules loaded");

    let events: Arc<dyn EventPublisher> = match &config.kafka {
        Some(kafka) => Arc::new(
            KafkaEventPublisher::new(&kafka.brokers).context("failed to create Kafka producer")?,
        ),
        None => {
            tracing::warn!("no Kafka brokers configured, ledger events are only logged");
            Arc::new(LogPublisher)
        }
    };

    let store = Arc::new(PgLedgerStore::new(db.pool.clone()));
    let engine = LedgerEngine::new(store, events, pricing);
    let app = app(AppState::new(engine));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
