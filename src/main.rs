use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod domain;
mod http;
mod metrics;
mod models;
mod store;
mod utils;

use config::AppConfig;
use domain::order::TransitionExecutor;
use http::auth::{PgSessionVerifier, SessionVerifier};
use http::server::{run_api_server, ApiContext};
use store::{OrderStore, PgAuditLog, PgOrderStore, TransitionAudit};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,order_lifecycle=debug")),
        )
        .init();

    tracing::info!("🚀 Starting order lifecycle service");

    let config = AppConfig::from_env()?;

    // === 1. Connect to Postgres and ensure schema ===
    tracing::info!("Connecting to Postgres...");
    let pool = PgPoolOptions::new()
        .max_connections(config.max_db_connections)
        .connect(&config.database_url)
        .await?;

    store::ensure_schema(&pool).await?;

    // === 2. Initialize Prometheus metrics ===
    tracing::info!("Initializing metrics");
    let metrics = Arc::new(metrics::Metrics::new()?);
    tracing::info!(
        "📊 Metrics registry created with {} metrics",
        metrics.registry().gather().len()
    );

    // Start metrics HTTP server in background thread
    let metrics_registry = Arc::new(metrics.registry().clone());
    let metrics_port = config.metrics_port;
    std::thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            if let Err(e) = metrics::start_metrics_server(metrics_registry, metrics_port).await {
                tracing::error!("Metrics server error: {}", e);
            }
        });
    });

    // === 3. Wire the transition engine ===
    let store: Arc<dyn OrderStore> = Arc::new(PgOrderStore::new(pool.clone()));
    let audit: Arc<dyn TransitionAudit> = Arc::new(PgAuditLog::new(pool.clone()));
    let verifier: Arc<dyn SessionVerifier> = Arc::new(PgSessionVerifier::new(pool));
    let executor = Arc::new(TransitionExecutor::new(
        store.clone(),
        audit.clone(),
        metrics.clone(),
    ));

    // === 4. Serve the order API ===
    let ctx = ApiContext {
        executor,
        store,
        audit,
        verifier,
        metrics,
    };
    run_api_server(ctx, &config.http_host, config.http_port).await?;

    Ok(())
}
