//! Warehouse Inventory Management Platform - Projector Worker
//!
//! Background worker that keeps denormalized stock summaries consistent.
//! Movement commit is decoupled from summary consistency; reporting reads
//! may lag behind executed movements until the next recompute.

use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use warehouse_inventory_engine::services::InventoryProjector;
use warehouse_inventory_engine::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wim_worker=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    tracing::info!("Starting Warehouse Inventory projector worker");
    tracing::info!("Environment: {}", config.environment);

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database.url)
        .await?;

    tracing::info!("Database connection established");

    // Run migrations in development
    if config.environment == "development" {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&db_pool).await?;
        tracing::info!("Migrations completed");
    }

    let projector = InventoryProjector::new(db_pool);
    let interval = Duration::from_secs(config.worker.sweep_interval_secs);

    // Catch-up sweeps; in-process queues owned by API hosts handle the
    // per-movement recomputes between sweeps
    loop {
        match projector.sweep().await {
            Ok(count) => tracing::info!(summaries = count, "Stock summary sweep completed"),
            Err(e) => tracing::error!(error = %e, "Stock summary sweep failed"),
        }
        tokio::time::sleep(interval).await;
    }
}
