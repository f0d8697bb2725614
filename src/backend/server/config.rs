/**
 * Store Configuration
 *
 * Picks the durable store for the server from the loaded `AppConfig`.
 *
 * # Selection
 *
 * - `DATABASE_URL` set: connect a PostgreSQL pool and run the embedded
 *   migrations. A failure here is fatal; the gateway must not silently
 *   lose durability.
 * - `DATABASE_URL` unset: log a warning and use the in-memory store.
 *
 * Either way the store is wrapped in `BoundedStore` so no call can outlive
 * `store_timeout`.
 */

use std::sync::Arc;

use sqlx::PgPool;
use thiserror::Error;

use crate::backend::store::{memory::MemoryStore, postgres::PgStore, BoundedStore, SharedStore};
use crate::shared::{AppConfig, ConfigError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("database connection failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("database migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Connect to PostgreSQL and bring the schema up to date
pub async fn load_database(database_url: &str) -> Result<PgPool, StartupError> {
    tracing::info!("[Server] Connecting to database...");
    let pool = PgPool::connect(database_url).await.map_err(|e| {
        tracing::error!("[Server] Failed to create database connection pool: {:?}", e);
        e
    })?;
    tracing::info!("[Server] Database connection pool created successfully");

    tracing::info!("[Server] Running database migrations...");
    sqlx::migrate!().run(&pool).await.map_err(|e| {
        tracing::error!("[Server] Failed to run database migrations: {}", e);
        e
    })?;
    tracing::info!("[Server] Database migrations completed successfully");

    Ok(pool)
}

/// Build the store the gateway persists through
pub async fn load_store(config: &AppConfig) -> Result<SharedStore, StartupError> {
    let inner: SharedStore = match &config.database_url {
        Some(url) => Arc::new(PgStore::new(load_database(url).await?)),
        None => {
            tracing::warn!("[Server] DATABASE_URL not set. Using the in-memory store; data is lost on restart.");
            Arc::new(MemoryStore::new())
        }
    };
    Ok(Arc::new(BoundedStore::new(inner, config.store_timeout)))
}
