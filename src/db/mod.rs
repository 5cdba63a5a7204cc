//! Persistence layer: models, repositories and connection setup.

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::config::DatabaseConfig;
use crate::error::AppResult;

pub mod models;
pub mod repository;

pub use models::*;
pub use repository::{NotificationPreferencesRepository, NotificationRepository};

/// Open the SQLite pool and run embedded migrations.
///
/// `sqlite::memory:` gets a single never-recycled connection so the database
/// survives for the lifetime of the pool; file-backed URLs get the configured
/// pool size and `create_if_missing`.
pub async fn connect(config: &DatabaseConfig) -> AppResult<SqlitePool> {
    let pool = if config.url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(SqliteConnectOptions::new().in_memory(true))
            .await?
    } else {
        let db_path = config.url.strip_prefix("sqlite://").unwrap_or(&config.url);

        // Create the parent directory so a fresh checkout can boot.
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    anyhow::anyhow!("Failed to create database directory {}: {}", parent.display(), e)
                })?;
            }
        }

        SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(db_path)
                    .create_if_missing(true),
            )
            .await?
    };

    tracing::info!("Running database migrations");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

    Ok(pool)
}

/// In-memory pool for tests.
#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
    };
    connect(&config).await.expect("in-memory pool")
}
