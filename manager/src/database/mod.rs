//! SQLite persistence for maintenance definitions.
//!
//! The module is organized into submodules:
//! - `definitions` - per-target definitions records (JSON payloads)
//! - `disambiguators` - tokens assigned to cloud pools sharing a name

mod definitions;
mod disambiguators;

use anyhow::Result;
use sqlx::{Pool, Sqlite, SqlitePool};
use std::path::Path;
use tracing::{error, info};

use crate::errors::StorageError;

pub struct SqliteStorage {
    pool: Pool<Sqlite>,
}

impl SqliteStorage {
    /// Expose pool for integration test queries
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn new(database_path: &str) -> Result<Self> {
        info!("Opening maintenance database at {}", database_path);

        if let Some(parent) = Path::new(database_path).parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                error!("Failed to create parent directory {:?}: {}", parent, e);
                return Err(e.into());
            }
        }

        let database_url = format!("sqlite:{}?mode=rwc", database_path);
        let pool = match SqlitePool::connect(&database_url).await {
            Ok(pool) => pool,
            Err(e) => {
                error!("Failed to connect to database: {}", e);
                error!("   Connection URL: {}", database_url);
                return Err(e.into());
            }
        };

        let storage = Self::from_pool(pool).await?;
        storage.test_database().await?;
        info!("Maintenance database ready");
        Ok(storage)
    }

    /// Wrap an existing pool, creating the tables if needed.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        let storage = Self { pool };
        if let Err(e) = storage.initialize_tables().await {
            error!("Database table initialization failed: {}", e);
            return Err(e);
        }
        Ok(storage)
    }

    async fn initialize_tables(&self) -> Result<()> {
        let definitions_table_sql = r#"
            CREATE TABLE IF NOT EXISTS maintenance_definitions (
                target_key TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                updated_at DATETIME NOT NULL
            )
        "#;
        if let Err(e) = sqlx::query(definitions_table_sql).execute(&self.pool).await {
            error!("Failed to create maintenance_definitions table: {}", e);
            return Err(e.into());
        }

        let disambiguators_table_sql = r#"
            CREATE TABLE IF NOT EXISTS cloud_disambiguators (
                pool_id TEXT PRIMARY KEY,
                token TEXT NOT NULL
            )
        "#;
        if let Err(e) = sqlx::query(disambiguators_table_sql).execute(&self.pool).await {
            error!("Failed to create cloud_disambiguators table: {}", e);
            return Err(e.into());
        }

        info!("Database tables initialized");
        Ok(())
    }

    async fn test_database(&self) -> Result<()> {
        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('maintenance_definitions', 'cloud_disambiguators')",
        )
        .fetch_all(&self.pool)
        .await?;

        if tables.len() != 2 {
            error!("Expected 2 tables, found {}: {:?}", tables.len(), tables);
            return Err(anyhow::anyhow!("Database tables not properly created"));
        }
        Ok(())
    }
}

fn query_failed(query: &str, e: sqlx::Error) -> StorageError {
    error!("Query '{}' failed: {}", query, e);
    StorageError::QueryFailed {
        query: query.to_string(),
        reason: e.to_string(),
    }
}
