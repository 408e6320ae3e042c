//! Test database utilities for in-memory SQLite testing

use anyhow::Result;
use maintenance_manager::database::SqliteStorage;
use sqlx::sqlite::SqlitePoolOptions;

/// Test database wrapper for in-memory SQLite
pub struct TestDatabase {
    storage: SqliteStorage,
}

impl TestDatabase {
    /// Create a new in-memory test database with the tables in place
    pub async fn new() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        Ok(Self {
            storage: SqliteStorage::from_pool(pool).await?,
        })
    }

    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    pub fn into_storage(self) -> SqliteStorage {
        self.storage
    }
}
