//! Definitions records, one JSON payload per target key.

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::errors::StorageError;
use crate::store::{Definitions, DefinitionsStorage, StoredDefinitions};

use super::{query_failed, SqliteStorage};

#[async_trait]
impl DefinitionsStorage for SqliteStorage {
    async fn read(&self, key: &str) -> Result<Option<StoredDefinitions>, StorageError> {
        let payload: Option<String> =
            sqlx::query_scalar("SELECT payload FROM maintenance_definitions WHERE target_key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| query_failed("select maintenance_definitions", e))?;

        match payload {
            Some(payload) => {
                debug!("Read maintenance definitions for {}", key);
                Ok(Some(serde_json::from_str(&payload)?))
            }
            None => Ok(None),
        }
    }

    async fn write(&self, key: &str, definitions: &Definitions) -> Result<(), StorageError> {
        let payload = serde_json::to_string(definitions)?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO maintenance_definitions (target_key, payload, updated_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(key)
        .bind(&payload)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| query_failed("store maintenance_definitions", e))?;

        debug!("Stored maintenance definitions for {}", key);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM maintenance_definitions WHERE target_key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| query_failed("delete maintenance_definitions", e))?;
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        sqlx::query_scalar("SELECT target_key FROM maintenance_definitions ORDER BY target_key")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| query_failed("list maintenance_definitions", e))
    }
}
