//! Tokens telling apart cloud pools that share a display name.

use std::collections::HashMap;

use sqlx::Row;
use tracing::debug;

use crate::errors::StorageError;

use super::{query_failed, SqliteStorage};

impl SqliteStorage {
    pub async fn load_disambiguators(&self) -> Result<HashMap<String, String>, StorageError> {
        let rows = sqlx::query("SELECT pool_id, token FROM cloud_disambiguators")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| query_failed("select cloud_disambiguators", e))?;

        let mut tokens = HashMap::with_capacity(rows.len());
        for row in rows {
            let pool_id: String = row
                .try_get("pool_id")
                .map_err(|e| query_failed("read pool_id", e))?;
            let token: String = row
                .try_get("token")
                .map_err(|e| query_failed("read token", e))?;
            tokens.insert(pool_id, token);
        }
        Ok(tokens)
    }

    /// Replace the stored tokens with `tokens`.
    pub async fn save_disambiguators(
        &self,
        tokens: &HashMap<String, String>,
    ) -> Result<(), StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| query_failed("begin", e))?;

        sqlx::query("DELETE FROM cloud_disambiguators")
            .execute(&mut *tx)
            .await
            .map_err(|e| query_failed("clear cloud_disambiguators", e))?;

        for (pool_id, token) in tokens {
            sqlx::query("INSERT INTO cloud_disambiguators (pool_id, token) VALUES (?, ?)")
                .bind(pool_id)
                .bind(token)
                .execute(&mut *tx)
                .await
                .map_err(|e| query_failed("store cloud_disambiguators", e))?;
        }

        tx.commit().await.map_err(|e| query_failed("commit", e))?;
        debug!("Stored {} cloud disambiguators", tokens.len());
        Ok(())
    }
}
