use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use revise_core::model::AppState;
use revise_core::time::Clock;

use crate::record::StateRecord;
use crate::repository::{StateStore, StorageError};

use super::SqliteRepository;

impl SqliteRepository {
    /// Raw value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the query fails.
    pub async fn get_value(&self, key: &str) -> Result<Option<String>, StorageError> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        row.map(|row| {
            row.try_get::<String, _>("value")
                .map_err(|err| StorageError::Serialization(err.to_string()))
        })
        .transpose()
    }

    /// Insert or replace the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the write fails.
    pub async fn set_value(&self, key: &str, value: &str) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            ",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl StateStore for SqliteRepository {
    async fn load_state(&self) -> Result<Option<AppState>, StorageError> {
        let Some(raw) = self.get_value(&self.state_key).await? else {
            return Ok(None);
        };
        Ok(Some(StateRecord::from_json(&raw)?.into_state(Clock::Default.now())))
    }

    async fn save_state(&self, state: &AppState) -> Result<(), StorageError> {
        let raw = StateRecord::from_state(state).to_json()?;
        self.set_value(&self.state_key, &raw).await
    }
}
