//! PostgreSQL implementation of the device-set store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::DeviceSetStore;
use super::models::StoredDeviceSet;
use crate::config::BridgeConfig;
use crate::domain::{DeviceDefinition, DeviceSetId};
use crate::error::BridgeError;

/// PostgreSQL-backed device-set store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresDeviceSetStore {
    pool: PgPool,
}

impl PostgresDeviceSetStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects using the pool settings in `config` and applies pending
    /// migrations.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::PersistenceError`] if the database is
    /// unreachable or a migration fails.
    pub async fn connect(config: &BridgeConfig) -> Result<Self, BridgeError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(std::time::Duration::from_secs(
                config.database_connect_timeout_secs,
            ))
            .connect(&config.database_url)
            .await
            .map_err(|e| BridgeError::PersistenceError(e.to_string()))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| BridgeError::PersistenceError(e.to_string()))?;

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl DeviceSetStore for PostgresDeviceSetStore {
    async fn find_all(&self) -> Result<Vec<StoredDeviceSet>, BridgeError> {
        let rows = sqlx::query_as::<_, (String, serde_json::Value, DateTime<Utc>)>(
            "SELECT device_set_id, device_definitions, updated_at FROM device_sets \
             ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| BridgeError::PersistenceError(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(
                |(device_set_id, device_definitions, updated_at)| StoredDeviceSet {
                    device_set_id,
                    device_definitions,
                    updated_at,
                },
            )
            .collect())
    }

    async fn upsert(
        &self,
        device_set_id: &DeviceSetId,
        device_definitions: &[DeviceDefinition],
    ) -> Result<(), BridgeError> {
        let payload = serde_json::to_value(device_definitions)
            .map_err(|e| BridgeError::PersistenceError(e.to_string()))?;

        sqlx::query(
            "INSERT INTO device_sets (device_set_id, device_definitions) VALUES ($1, $2) \
             ON CONFLICT (device_set_id) DO UPDATE \
             SET device_definitions = EXCLUDED.device_definitions, updated_at = now()",
        )
        .bind(device_set_id.as_str())
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(|e| BridgeError::PersistenceError(e.to_string()))?;

        Ok(())
    }
}
