//! In-memory device-set store.
//!
//! Used when persistence is disabled and in tests. Keeps rows in first-write
//! order like the PostgreSQL backend's `created_at` ordering.

use async_trait::async_trait;
use chrono::Utc;
use indexmap::IndexMap;
use tokio::sync::RwLock;

use super::DeviceSetStore;
use super::models::StoredDeviceSet;
use crate::domain::{DeviceDefinition, DeviceSetId};
use crate::error::BridgeError;

/// Device-set store that lives and dies with the process.
#[derive(Debug, Default)]
pub struct MemoryDeviceSetStore {
    rows: RwLock<IndexMap<String, StoredDeviceSet>>,
}

impl MemoryDeviceSetStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-filled with `rows`.
    #[must_use]
    pub fn with_rows(rows: Vec<StoredDeviceSet>) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| (row.device_set_id.clone(), row))
            .collect();
        Self {
            rows: RwLock::new(rows),
        }
    }

    /// Number of stored device-sets.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    /// Returns `true` if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl DeviceSetStore for MemoryDeviceSetStore {
    async fn find_all(&self) -> Result<Vec<StoredDeviceSet>, BridgeError> {
        Ok(self.rows.read().await.values().cloned().collect())
    }

    async fn upsert(
        &self,
        device_set_id: &DeviceSetId,
        device_definitions: &[DeviceDefinition],
    ) -> Result<(), BridgeError> {
        let payload = serde_json::to_value(device_definitions)
            .map_err(|e| BridgeError::PersistenceError(e.to_string()))?;
        let row = StoredDeviceSet {
            device_set_id: device_set_id.to_string(),
            device_definitions: payload,
            updated_at: Utc::now(),
        };
        self.rows.write().await.insert(row.device_set_id.clone(), row);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_replaces_in_place() {
        let store = MemoryDeviceSetStore::new();
        let a = DeviceSetId::new("A");
        let b = DeviceSetId::new("B");

        tokio_test::assert_ok!(store.upsert(&a, &[DeviceDefinition::new("lamp1")]).await);
        tokio_test::assert_ok!(store.upsert(&b, &[DeviceDefinition::new("fan")]).await);
        tokio_test::assert_ok!(store.upsert(&a, &[DeviceDefinition::new("heater")]).await);

        let Ok(rows) = store.find_all().await else {
            panic!("find_all failed");
        };
        assert_eq!(rows.len(), 2);
        let Some(first) = rows.first() else {
            panic!("expected rows");
        };
        assert_eq!(first.device_set_id, "A");
        assert_eq!(first.device_definitions, serde_json::json!([{"id": "heater"}]));
    }

    #[tokio::test]
    async fn starts_empty() {
        let store = MemoryDeviceSetStore::new();
        assert!(store.is_empty().await);
        assert_eq!(store.len().await, 0);
    }
}
