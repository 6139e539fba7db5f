//! Database models for stored device-sets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{DeviceDefinition, DeviceSet, DeviceSetId};
use crate::error::BridgeError;

/// A row from the `device_sets` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDeviceSet {
    /// Device-set name (primary key).
    pub device_set_id: String,
    /// Definitions as JSONB, in announcement order.
    pub device_definitions: serde_json::Value,
    /// Time of the last upsert.
    pub updated_at: DateTime<Utc>,
}

impl StoredDeviceSet {
    /// Converts the row into an offline registry record.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::PersistenceError`] if the stored definitions
    /// are not a list of objects with string ids.
    pub fn into_device_set(self) -> Result<DeviceSet, BridgeError> {
        let device_definitions: Vec<DeviceDefinition> =
            serde_json::from_value(self.device_definitions).map_err(|e| {
                BridgeError::PersistenceError(format!(
                    "device set {}: bad stored definitions: {e}",
                    self.device_set_id
                ))
            })?;
        Ok(DeviceSet {
            id: DeviceSetId::new(self.device_set_id),
            device_definitions,
            last_registration_at: self.updated_at,
            connection: None,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn row_converts_to_offline_set() {
        let row = StoredDeviceSet {
            device_set_id: "A".to_string(),
            device_definitions: serde_json::json!([{"id": "lamp1", "type": "light"}]),
            updated_at: Utc::now(),
        };
        let Ok(set) = row.into_device_set() else {
            panic!("row should convert");
        };
        assert_eq!(set.id, DeviceSetId::new("A"));
        assert_eq!(set.device_ids(), vec!["lamp1".to_string()]);
        assert!(set.connection.is_none());
    }

    #[test]
    fn corrupt_row_is_an_error() {
        let row = StoredDeviceSet {
            device_set_id: "A".to_string(),
            device_definitions: serde_json::json!({"id": "not-a-list"}),
            updated_at: Utc::now(),
        };
        assert!(matches!(
            row.into_device_set(),
            Err(BridgeError::PersistenceError(_))
        ));
    }
}
