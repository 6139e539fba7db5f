//! Device-set identity, device definitions, and the device-set record.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ConnectionId;

/// Name of a group of devices sharing one registration session and one
/// connection.
///
/// Chosen by the device side and sent in every `register` frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceSetId(String);

impl DeviceSetId {
    /// Wraps a raw device-set name.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceSetId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Opaque description of a single device as announced by its device-set.
///
/// Only `id` is interpreted by the bridge. Every other field (type, traits,
/// names, attributes, custom data) is carried through untouched so the
/// fulfillment layer sees exactly what the device sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDefinition {
    /// Device identifier, unique within its device-set.
    pub id: String,
    /// Remaining descriptor fields, passed through verbatim.
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl DeviceDefinition {
    /// Creates a definition with no attributes besides its id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: serde_json::Map::new(),
        }
    }
}

/// Registry record for one device-set.
///
/// `connection` is `None` exactly when no connection is believed alive for
/// the set. The record itself outlives its connection; only a later
/// registration replaces it.
#[derive(Debug, Clone)]
pub struct DeviceSet {
    /// Device-set name.
    pub id: DeviceSetId,
    /// Announced devices, in the order the device-set sent them.
    pub device_definitions: Vec<DeviceDefinition>,
    /// When the set last registered (or was restored from storage).
    pub last_registration_at: DateTime<Utc>,
    /// Live connection serving this set, if any.
    pub connection: Option<ConnectionId>,
}

impl DeviceSet {
    /// Returns the device ids in announcement order.
    #[must_use]
    pub fn device_ids(&self) -> Vec<String> {
        self.device_definitions.iter().map(|d| d.id.clone()).collect()
    }

    /// Returns `true` while a connection is bound to the set.
    #[must_use]
    pub const fn is_online(&self) -> bool {
        self.connection.is_some()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn definition_keeps_unknown_fields() {
        let raw = serde_json::json!({
            "id": "lamp1",
            "type": "action.devices.types.LIGHT",
            "traits": ["action.devices.traits.OnOff"],
            "willReportState": false
        });
        let Ok(def) = serde_json::from_value::<DeviceDefinition>(raw.clone()) else {
            panic!("definition should decode");
        };
        assert_eq!(def.id, "lamp1");
        assert_eq!(def.attributes.len(), 3);

        let Ok(back) = serde_json::to_value(&def) else {
            panic!("definition should encode");
        };
        assert_eq!(back, raw);
    }

    #[test]
    fn definition_without_id_is_rejected() {
        let raw = serde_json::json!({ "type": "action.devices.types.LIGHT" });
        assert!(serde_json::from_value::<DeviceDefinition>(raw).is_err());
    }

    #[test]
    fn device_ids_keep_announcement_order() {
        let set = DeviceSet {
            id: DeviceSetId::new("A"),
            device_definitions: vec![DeviceDefinition::new("lamp1"), DeviceDefinition::new("fan")],
            last_registration_at: Utc::now(),
            connection: None,
        };
        assert_eq!(set.device_ids(), vec!["lamp1".to_string(), "fan".to_string()]);
        assert!(!set.is_online());
    }

    #[test]
    fn device_set_id_display() {
        assert_eq!(DeviceSetId::from("living-room").to_string(), "living-room");
    }
}
