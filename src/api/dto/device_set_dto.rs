//! Diagnostics view of registered device-sets.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::DeviceSet;

/// One device-set in `GET /api/v1/device-sets`.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeviceSetDto {
    /// Device-set name.
    pub device_set_id: String,
    /// Device ids in announcement order.
    pub device_ids: Vec<String>,
    /// Last registration (or restore) time.
    pub last_registration_at: DateTime<Utc>,
    /// Whether a connection currently serves the set.
    pub online: bool,
    /// Id of that connection, if any.
    pub connection_id: Option<String>,
}

impl From<DeviceSet> for DeviceSetDto {
    fn from(set: DeviceSet) -> Self {
        Self {
            device_ids: set.device_ids(),
            online: set.is_online(),
            connection_id: set.connection.map(|c| c.to_string()),
            device_set_id: set.id.to_string(),
            last_registration_at: set.last_registration_at,
        }
    }
}

/// Response body for `GET /api/v1/device-sets`.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeviceSetListResponse {
    /// Known device-sets, in first-registration order.
    pub device_sets: Vec<DeviceSetDto>,
    /// Number of known device-sets.
    pub total: usize,
    /// Number of device-sets with a live connection.
    pub online: usize,
}
