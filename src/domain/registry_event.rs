//! Domain events reflecting registry mutations.
//!
//! Every registration and every offline transition emits a
//! [`RegistryEvent`] through the [`super::EventBus`]. The catalogue sync
//! worker turns the ones that change what the cloud should see into
//! request-sync calls.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{ConnectionId, DeviceSetId};

/// Why a device-set lost its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OfflineReason {
    /// The transport closed (peer hung up, missed pong, send failure).
    ConnectionClosed,
    /// The set did not re-register within the registration interval.
    Stale,
    /// Another device-set registered over the same connection.
    Superseded,
}

/// Domain event emitted after every registry mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum RegistryEvent {
    /// A device-set was created or refreshed by a `register` frame.
    DeviceSetRegistered {
        /// Device-set name.
        device_set_id: DeviceSetId,
        /// Connection now serving the set.
        connection_id: ConnectionId,
        /// Device ids announced by the set, in order.
        device_ids: Vec<String>,
        /// `true` if the set was unknown before this registration.
        created: bool,
        /// Registration timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A device-set's connection was cleared.
    DeviceSetOffline {
        /// Device-set name.
        device_set_id: DeviceSetId,
        /// Connection that was serving the set.
        connection_id: ConnectionId,
        /// Why the connection was cleared.
        reason: OfflineReason,
        /// Timestamp of the transition.
        timestamp: DateTime<Utc>,
    },
}

impl RegistryEvent {
    /// Returns the device-set this event concerns.
    #[must_use]
    pub const fn device_set_id(&self) -> &DeviceSetId {
        match self {
            Self::DeviceSetRegistered { device_set_id, .. }
            | Self::DeviceSetOffline { device_set_id, .. } => device_set_id,
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::DeviceSetRegistered { .. } => "device_set_registered",
            Self::DeviceSetOffline { .. } => "device_set_offline",
        }
    }

    /// Returns `true` if the cloud side should be asked to re-sync its
    /// device list after this event.
    ///
    /// Registrations always qualify. Of the offline transitions only
    /// staleness reaps do; a dropped socket is expected to come back and
    /// re-register on its own.
    #[must_use]
    pub const fn requires_sync(&self) -> bool {
        match self {
            Self::DeviceSetRegistered { .. } => true,
            Self::DeviceSetOffline { reason, .. } => matches!(reason, OfflineReason::Stale),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn offline(reason: OfflineReason) -> RegistryEvent {
        RegistryEvent::DeviceSetOffline {
            device_set_id: DeviceSetId::new("A"),
            connection_id: ConnectionId::new(),
            reason,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn registered_event_type() {
        let event = RegistryEvent::DeviceSetRegistered {
            device_set_id: DeviceSetId::new("A"),
            connection_id: ConnectionId::new(),
            device_ids: vec!["lamp1".to_string()],
            created: true,
            timestamp: Utc::now(),
        };
        assert_eq!(event.event_type_str(), "device_set_registered");
        assert!(event.requires_sync());
    }

    #[test]
    fn only_stale_offline_requires_sync() {
        assert!(offline(OfflineReason::Stale).requires_sync());
        assert!(!offline(OfflineReason::ConnectionClosed).requires_sync());
        assert!(!offline(OfflineReason::Superseded).requires_sync());
    }

    #[test]
    fn offline_serializes_with_reason() {
        let json = serde_json::to_string(&offline(OfflineReason::Stale)).unwrap_or_default();
        assert!(json.contains("device_set_offline"));
        assert!(json.contains("\"reason\":\"stale\""));
    }
}
