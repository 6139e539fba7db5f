//! Registry observation hooks.
//!
//! The registry reports what it did through a [`RegistryObserver`] instead
//! of logging inline. Production wiring uses [`TracingObserver`]; tests can
//! plug in a recorder or [`NoopObserver`].

use std::fmt::Debug;

use super::{ConnectionId, DeviceSetId, OfflineReason};

/// Receives a callback after each registry mutation.
///
/// Callbacks run while the registry lock is held, so implementations must
/// not block or call back into the registry.
pub trait RegistryObserver: Debug + Send + Sync {
    /// A device-set was created or refreshed.
    fn registered(
        &self,
        _device_set_id: &DeviceSetId,
        _connection_id: ConnectionId,
        _device_ids: &[String],
        _created: bool,
    ) {
    }

    /// A device-set's previous connection was replaced by a new one. The
    /// caller owns closing the old connection.
    fn connection_replaced(&self, _device_set_id: &DeviceSetId, _old: ConnectionId, _new: ConnectionId) {}

    /// A device-set lost its connection.
    fn offline(&self, _device_set_id: &DeviceSetId, _connection_id: ConnectionId, _reason: OfflineReason) {}

    /// `mark_offline` was called for a connection that serves no device-set.
    fn unknown_connection(&self, _connection_id: ConnectionId) {}

    /// Device-sets were restored from the durable snapshot.
    fn seeded(&self, _count: usize) {}
}

/// Observer that ignores every callback.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RegistryObserver for NoopObserver {}

/// Observer that forwards every callback to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RegistryObserver for TracingObserver {
    fn registered(
        &self,
        device_set_id: &DeviceSetId,
        connection_id: ConnectionId,
        device_ids: &[String],
        created: bool,
    ) {
        if created {
            tracing::info!(%device_set_id, %connection_id, ?device_ids, "device set created");
        } else {
            tracing::debug!(%device_set_id, %connection_id, ?device_ids, "device set updated");
        }
    }

    fn connection_replaced(&self, device_set_id: &DeviceSetId, old: ConnectionId, new: ConnectionId) {
        tracing::info!(%device_set_id, old = %old, new = %new, "device set moved to a new connection");
    }

    fn offline(&self, device_set_id: &DeviceSetId, connection_id: ConnectionId, reason: OfflineReason) {
        tracing::info!(%device_set_id, %connection_id, ?reason, "device set offline");
    }

    fn unknown_connection(&self, connection_id: ConnectionId) {
        tracing::trace!(%connection_id, "mark_offline on unbound connection");
    }

    fn seeded(&self, count: usize) {
        tracing::info!(count, "device sets restored from storage");
    }
}
