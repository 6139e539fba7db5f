//! Staleness reaper: drops device-sets that stopped re-registering.

use chrono::{DateTime, Duration, Utc};

use crate::domain::{ConnectionRegistry, DeviceSetId};

/// Marks offline, then terminates, every online set whose last
/// registration is more than `stale_after` older than `now`.
///
/// Returns the reaped sets. The offline transition is recorded before the
/// socket closes so the later close path finds nothing left to unbind.
/// Sockets are terminated after the registry lock is released.
pub async fn sweep(
    registry: &ConnectionRegistry,
    now: DateTime<Utc>,
    stale_after: Duration,
) -> Vec<DeviceSetId> {
    registry
        .reap_stale(now, stale_after)
        .await
        .into_iter()
        .map(|(device_set_id, connection)| {
            tracing::info!(
                %device_set_id,
                connection_id = %connection.id(),
                "device set missed re-registration; reaping"
            );
            connection.terminate();
            device_set_id
        })
        .collect()
}
