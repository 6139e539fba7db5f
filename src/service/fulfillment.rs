//! Fulfillment service: answers cloud SYNC / QUERY / EXECUTE from the
//! registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{ConnectionRegistry, DeviceDefinition};
use crate::protocol::{DeviceTarget, Execution, WireMessage};

/// Outcome reported for a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandStatus {
    /// Handed to the device's connection (or, for QUERY, answered).
    Success,
    /// No live connection reaches the device.
    Offline,
}

/// Per-device EXECUTE result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CommandResult {
    /// Device ids this result covers.
    pub ids: Vec<String>,
    /// Delivery outcome.
    pub status: CommandStatus,
}

/// Per-device QUERY answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct DeviceQueryState {
    /// Whether the device is reachable right now.
    pub online: bool,
    /// Always [`CommandStatus::Success`]; offline devices are reported via
    /// `online`.
    pub status: CommandStatus,
}

/// SYNC answer.
#[derive(Debug, Clone)]
pub struct SyncPayload {
    /// Agent user the catalogue belongs to.
    pub agent_user_id: String,
    /// Full device catalogue.
    pub devices: Vec<DeviceDefinition>,
}

/// Fulfillment adapter over the [`ConnectionRegistry`].
///
/// Commands are fire-and-forget: `SUCCESS` means the execute frame was
/// queued on a live connection, not that the device carried it out.
#[derive(Debug, Clone)]
pub struct FulfillmentService {
    registry: Arc<ConnectionRegistry>,
    agent_user_id: String,
}

impl FulfillmentService {
    /// Creates a new `FulfillmentService`.
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>, agent_user_id: impl Into<String>) -> Self {
        Self {
            registry,
            agent_user_id: agent_user_id.into(),
        }
    }

    /// Returns the agent user id reported to the cloud.
    #[must_use]
    pub fn agent_user_id(&self) -> &str {
        &self.agent_user_id
    }

    /// Returns the device catalogue.
    pub async fn sync(&self) -> SyncPayload {
        let devices = self.registry.all_device_definitions().await;
        tracing::debug!(count = devices.len(), "answering SYNC");
        SyncPayload {
            agent_user_id: self.agent_user_id.clone(),
            devices,
        }
    }

    /// Reports the online state of `device_ids`, or of the whole catalogue
    /// when the list is empty.
    pub async fn query(&self, device_ids: &[String]) -> BTreeMap<String, DeviceQueryState> {
        let ids: Vec<String> = if device_ids.is_empty() {
            self.registry
                .all_device_definitions()
                .await
                .into_iter()
                .map(|d| d.id)
                .collect()
        } else {
            device_ids.to_vec()
        };

        let mut states = BTreeMap::new();
        for id in ids {
            let online = self.registry.is_online(&id).await;
            states.insert(
                id,
                DeviceQueryState {
                    online,
                    status: CommandStatus::Success,
                },
            );
        }
        states
    }

    /// Forwards `executions` to the connection serving `device`.
    ///
    /// Returns [`CommandStatus::Offline`] when no connection reaches the
    /// device or its connection has already gone away. Never fails.
    pub async fn execute(&self, device: DeviceTarget, executions: Vec<Execution>) -> CommandResult {
        let ids = vec![device.id.clone()];
        let Some(connection) = self.registry.connection_for(&device.id).await else {
            tracing::debug!(device_id = %device.id, "execute target offline");
            return CommandResult {
                ids,
                status: CommandStatus::Offline,
            };
        };

        let message = WireMessage::execute(device, executions);
        let request_id = message.request_id().to_string();
        match connection.send(message) {
            Ok(()) => {
                tracing::debug!(
                    connection_id = %connection.id(),
                    %request_id,
                    "execute forwarded"
                );
                CommandResult {
                    ids,
                    status: CommandStatus::Success,
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, %request_id, "execute not delivered");
                CommandResult {
                    ids,
                    status: CommandStatus::Offline,
                }
            }
        }
    }

    /// Runs [`Self::execute`] for every device of every command, in order.
    pub async fn execute_all(
        &self,
        commands: Vec<(Vec<DeviceTarget>, Vec<Execution>)>,
    ) -> Vec<CommandResult> {
        let mut results = Vec::new();
        for (devices, executions) in commands {
            for device in devices {
                results.push(self.execute(device, executions.clone()).await);
            }
        }
        results
    }
}
