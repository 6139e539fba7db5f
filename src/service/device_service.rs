//! Device service: handles inbound frames and connection lifecycle.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::domain::{
    ConnectionHandle, ConnectionId, ConnectionRegistry, DeviceDefinition, DeviceSetId,
};
use crate::error::BridgeError;
use crate::persistence::DeviceSetStore;
use crate::protocol::{self, MessageKind, RegisterMessage, ResponseMessage, WireMessage};

/// Orchestration layer for everything a device connection does.
///
/// Coordinator over the [`ConnectionRegistry`] and the [`DeviceSetStore`].
/// Registration follows the pattern: upsert in memory → close the displaced
/// connection → reply → queue the durable write.
///
/// Durable writes go through a single persistence worker, so they reach the
/// store in the order the registrations were applied.
#[derive(Debug, Clone)]
pub struct DeviceService {
    registry: Arc<ConnectionRegistry>,
    store: Arc<dyn DeviceSetStore>,
    writes: mpsc::UnboundedSender<PersistCommand>,
}

#[derive(Debug)]
enum PersistCommand {
    Upsert {
        device_set_id: DeviceSetId,
        device_definitions: Vec<DeviceDefinition>,
    },
    Flush(oneshot::Sender<()>),
}

impl DeviceService {
    /// Creates a new `DeviceService` and spawns its persistence worker.
    ///
    /// Must be called from within a Tokio runtime. The worker stops once
    /// every clone of the service is dropped.
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>, store: Arc<dyn DeviceSetStore>) -> Self {
        let (writes, queue) = mpsc::unbounded_channel();
        tokio::spawn(run_persistence(Arc::clone(&store), queue));
        Self {
            registry,
            store,
            writes,
        }
    }

    /// Returns a reference to the inner [`ConnectionRegistry`].
    #[must_use]
    pub const fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Seeds the registry from the durable snapshot.
    ///
    /// Rows that no longer decode are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::PersistenceError`] if the store cannot be read.
    pub async fn restore(&self) -> Result<usize, BridgeError> {
        let rows = self.store.find_all().await?;
        let mut sets = Vec::with_capacity(rows.len());
        for row in rows {
            match row.into_device_set() {
                Ok(set) => sets.push(set),
                Err(e) => tracing::warn!(error = %e, "skipping stored device set"),
            }
        }
        Ok(self.registry.seed(sets).await)
    }

    /// Handles one text frame received on `connection`.
    ///
    /// Frames that fail to decode are logged and dropped; the connection is
    /// left open.
    pub async fn handle_frame(&self, connection: &ConnectionHandle, text: &str) {
        let message = match protocol::decode(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(connection_id = %connection.id(), error = %e, "dropping device frame");
                return;
            }
        };

        match message {
            WireMessage::Register(register) => self.register(connection, register).await,
            WireMessage::Response(response) => {
                let device_set = self.registry.device_set_for_connection(connection.id()).await;
                log_response(connection.id(), device_set.as_ref(), &response);
            }
            execute @ WireMessage::Execute(_) => {
                tracing::warn!(
                    connection_id = %connection.id(),
                    request_id = %execute.request_id(),
                    "devices may not send execute frames; ignored"
                );
                let diagnostics = serde_json::json!({"error": "execute is server-to-device only"});
                let reply = WireMessage::response_to(&execute, false, Some(diagnostics));
                if let Err(e) = connection.send(reply) {
                    tracing::debug!(error = %e, "execute rejection not delivered");
                }
            }
        }
    }

    /// Registers the device-set announced by `register` on `connection`,
    /// replies to the device, and queues the catalogue for persistence.
    ///
    /// Use [`Self::flush`] to wait for the write.
    pub async fn register(&self, connection: &ConnectionHandle, register: RegisterMessage) {
        let RegisterMessage {
            request_id,
            device_set_id,
            device_definitions,
        } = register;
        let reply = WireMessage::Response(ResponseMessage {
            request_id,
            request_message_type: MessageKind::Register,
            success: true,
            diagnostics: None,
        });

        let registration = self
            .registry
            .register_device_set(connection, device_set_id.clone(), device_definitions.clone())
            .await;

        if let Some(old) = registration.displaced.previous_connection {
            old.terminate();
        }

        if let Err(e) = connection.send(reply) {
            tracing::debug!(error = %e, "register reply not delivered");
        }

        let write = PersistCommand::Upsert {
            device_set_id,
            device_definitions,
        };
        if self.writes.send(write).is_err() {
            tracing::warn!("persistence worker gone; device set not persisted");
        }
    }

    /// Waits until every write queued before this call has reached the
    /// store (or failed and been logged).
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.writes.send(PersistCommand::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }

    /// Handles the close of `connection`, whatever caused it.
    pub async fn connection_closed(&self, connection: ConnectionId) -> Option<DeviceSetId> {
        self.registry.mark_offline(connection).await
    }
}

async fn run_persistence(
    store: Arc<dyn DeviceSetStore>,
    mut queue: mpsc::UnboundedReceiver<PersistCommand>,
) {
    while let Some(command) = queue.recv().await {
        match command {
            PersistCommand::Upsert {
                device_set_id,
                device_definitions,
            } => {
                if let Err(e) = store.upsert(&device_set_id, &device_definitions).await {
                    tracing::warn!(%device_set_id, error = %e, "device set not persisted");
                }
            }
            PersistCommand::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    tracing::debug!("persistence worker stopped");
}

fn log_response(
    connection: ConnectionId,
    device_set: Option<&DeviceSetId>,
    response: &ResponseMessage,
) {
    if response.success {
        tracing::debug!(
            connection_id = %connection,
            device_set = ?device_set,
            request_id = %response.request_id,
            request_type = %response.request_message_type,
            "device acknowledged request"
        );
    } else {
        tracing::warn!(
            connection_id = %connection,
            device_set = ?device_set,
            request_id = %response.request_id,
            request_type = %response.request_message_type,
            diagnostics = ?response.diagnostics,
            "device reported failure"
        );
    }
}
