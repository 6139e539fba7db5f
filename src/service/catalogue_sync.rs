//! Catalogue sync: asks the cloud side to re-fetch the device list after
//! registry changes it cares about.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::domain::{EventBus, RegistryEvent};
use crate::error::BridgeError;

/// Outbound "request sync" call to the smart-home cloud.
#[async_trait]
pub trait CatalogueSync: Debug + Send + Sync {
    /// Asks the cloud to issue a fresh SYNC for `agent_user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Internal`] if the call could not be made.
    async fn request_sync(&self, agent_user_id: &str) -> Result<(), BridgeError>;
}

/// [`CatalogueSync`] that only records the call in the log.
///
/// In local mode the call is skipped outright.
#[derive(Debug, Clone, Copy)]
pub struct LoggingCatalogueSync {
    local: bool,
}

impl LoggingCatalogueSync {
    /// Creates a new `LoggingCatalogueSync`.
    #[must_use]
    pub const fn new(local: bool) -> Self {
        Self { local }
    }
}

#[async_trait]
impl CatalogueSync for LoggingCatalogueSync {
    async fn request_sync(&self, agent_user_id: &str) -> Result<(), BridgeError> {
        if self.local {
            tracing::info!(agent_user_id, "request sync skipped (local mode)");
        } else {
            tracing::info!(agent_user_id, "request sync");
        }
        Ok(())
    }
}

/// Background task turning [`RegistryEvent`]s into request-sync calls.
#[derive(Debug)]
pub struct CatalogueSyncWorker;

impl CatalogueSyncWorker {
    /// Subscribes to `events` and spawns the worker.
    ///
    /// The task ends when the bus closes.
    #[must_use]
    pub fn spawn(
        events: &EventBus,
        sync: Arc<dyn CatalogueSync>,
        agent_user_id: impl Into<String>,
    ) -> JoinHandle<()> {
        let rx = events.subscribe();
        let agent_user_id = agent_user_id.into();
        tokio::spawn(run(rx, sync, agent_user_id))
    }
}

async fn run(
    mut rx: broadcast::Receiver<RegistryEvent>,
    sync: Arc<dyn CatalogueSync>,
    agent_user_id: String,
) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                if !event.requires_sync() {
                    continue;
                }
                tracing::debug!(
                    device_set_id = %event.device_set_id(),
                    event_type = event.event_type_str(),
                    "catalogue changed"
                );
                if let Err(e) = sync.request_sync(&agent_user_id).await {
                    tracing::warn!(error = %e, "request sync failed");
                }
            }
            // Missed events may have changed the catalogue; sync once to be safe.
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(lagged = n, "catalogue sync lagged behind event bus");
                if let Err(e) = sync.request_sync(&agent_user_id).await {
                    tracing::warn!(error = %e, "request sync failed");
                }
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    tracing::debug!("catalogue sync worker stopped");
}
