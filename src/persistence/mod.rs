//! Persistence layer: durable snapshot of the device catalogue.
//!
//! The registry is the source of truth for the running process. Storage is a
//! write-behind cache of each device-set's latest definitions, read once at
//! startup so the catalogue survives restarts. [`DeviceSetStore`] is the
//! seam; [`postgres::PostgresDeviceSetStore`] is the production backend and
//! [`memory::MemoryDeviceSetStore`] serves tests and persistence-off runs.

pub mod memory;
pub mod models;
pub mod postgres;

use std::fmt::Debug;

use async_trait::async_trait;

pub use memory::MemoryDeviceSetStore;
pub use models::StoredDeviceSet;
pub use postgres::PostgresDeviceSetStore;

use crate::domain::{DeviceDefinition, DeviceSetId};
use crate::error::BridgeError;

/// Durable upsert/find-all store for device-sets.
#[async_trait]
pub trait DeviceSetStore: Debug + Send + Sync {
    /// Loads every stored device-set.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::PersistenceError`] on backend failure.
    async fn find_all(&self) -> Result<Vec<StoredDeviceSet>, BridgeError>;

    /// Creates or replaces the stored definitions of one device-set.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::PersistenceError`] on backend failure.
    async fn upsert(
        &self,
        device_set_id: &DeviceSetId,
        device_definitions: &[DeviceDefinition],
    ) -> Result<(), BridgeError>;
}
