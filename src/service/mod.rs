//! Service layer: business logic orchestration.
//!
//! [`DeviceService`] drives device connections through the registry and
//! the durable store, [`FulfillmentService`] answers the cloud side, and
//! [`CatalogueSyncWorker`] turns registry events into request-sync calls.

pub mod catalogue_sync;
pub mod device_service;
pub mod fulfillment;

pub use catalogue_sync::{CatalogueSync, CatalogueSyncWorker, LoggingCatalogueSync};
pub use device_service::DeviceService;
pub use fulfillment::{
    CommandResult, CommandStatus, DeviceQueryState, FulfillmentService, SyncPayload,
};
