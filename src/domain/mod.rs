//! Domain layer: device-sets, connections, the registry, and its events.
//!
//! This module contains the server-side model of which devices exist and
//! which live connection reaches them: device-set records, connection
//! handles, the bidirectional connection index, the registry that owns
//! them, and the event bus that broadcasts registry changes.

pub mod connection;
pub mod connection_index;
pub mod device_set;
pub mod event_bus;
pub mod observer;
pub mod registry;
pub mod registry_event;

pub use connection::{ConnectionClosed, ConnectionHandle, ConnectionId, Outbound};
pub use connection_index::ConnectionIndex;
pub use device_set::{DeviceDefinition, DeviceSet, DeviceSetId};
pub use event_bus::EventBus;
pub use observer::{NoopObserver, RegistryObserver, TracingObserver};
pub use registry::{ConnectionRegistry, Registration, RegistryState};
pub use registry_event::{OfflineReason, RegistryEvent};
