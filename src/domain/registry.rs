//! Device connection registry.
//!
//! [`RegistryState`] holds the plain data: device-sets in insertion order
//! and the [`ConnectionIndex`] saying which connection serves which set. Its
//! methods are synchronous transforms with no logging or I/O.
//!
//! [`ConnectionRegistry`] is the shared, explicitly constructed instance the
//! rest of the server talks to. It guards the state with a single
//! [`tokio::sync::RwLock`] held for the whole of each call and never across
//! I/O, so every entry point is atomic with respect to every other. After
//! each mutation it notifies its [`RegistryObserver`] and publishes a
//! [`RegistryEvent`] on the [`EventBus`].

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use tokio::sync::RwLock;

use super::connection_index::{ConnectionIndex, Displaced};
use super::{
    ConnectionHandle, ConnectionId, DeviceDefinition, DeviceSet, DeviceSetId, EventBus,
    OfflineReason, RegistryEvent, RegistryObserver,
};

#[derive(Debug, Clone)]
struct SetRecord {
    device_definitions: Vec<DeviceDefinition>,
    last_registration_at: DateTime<Utc>,
}

/// Outcome of an upsert.
#[derive(Debug)]
pub struct Registration {
    /// `true` if the device-set did not exist before.
    pub created: bool,
    /// Bindings the new connection displaced.
    pub displaced: Displaced,
}

/// Plain registry data and its transforms.
#[derive(Debug, Default)]
pub struct RegistryState {
    sets: IndexMap<DeviceSetId, SetRecord>,
    index: ConnectionIndex,
}

impl RegistryState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or replaces a device-set and binds it to `connection`.
    ///
    /// Replacing keeps the set's original insertion position.
    pub fn upsert(
        &mut self,
        connection: ConnectionHandle,
        device_set_id: DeviceSetId,
        device_definitions: Vec<DeviceDefinition>,
        at: DateTime<Utc>,
    ) -> Registration {
        let record = SetRecord {
            device_definitions,
            last_registration_at: at,
        };
        let created = self.sets.insert(device_set_id.clone(), record).is_none();
        let displaced = self.index.bind(device_set_id, connection);
        Registration { created, displaced }
    }

    /// Clears the connection of whichever set `connection` serves.
    ///
    /// Returns the affected set, or `None` when the connection was unknown
    /// or already unbound.
    pub fn unbind(&mut self, connection: ConnectionId) -> Option<DeviceSetId> {
        self.index.unbind(connection)
    }

    /// Restores sets from durable storage without touching sets that are
    /// already present. Restored sets start offline.
    ///
    /// Returns the number of sets added.
    pub fn seed(&mut self, stored: impl IntoIterator<Item = DeviceSet>) -> usize {
        let mut added = 0;
        for set in stored {
            if self.sets.contains_key(&set.id) || set.device_definitions.is_empty() {
                continue;
            }
            self.sets.insert(
                set.id,
                SetRecord {
                    device_definitions: set.device_definitions,
                    last_registration_at: set.last_registration_at,
                },
            );
            added += 1;
        }
        added
    }

    /// Returns the connection of the first *online* device-set containing
    /// `device_id`, scanning sets in insertion order.
    ///
    /// When several sets list the same device id, offline sets are skipped:
    /// an earlier offline set never shadows a later online one. Linear in
    /// sets × devices per set.
    #[must_use]
    pub fn connection_for(&self, device_id: &str) -> Option<&ConnectionHandle> {
        self.sets
            .iter()
            .filter(|(_, record)| record.device_definitions.iter().any(|d| d.id == device_id))
            .find_map(|(id, _)| self.index.connection(id))
    }

    /// Returns `true` if some device-set containing `device_id` is online.
    #[must_use]
    pub fn is_online(&self, device_id: &str) -> bool {
        self.connection_for(device_id).is_some()
    }

    /// Returns every known device definition, flattened in device-set
    /// insertion order then per-set order.
    #[must_use]
    pub fn all_device_definitions(&self) -> Vec<DeviceDefinition> {
        self.sets
            .values()
            .flat_map(|record| record.device_definitions.iter().cloned())
            .collect()
    }

    /// Returns a snapshot of one device-set.
    #[must_use]
    pub fn device_set(&self, id: &DeviceSetId) -> Option<DeviceSet> {
        self.sets.get(id).map(|record| self.snapshot(id, record))
    }

    /// Returns snapshots of every device-set in insertion order.
    #[must_use]
    pub fn device_sets(&self) -> Vec<DeviceSet> {
        self.sets
            .iter()
            .map(|(id, record)| self.snapshot(id, record))
            .collect()
    }

    /// Returns the device-set served by `connection`.
    #[must_use]
    pub fn device_set_for_connection(&self, connection: ConnectionId) -> Option<&DeviceSetId> {
        self.index.device_set(connection)
    }

    /// Unbinds every online set whose last registration is older than
    /// `max_age` at `now`, returning each with the connection that served it.
    ///
    /// The age check and the unbind share one borrow; a set re-registered
    /// after this call is untouched.
    pub fn reap_stale(
        &mut self,
        now: DateTime<Utc>,
        max_age: Duration,
    ) -> Vec<(DeviceSetId, ConnectionHandle)> {
        let stale: Vec<(DeviceSetId, ConnectionHandle)> = self
            .index
            .iter()
            .filter(|(id, _)| {
                self.sets
                    .get(*id)
                    .is_some_and(|record| now - record.last_registration_at > max_age)
            })
            .map(|(id, conn)| (id.clone(), conn.clone()))
            .collect();
        for (_, conn) in &stale {
            self.index.unbind(conn.id());
        }
        stale
    }

    /// Number of known device-sets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Returns `true` if no device-set is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Number of device-sets with a live connection.
    #[must_use]
    pub fn online_count(&self) -> usize {
        self.index.len()
    }

    fn snapshot(&self, id: &DeviceSetId, record: &SetRecord) -> DeviceSet {
        DeviceSet {
            id: id.clone(),
            device_definitions: record.device_definitions.clone(),
            last_registration_at: record.last_registration_at,
            connection: self.index.connection(id).map(ConnectionHandle::id),
        }
    }
}

/// Shared registry of device-sets and the connections serving them.
#[derive(Debug)]
pub struct ConnectionRegistry {
    state: RwLock<RegistryState>,
    observer: Arc<dyn RegistryObserver>,
    events: EventBus,
}

impl ConnectionRegistry {
    /// Creates an empty registry reporting to `observer` and publishing on
    /// `events`.
    #[must_use]
    pub fn new(events: EventBus, observer: Arc<dyn RegistryObserver>) -> Self {
        Self {
            state: RwLock::new(RegistryState::new()),
            observer,
            events,
        }
    }

    /// Returns the bus registry events are published on.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Restores device-sets loaded from durable storage. Meant to be called
    /// once at startup, before connections are accepted.
    pub async fn seed(&self, stored: Vec<DeviceSet>) -> usize {
        let added = self.state.write().await.seed(stored);
        self.observer.seeded(added);
        added
    }

    /// Creates or refreshes a device-set and binds it to `connection`.
    ///
    /// Idempotent: registering the same payload again only refreshes the
    /// staleness timer. Any connection previously serving the set is
    /// unbound and returned in [`Registration::displaced`]; closing it is up
    /// to the caller.
    pub async fn register_device_set(
        &self,
        connection: &ConnectionHandle,
        device_set_id: DeviceSetId,
        device_definitions: Vec<DeviceDefinition>,
    ) -> Registration {
        let now = Utc::now();
        let device_ids: Vec<String> = device_definitions.iter().map(|d| d.id.clone()).collect();

        let registration = {
            let mut state = self.state.write().await;
            let registration =
                state.upsert(connection.clone(), device_set_id.clone(), device_definitions, now);

            self.observer
                .registered(&device_set_id, connection.id(), &device_ids, registration.created);
            if let Some(old) = &registration.displaced.previous_connection {
                self.observer
                    .connection_replaced(&device_set_id, old.id(), connection.id());
            }
            if let Some(old_set) = &registration.displaced.previous_set {
                self.observer
                    .offline(old_set, connection.id(), OfflineReason::Superseded);
            }
            registration
        };

        if let Some(old_set) = &registration.displaced.previous_set {
            let _ = self.events.publish(RegistryEvent::DeviceSetOffline {
                device_set_id: old_set.clone(),
                connection_id: connection.id(),
                reason: OfflineReason::Superseded,
                timestamp: now,
            });
        }
        let _ = self.events.publish(RegistryEvent::DeviceSetRegistered {
            device_set_id,
            connection_id: connection.id(),
            device_ids,
            created: registration.created,
            timestamp: now,
        });

        registration
    }

    /// Marks the device-set served by `connection` offline because its
    /// transport closed.
    ///
    /// No-op for an unknown or already unbound connection; never touches
    /// other device-sets.
    pub async fn mark_offline(&self, connection: ConnectionId) -> Option<DeviceSetId> {
        let reason = OfflineReason::ConnectionClosed;
        let unbound = {
            let mut state = self.state.write().await;
            let unbound = state.unbind(connection);
            match &unbound {
                Some(set) => self.observer.offline(set, connection, reason),
                None => self.observer.unknown_connection(connection),
            }
            unbound
        };

        if let Some(set) = &unbound {
            let _ = self.events.publish(RegistryEvent::DeviceSetOffline {
                device_set_id: set.clone(),
                connection_id: connection,
                reason,
                timestamp: Utc::now(),
            });
        }
        unbound
    }

    /// Returns the connection of the first online set listing `device_id`.
    ///
    /// See [`RegistryState::connection_for`] for the duplicate-id policy.
    pub async fn connection_for(&self, device_id: &str) -> Option<ConnectionHandle> {
        self.state.read().await.connection_for(device_id).cloned()
    }

    /// Returns `true` if `device_id` is currently reachable.
    pub async fn is_online(&self, device_id: &str) -> bool {
        self.state.read().await.is_online(device_id)
    }

    /// Returns the flattened device catalogue.
    pub async fn all_device_definitions(&self) -> Vec<DeviceDefinition> {
        self.state.read().await.all_device_definitions()
    }

    /// Returns a snapshot of one device-set.
    pub async fn device_set(&self, id: &DeviceSetId) -> Option<DeviceSet> {
        self.state.read().await.device_set(id)
    }

    /// Returns snapshots of every device-set.
    pub async fn device_sets(&self) -> Vec<DeviceSet> {
        self.state.read().await.device_sets()
    }

    /// Returns the device-set served by `connection`.
    pub async fn device_set_for_connection(&self, connection: ConnectionId) -> Option<DeviceSetId> {
        self.state
            .read()
            .await
            .device_set_for_connection(connection)
            .cloned()
    }

    /// Takes every set that missed its re-registration deadline offline
    /// with [`OfflineReason::Stale`], under a single write lock.
    ///
    /// The returned connections are already unbound; terminating them is up
    /// to the caller.
    pub async fn reap_stale(
        &self,
        now: DateTime<Utc>,
        max_age: Duration,
    ) -> Vec<(DeviceSetId, ConnectionHandle)> {
        let reaped = {
            let mut state = self.state.write().await;
            let reaped = state.reap_stale(now, max_age);
            for (device_set_id, connection) in &reaped {
                self.observer
                    .offline(device_set_id, connection.id(), OfflineReason::Stale);
            }
            reaped
        };

        let timestamp = Utc::now();
        for (device_set_id, connection) in &reaped {
            let _ = self.events.publish(RegistryEvent::DeviceSetOffline {
                device_set_id: device_set_id.clone(),
                connection_id: connection.id(),
                reason: OfflineReason::Stale,
                timestamp,
            });
        }
        reaped
    }

    /// Returns `(known sets, online sets)`.
    pub async fn counts(&self) -> (usize, usize) {
        let state = self.state.read().await;
        (state.len(), state.online_count())
    }
}
