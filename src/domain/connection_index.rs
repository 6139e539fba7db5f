//! Bidirectional connection ↔ device-set index.
//!
//! Both directions live behind one type so they can never drift apart:
//! every binding present in one map is present in the other.

use std::collections::HashMap;

use super::{ConnectionHandle, ConnectionId, DeviceSetId};

/// One-to-one map between live connections and the device-sets they serve.
#[derive(Debug, Default)]
pub struct ConnectionIndex {
    by_set: HashMap<DeviceSetId, ConnectionHandle>,
    by_connection: HashMap<ConnectionId, DeviceSetId>,
}

/// Bindings displaced by [`ConnectionIndex::bind`].
#[derive(Debug, Default)]
pub struct Displaced {
    /// Connection that previously served the device-set, if it differs from
    /// the new one.
    pub previous_connection: Option<ConnectionHandle>,
    /// Device-set the new connection previously served, if it differs from
    /// the new one.
    pub previous_set: Option<DeviceSetId>,
}

impl ConnectionIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `set` to `connection`, dropping whatever either side was bound
    /// to before.
    pub fn bind(&mut self, set: DeviceSetId, connection: ConnectionHandle) -> Displaced {
        let mut displaced = Displaced::default();

        if let Some(old_set) = self.by_connection.remove(&connection.id())
            && old_set != set
        {
            self.by_set.remove(&old_set);
            displaced.previous_set = Some(old_set);
        }

        if let Some(old_conn) = self.by_set.remove(&set)
            && old_conn.id() != connection.id()
        {
            self.by_connection.remove(&old_conn.id());
            displaced.previous_connection = Some(old_conn);
        }

        self.by_connection.insert(connection.id(), set.clone());
        self.by_set.insert(set, connection);
        displaced
    }

    /// Removes the binding for `connection`, returning the device-set it
    /// served. `None` if the connection was unknown or already unbound.
    pub fn unbind(&mut self, connection: ConnectionId) -> Option<DeviceSetId> {
        let set = self.by_connection.remove(&connection)?;
        self.by_set.remove(&set);
        Some(set)
    }

    /// Returns the connection serving `set`.
    #[must_use]
    pub fn connection(&self, set: &DeviceSetId) -> Option<&ConnectionHandle> {
        self.by_set.get(set)
    }

    /// Returns the device-set served by `connection`.
    #[must_use]
    pub fn device_set(&self, connection: ConnectionId) -> Option<&DeviceSetId> {
        self.by_connection.get(&connection)
    }

    /// Iterates over every bound `(set, connection)` pair.
    pub fn iter(&self) -> impl Iterator<Item = (&DeviceSetId, &ConnectionHandle)> {
        self.by_set.iter()
    }

    /// Number of live bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_set.len()
    }

    /// Returns `true` when nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_set.is_empty()
    }
}
