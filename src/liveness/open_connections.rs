//! Set of every accepted WebSocket, registered or not.

use indexmap::IndexMap;
use tokio::sync::RwLock;

use crate::domain::{ConnectionHandle, ConnectionId};

/// Every open device connection, keyed by id.
///
/// The heartbeat sweeps this set rather than the registry so that sockets
/// which never sent a `register` frame are still pinged and reaped.
#[derive(Debug, Default)]
pub struct OpenConnections {
    connections: RwLock<IndexMap<ConnectionId, ConnectionHandle>>,
}

impl OpenConnections {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `connection` to the set.
    pub async fn attach(&self, connection: ConnectionHandle) {
        self.connections
            .write()
            .await
            .insert(connection.id(), connection);
    }

    /// Removes the connection with `id`. Returns `false` if it was not
    /// present.
    pub async fn detach(&self, id: ConnectionId) -> bool {
        self.connections.write().await.shift_remove(&id).is_some()
    }

    /// Returns a snapshot of the open connections, oldest first.
    pub async fn snapshot(&self) -> Vec<ConnectionHandle> {
        self.connections.read().await.values().cloned().collect()
    }

    /// Number of open connections.
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Returns `true` if no connection is open.
    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn attach_and_detach() {
        let open = OpenConnections::new();
        let (c1, _rx1) = ConnectionHandle::new();
        let (c2, _rx2) = ConnectionHandle::new();

        open.attach(c1.clone()).await;
        open.attach(c2.clone()).await;
        assert_eq!(open.len().await, 2);

        assert!(open.detach(c1.id()).await);
        assert!(!open.detach(c1.id()).await);

        let ids: Vec<ConnectionId> = open.snapshot().await.iter().map(ConnectionHandle::id).collect();
        assert_eq!(ids, vec![c2.id()]);
    }
}
