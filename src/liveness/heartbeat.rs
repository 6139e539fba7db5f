//! Ping/pong heartbeat sweep.

use super::OpenConnections;

/// Outcome of one heartbeat sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeartbeatReport {
    /// Connections that answered the previous ping and were pinged again.
    pub pinged: usize,
    /// Connections that missed the previous pong and were terminated.
    pub terminated: usize,
}

/// Runs one heartbeat pass over every open connection.
///
/// A connection whose alive flag is still clear from the previous pass is
/// terminated; its close path then marks its device-set offline. Every
/// other connection has its flag cleared and receives a ping.
pub async fn sweep(connections: &OpenConnections) -> HeartbeatReport {
    let mut report = HeartbeatReport::default();
    for connection in connections.snapshot().await {
        if !connection.take_alive() {
            tracing::info!(connection_id = %connection.id(), "missed pong; terminating");
            connection.terminate();
            report.terminated += 1;
            continue;
        }
        if connection.ping().is_ok() {
            report.pinged += 1;
        }
    }
    if report.terminated > 0 {
        tracing::debug!(pinged = report.pinged, terminated = report.terminated, "heartbeat sweep");
    }
    report
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{ConnectionHandle, Outbound};

    #[tokio::test]
    async fn missed_pong_is_terminated_on_next_sweep() {
        let open = OpenConnections::new();
        let (conn, mut rx) = ConnectionHandle::new();
        open.attach(conn.clone()).await;

        let first = sweep(&open).await;
        assert_eq!(first, HeartbeatReport { pinged: 1, terminated: 0 });
        let Some(Outbound::Ping) = rx.recv().await else {
            panic!("expected a ping");
        };

        // no pong arrives
        let second = sweep(&open).await;
        assert_eq!(second, HeartbeatReport { pinged: 0, terminated: 1 });
        let Some(Outbound::Terminate) = rx.recv().await else {
            panic!("expected termination");
        };
    }

    #[tokio::test]
    async fn pong_keeps_connection_alive() {
        let open = OpenConnections::new();
        let (conn, _rx) = ConnectionHandle::new();
        open.attach(conn.clone()).await;

        for _ in 0..3 {
            let report = sweep(&open).await;
            assert_eq!(report.terminated, 0);
            conn.mark_alive();
        }
        assert!(conn.is_alive());
    }
}
