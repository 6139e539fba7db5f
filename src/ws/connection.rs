//! WebSocket connection task.
//!
//! Owns the socket for one device. Inbound frames go to the
//! [`DeviceService`]; everything addressed to the device arrives on the
//! handle's outbound queue and is written here, so the socket never leaves
//! this task.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};

use crate::domain::{ConnectionHandle, Outbound};
use crate::liveness::OpenConnections;
use crate::protocol;
use crate::service::DeviceService;

/// Runs the read/write loop for a single device connection.
///
/// - Reads frames from the device and hands them to the service.
/// - Drains the outbound queue: wire messages, heartbeat pings, terminate.
///
/// On exit the connection leaves the heartbeat set and its device-set, if
/// any, goes offline.
pub async fn run_connection(
    socket: WebSocket,
    device_service: Arc<DeviceService>,
    connections: Arc<OpenConnections>,
) {
    let (handle, mut outbound_rx) = ConnectionHandle::new();
    let connection_id = handle.id();
    connections.attach(handle.clone()).await;
    tracing::debug!(%connection_id, "device connected");

    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            // Incoming frame from the device
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        device_service.handle_frame(&handle, text.as_str()).await;
                    }
                    Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                        Ok(text) => device_service.handle_frame(&handle, text).await,
                        Err(_) => tracing::warn!(%connection_id, "dropping non-UTF-8 binary frame"),
                    },
                    Some(Ok(Message::Pong(_))) => handle.mark_alive(),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(%connection_id, error = %e, "device socket error");
                        break;
                    }
                    // pings are answered by the transport
                    Some(Ok(Message::Ping(_))) => {}
                }
            }
            // Outbound instruction from the registry, fulfillment or liveness
            outbound = outbound_rx.recv() => {
                match outbound {
                    Some(Outbound::Message(message)) => match protocol::encode(&message) {
                        Ok(json) => {
                            if ws_tx.send(Message::text(json)).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => tracing::warn!(%connection_id, error = %e, "dropping unencodable frame"),
                    },
                    Some(Outbound::Ping) => {
                        if ws_tx.send(Message::Ping(Bytes::new())).await.is_err() {
                            break;
                        }
                    }
                    Some(Outbound::Terminate) | None => break,
                }
            }
        }
    }

    connections.detach(connection_id).await;
    let device_set = device_service.connection_closed(connection_id).await;
    tracing::debug!(%connection_id, device_set = ?device_set, "device connection closed");
}
