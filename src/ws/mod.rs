//! WebSocket layer: the device endpoint and its per-connection task.
//!
//! Devices connect to the configured path (`/device-manager` by default),
//! pass the upgrade gate, then exchange `register` / `execute` / `response`
//! frames over a single long-lived socket.

pub mod connection;
pub mod handler;
