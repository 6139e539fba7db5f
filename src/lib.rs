//! # device-bridge
//!
//! WebSocket bridge between a smart-home fulfillment layer and devices that
//! hold long-lived connections to this server.
//!
//! Devices connect, pass the upgrade gate, and register a named device-set
//! with its device definitions. The cloud side then asks which devices exist
//! (SYNC), whether they are reachable (QUERY), and sends them commands
//! (EXECUTE). The bridge tracks which live connection serves which device
//! and keeps that mapping honest under reconnects, dead sockets and devices
//! that stop re-registering.
//!
//! ## Architecture
//!
//! ```text
//! Devices (WebSocket)            Cloud (HTTP)
//!     │                              │
//!     ├── WS Handler (ws/)           ├── REST Handlers (api/)
//!     ├── Upgrade Gate (auth/)  ─────┤
//!     │                              │
//!     ├── DeviceService              ├── FulfillmentService (service/)
//!     ├── Codec (protocol/)          │
//!     │                              │
//!     ├── ConnectionRegistry + EventBus (domain/)
//!     ├── Liveness Monitor (liveness/)
//!     ├── Catalogue sync worker (service/)
//!     │
//!     └── PostgreSQL snapshot (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod liveness;
pub mod persistence;
pub mod protocol;
pub mod service;
pub mod ws;
