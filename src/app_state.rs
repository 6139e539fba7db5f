//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::auth::{StaticTokenGate, UpgradeGate};
use crate::config::BridgeConfig;
use crate::domain::{ConnectionRegistry, EventBus, TracingObserver};
use crate::liveness::OpenConnections;
use crate::persistence::DeviceSetStore;
use crate::service::{DeviceService, FulfillmentService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Device connection lifecycle and frame handling.
    pub device_service: Arc<DeviceService>,
    /// SYNC / QUERY / EXECUTE answers for the cloud side.
    pub fulfillment: Arc<FulfillmentService>,
    /// Registry read by the diagnostics endpoints.
    pub registry: Arc<ConnectionRegistry>,
    /// Every open device socket, for the heartbeat.
    pub connections: Arc<OpenConnections>,
    /// Authorizes device upgrades and fulfillment calls.
    pub gate: Arc<dyn UpgradeGate>,
    /// Loaded configuration.
    pub config: Arc<BridgeConfig>,
}

impl AppState {
    /// Wires the registry, services and gate for `config` on top of
    /// `store`, publishing registry events on `events`.
    #[must_use]
    pub fn build(config: BridgeConfig, store: Arc<dyn DeviceSetStore>, events: EventBus) -> Self {
        let registry = Arc::new(ConnectionRegistry::new(events, Arc::new(TracingObserver)));
        let device_service = Arc::new(DeviceService::new(Arc::clone(&registry), store));
        let fulfillment = Arc::new(FulfillmentService::new(
            Arc::clone(&registry),
            config.agent_user_id.clone(),
        ));
        let gate = StaticTokenGate::new(config.access_tokens.clone(), config.required_scope.clone());
        if gate.is_open() {
            tracing::warn!("ACCESS_TOKENS is empty; device and fulfillment endpoints are open");
        }

        Self {
            device_service,
            fulfillment,
            registry,
            connections: Arc::new(OpenConnections::new()),
            gate: Arc::new(gate),
            config: Arc::new(config),
        }
    }
}
