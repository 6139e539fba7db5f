//! device-bridge server entry point.
//!
//! Loads configuration, restores the device catalogue, starts the liveness
//! timers and the catalogue sync worker, then serves HTTP and the device
//! WebSocket until Ctrl-C.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use device_bridge::api;
use device_bridge::app_state::AppState;
use device_bridge::config::BridgeConfig;
use device_bridge::domain::EventBus;
use device_bridge::liveness::{LivenessMonitor, LivenessSettings};
use device_bridge::persistence::{DeviceSetStore, MemoryDeviceSetStore, PostgresDeviceSetStore};
use device_bridge::service::{CatalogueSyncWorker, LoggingCatalogueSync};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = BridgeConfig::from_env().context("loading configuration")?;

    // Initialize tracing
    init_tracing(config.log_json);
    tracing::info!(addr = %config.listen_addr, path = %config.device_ws_path, "starting device-bridge");

    // Durable snapshot
    let store: Arc<dyn DeviceSetStore> = if config.persistence_enabled {
        Arc::new(
            PostgresDeviceSetStore::connect(&config)
                .await
                .context("connecting to PostgreSQL")?,
        )
    } else {
        tracing::warn!("persistence disabled; device catalogue will not survive restarts");
        Arc::new(MemoryDeviceSetStore::new())
    };

    // Build domain and service layers
    let events = EventBus::new(config.event_bus_capacity);
    let sync_worker = CatalogueSyncWorker::spawn(
        &events,
        Arc::new(LoggingCatalogueSync::new(config.local)),
        config.agent_user_id.clone(),
    );
    let liveness_settings = LivenessSettings::from_config(&config);
    let listen_addr = config.listen_addr;
    let state = AppState::build(config, store, events);

    let restored = state
        .device_service
        .restore()
        .await
        .context("restoring device sets")?;
    tracing::info!(restored, "device catalogue restored");

    let liveness = LivenessMonitor::spawn(
        Arc::clone(&state.connections),
        Arc::clone(&state.registry),
        liveness_settings,
    );

    let device_service = Arc::clone(&state.device_service);

    // Start server
    let app = api::build_app(state);
    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("binding {listen_addr}"))?;
    tracing::info!(addr = %listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving")?;

    liveness.shutdown().await;
    device_service.flush().await;
    sync_worker.abort();
    tracing::info!("device-bridge stopped");

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
