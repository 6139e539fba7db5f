//! Liveness monitor: heartbeat and staleness timers.
//!
//! Two singleton tasks run for the life of the server. The heartbeat pings
//! every open connection and terminates the ones that missed the previous
//! pong. The reaper drops device-sets that stopped re-registering. Both only
//! act through [`crate::domain::ConnectionHandle`] and the
//! [`ConnectionRegistry`], never on sockets directly.

pub mod heartbeat;
pub mod open_connections;
pub mod reaper;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

pub use heartbeat::HeartbeatReport;
pub use open_connections::OpenConnections;

use crate::config::BridgeConfig;
use crate::domain::ConnectionRegistry;

/// Timer settings for the [`LivenessMonitor`].
#[derive(Debug, Clone, Copy)]
pub struct LivenessSettings {
    /// Period of the heartbeat sweep.
    pub heartbeat_interval: Duration,
    /// Period of the staleness sweep.
    pub reaper_interval: Duration,
    /// Registration age past which a set is reaped.
    pub stale_after: chrono::Duration,
}

impl LivenessSettings {
    /// Reads the timer settings from the bridge configuration.
    #[must_use]
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            heartbeat_interval: config.heartbeat_interval(),
            reaper_interval: config.reaper_interval(),
            stale_after: config.stale_after(),
        }
    }
}

/// Handle to the running heartbeat and reaper tasks.
#[derive(Debug)]
pub struct LivenessMonitor {
    shutdown: watch::Sender<bool>,
    heartbeat: JoinHandle<()>,
    reaper: JoinHandle<()>,
}

impl LivenessMonitor {
    /// Spawns both timers. The first sweep of each runs one period after
    /// startup.
    #[must_use]
    pub fn spawn(
        connections: Arc<OpenConnections>,
        registry: Arc<ConnectionRegistry>,
        settings: LivenessSettings,
    ) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);

        let heartbeat = tokio::spawn(run_heartbeat(
            connections,
            settings.heartbeat_interval,
            shutdown_rx.clone(),
        ));
        let reaper = tokio::spawn(run_reaper(
            registry,
            settings.reaper_interval,
            settings.stale_after,
            shutdown_rx,
        ));

        tracing::info!(
            heartbeat_secs = settings.heartbeat_interval.as_secs(),
            reaper_secs = settings.reaper_interval.as_secs(),
            stale_after_secs = settings.stale_after.num_seconds(),
            "liveness monitor started"
        );

        Self {
            shutdown,
            heartbeat,
            reaper,
        }
    }

    /// Stops both timers and waits for them to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.heartbeat.await {
            tracing::warn!(error = %e, "heartbeat task join error");
        }
        if let Err(e) = self.reaper.await {
            tracing::warn!(error = %e, "reaper task join error");
        }
    }
}

fn ticker(period: Duration) -> tokio::time::Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn run_heartbeat(
    connections: Arc<OpenConnections>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = ticker(period);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let _ = heartbeat::sweep(&connections).await;
            }
            _ = shutdown.changed() => break,
        }
    }
    tracing::debug!("heartbeat stopped");
}

async fn run_reaper(
    registry: Arc<ConnectionRegistry>,
    period: Duration,
    stale_after: chrono::Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = ticker(period);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let reaped = reaper::sweep(&registry, Utc::now(), stale_after).await;
                if !reaped.is_empty() {
                    tracing::info!(count = reaped.len(), "reaped stale device sets");
                }
            }
            _ = shutdown.changed() => break,
        }
    }
    tracing::debug!("reaper stopped");
}
