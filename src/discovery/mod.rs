// src/discovery/mod.rs
mod prober;

pub use prober::{HttpProber, Prober};

use crate::config::DiscoveryConfig;
use crate::metrics::MetricsCollector;
use crate::registry::{BackendDescriptor, Registry, RegistrySnapshot};
use chrono::Utc;
use futures::StreamExt;
use std::sync::Arc;
use tokio::time::interval;
use tracing::info;

/// Background task that keeps the registry converged with reality.
///
/// Sole writer of the registry. Probes the whole candidate port range
/// every cycle with bounded concurrency and publishes the reconciled
/// snapshot in one atomic swap, so request-serving paths never wait on
/// discovery.
pub struct DiscoveryLoop {
    config: DiscoveryConfig,
    registry: Arc<Registry>,
    prober: Arc<dyn Prober>,
    metrics: Option<Arc<MetricsCollector>>,
    shutdown_tx: tokio::sync::watch::Sender<bool>,
    shutdown_rx: tokio::sync::watch::Receiver<bool>,
}

impl DiscoveryLoop {
    pub fn new(
        config: DiscoveryConfig,
        registry: Arc<Registry>,
        prober: Arc<dyn Prober>,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

        Self {
            config,
            registry,
            prober,
            metrics,
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub async fn start(self: Arc<Self>) {
        let mut interval = interval(self.config.interval());
        let mut shutdown_rx = self.shutdown_rx.clone();

        info!(
            "Starting discovery loop with interval: {:?}",
            self.config.interval()
        );

        // The caller runs an eager cycle at startup; consume the immediate
        // first tick so the next cycle lands one full interval later.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.run_cycle().await;
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Discovery loop shutting down");
                        break;
                    }
                }
            }
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// One discovery cycle: probe every candidate port concurrently,
    /// then reconcile the results into a new registry snapshot.
    pub async fn run_cycle(&self) -> Arc<RegistrySnapshot> {
        let host = self.config.host.clone();

        let alive: Vec<BackendDescriptor> =
            futures::stream::iter(self.config.candidate_ports())
                .map(|port| {
                    let prober = self.prober.clone();
                    let host = host.clone();
                    async move { prober.probe(&host, port).await }
                })
                .buffer_unordered(self.config.max_servers as usize)
                .filter_map(|result| async move { result })
                .collect()
                .await;

        let found = alive.len();
        let snapshot =
            self.registry
                .reconcile(alive, Utc::now(), self.config.grace_period());

        if let Some(metrics) = &self.metrics {
            metrics.record_discovery_cycle(snapshot.len(), snapshot.version());
        }

        info!(
            "Discovery cycle complete: {} responding, {} live (registry v{})",
            found,
            snapshot.len(),
            snapshot.version()
        );

        snapshot
    }
}
