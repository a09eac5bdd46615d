// src/main.rs
use analysis_gateway::{
    config::{self, Config},
    discovery::{DiscoveryLoop, HttpProber},
    forward::Forwarder,
    gateway::Gateway,
    metrics::MetricsRegistry,
    registry::Registry,
    server::{RequestHandler, ServerBuilder},
};
use anyhow::Result;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("analysis_gateway=debug".parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .init();

    // Load configuration; with no config file given, defaults apply.
    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            config::load_config(&path).await?
        }
        None => {
            let config = Config::default();
            config.validate()?;
            config
        }
    };

    // Initialize metrics
    let metrics = if config.metrics.enabled {
        Some(Arc::new(MetricsRegistry::new()?))
    } else {
        None
    };

    // Registry plus its single writer, the discovery loop
    let registry = Arc::new(Registry::new());
    let prober = Arc::new(HttpProber::new(config.discovery.probe_timeout()));
    let discovery = Arc::new(DiscoveryLoop::new(
        config.discovery.clone(),
        registry.clone(),
        prober,
        metrics.as_ref().map(|m| m.collector()),
    ));

    // Eager first cycle so the gateway starts with a populated registry;
    // serving begins regardless of the outcome.
    let snapshot = discovery.run_cycle().await;
    if snapshot.is_empty() {
        info!("No backends found yet; discovery continues in the background");
    } else {
        for backend in snapshot.by_port() {
            info!(
                "Found backend '{}' at {} (ID: {})",
                backend.display_name,
                backend.base_url(),
                backend.id
            );
        }
    }
    tokio::spawn(discovery.clone().start());

    // Forwarding and the client-facing surface
    let forwarder = Arc::new(Forwarder::new(config.forward.clone()));
    let gateway = Arc::new(Gateway::new(
        registry,
        forwarder,
        metrics,
        config.metrics.clone(),
    ));
    let handler = RequestHandler::new(gateway);

    let addr = config.server.listen_addr;
    info!("Starting analysis gateway on {}", addr);

    ServerBuilder::new(addr)
        .with_handler(handler)
        .serve(shutdown_signal())
        .await?;

    discovery.shutdown();
    Ok(())
}

// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
