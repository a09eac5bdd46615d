// src/discovery/prober.rs
use crate::registry::BackendDescriptor;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

/// Status payload every backend serves at GET /status.
#[derive(Debug, Deserialize)]
struct StatusPayload {
    #[serde(default)]
    loaded: bool,
    #[serde(default)]
    filename: Option<String>,
    /// Everything else is carried as opaque metadata.
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Liveness probe against one candidate address.
///
/// Probes are read-only and never fail hard: any transport or protocol
/// problem means "no backend here" and nothing more.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, host: &str, port: u16) -> Option<BackendDescriptor>;
}

pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, host: &str, port: u16) -> Option<BackendDescriptor> {
        let url = format!("http://{}:{}/status", host, port);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(err) => {
                debug!(%url, %err, "probe failed");
                return None;
            }
        };

        if !response.status().is_success() {
            debug!(%url, status = %response.status(), "probe returned non-success");
            return None;
        }

        let status: StatusPayload = match response.json().await {
            Ok(status) => status,
            Err(err) => {
                debug!(%url, %err, "probe returned malformed status payload");
                return None;
            }
        };

        // A server with no artifact loaded is not a routable backend.
        if !status.loaded {
            debug!(%url, "server up but no artifact loaded");
            return None;
        }

        let display_name = status.filename.unwrap_or_else(|| "unknown".to_string());
        Some(BackendDescriptor::new(
            host,
            port,
            display_name,
            status.extra,
            Utc::now(),
        ))
    }
}
