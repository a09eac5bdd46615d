// src/registry/descriptor.rs
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Stable identifier for the backend bound to `port`.
pub fn backend_id(port: u16) -> String {
    format!("port_{}", port)
}

/// One live backend instance as last observed by the prober.
#[derive(Debug, Clone, Serialize)]
pub struct BackendDescriptor {
    pub id: String,
    pub host: String,
    pub port: u16,
    /// Filename of the loaded artifact, used for fuzzy selection.
    pub display_name: String,
    /// Opaque key/value pairs from the backend's status payload.
    pub metadata: Map<String, Value>,
    pub last_seen: DateTime<Utc>,
}

impl BackendDescriptor {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        display_name: impl Into<String>,
        metadata: Map<String, Value>,
        last_seen: DateTime<Utc>,
    ) -> Self {
        Self {
            id: backend_id(port),
            host: host.into(),
            port,
            display_name: display_name.into(),
            metadata,
            last_seen,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}
