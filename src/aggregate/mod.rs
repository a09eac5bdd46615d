// src/aggregate/mod.rs
use crate::forward::{Forwarder, Operation};
use crate::registry::RegistrySnapshot;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Per-backend outcome of a fan-out call. The descriptor fields always
/// come from the registry snapshot, so a dead backend still appears in
/// the output, tagged as failed.
#[derive(Debug, Serialize)]
pub struct AggregateEntry {
    pub id: String,
    pub display_name: String,
    pub port: u16,
    pub metadata: Map<String, Value>,
    pub last_seen: DateTime<Utc>,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Cross-backend fan-out over one registry snapshot.
pub struct Aggregator {
    forwarder: Arc<Forwarder>,
}

impl Aggregator {
    pub fn new(forwarder: Arc<Forwarder>) -> Self {
        Self { forwarder }
    }

    /// Issue `op` against every live backend concurrently. One entry per
    /// descriptor, success or failure, sorted ascending by port.
    pub async fn aggregate(
        &self,
        snapshot: &RegistrySnapshot,
        op: &'static Operation,
        params: &[(String, String)],
    ) -> Vec<AggregateEntry> {
        let concurrency = snapshot.len().max(1);

        let mut entries: Vec<AggregateEntry> =
            futures::stream::iter(snapshot.by_port())
                .map(|backend| {
                    let forwarder = self.forwarder.clone();
                    async move {
                        let outcome =
                            forwarder.forward(&backend, op, params, None).await;
                        let (ok, result, error) = match outcome {
                            Ok(value) => (true, Some(value), None),
                            Err(err) => (false, None, Some(err.to_string())),
                        };
                        AggregateEntry {
                            id: backend.id.clone(),
                            display_name: backend.display_name.clone(),
                            port: backend.port,
                            metadata: backend.metadata.clone(),
                            last_seen: backend.last_seen,
                            ok,
                            result,
                            error,
                        }
                    }
                })
                .buffer_unordered(concurrency)
                .collect()
                .await;

        entries.sort_by_key(|entry| entry.port);
        entries
    }
}
