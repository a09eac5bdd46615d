// src/forward/mod.rs
mod operations;
mod retry;

pub use operations::{lookup_operation, Operation, OPERATIONS};
pub use retry::{RetryDecision, RetryStrategy};

use crate::config::ForwardConfig;
use crate::error::GatewayError;
use crate::registry::BackendDescriptor;
use hyper::Method;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Structured error body backends return on application-level failures.
#[derive(Debug, Deserialize)]
struct UpstreamBody {
    kind: String,
    message: String,
}

/// Relays one operation to one resolved backend.
///
/// Retries are bounded and apply only to connection-establishment
/// failures; timeouts and application-level errors propagate on the
/// first attempt. Connections are not pooled across backends beyond
/// what the shared client does internally; each call is independent.
pub struct Forwarder {
    client: Client,
    retry: RetryStrategy,
}

impl Forwarder {
    pub fn new(config: ForwardConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            retry: RetryStrategy::new(config),
        }
    }

    pub async fn forward(
        &self,
        backend: &BackendDescriptor,
        op: &Operation,
        params: &[(String, String)],
        body: Option<String>,
    ) -> Result<Value, GatewayError> {
        self.retry
            .execute_with_decision(
                || self.send_once(backend, op, params, body.clone()),
                |error| match error {
                    GatewayError::BackendUnreachable { .. } => RetryDecision::Retry,
                    _ => RetryDecision::NoRetry,
                },
            )
            .await
    }

    async fn send_once(
        &self,
        backend: &BackendDescriptor,
        op: &Operation,
        params: &[(String, String)],
        body: Option<String>,
    ) -> Result<Value, GatewayError> {
        let url = format!("{}/{}", backend.base_url(), op.path);
        debug!(backend = %backend.id, operation = op.name, %url, "forwarding");

        let request = if op.method == Method::POST {
            let mut request = self.client.post(&url).query(params);
            if let Some(body) = body {
                request = request.body(body);
            }
            request
        } else {
            self.client.get(&url).query(params)
        };

        let response = request
            .send()
            .await
            .map_err(|err| classify_transport_error(err, backend))?;

        let status = response.status();
        let text = response.text().await.map_err(|_| GatewayError::Upstream {
            kind: "transport".to_string(),
            message: "failed to read backend response body".to_string(),
        })?;

        if status.is_success() {
            Ok(parse_success_body(&text))
        } else {
            Err(upstream_from_parts(status.as_u16(), &text))
        }
    }
}

fn classify_transport_error(
    err: reqwest::Error,
    backend: &BackendDescriptor,
) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout
    } else if err.is_connect() {
        GatewayError::BackendUnreachable {
            id: backend.id.clone(),
            last_seen: backend.last_seen,
        }
    } else {
        GatewayError::Upstream {
            kind: "transport".to_string(),
            message: err.to_string(),
        }
    }
}

/// Backends usually answer JSON; some endpoints return plain text, which
/// is normalized to an array of lines.
fn parse_success_body(text: &str) -> Value {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(_) => Value::Array(
            text.trim()
                .lines()
                .map(|line| Value::String(line.to_string()))
                .collect(),
        ),
    }
}

fn upstream_from_parts(status: u16, body: &str) -> GatewayError {
    match serde_json::from_str::<UpstreamBody>(body) {
        Ok(parsed) => GatewayError::Upstream {
            kind: parsed.kind,
            message: parsed.message,
        },
        Err(_) => GatewayError::Upstream {
            kind: format!("http_{}", status),
            message: if body.trim().is_empty() {
                format!("backend returned status {}", status)
            } else {
                body.trim().to_string()
            },
        },
    }
}
