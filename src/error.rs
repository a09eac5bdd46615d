// src/error.rs
use chrono::{DateTime, Utc};
use hyper::{Body, Response, StatusCode};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("no backend matched selector '{0}'")]
    NotFound(String),

    #[error("no live backends in registry")]
    RegistryEmpty,

    #[error("backend '{id}' unreachable (last seen {last_seen})")]
    BackendUnreachable {
        id: String,
        last_seen: DateTime<Utc>,
    },

    #[error("request to backend timed out")]
    Timeout,

    #[error("backend error [{kind}]: {message}")]
    Upstream { kind: String, message: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl GatewayError {
    /// Stable machine-readable tag, mirrored in HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::NotFound(_) => "not_found",
            GatewayError::RegistryEmpty => "registry_empty",
            GatewayError::BackendUnreachable { .. } => "backend_unreachable",
            GatewayError::Timeout => "timeout",
            GatewayError::Upstream { .. } => "upstream_error",
            GatewayError::InvalidRequest(_) => "invalid_request",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::RegistryEmpty => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::BackendUnreachable { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

// Convert GatewayError into the JSON error envelope the backends also use.
impl From<GatewayError> for Response<Body> {
    fn from(err: GatewayError) -> Self {
        let body = json!({
            "kind": err.kind(),
            "message": err.to_string(),
        });

        Response::builder()
            .status(err.status_code())
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap_or_else(|_| Response::new(Body::empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(
            GatewayError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::RegistryEmpty.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(GatewayError::Timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            GatewayError::BackendUnreachable {
                id: "port_9009".into(),
                last_seen: Utc::now(),
            }
            .status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn unreachable_error_carries_descriptor_context() {
        let err = GatewayError::BackendUnreachable {
            id: "port_9010".into(),
            last_seen: Utc::now(),
        };
        assert!(err.to_string().contains("port_9010"));
    }
}
