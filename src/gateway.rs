// src/gateway.rs
// Routing core: maps the client-facing HTTP surface onto the registry,
// selector, forwarder and aggregator.
use crate::aggregate::Aggregator;
use crate::config::MetricsConfig;
use crate::error::GatewayError;
use crate::forward::{lookup_operation, Forwarder};
use crate::metrics::MetricsRegistry;
use crate::registry::Registry;
use crate::selector::{matches_by_filename, resolve, SelectionRequest};
use hyper::{Body, Method, Request, Response, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, Instrument};
use uuid::Uuid;

pub struct Gateway {
    registry: Arc<Registry>,
    forwarder: Arc<Forwarder>,
    aggregator: Aggregator,
    metrics: Option<Arc<MetricsRegistry>>,
    metrics_config: MetricsConfig,
}

impl Gateway {
    pub fn new(
        registry: Arc<Registry>,
        forwarder: Arc<Forwarder>,
        metrics: Option<Arc<MetricsRegistry>>,
        metrics_config: MetricsConfig,
    ) -> Self {
        Self {
            registry,
            aggregator: Aggregator::new(forwarder.clone()),
            forwarder,
            metrics,
            metrics_config,
        }
    }

    pub async fn handle(&self, req: Request<Body>) -> Result<Response<Body>, GatewayError> {
        let request_id = Uuid::new_v4();
        let span = tracing::debug_span!(
            "request",
            %request_id,
            method = %req.method(),
            path = %req.uri().path(),
        );

        self.route(req).instrument(span).await
    }

    async fn route(&self, req: Request<Body>) -> Result<Response<Body>, GatewayError> {
        let (parts, body) = req.into_parts();
        let path = parts.uri.path().to_string();
        let params = parse_query(parts.uri.query().unwrap_or(""));

        if self.metrics_config.enabled && path == self.metrics_config.path {
            if let Some(metrics) = &self.metrics {
                return Ok(Response::builder()
                    .status(StatusCode::OK)
                    .header("Content-Type", "text/plain; version=0.0.4")
                    .body(Body::from(metrics.gather()))
                    .unwrap_or_else(|_| Response::new(Body::empty())));
            }
        }

        match path.as_str() {
            "/health" => {
                require_method(&parts.method, Method::GET, "/health")?;
                Ok(self.health())
            }
            "/servers" => {
                require_method(&parts.method, Method::GET, "/servers")?;
                self.list_servers().await
            }
            "/select" => {
                require_method(&parts.method, Method::GET, "/select")?;
                self.select_by_filename(&params)
            }
            path if path.starts_with("/api/") => {
                let name = path.trim_start_matches("/api/").to_string();
                self.call_operation(&name, parts.method, params, body).await
            }
            _ => Ok(json_response(
                StatusCode::NOT_FOUND,
                &json!({"kind": "not_found", "message": format!("no route for {}", path)}),
            )),
        }
    }

    /// Gateway self-status; not a backend probe.
    fn health(&self) -> Response<Body> {
        let snapshot = self.registry.snapshot();
        json_response(
            StatusCode::OK,
            &json!({
                "ok": true,
                "live_backends": snapshot.len(),
                "registry_version": snapshot.version(),
            }),
        )
    }

    /// List every live backend with its probed metadata plus a tagged
    /// live binary_info result.
    async fn list_servers(&self) -> Result<Response<Body>, GatewayError> {
        let snapshot = self.registry.snapshot();
        let op = lookup_operation("binary_info")
            .ok_or_else(|| GatewayError::InvalidRequest("binary_info not in table".into()))?;
        let servers = self.aggregator.aggregate(&snapshot, op, &[]).await;

        Ok(json_response(
            StatusCode::OK,
            &json!({
                "ok": true,
                "count": servers.len(),
                "version": snapshot.version(),
                "servers": servers,
            }),
        ))
    }

    /// Resolve a filename substring to a backend id, reporting every
    /// match. Ambiguity is informational; the tie-break winner is the
    /// selected id.
    fn select_by_filename(
        &self,
        params: &[(String, String)],
    ) -> Result<Response<Body>, GatewayError> {
        let filename = param(params, "filename").ok_or_else(|| {
            GatewayError::InvalidRequest("query parameter 'filename' is required".into())
        })?;

        let snapshot = self.registry.snapshot();
        let matches = matches_by_filename(&snapshot, &filename);
        if matches.is_empty() {
            return Err(GatewayError::NotFound(filename));
        }

        let needle = filename.to_lowercase();
        let match_list: Vec<Value> = matches
            .iter()
            .map(|d| {
                json!({
                    "id": d.id,
                    "display_name": d.display_name,
                    "port": d.port,
                    "exact_match": d.display_name.to_lowercase() == needle,
                })
            })
            .collect();

        Ok(json_response(
            StatusCode::OK,
            &json!({
                "ok": true,
                "selected": matches[0].id,
                "matches": match_list,
                "message": format!("Found {} match(es) for '{}'", matches.len(), filename),
            }),
        ))
    }

    /// Resolve the optional selector, then forward the operation to
    /// exactly one backend.
    async fn call_operation(
        &self,
        name: &str,
        method: Method,
        params: Vec<(String, String)>,
        body: Body,
    ) -> Result<Response<Body>, GatewayError> {
        let op = lookup_operation(name)
            .ok_or_else(|| GatewayError::InvalidRequest(format!("unknown operation '{}'", name)))?;
        if method != op.method {
            return Err(GatewayError::InvalidRequest(format!(
                "operation '{}' requires {}",
                name, op.method
            )));
        }

        let request = SelectionRequest::from_parts(
            param(&params, "binary_id"),
            param(&params, "filename"),
        );
        let forwarded: Vec<(String, String)> = params
            .into_iter()
            .filter(|(key, _)| key != "binary_id" && key != "filename")
            .collect();

        let snapshot = self.registry.snapshot();
        let backend = resolve(&snapshot, &request)?;
        debug!(backend = %backend.id, operation = name, "resolved selector");

        let body = if op.method == Method::POST {
            let bytes = hyper::body::to_bytes(body).await.map_err(|err| {
                GatewayError::InvalidRequest(format!("failed to read request body: {}", err))
            })?;
            Some(String::from_utf8_lossy(&bytes).into_owned())
        } else {
            None
        };

        let start = Instant::now();
        let result = self.forwarder.forward(&backend, op, &forwarded, body).await;
        if let Some(metrics) = &self.metrics {
            metrics
                .collector()
                .record_forward(op.name, start, result.is_ok());
        }

        let value = result?;
        Ok(json_response(StatusCode::OK, &value))
    }
}

fn require_method(actual: &Method, expected: Method, path: &str) -> Result<(), GatewayError> {
    if *actual == expected {
        Ok(())
    } else {
        Err(GatewayError::InvalidRequest(format!(
            "{} requires {}",
            path, expected
        )))
    }
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

fn param(params: &[(String, String)], key: &str) -> Option<String> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.clone())
        .filter(|v| !v.is_empty())
}

fn json_response(status: StatusCode, value: &impl serde::Serialize) -> Response<Body> {
    let body = serde_json::to_vec(value).unwrap_or_default();
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Body::from(body))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ForwardConfig, MetricsConfig};
    use crate::registry::BackendDescriptor;
    use chrono::Utc;
    use serde_json::Map;

    fn gateway_with(entries: &[(u16, &str)]) -> Gateway {
        let registry = Arc::new(Registry::new());
        let now = Utc::now();
        registry.reconcile(
            entries
                .iter()
                .map(|&(port, name)| {
                    BackendDescriptor::new("localhost", port, name, Map::new(), now)
                })
                .collect(),
            now,
            chrono::Duration::seconds(60),
        );
        let forwarder = Arc::new(Forwarder::new(ForwardConfig::default()));
        Gateway::new(registry, forwarder, None, MetricsConfig::default())
    }

    fn request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .expect("valid test request")
    }

    async fn body_json(response: Response<Body>) -> Value {
        let bytes = hyper::body::to_bytes(response.into_body())
            .await
            .expect("readable body");
        serde_json::from_slice(&bytes).expect("JSON body")
    }

    #[tokio::test]
    async fn unknown_operation_is_invalid_request() {
        let gateway = gateway_with(&[(9009, "sample.exe")]);
        let err = gateway
            .handle(request(Method::GET, "/api/bogus"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRequest(_)));

        let response: Response<Body> = err.into();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["kind"], "invalid_request");
    }

    #[tokio::test]
    async fn operation_method_mismatch_is_rejected() {
        let gateway = gateway_with(&[(9009, "sample.exe")]);
        // decompile is POST-only.
        let err = gateway
            .handle(request(Method::GET, "/api/decompile"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn wrong_method_on_known_route_is_invalid_request() {
        let gateway = gateway_with(&[(9009, "sample.exe")]);
        let err = gateway
            .handle(request(Method::POST, "/select?filename=sample"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRequest(_)));

        let err = gateway
            .handle(request(Method::POST, "/servers"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let gateway = gateway_with(&[]);
        let response = gateway
            .handle(request(Method::GET, "/nope"))
            .await
            .expect("plain 404 response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["kind"], "not_found");
    }

    #[tokio::test]
    async fn health_reports_registry_state() {
        let gateway = gateway_with(&[(9009, "sample.exe"), (9010, "sample2.exe")]);
        let response = gateway
            .handle(request(Method::GET, "/health"))
            .await
            .expect("health response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["live_backends"], 2);
        assert_eq!(body["registry_version"], 1);
    }

    #[tokio::test]
    async fn select_reports_tie_break_winner_and_all_matches() {
        let gateway = gateway_with(&[(9009, "sample.exe"), (9010, "sample2.exe")]);
        let response = gateway
            .handle(request(Method::GET, "/select?filename=sample"))
            .await
            .expect("select response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["selected"], "port_9009");
        assert_eq!(body["matches"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn select_without_filename_is_invalid_request() {
        let gateway = gateway_with(&[(9009, "sample.exe")]);
        let err = gateway
            .handle(request(Method::GET, "/select"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn select_with_no_match_is_not_found() {
        let gateway = gateway_with(&[(9009, "sample.exe")]);
        let err = gateway
            .handle(request(Method::GET, "/select?filename=nomatch"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(_)));
    }

    #[tokio::test]
    async fn operation_on_empty_registry_is_registry_empty() {
        let gateway = gateway_with(&[]);
        let err = gateway
            .handle(request(Method::GET, "/api/overview"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::RegistryEmpty));
    }

    #[tokio::test]
    async fn listing_with_empty_registry_is_ok_and_empty() {
        let gateway = gateway_with(&[]);
        let response = gateway
            .handle(request(Method::GET, "/servers"))
            .await
            .expect("listing response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["count"], 0);
        assert_eq!(body["servers"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn query_parsing_decodes_pairs() {
        let params = parse_query("binary_id=port_9009&query=main%20loop");
        assert_eq!(param(&params, "binary_id").as_deref(), Some("port_9009"));
        assert_eq!(param(&params, "query").as_deref(), Some("main loop"));
        assert_eq!(param(&params, "missing"), None);
    }

    #[test]
    fn empty_params_are_treated_as_absent() {
        let params = parse_query("binary_id=&filename=sample");
        assert_eq!(param(&params, "binary_id"), None);
        assert_eq!(param(&params, "filename").as_deref(), Some("sample"));
    }
}
