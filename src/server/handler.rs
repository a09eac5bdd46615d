// src/server/handler.rs
use hyper::{Body, Request, Response};
use std::sync::Arc;
use tower::Service;

use crate::gateway::Gateway;

#[derive(Clone)]
pub struct RequestHandler {
    gateway: Arc<Gateway>,
}

impl RequestHandler {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }
}

impl Service<Request<Body>> for RequestHandler {
    type Response = Response<Body>;
    type Error = Box<dyn std::error::Error + Send + Sync>;
    type Future = futures::future::BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let gateway = self.gateway.clone();
        Box::pin(async move {
            // Gateway errors become structured HTTP error responses, never
            // connection failures.
            let response = match gateway.handle(req).await {
                Ok(response) => response,
                Err(err) => {
                    tracing::debug!(%err, "request failed");
                    err.into()
                }
            };
            Ok(response)
        })
    }
}
