//! HTTP client for the downstream collaborators.
//!
//! # Responsibilities
//! - Map each dependency to its method and URL
//! - Send the JSON payload and return the acknowledgement text
//! - Classify failures (connection, status, request construction)
//!
//! The per-call deadline is owned by the circuit breaker, not by this client.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::DownstreamConfig;
use crate::downstream::{Dependency, DependencyCall, Downstream, DownstreamError};

/// Upper bound on an acknowledgement body.
const MAX_RESPONSE_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone)]
struct Endpoint {
    method: Method,
    url: String,
}

impl Endpoint {
    fn new(method: Method, base: &str, path: &str) -> Self {
        Self {
            method,
            url: format!("{}{}", base.trim_end_matches('/'), path),
        }
    }
}

/// Downstream implementation that talks HTTP/1.1 to the stub services.
#[derive(Clone)]
pub struct HttpDownstream {
    client: Client<HttpConnector, Body>,
    payment: Endpoint,
    inventory: Endpoint,
    shipping: Endpoint,
}

impl HttpDownstream {
    pub fn new(config: &DownstreamConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Self {
            client,
            payment: Endpoint::new(Method::POST, &config.payment_url, "/payments"),
            inventory: Endpoint::new(Method::PUT, &config.inventory_url, "/inventory"),
            shipping: Endpoint::new(Method::POST, &config.shipping_url, "/shipping"),
        }
    }

    fn endpoint(&self, dependency: Dependency) -> &Endpoint {
        match dependency {
            Dependency::Payment => &self.payment,
            Dependency::Inventory => &self.inventory,
            Dependency::Shipping => &self.shipping,
        }
    }

    fn build_request(&self, call: &DependencyCall) -> Result<Request<Body>, DownstreamError> {
        let endpoint = self.endpoint(call.target);
        let body = serde_json::to_vec(&call.payload.to_json())
            .map_err(|e| DownstreamError::InvalidRequest(call.target, e.to_string()))?;

        Request::builder()
            .method(endpoint.method.clone())
            .uri(endpoint.url.as_str())
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::USER_AGENT, "order-service")
            .body(Body::from(body))
            .map_err(|e| DownstreamError::InvalidRequest(call.target, e.to_string()))
    }
}

#[async_trait]
impl Downstream for HttpDownstream {
    async fn call(&self, call: &DependencyCall) -> Result<String, DownstreamError> {
        let target = call.target;
        let request = self.build_request(call)?;

        let response: hyper::Response<hyper::body::Incoming> = self
            .client
            .request(request)
            .await
            .map_err(|e| DownstreamError::Connect(target, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownstreamError::Status(target, status.as_u16()));
        }

        let bytes = axum::body::to_bytes(Body::new(response.into_body()), MAX_RESPONSE_BYTES)
            .await
            .map_err(|e| DownstreamError::Connect(target, e.to_string()))?;

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_follow_collaborator_contract() {
        let downstream = HttpDownstream::new(&DownstreamConfig {
            payment_url: "http://127.0.0.1:3001/".into(),
            ..DownstreamConfig::default()
        });

        let payment = downstream.endpoint(Dependency::Payment);
        assert_eq!(payment.method, Method::POST);
        assert_eq!(payment.url, "http://127.0.0.1:3001/payments");

        let inventory = downstream.endpoint(Dependency::Inventory);
        assert_eq!(inventory.method, Method::PUT);
        assert_eq!(inventory.url, "http://127.0.0.1:3002/inventory");
    }

    #[tokio::test]
    async fn test_malformed_base_url_is_invalid_request() {
        let downstream = HttpDownstream::new(&DownstreamConfig {
            shipping_url: "http://bad host".into(),
            ..DownstreamConfig::default()
        });

        let err = downstream.call(&DependencyCall::shipping("1")).await.unwrap_err();
        assert!(matches!(err, DownstreamError::InvalidRequest(Dependency::Shipping, _)));
    }
}
