//! Shared utilities for integration testing.

use axum::{body::Bytes, http::StatusCode, Router};
use order_service::config::OrderServiceConfig;
use order_service::{HttpServer, Shutdown};
use serde_json::Value;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Start a programmable mock downstream on an ephemeral port.
///
/// `f` receives the JSON request body and returns `(status, body)`.
pub async fn start_programmable_downstream<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let f = Arc::new(f);
    let app = Router::new().fallback(move |body: Bytes| {
        let f = f.clone();
        async move {
            let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
            let (status, text) = f(json).await;
            (StatusCode::from_u16(status).unwrap_or(StatusCode::OK), text)
        }
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Start a mock downstream that always succeeds and counts its calls.
pub async fn start_counting_downstream(prefix: &'static str, field: &'static str) -> (SocketAddr, Arc<AtomicU32>) {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let addr = start_programmable_downstream(move |body| {
        counter.fetch_add(1, Ordering::SeqCst);
        let id = body.get(field).and_then(Value::as_str).unwrap_or("?").to_string();
        async move { (200, format!("{} {}", prefix, id)) }
    })
    .await;
    (addr, calls)
}

/// An address nothing listens on.
#[allow(dead_code)]
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn config_for(payment: SocketAddr, inventory: SocketAddr, shipping: SocketAddr) -> OrderServiceConfig {
    let mut config = OrderServiceConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.observability.metrics_enabled = false;
    config.downstream.payment_url = format!("http://{}", payment);
    config.downstream.inventory_url = format!("http://{}", inventory);
    config.downstream.shipping_url = format!("http://{}", shipping);
    config
}

/// Start the order service and return its address and shutdown handle.
pub async fn start_order_service(config: OrderServiceConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = HttpServer::new(config);

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });
    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

pub async fn place_order(
    client: &reqwest::Client,
    addr: SocketAddr,
    order_id: &str,
    product_id: &str,
) -> reqwest::Response {
    client
        .post(format!("http://{}/orders", addr))
        .json(&serde_json::json!({ "orderId": order_id, "productId": product_id }))
        .send()
        .await
        .expect("order service unreachable")
}
