//! Stand-in payment, inventory and shipping services.
//!
//! Each stub acknowledges its single operation. Failures and latency can be
//! injected to exercise the order service's circuit breakers.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{post, put},
    Json, Router,
};
use clap::Parser;
use serde_json::Value;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Clone)]
#[command(name = "downstream-stubs")]
#[command(about = "Runs the payment, inventory and shipping stub services", long_about = None)]
struct Args {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 3001)]
    payment_port: u16,

    #[arg(long, default_value_t = 3002)]
    inventory_port: u16,

    #[arg(long, default_value_t = 3003)]
    shipping_port: u16,

    /// Probability (0.0 - 1.0) that a request answers 500.
    #[arg(long, default_value_t = 0.0)]
    failure_rate: f64,

    /// Delay added before every answer, in milliseconds.
    #[arg(long, default_value_t = 0)]
    latency_ms: u64,
}

#[derive(Clone, Copy)]
struct Faults {
    failure_rate: f64,
    latency: Duration,
}

impl Faults {
    /// Apply latency, then decide whether this request fails.
    async fn inject(&self) -> bool {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        fastrand::f64() < self.failure_rate
    }
}

fn field(body: &Value, name: &str) -> String {
    match body.get(name) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "undefined".to_string(),
    }
}

async fn respond(faults: Faults, service: &str, text: String) -> Response {
    if faults.inject().await {
        tracing::warn!(service, "Injected failure");
        return (StatusCode::INTERNAL_SERVER_ERROR, format!("{} service failure", service)).into_response();
    }
    tracing::info!(service, "{}", text);
    text.into_response()
}

async fn payments(State(faults): State<Faults>, Json(body): Json<Value>) -> Response {
    let text = format!("Payment processed for order {}", field(&body, "orderId"));
    respond(faults, "payment", text).await
}

async fn inventory(State(faults): State<Faults>, Json(body): Json<Value>) -> Response {
    let text = format!("Inventory updated for product {}", field(&body, "productId"));
    respond(faults, "inventory", text).await
}

async fn shipping(State(faults): State<Faults>, Json(body): Json<Value>) -> Response {
    let text = format!("Shipping started for order {}", field(&body, "orderId"));
    respond(faults, "shipping", text).await
}

async fn serve(name: &'static str, addr: SocketAddr, app: Router) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(service = name, address = %addr, "Stub listening");
    axum::serve(listener, app).await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "downstream_stubs=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let faults = Faults {
        failure_rate: args.failure_rate.clamp(0.0, 1.0),
        latency: Duration::from_millis(args.latency_ms),
    };
    let addr = |port: u16| -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", args.host, port).parse()
    };

    let payment = Router::new().route("/payments", post(payments)).with_state(faults);
    let inventory_app = Router::new().route("/inventory", put(inventory)).with_state(faults);
    let shipping_app = Router::new().route("/shipping", post(shipping)).with_state(faults);

    tokio::try_join!(
        serve("payment", addr(args.payment_port)?, payment),
        serve("inventory", addr(args.inventory_port)?, inventory_app),
        serve("shipping", addr(args.shipping_port)?, shipping_app),
    )?;
    Ok(())
}
