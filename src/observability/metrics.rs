//! Metrics collection and exposition.
//!
//! # Metrics
//! - `orders_total` (counter): orders by response status
//! - `order_duration_seconds` (histogram): end-to-end order latency
//! - `rate_limited_total` (counter): admissions denied
//! - `dependency_calls_total` (counter): calls by dependency and outcome
//! - `dependency_call_duration_seconds` (histogram): per-dependency latency
//! - `circuit_fallbacks_total` (counter): fallbacks by dependency and reason
//! - `circuit_transitions_total` (counter): transitions by dependency and new state
//! - `circuit_state` (gauge): 0=closed, 1=half-open, 2=open
//!
//! Without an installed recorder every call is a no-op.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::resilience::circuit_breaker::CircuitState;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_order(status: u16, start: Instant) {
    counter!("orders_total", "status" => status.to_string()).increment(1);
    histogram!("order_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    counter!("rate_limited_total").increment(1);
}

pub fn record_dependency_call(dependency: &'static str, outcome: &'static str, elapsed: Duration) {
    counter!("dependency_calls_total", "dependency" => dependency, "outcome" => outcome).increment(1);
    histogram!("dependency_call_duration_seconds", "dependency" => dependency).record(elapsed.as_secs_f64());
}

pub fn record_fallback(dependency: &'static str, reason: &'static str) {
    counter!("circuit_fallbacks_total", "dependency" => dependency, "reason" => reason).increment(1);
}

pub fn record_circuit_state(dependency: &'static str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::HalfOpen => 1.0,
        CircuitState::Open => 2.0,
    };
    counter!("circuit_transitions_total", "dependency" => dependency, "state" => state.as_str()).increment(1);
    gauge!("circuit_state", "dependency" => dependency).set(value);
}
