//! Operator surface: breaker and limiter introspection and overrides.
//!
//! Every path here is on the rate limiter's exempt list.

pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};

use self::handlers::*;
use crate::http::server::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(get_health))
        .route("/circuit-status", get(get_circuit_status))
        .route("/trip-circuit/{service}", post(trip_circuit))
        .route("/rate-limit-status", get(get_rate_limit_status))
        .route("/reset-rate-limit", post(reset_rate_limit))
}
