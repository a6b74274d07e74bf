use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::downstream::Dependency;
use crate::error::AdminError;
use crate::http::server::AppState;
use crate::orchestrator::CircuitStatusReport;
use crate::security::RateLimitStatus;

#[derive(Serialize)]
pub struct HealthStatus {
    pub version: &'static str,
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct ResetResponse {
    pub status: &'static str,
    pub message: &'static str,
    #[serde(flatten)]
    pub limits: RateLimitStatus,
}

pub async fn get_health() -> Json<HealthStatus> {
    Json(HealthStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "ok",
    })
}

pub async fn get_circuit_status(State(state): State<AppState>) -> Json<CircuitStatusReport> {
    Json(state.breakers().status())
}

pub async fn trip_circuit(
    State(state): State<AppState>,
    Path(service): Path<String>,
) -> Result<String, AdminError> {
    let dependency: Dependency = service.parse().map_err(|e| {
        tracing::warn!(service = %service, "Manual trip of unknown service rejected");
        AdminError::UnknownService(e)
    })?;

    state.breakers().trip(dependency);
    Ok(format!("{} service circuit manually opened", dependency.display_name()))
}

pub async fn get_rate_limit_status(State(state): State<AppState>) -> Json<RateLimitStatus> {
    Json(state.limiter.status())
}

pub async fn reset_rate_limit(State(state): State<AppState>) -> Json<ResetResponse> {
    Json(ResetResponse {
        status: "success",
        message: "Rate limit reset successfully",
        limits: state.limiter.reset(),
    })
}
