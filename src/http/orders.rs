//! `POST /orders` handler.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

use crate::error::OrderError;
use crate::http::request::request_id;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::orchestrator::OrderResult;
use crate::security::Admission;

/// Order and product identifiers may arrive as strings or integers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Text(String),
    Number(i64),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Text(s) => f.write_str(s),
            Identifier::Number(n) => write!(f, "{}", n),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub order_id: Identifier,
    pub product_id: Identifier,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub message: String,
    #[serde(flatten)]
    pub result: OrderResult,
    pub request_number: u32,
}

pub async fn create_order(
    State(state): State<AppState>,
    admission: Option<Extension<Admission>>,
    headers: HeaderMap,
    body: Result<Json<OrderRequest>, JsonRejection>,
) -> Response {
    let start = Instant::now();
    let request_number = admission.map(|Extension(a)| a.consumed).unwrap_or(0);

    let response = match place_order(&state, request_number, body).await {
        Ok(order) => Json(order).into_response(),
        Err(e) => {
            tracing::error!(request_id = %request_id(&headers), error = %e, "Order failed");
            e.into_response()
        }
    };

    metrics::record_order(response.status().as_u16(), start);
    response
}

async fn place_order(
    state: &AppState,
    request_number: u32,
    body: Result<Json<OrderRequest>, JsonRejection>,
) -> Result<OrderResponse, OrderError> {
    let Json(order) = body.map_err(|e| OrderError::InvalidBody(e.body_text()))?;
    let order_id = order.order_id.to_string();
    let product_id = order.product_id.to_string();

    let result = state.orchestrator.process_order(&order_id, &product_id).await?;

    Ok(OrderResponse {
        message: format!("Order {} processed successfully", order_id),
        result,
        request_number,
    })
}
