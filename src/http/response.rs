//! Response mapping for service errors.
//!
//! Errors become JSON bodies of the shape `{status: "error", message}`;
//! admission denials also carry `retryAfter` and a `Retry-After` header.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::{AdminError, OrderError};

impl OrderError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            OrderError::AdmissionDenied { .. } => StatusCode::TOO_MANY_REQUESTS,
            OrderError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
            OrderError::InvalidBody(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for OrderError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            OrderError::AdmissionDenied { retry_after_secs } => (
                status,
                [(header::RETRY_AFTER, retry_after_secs.to_string())],
                Json(json!({
                    "status": "error",
                    "message": self.to_string(),
                    "retryAfter": retry_after_secs,
                })),
            )
                .into_response(),
            OrderError::Transport(ref e) => (
                status,
                Json(json!({
                    "status": "error",
                    "message": format!("Failed to place order: {}", e),
                })),
            )
                .into_response(),
            OrderError::InvalidBody(_) => (
                status,
                Json(json!({
                    "status": "error",
                    "message": self.to_string(),
                })),
            )
                .into_response(),
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        match self {
            AdminError::UnknownService(_) => (StatusCode::BAD_REQUEST, self.to_string()).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downstream::{Dependency, DownstreamError, UnknownDependency};

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_admission_denied_carries_retry_hint() {
        let response = OrderError::AdmissionDenied { retry_after_secs: 42 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");

        let body = body_json(response).await;
        assert_eq!(body["retryAfter"], 42);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn test_transport_error_is_internal() {
        let err = DownstreamError::InvalidRequest(Dependency::Payment, "invalid uri".into());
        let response = OrderError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        let message = body["message"].as_str().unwrap();
        assert!(message.starts_with("Failed to place order: payment request could not be built"));
    }

    #[tokio::test]
    async fn test_unknown_service_is_bad_request() {
        let response = AdminError::from(UnknownDependency("billing".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"Invalid service name");
    }
}
