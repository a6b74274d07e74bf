//! Error taxonomy of the orchestration boundary.
//!
//! - `AdmissionDenied`: rate limit exceeded, answered with 429 and a retry hint
//! - `Transport`: a dependency error the breaker did not absorb, answered with 500
//! - `InvalidBody`: malformed order request, answered with 400
//! - `AdminError::UnknownService`: manual trip of an unknown breaker, answered with 400
//!
//! Degraded dependencies are not errors; they surface as fallback outcomes.
//! HTTP mapping lives in `http::response`.

use thiserror::Error;

use crate::downstream::{DownstreamError, UnknownDependency};

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Too many requests. Please retry in {retry_after_secs} seconds.")]
    AdmissionDenied { retry_after_secs: u64 },

    #[error(transparent)]
    Transport(#[from] DownstreamError),

    #[error("Invalid order request: {0}")]
    InvalidBody(String),
}

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Invalid service name")]
    UnknownService(#[from] UnknownDependency),
}
