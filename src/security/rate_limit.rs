//! Fixed-window admission throttle for the order endpoint.
//!
//! One process-wide counter: at most `limit` admissions per window. The
//! window resets lazily on the first admission check after it has elapsed.
//! The reset-then-check sequence runs under a single lock.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use crate::config::RateLimitConfig;
use crate::error::OrderError;
use crate::observability::metrics;

/// Paths that bypass admission (operator endpoints).
pub const EXEMPT_PATHS: &[&str] = &[
    "/health",
    "/circuit-status",
    "/rate-limit-status",
    "/reset-rate-limit",
    "/trip-circuit/payment",
    "/trip-circuit/inventory",
    "/trip-circuit/shipping",
];

pub fn is_exempt(path: &str) -> bool {
    EXEMPT_PATHS.contains(&path)
}

/// Result of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub allowed: bool,
    /// Whole seconds until the window resets; 0 when allowed.
    pub retry_after_secs: u64,
    /// Admissions consumed in the current window, including this one.
    pub consumed: u32,
}

/// Limiter counters as reported to operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitStatus {
    pub remaining_requests: u32,
    pub ms_before_next: u64,
    pub seconds_before_reset: u64,
    pub is_blocked: bool,
    pub consumed_points: u32,
    pub total_limit: u32,
}

#[derive(Debug)]
struct Window {
    count: u32,
    start: Instant,
}

pub struct RateLimiter {
    limit: u32,
    window: Duration,
    state: Mutex<Window>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            state: Mutex::new(Window {
                count: 0,
                start: Instant::now(),
            }),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.limit, config.window())
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    fn lock(&self) -> MutexGuard<'_, Window> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Time left in the window that started at `start`; zero once it elapsed.
    fn until_reset(&self, start: Instant, now: Instant) -> Duration {
        self.window.saturating_sub(now.saturating_duration_since(start))
    }

    /// Check and consume one admission.
    pub fn admit(&self) -> Admission {
        let mut window = self.lock();
        let now = Instant::now();

        if self.until_reset(window.start, now).is_zero() {
            if window.count > 0 {
                tracing::info!(previous = window.count, "Rate limit window elapsed, counter reset");
            }
            window.count = 0;
            window.start = now;
        }

        if window.count < self.limit {
            window.count += 1;
            tracing::info!(request = window.count, limit = self.limit, "Request admitted");
            return Admission {
                allowed: true,
                retry_after_secs: 0,
                consumed: window.count,
            };
        }

        let remaining = self.until_reset(window.start, now);
        let retry_after_secs = (remaining.as_secs_f64().ceil() as u64).max(1);
        tracing::warn!(limit = self.limit, retry_after_secs, "Request denied, rate limit reached");
        Admission {
            allowed: false,
            retry_after_secs,
            consumed: window.count,
        }
    }

    /// Current counters without consuming an admission.
    pub fn status(&self) -> RateLimitStatus {
        let window = self.lock();
        let until_reset = self.until_reset(window.start, Instant::now());

        // An elapsed window counts as fresh even before the next admission resets it.
        let consumed = if until_reset.is_zero() { 0 } else { window.count };
        let remaining = self.limit.saturating_sub(consumed);

        RateLimitStatus {
            remaining_requests: remaining,
            ms_before_next: u64::try_from(until_reset.as_millis()).unwrap_or(u64::MAX),
            seconds_before_reset: until_reset.as_secs_f64().ceil() as u64,
            is_blocked: remaining == 0,
            consumed_points: consumed,
            total_limit: self.limit,
        }
    }

    /// Zero the counter and start a new window now.
    pub fn reset(&self) -> RateLimitStatus {
        {
            let mut window = self.lock();
            window.count = 0;
            window.start = Instant::now();
        }
        tracing::info!("Rate limit reset manually");
        self.status()
    }
}

/// Middleware gating every non-exempt path on the limiter.
///
/// The admission is stored in request extensions for handlers.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if is_exempt(request.uri().path()) {
        return next.run(request).await;
    }

    let admission = limiter.admit();
    if admission.allowed {
        request.extensions_mut().insert(admission);
        next.run(request).await
    } else {
        tracing::warn!(path = %request.uri().path(), "Rate limit exceeded");
        metrics::record_rate_limited();
        OrderError::AdmissionDenied {
            retry_after_secs: admission.retry_after_secs,
        }
        .into_response()
    }
}
