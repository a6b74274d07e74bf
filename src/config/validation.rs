//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and addresses.
//! Every problem is reported, not just the first one.

use std::fmt;
use std::net::SocketAddr;
use url::Url;

use crate::config::schema::OrderServiceConfig;

/// Longest window or timeout accepted: one week.
const MAX_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

/// Breaker calls an order makes, one after another.
const CALLS_PER_ORDER: u64 = 3;

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &OrderServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    let rl = &config.rate_limit;
    if rl.limit == 0 {
        errors.push(ValidationError::new("rate_limit.limit", "must be greater than 0"));
    }
    if rl.window_secs == 0 {
        errors.push(ValidationError::new("rate_limit.window_secs", "must be greater than 0"));
    } else if rl.window_secs > MAX_DURATION_SECS {
        errors.push(ValidationError::new(
            "rate_limit.window_secs",
            format!("must be at most {}", MAX_DURATION_SECS),
        ));
    }

    let cb = &config.circuit_breaker;
    if !(1..=100).contains(&cb.error_threshold_percentage) {
        errors.push(ValidationError::new(
            "circuit_breaker.error_threshold_percentage",
            "must be between 1 and 100",
        ));
    }
    for (field, value) in [
        ("circuit_breaker.timeout_ms", cb.timeout_ms),
        ("circuit_breaker.reset_timeout_ms", cb.reset_timeout_ms),
        ("circuit_breaker.rolling_window_ms", cb.rolling_window_ms),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than 0"));
        } else if value > MAX_DURATION_SECS * 1000 {
            errors.push(ValidationError::new(
                field,
                format!("must be at most {}", MAX_DURATION_SECS * 1000),
            ));
        }
    }
    if cb.minimum_calls == 0 {
        errors.push(ValidationError::new("circuit_breaker.minimum_calls", "must be at least 1"));
    }
    if cb.sample_size < cb.minimum_calls {
        errors.push(ValidationError::new(
            "circuit_breaker.sample_size",
            format!("must be at least minimum_calls ({})", cb.minimum_calls),
        ));
    }

    let ds = &config.downstream;
    for (field, value) in [
        ("downstream.payment_url", &ds.payment_url),
        ("downstream.inventory_url", &ds.inventory_url),
        ("downstream.shipping_url", &ds.shipping_url),
    ] {
        match Url::parse(value) {
            Ok(url) if url.scheme() == "http" && url.host().is_some() => {}
            Ok(url) => errors.push(ValidationError::new(
                field,
                format!("'{}' must be an http:// URL with a host", url),
            )),
            Err(e) => errors.push(ValidationError::new(field, format!("'{}': {}", value, e))),
        }
    }

    let request_ms = config.timeouts.request_secs.saturating_mul(1000);
    let order_ms = cb.timeout_ms.saturating_mul(CALLS_PER_ORDER);
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    } else if request_ms <= order_ms {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            format!(
                "must exceed {} breaker timeouts ({} ms) so degraded orders can complete",
                CALLS_PER_ORDER, order_ms
            ),
        ));
    }

    let obs = &config.observability;
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", obs.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
