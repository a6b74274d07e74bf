//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the order service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the order service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct OrderServiceConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Admission throttle for the order endpoint.
    pub rate_limit: RateLimitConfig,

    /// Settings shared by the per-dependency circuit breakers.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Downstream collaborator addresses.
    pub downstream: DownstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Fixed-window rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum admitted requests per window.
    pub limit: u32,

    /// Window length in seconds.
    pub window_secs: u64,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            limit: 5,
            window_secs: 60,
        }
    }
}

/// Circuit breaker configuration, applied to every dependency.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Per-call deadline in milliseconds; slower calls count as failures.
    pub timeout_ms: u64,

    /// Failure percentage over the rolling sample that opens the circuit.
    pub error_threshold_percentage: u8,

    /// Time spent Open before a probe is allowed, in milliseconds.
    pub reset_timeout_ms: u64,

    /// Maximum age of an outcome kept in the rolling sample, in milliseconds.
    pub rolling_window_ms: u64,

    /// Maximum number of outcomes kept in the rolling sample.
    pub sample_size: usize,

    /// Outcomes required before the failure ratio is evaluated.
    pub minimum_calls: usize,
}

impl CircuitBreakerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }

    pub fn rolling_window(&self) -> Duration {
        Duration::from_millis(self.rolling_window_ms)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 3000,
            error_threshold_percentage: 50,
            reset_timeout_ms: 10_000,
            rolling_window_ms: 10_000,
            sample_size: 10,
            minimum_calls: 2,
        }
    }
}

/// Base URLs of the downstream collaborators.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DownstreamConfig {
    pub payment_url: String,
    pub inventory_url: String,
    pub shipping_url: String,
}

impl Default for DownstreamConfig {
    fn default() -> Self {
        Self {
            payment_url: "http://127.0.0.1:3001".to_string(),
            inventory_url: "http://127.0.0.1:3002".to_string(),
            shipping_url: "http://127.0.0.1:3003".to_string(),
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
