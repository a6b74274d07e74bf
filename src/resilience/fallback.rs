//! Static fallback responses.
//!
//! Each dependency has exactly one fallback text, returned verbatim whenever
//! its breaker does not let a call through or the call fails. Fallbacks signal
//! a degraded but handled outcome; they are never errors for the caller.

use serde::{Serialize, Serializer};

use crate::downstream::Dependency;

pub const PAYMENT_FALLBACK: &str =
    "💸 Payment service is unavailable. Using fallback payment processing.";
pub const INVENTORY_FALLBACK: &str =
    "📦 Inventory service is unavailable. Order marked for manual inventory check.";
pub const SHIPPING_FALLBACK: &str =
    "🚚 Shipping service is unavailable. Order queued for shipping later.";

/// The fallback text configured for a dependency.
pub fn fallback_for(dependency: Dependency) -> &'static str {
    match dependency {
        Dependency::Payment => PAYMENT_FALLBACK,
        Dependency::Inventory => INVENTORY_FALLBACK,
        Dependency::Shipping => SHIPPING_FALLBACK,
    }
}

/// Why a fallback was substituted for a real response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// Circuit is open; the dependency was not called.
    CircuitOpen,
    /// Circuit is half-open and the single probe slot is taken.
    ProbeInFlight,
    /// The call exceeded the breaker deadline.
    Timeout,
    /// The dependency failed (connection error or non-2xx).
    Failure,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::CircuitOpen => "circuit_open",
            FallbackReason::ProbeInFlight => "probe_in_flight",
            FallbackReason::Timeout => "timeout",
            FallbackReason::Failure => "failure",
        }
    }
}

/// Result of firing a breaker: the dependency's answer or its fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Response(String),
    Fallback {
        reason: FallbackReason,
        message: &'static str,
    },
}

impl Outcome {
    pub fn fallback(dependency: Dependency, reason: FallbackReason) -> Self {
        Outcome::Fallback {
            reason,
            message: fallback_for(dependency),
        }
    }

    /// Text returned to the caller.
    pub fn text(&self) -> &str {
        match self {
            Outcome::Response(text) => text,
            Outcome::Fallback { message, .. } => message,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Outcome::Fallback { .. })
    }
}

impl Serialize for Outcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.text())
    }
}
