//! Downstream collaborators.
//!
//! # Data Flow
//! ```text
//! orchestrator
//!     → DependencyCall { target, payload }
//!     → circuit breaker (timeout, fallback)
//!     → client.rs (HTTP request to payment / inventory / shipping)
//! ```
//!
//! Each collaborator exposes one synchronous operation that either returns
//! an acknowledgement text or fails (timeout, connection refused, non-2xx).

pub mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use client::HttpDownstream;

/// The three downstream dependencies guarded by circuit breakers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dependency {
    Payment,
    Inventory,
    Shipping,
}

impl Dependency {
    /// Fixed dispatch order used by the orchestrator.
    pub const ALL: [Dependency; 3] = [Dependency::Payment, Dependency::Inventory, Dependency::Shipping];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dependency::Payment => "payment",
            Dependency::Inventory => "inventory",
            Dependency::Shipping => "shipping",
        }
    }

    /// Human readable name used in operator messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Dependency::Payment => "Payment",
            Dependency::Inventory => "Inventory",
            Dependency::Shipping => "Shipping",
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a service name does not match any dependency.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown service '{0}'")]
pub struct UnknownDependency(pub String);

impl FromStr for Dependency {
    type Err = UnknownDependency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "payment" => Ok(Dependency::Payment),
            "inventory" => Ok(Dependency::Inventory),
            "shipping" => Ok(Dependency::Shipping),
            other => Err(UnknownDependency(other.to_string())),
        }
    }
}

/// Payload sent to a dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Order { order_id: String },
    Product { product_id: String },
}

impl Payload {
    /// JSON body expected by the collaborator.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Payload::Order { order_id } => serde_json::json!({ "orderId": order_id }),
            Payload::Product { product_id } => serde_json::json!({ "productId": product_id }),
        }
    }
}

/// Immutable description of one downstream invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyCall {
    pub target: Dependency,
    pub payload: Payload,
}

impl DependencyCall {
    pub fn payment(order_id: impl Into<String>) -> Self {
        Self {
            target: Dependency::Payment,
            payload: Payload::Order { order_id: order_id.into() },
        }
    }

    pub fn inventory(product_id: impl Into<String>) -> Self {
        Self {
            target: Dependency::Inventory,
            payload: Payload::Product { product_id: product_id.into() },
        }
    }

    pub fn shipping(order_id: impl Into<String>) -> Self {
        Self {
            target: Dependency::Shipping,
            payload: Payload::Order { order_id: order_id.into() },
        }
    }
}

/// Errors that can occur while calling a dependency.
#[derive(Debug, Error)]
pub enum DownstreamError {
    /// The call did not complete within the breaker deadline.
    #[error("{0} timed out after {1} ms")]
    Timeout(Dependency, u64),

    /// Connection refused, reset, or otherwise broken transport.
    #[error("{0} unreachable: {1}")]
    Connect(Dependency, String),

    /// The collaborator answered with a non-2xx status.
    #[error("{0} responded with status {1}")]
    Status(Dependency, u16),

    /// The request could not be constructed at all.
    #[error("{0} request could not be built: {1}")]
    InvalidRequest(Dependency, String),
}

impl DownstreamError {
    /// Whether the error reflects the health of the dependency.
    ///
    /// Only these errors are counted by the breaker and replaced by a fallback.
    pub fn is_dependency_failure(&self) -> bool {
        !matches!(self, DownstreamError::InvalidRequest(..))
    }
}

/// A downstream collaborator reachable by the orchestrator.
#[async_trait]
pub trait Downstream: Send + Sync {
    /// Execute the call and return the collaborator's acknowledgement text.
    async fn call(&self, call: &DependencyCall) -> Result<String, DownstreamError>;
}
