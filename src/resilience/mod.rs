//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to a dependency:
//!     → circuit_breaker.rs (admit, enforce deadline, track failure ratio)
//!     → On denial, failure or timeout: fallback.rs (static substitute text)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every dependency call has a deadline
//! - No retries inside the breaker; retry policy belongs to the caller
//! - Fail fast in Open state, single probe in Half-Open
//! - Per-dependency breakers (not global)

pub mod circuit_breaker;
pub mod fallback;

pub use circuit_breaker::{BreakerEvent, BreakerStatus, CircuitBreaker, CircuitState, OpenCause, Transition};
pub use fallback::{fallback_for, FallbackReason, Outcome};
