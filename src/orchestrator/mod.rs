//! Order orchestration subsystem.
//!
//! # Data Flow
//! ```text
//! POST /orders (admitted by the rate limiter)
//!     → order.rs (payment → inventory → shipping)
//!     → breakers.rs (breaker of each target)
//!     → dependency response or fallback
//!     → OrderResult
//! ```
//!
//! # Design Decisions
//! - Fixed sequential dispatch order for deterministic logs
//! - Breakers are independent; one open circuit never blocks another dependency
//! - Only errors the breaker does not absorb fail the order

pub mod breakers;
pub mod order;

pub use breakers::{CircuitStatusReport, DependencyBreakers};
pub use order::{OrderOrchestrator, OrderResult};
