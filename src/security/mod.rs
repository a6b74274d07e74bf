//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (exempt operator paths pass through)
//!     → fixed-window admission check
//!     → Pass to handler, or 429 with retry hint
//! ```
//!
//! # Design Decisions
//! - One process-wide window, not per client
//! - Fail closed: a full window rejects until it resets
//! - Operator endpoints are an explicit allow-list

pub mod rate_limit;

pub use rate_limit::{Admission, RateLimitStatus, RateLimiter};
