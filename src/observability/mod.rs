//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Circuit breakers publish transitions:
//!     → events.rs (subscriber task per breaker → logs + metrics)
//!
//! Consumers:
//!     → stdout
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every request span
//! - Metrics are cheap (no-ops without a recorder)
//! - Breaker transitions are events, not log side effects of the breaker

pub mod events;
pub mod logging;
pub mod metrics;
