//! Order service: resilient orchestration of payment, inventory and shipping.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────┐
//!                         │                  ORDER SERVICE                   │
//!                         │                                                  │
//!   POST /orders          │  ┌────────────┐    ┌──────────────┐              │
//!   ──────────────────────┼─▶│ rate limit │───▶│ orchestrator │              │
//!                         │  │ (fixed     │    └──────┬───────┘              │
//!                         │  │  window)   │           │ payment → inventory  │
//!                         │  └────────────┘           │ → shipping           │
//!                         │                           ▼                      │
//!                         │                  ┌──────────────────┐            │     ┌──────────┐
//!                         │                  │ circuit breaker  │────────────┼────▶│ payment  │
//!                         │                  │ per dependency   │────────────┼────▶│ inventory│
//!                         │                  │ (+ fallback)     │────────────┼────▶│ shipping │
//!                         │                  └──────────────────┘            │     └──────────┘
//!                         │                                                  │
//!   operator endpoints    │  ┌────────────────────────────────────────────┐  │
//!   ──────────────────────┼─▶│ admin: circuit status / trip, limiter      │  │
//!   (exempt from limits)  │  │ status / reset                             │  │
//!                         │  └────────────────────────────────────────────┘  │
//!                         └──────────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod config;
pub mod downstream;
pub mod http;
pub mod orchestrator;

// Protection
pub mod resilience;
pub mod security;

// Operator surface
pub mod admin;

// Cross-cutting concerns
pub mod error;
pub mod lifecycle;
pub mod observability;

pub use config::OrderServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
