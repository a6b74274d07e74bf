//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID)
//!     → security::rate_limit (admission, operator paths exempt)
//!     → orders.rs / admin handlers
//!     → response.rs (error mapping)
//!     → Send to client
//! ```

pub mod orders;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
