//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, request-id and trace layers)
//!     → request.rs (request ID, client identity)
//!     → middleware/ (fault barrier, request log, rate limit, size guard)
//!     → routing table → proxy director, or docs handlers
//!     → response.rs (upstream annotation)
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
