//! API gateway library.
//!
//! A single public entry point in front of a set of backend services:
//! a fixed middleware chain, a path-rewriting reverse proxy and a combined
//! documentation endpoint.

// Core subsystems
pub mod config;
pub mod docs;
pub mod error;
pub mod http;
pub mod proxy;
pub mod routing;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
