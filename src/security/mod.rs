//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-client fixed-window quota)
//!     → limits.rs (request body ceiling)
//!     → Pass to routing / proxy
//!
//! Outgoing request:
//!     → headers.rs (strip hop-by-hop, add X-Forwarded-*)
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - No trust in client input (forwarded headers opt-in)

pub mod headers;
pub mod limits;
pub mod rate_limit;

pub use rate_limit::RateLimiter;
