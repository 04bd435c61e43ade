//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     ServiceConfig[].routes
//!     → router.rs (full public path + method → ServiceTarget)
//!     → group by path into one axum MethodRouter per path
//!     → Freeze inside the axum Router
//!
//! Incoming Request:
//!     → axum path match ({param} segments passed through verbatim)
//!     → method match, else 405
//!     → proxy handler with the route's ServiceTarget
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: one method + path maps to exactly one service
//! - Paths without a configured OPTIONS handler answer preflights with 200

pub mod router;

pub use router::{RouteRule, RouteTable};
