//! Reverse proxy subsystem.
//!
//! # Data Flow
//! ```text
//! Matched route (ServiceTarget) + inbound request
//!     → director.rs (validate base URL, rewrite path, set Host/X-Forwarded-*)
//!     → upstream call (http or https) under a deadline, exactly one attempt
//!     → deadline.rs (backend body streamed back, cut off at the same deadline)
//!     → or 500 / 400 / 502
//! ```

pub mod deadline;
pub mod director;

pub use director::{Director, ProxyOutcome, ProxyRequestContext, ServiceTarget};
