//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events, subscriber setup)
//!     → metrics.rs (counters and histograms, Prometheus exporter)
//!
//! Per-request access records come from http::middleware::request_log.
//! ```
//!
//! # Design Decisions
//! - Request ID is a field on every per-request event
//! - Metric updates are fire-and-forget; a missing recorder makes them no-ops

pub mod logging;
pub mod metrics;
