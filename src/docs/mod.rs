//! API documentation aggregation.
//!
//! # Data Flow
//! ```text
//! GET {prefix}/docs/doc.json
//!     → handlers.rs
//!     → aggregator.rs (fetch every backend doc concurrently, each with a deadline)
//!     → model.rs (re-prefix paths, merge components, wrap in the envelope)
//!     → JSON response
//!
//! GET {prefix}/docs/index.html
//!     → handlers.rs (bundled viewer page pointing at doc.json)
//! ```
//!
//! # Design Decisions
//! - Rebuilt on every request; nothing is cached
//! - One bad backend drops out of the document, the rest still render
//! - Schema bodies stay as `serde_json::Value`; only the envelope is typed

pub mod aggregator;
pub mod handlers;
pub mod model;

pub use aggregator::{DocAggregator, DocSource, DocsError};
pub use model::{AggregatedDoc, BackendDoc, DocInfo};
