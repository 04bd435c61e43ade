//! Per-request middleware chain.
//!
//! # Order
//! ```text
//! request
//!   → recovery.rs     (fault barrier: panic → 500)
//!   → request_log.rs  (method, path, params, body snapshot, status, duration)
//!   → security::rate_limit (429)
//!   → security::limits     (413 / 400)
//!   → route handler (proxy, docs)
//! ```
//!
//! Every stage either hands the request to the next one or answers with a
//! [`GatewayError`](crate::error::GatewayError); a stage that answers stops
//! everything after it, the proxy included. Only the fault barrier knows
//! about panics.

pub mod recovery;
pub mod request_log;

use std::sync::Arc;

use axum::{middleware, Router};
use tower::ServiceBuilder;

use crate::config::GatewayConfig;
use crate::security::limits::size_guard_middleware;
use crate::security::rate_limit::{rate_limit_middleware, RateLimiter};

/// State shared by the chain's stages.
#[derive(Clone)]
pub struct ChainState {
    pub limiter: Arc<RateLimiter>,
    pub rate_limit_enabled: bool,
    pub trust_forwarded_headers: bool,
    pub max_body_bytes: usize,
    pub body_snapshot_bytes: usize,
}

impl ChainState {
    pub fn from_config(config: &GatewayConfig, limiter: Arc<RateLimiter>) -> Self {
        Self {
            limiter,
            rate_limit_enabled: config.rate_limit.enabled,
            trust_forwarded_headers: config.rate_limit.trust_forwarded_headers,
            max_body_bytes: config.security.max_body_size,
            body_snapshot_bytes: config.observability.body_snapshot_bytes,
        }
    }
}

/// Wrap every route of `router` in the chain, outermost stage first.
pub fn layer_chain<S>(router: Router<S>, chain: ChainState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(
        ServiceBuilder::new()
            .layer(middleware::from_fn(recovery::fault_barrier))
            .layer(middleware::from_fn_with_state(
                chain.clone(),
                request_log::request_log_middleware,
            ))
            .layer(middleware::from_fn_with_state(
                chain.clone(),
                rate_limit_middleware,
            ))
            .layer(middleware::from_fn_with_state(chain, size_guard_middleware)),
    )
}
