//! Per-client rate limiting with a fixed-window counter.
//!
//! Each client identity owns a [`ClientWindowCounter`]. On every call the
//! counter's window is checked first and reset if it has elapsed, then the
//! count is incremented and compared against the limit. There are no
//! per-request timers.
//!
//! This is a fixed window, not a sliding one: a burst straddling a window
//! boundary can let through up to twice the limit in a short span. That is
//! an accepted approximation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::error::GatewayError;
use crate::http::middleware::ChainState;
use crate::http::request::{client_identity, request_id};
use crate::observability::metrics;

/// Time source for window bookkeeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Request count of one client within its current window.
#[derive(Debug, Clone, Copy)]
struct ClientWindowCounter {
    count: u64,
    window_start: Instant,
}

impl ClientWindowCounter {
    fn new(now: Instant) -> Self {
        Self {
            count: 0,
            window_start: now,
        }
    }
}

/// Shared table of per-client counters.
///
/// Counters live in a sharded map, so updates for one client only contend
/// with clients hashed to the same shard.
pub struct RateLimiter {
    limit: u64,
    window: Duration,
    counters: DashMap<String, ClientWindowCounter>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(limit: u64, window: Duration) -> Self {
        Self::with_clock(limit, window, Arc::new(SystemClock))
    }

    pub fn with_clock(limit: u64, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            limit,
            window,
            counters: DashMap::new(),
            clock,
        }
    }

    /// Count one request from `client_id`; returns false once the client
    /// has gone over the limit for the current window.
    pub fn allow(&self, client_id: &str) -> bool {
        let now = self.clock.now();

        // The entry guard holds the shard's write lock for the whole
        // read-modify-write.
        let mut counter = match self.counters.get_mut(client_id) {
            Some(counter) => counter,
            None => self
                .counters
                .entry(client_id.to_owned())
                .or_insert_with(|| ClientWindowCounter::new(now)),
        };

        if now.saturating_duration_since(counter.window_start) >= self.window {
            counter.count = 0;
            counter.window_start = now;
        }

        counter.count = counter.count.saturating_add(1);
        counter.count <= self.limit
    }

    /// Drop counters whose window has already elapsed. Returns how many
    /// were removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;
        self.counters.retain(|_, counter| {
            let live = now.saturating_duration_since(counter.window_start) < self.window;
            if !live {
                removed += 1;
            }
            live
        });
        removed
    }

    /// Number of client identities currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.counters.len()
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Spawn the idle-client sweeper. Runs once per window until shutdown.
    pub fn spawn_sweeper(self: &Arc<Self>, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(limiter.window);
            // First tick completes immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = limiter.sweep();
                        if removed > 0 {
                            tracing::debug!(
                                removed,
                                tracked = limiter.tracked_clients(),
                                "Evicted idle rate limit counters"
                            );
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::debug!("Rate limit sweeper stopping");
                        break;
                    }
                }
            }
        })
    }
}

/// Middleware stage: rejects with 429 once the caller's quota is spent.
pub async fn rate_limit_middleware(
    State(chain): State<ChainState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match admit(&chain, request) {
        Ok(request) => next.run(request).await,
        Err(err) => err.into_response(),
    }
}

fn admit(chain: &ChainState, request: Request<Body>) -> Result<Request<Body>, GatewayError> {
    if !chain.rate_limit_enabled {
        return Ok(request);
    }

    let client = client_identity(&request, chain.trust_forwarded_headers);
    if chain.limiter.allow(&client) {
        return Ok(request);
    }

    tracing::warn!(
        request_id = %request_id(request.headers()),
        client = %client,
        limit = chain.limiter.limit(),
        window_secs = chain.limiter.window().as_secs(),
        "Rate limit exceeded"
    );
    metrics::record_rate_limited();
    Err(GatewayError::RateLimited)
}
