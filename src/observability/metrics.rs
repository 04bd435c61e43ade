//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): proxied requests by method, status, service
//! - `gateway_request_duration_seconds` (histogram): proxied request latency by service
//! - `gateway_rate_limited_total` (counter): requests rejected by the rate limiter
//! - `gateway_payload_rejected_total` (counter): bodies rejected by the size guard, by status
//! - `gateway_panics_total` (counter): panics caught by the fault barrier
//! - `gateway_docs_fetch_total` (counter): documentation fetches by service, outcome
//!
//! Until [`init_metrics`] installs the exporter every `record_*` call is a no-op,
//! which keeps tests free of global recorder setup.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener on `addr`.
///
/// Must run inside the Tokio runtime; the exporter task is spawned on it.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    describe();
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

fn describe() {
    describe_counter!("gateway_requests_total", "Proxied requests by method, status and service");
    describe_histogram!(
        "gateway_request_duration_seconds",
        "Latency of proxied requests in seconds"
    );
    describe_counter!("gateway_rate_limited_total", "Requests rejected by the rate limiter");
    describe_counter!("gateway_payload_rejected_total", "Request bodies rejected by the size guard");
    describe_counter!("gateway_panics_total", "Panics caught by the fault barrier");
    describe_counter!("gateway_docs_fetch_total", "Backend documentation fetches by outcome");
}

pub fn record_request(method: &str, status: u16, service: &str, start: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "service" => service.to_string()
    )
    .increment(1);
    histogram!(
        "gateway_request_duration_seconds",
        "service" => service.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    counter!("gateway_rate_limited_total").increment(1);
}

pub fn record_payload_rejected(status: u16) {
    counter!("gateway_payload_rejected_total", "status" => status.to_string()).increment(1);
}

pub fn record_panic() {
    counter!("gateway_panics_total").increment(1);
}

/// `outcome` is one of `ok`, `unreachable`, `status`, `decode`.
pub fn record_docs_fetch(service: &str, outcome: &'static str) {
    counter!(
        "gateway_docs_fetch_total",
        "service" => service.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}
