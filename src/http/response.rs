//! Response annotation.
//!
//! # Responsibilities
//! - Tag proxied responses with the service that produced them
//!
//! # Design Decisions
//! - Backend status, headers and body otherwise pass through untouched
//! - `X-Request-Id` is echoed by the request-id layer, not here

use axum::http::{HeaderMap, HeaderValue};

pub const X_GATEWAY_UPSTREAM: &str = "x-gateway-upstream";

/// Record which service answered.
pub fn annotate_upstream(headers: &mut HeaderMap, service: &str) {
    if let Ok(value) = HeaderValue::from_str(service) {
        headers.insert(X_GATEWAY_UPSTREAM, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotate_overwrites_backend_value() {
        let mut headers = HeaderMap::new();
        headers.insert(X_GATEWAY_UPSTREAM, HeaderValue::from_static("spoofed"));

        annotate_upstream(&mut headers, "product");

        assert_eq!(headers.get_all(X_GATEWAY_UPSTREAM).iter().count(), 1);
        assert_eq!(headers[X_GATEWAY_UPSTREAM], "product");
    }
}
