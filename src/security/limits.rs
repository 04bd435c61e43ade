//! Request body size enforcement.
//!
//! # Responsibilities
//! - Reject bodies whose declared Content-Length exceeds the ceiling
//! - Read the full body with a running count, aborting as soon as the
//!   ceiling is crossed (slow or chunked uploads cannot slip past)
//! - Hand the buffered body to the next stage unchanged
//!
//! # Design Decisions
//! - Limit checked before reading when the length is declared (early rejection)
//! - 413 for oversized bodies, 400 for bodies that cannot be read

use axum::{
    body::Body,
    extract::State,
    http::{header::CONTENT_LENGTH, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures_util::StreamExt;

use crate::error::GatewayError;
use crate::http::middleware::ChainState;
use crate::http::request::request_id;
use crate::observability::metrics;

/// Middleware stage wrapping the size guard.
pub async fn size_guard_middleware(
    State(chain): State<ChainState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let id = request_id(request.headers()).to_owned();
    match enforce_body_limit(request, chain.max_body_bytes).await {
        Ok(request) => next.run(request).await,
        Err(err) => {
            tracing::warn!(
                request_id = %id,
                limit = chain.max_body_bytes,
                error = %err,
                "Request body rejected"
            );
            metrics::record_payload_rejected(err.status().as_u16());
            err.into_response()
        }
    }
}

/// Buffer the body, failing once more than `limit` bytes have arrived.
pub async fn enforce_body_limit(
    request: Request<Body>,
    limit: usize,
) -> Result<Request<Body>, GatewayError> {
    if declared_length(request.headers()).is_some_and(|len| len > limit as u64) {
        return Err(GatewayError::PayloadTooLarge { limit });
    }

    let (parts, body) = request.into_parts();
    let mut stream = body.into_data_stream();
    let mut buffered = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| GatewayError::MalformedBody(e.to_string()))?;
        if buffered.len() + chunk.len() > limit {
            return Err(GatewayError::PayloadTooLarge { limit });
        }
        buffered.extend_from_slice(&chunk);
    }

    Ok(Request::from_parts(parts, Body::from(buffered)))
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}
