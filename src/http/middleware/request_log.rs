//! Request observability.
//!
//! One access record per exchange: method, path, route parameters, a capped
//! snapshot of the request body, final status and duration. The body is
//! tapped while it streams through to the later stages, so nothing is
//! buffered here and downstream sees every byte.
//!
//! A panic below this stage is logged as a 500 and then handed on unchanged
//! to the fault barrier, which owns the response.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    extract::{rejection::RawPathParamsRejection, RawPathParams, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use futures_util::{FutureExt, StreamExt};

use crate::http::middleware::ChainState;
use crate::http::request::request_id;

pub async fn request_log_middleware(
    State(chain): State<ChainState>,
    params: Result<RawPathParams, RawPathParamsRejection>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let id = request_id(request.headers()).to_owned();
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let params = params.map(|p| format_params(&p)).unwrap_or_default();

    let snapshot = BodySnapshot::new(chain.body_snapshot_bytes);
    let request = snapshot.tap(request);

    let record = |status: StatusCode| {
        tracing::info!(
            request_id = %id,
            method = %method,
            path = %path,
            params = %params,
            body = %snapshot.render(),
            status = status.as_u16(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Request handled"
        )
    };

    match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => {
            record(response.status());
            response
        }
        Err(panic) => {
            record(StatusCode::INTERNAL_SERVER_ERROR);
            std::panic::resume_unwind(panic)
        }
    }
}

fn format_params(params: &RawPathParams) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// First `cap` bytes of a request body, filled in as the body is consumed.
#[derive(Clone)]
struct BodySnapshot {
    cap: usize,
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl BodySnapshot {
    fn new(cap: usize) -> Self {
        Self {
            cap,
            bytes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Swap the body for one that copies into the snapshot as it is read.
    fn tap(&self, request: Request<Body>) -> Request<Body> {
        if self.cap == 0 {
            return request;
        }
        let (parts, body) = request.into_parts();
        let sink = self.clone();
        let stream = body.into_data_stream().map(move |chunk| {
            if let Ok(bytes) = &chunk {
                sink.record(bytes);
            }
            chunk
        });
        Request::from_parts(parts, Body::from_stream(stream))
    }

    fn record(&self, chunk: &Bytes) {
        if let Ok(mut bytes) = self.bytes.lock() {
            let room = self.cap.saturating_sub(bytes.len());
            bytes.extend_from_slice(&chunk[..room.min(chunk.len())]);
        }
    }

    fn render(&self) -> String {
        self.bytes
            .lock()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default()
    }
}
