//! Fault barrier.
//!
//! Outermost stage of the chain. Any panic raised further down (later
//! stages, handlers, the proxy) is caught here and answered with an opaque
//! 500. The panic message is logged server-side only. No retry.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use axum::{
    body::Body,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures_util::FutureExt;

use crate::error::GatewayError;
use crate::http::request::request_id;
use crate::observability::metrics;

pub async fn fault_barrier(request: Request<Body>, next: Next) -> Response {
    let id = request_id(request.headers()).to_owned();
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => {
            tracing::error!(
                request_id = %id,
                method = %method,
                path = %path,
                panic = %panic_message(panic.as_ref()),
                "Recovered from panic while handling request"
            );
            metrics::record_panic();
            GatewayError::Internal.into_response()
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
