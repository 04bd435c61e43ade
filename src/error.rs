//! Request-scoped error taxonomy.
//!
//! Every failure a request can hit is resolved into a [`GatewayError`] at the
//! boundary of that request and rendered as `{"error": ..., "details": ...}`.
//! Nothing here propagates past the middleware chain.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced to gateway callers.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Inbound path does not sit under the gateway prefix.
    #[error("Invalid request path")]
    InvalidPath,

    /// No route or gateway endpoint serves this path.
    #[error("Route not found")]
    NotFound,

    /// Body exceeded the configured ceiling.
    #[error("Request size exceeds limit")]
    PayloadTooLarge { limit: usize },

    /// Body could not be read (broken framing, client abort).
    #[error("Malformed request body")]
    MalformedBody(String),

    /// Client exhausted its quota for the current window.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Gateway-side setup defect, e.g. a malformed backend URL.
    /// Rendered without details.
    #[error("Service unavailable")]
    ServiceUnavailable,

    /// Backend unreachable, failed at the transport level or timed out.
    #[error("Service temporarily unavailable")]
    Upstream(String),

    /// Unexpected fault caught by the fault barrier.
    #[error("Internal Server Error")]
    Internal,
}

impl GatewayError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::InvalidPath | GatewayError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound => StatusCode::NOT_FOUND,
            GatewayError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::ServiceUnavailable | GatewayError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            GatewayError::PayloadTooLarge { limit } => Some(format!("limit is {} bytes", limit)),
            GatewayError::MalformedBody(reason) | GatewayError::Upstream(reason) => {
                Some(reason.clone())
            }
            _ => None,
        }
    }

    /// Structured body sent to the caller.
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
            details: self.details(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

/// Wire shape of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
