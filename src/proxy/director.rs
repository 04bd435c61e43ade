//! Request director.
//!
//! # Responsibilities
//! - Validate the backend base URL before any network activity
//! - Rewrite the public path onto the backend's own API prefix
//! - Point `Host` at the backend and record the original caller
//! - Relay the exchange and stream the backend response back verbatim
//!
//! # Design Decisions
//! - One attempt per request: a failed or late upstream is a 502, never a retry
//! - One deadline covers the response head and the streamed body
//! - The prefix only matches at a segment boundary (`/gw` does not match `/gwx`)
//! - Dropping the returned future cancels the in-flight upstream call

use std::error::Error as StdError;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header::HOST, HeaderValue, Request, StatusCode, Uri, Version},
    response::Response,
};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::time::Instant;
use url::{Position, Url};

use crate::config::TimeoutConfig;
use crate::error::GatewayError;
use crate::http::request::request_id;
use crate::http::response::annotate_upstream;
use crate::proxy::deadline::DeadlineBody;
use crate::security::headers::{append_forwarded, strip_hop_by_hop};

/// A backend a route forwards to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceTarget {
    pub name: String,
    pub base_url: String,
    pub path_prefix: String,
}

/// What happened to one forwarded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyOutcome {
    /// The backend answered with this status.
    Forwarded(StatusCode),
    /// The gateway answered itself.
    Rejected { status: StatusCode, reason: String },
}

/// One request's trip through the director. Dropped with the request.
#[derive(Debug, Clone)]
pub struct ProxyRequestContext {
    pub request_id: String,
    pub service: String,
    pub inbound_path: String,
    /// Set once the backend URL has been resolved.
    pub upstream: Option<Uri>,
    pub started: Instant,
}

impl ProxyRequestContext {
    fn new(request: &Request<Body>, target: &ServiceTarget) -> Self {
        Self {
            request_id: request_id(request.headers()).to_owned(),
            service: target.name.clone(),
            inbound_path: request.uri().path().to_owned(),
            upstream: None,
            started: Instant::now(),
        }
    }

    /// Log `outcome` with everything known about the request.
    pub fn record(&self, outcome: &ProxyOutcome) {
        let upstream = self
            .upstream
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        let elapsed_ms = self.started.elapsed().as_millis() as u64;

        match outcome {
            ProxyOutcome::Forwarded(status) => tracing::debug!(
                request_id = %self.request_id,
                service = %self.service,
                path = %self.inbound_path,
                upstream = %upstream,
                status = status.as_u16(),
                elapsed_ms,
                "Request forwarded"
            ),
            ProxyOutcome::Rejected { status, reason } if status.is_server_error() => {
                tracing::warn!(
                    request_id = %self.request_id,
                    service = %self.service,
                    path = %self.inbound_path,
                    upstream = %upstream,
                    status = status.as_u16(),
                    reason = %reason,
                    elapsed_ms,
                    "Request rejected"
                )
            }
            ProxyOutcome::Rejected { status, reason } => tracing::info!(
                request_id = %self.request_id,
                service = %self.service,
                path = %self.inbound_path,
                status = status.as_u16(),
                reason = %reason,
                "Request rejected"
            ),
        }
    }

    fn reject(&self, err: GatewayError, reason: impl Into<String>) -> GatewayError {
        self.record(&ProxyOutcome::Rejected {
            status: err.status(),
            reason: reason.into(),
        });
        err
    }
}

/// Forwards matched requests to their backend service.
pub struct Director {
    client: Client<HttpsConnector<HttpConnector>, Body>,
    gateway_prefix: String,
    timeout: Duration,
}

impl Director {
    pub fn new(gateway_prefix: impl Into<String>, timeouts: &TimeoutConfig) -> Self {
        let mut http = HttpConnector::new();
        http.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
        http.set_nodelay(true);
        http.enforce_http(false);

        let connector = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .wrap_connector(http);

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            gateway_prefix: gateway_prefix.into(),
            timeout: Duration::from_secs(timeouts.upstream_secs),
        }
    }

    /// Forward `request` to `target` and return the backend's response.
    pub async fn forward(
        &self,
        target: &ServiceTarget,
        request: Request<Body>,
    ) -> Result<Response, GatewayError> {
        let mut ctx = ProxyRequestContext::new(&request, target);
        let deadline = ctx.started + self.timeout;

        let Some(base) = parse_base_url(&target.base_url) else {
            return Err(ctx.reject(
                GatewayError::ServiceUnavailable,
                format!("base URL '{}' is not an absolute http(s) URL", target.base_url),
            ));
        };

        let Some(path) = rewrite_path(request.uri().path(), &self.gateway_prefix, &target.path_prefix)
        else {
            return Err(ctx.reject(
                GatewayError::InvalidPath,
                "path is outside the gateway prefix",
            ));
        };

        let authority = &base[Position::BeforeHost..Position::AfterPort];
        let uri = match backend_uri(&base, authority, &path, request.uri().query()) {
            Ok(uri) => uri,
            Err(err) => return Err(ctx.reject(err, "rewritten path is not a valid URI")),
        };
        ctx.upstream = Some(uri.clone());

        let client_ip = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        let (mut parts, body) = request.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        append_forwarded(&mut parts.headers, client_ip, "http");
        let Ok(host) = HeaderValue::from_str(authority) else {
            return Err(ctx.reject(
                GatewayError::ServiceUnavailable,
                "backend authority is not a valid Host header",
            ));
        };
        parts.headers.insert(HOST, host);
        parts.uri = uri;
        parts.version = Version::HTTP_11;

        let upstream = self.client.request(Request::from_parts(parts, body));
        match tokio::time::timeout_at(deadline, upstream).await {
            Ok(Ok(response)) => {
                let (mut parts, body) = response.into_parts();
                strip_hop_by_hop(&mut parts.headers);
                annotate_upstream(&mut parts.headers, &target.name);
                ctx.record(&ProxyOutcome::Forwarded(parts.status));
                let body = DeadlineBody::new(body, deadline, self.timeout);
                Ok(Response::from_parts(parts, Body::new(body)))
            }
            Ok(Err(err)) => {
                let reason = error_chain(&err);
                Err(ctx.reject(GatewayError::Upstream(reason.clone()), reason))
            }
            Err(_) => {
                let reason = format!(
                    "upstream did not respond within {}s",
                    self.timeout.as_secs()
                );
                Err(ctx.reject(GatewayError::Upstream(reason.clone()), reason))
            }
        }
    }
}

/// An absolute http or https URL with a host, or `None`.
pub fn parse_base_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw).ok()?;
    let supported = matches!(url.scheme(), "http" | "https");
    (supported && url.host_str().is_some_and(|h| !h.is_empty())).then_some(url)
}

/// Swap `gateway_prefix` for `backend_prefix` at the front of `path`.
///
/// `None` when `path` does not start with `gateway_prefix` at a segment
/// boundary. The remainder of the path is kept byte for byte.
pub fn rewrite_path(path: &str, gateway_prefix: &str, backend_prefix: &str) -> Option<String> {
    let rest = path.strip_prefix(gateway_prefix)?;
    if !rest.is_empty() && !rest.starts_with('/') {
        return None;
    }

    let mut rewritten = backend_prefix.trim_end_matches('/').to_string();
    rewritten.push_str(rest);
    if rewritten.is_empty() {
        rewritten.push('/');
    }
    Some(rewritten)
}

fn backend_uri(
    base: &Url,
    authority: &str,
    path: &str,
    query: Option<&str>,
) -> Result<Uri, GatewayError> {
    let mut target = format!(
        "{}://{}{}{}",
        base.scheme(),
        authority,
        base.path().trim_end_matches('/'),
        path
    );
    if let Some(query) = query {
        target.push('?');
        target.push_str(query);
    }
    target.parse().map_err(|_| GatewayError::InvalidPath)
}

fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    fn director(prefix: &str) -> Director {
        Director::new(prefix, &TimeoutConfig::default())
    }

    fn target(base_url: &str, path_prefix: &str) -> ServiceTarget {
        ServiceTarget {
            name: "product".to_string(),
            base_url: base_url.to_string(),
            path_prefix: path_prefix.to_string(),
        }
    }

    #[test]
    fn test_rewrite_path() {
        assert_eq!(
            rewrite_path("/gw/Products/7", "/gw", "/svc/api").as_deref(),
            Some("/svc/api/Products/7")
        );
        assert_eq!(
            rewrite_path("/gateway/api/Orders/3/status", "/gateway/api", "/api").as_deref(),
            Some("/api/Orders/3/status")
        );
        assert_eq!(rewrite_path("/gw", "/gw", "").as_deref(), Some("/"));
        assert_eq!(rewrite_path("/gw/x", "/gw", "/").as_deref(), Some("/x"));
    }

    #[test]
    fn test_rewrite_path_rejects_foreign_paths() {
        assert_eq!(rewrite_path("/other/Products", "/gw", "/svc/api"), None);
        assert_eq!(rewrite_path("/gwx/Products", "/gw", "/svc/api"), None);
    }

    #[test]
    fn test_rewrite_only_touches_the_leading_prefix() {
        assert_eq!(
            rewrite_path("/gw/Tags/gw/1", "/gw", "/api").as_deref(),
            Some("/api/Tags/gw/1")
        );
    }

    #[test]
    fn test_parse_base_url() {
        assert!(parse_base_url("http://product-service:8080").is_some());
        assert!(parse_base_url("https://10.0.0.1").is_some());
        assert!(parse_base_url("product-service:8080").is_none());
        assert!(parse_base_url("://nope").is_none());
        assert!(parse_base_url("ftp://files.local").is_none());
        assert!(parse_base_url("").is_none());
    }

    #[test]
    fn test_backend_uri_keeps_base_path_and_query() {
        let base = Url::parse("http://svc.local:9000/root/").unwrap();
        let authority = &base[Position::BeforeHost..Position::AfterPort];
        let uri = backend_uri(&base, authority, "/api/Products", Some("page=2&q=a%20b")).unwrap();
        assert_eq!(uri.to_string(), "http://svc.local:9000/root/api/Products?page=2&q=a%20b");
    }

    #[tokio::test]
    async fn test_foreign_path_is_rejected_without_network() {
        let request = Request::get("/other/Products").body(Body::empty()).unwrap();
        let err = director("/gw")
            .forward(&target("http://127.0.0.1:1", "/svc/api"), request)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidPath));
    }

    #[tokio::test]
    async fn test_malformed_base_url_is_service_unavailable() {
        let request = Request::get("/gw/Products").body(Body::empty()).unwrap();
        let err = director("/gw")
            .forward(&target("not a url", "/api"), request)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::ServiceUnavailable));
        assert!(err.body().details.is_none());
    }

    #[test]
    fn test_context_tracks_inbound_path() {
        let request = Request::get("/gw/Products?page=2")
            .header("x-request-id", "abc")
            .body(Body::empty())
            .unwrap();
        let ctx = ProxyRequestContext::new(&request, &target("http://svc", "/api"));
        assert_eq!(ctx.request_id, "abc");
        assert_eq!(ctx.service, "product");
        assert_eq!(ctx.inbound_path, "/gw/Products");
        assert!(ctx.upstream.is_none());
    }

    #[tokio::test]
    async fn test_https_scheme_reaches_the_network() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let request = Request::get("/gw/Products").body(Body::empty()).unwrap();
        let err = director("/gw")
            .forward(&target(&format!("https://{}", addr), "/api"), request)
            .await
            .unwrap_err();

        let details = err.body().details.unwrap_or_default();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_GATEWAY);
        assert!(!details.contains("scheme is not http"), "{}", details);
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_upstream_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let request = Request::get("/gw/Products").body(Body::empty()).unwrap();
        let err = director("/gw")
            .forward(&target(&format!("http://{}", addr), "/api"), request)
            .await
            .unwrap_err();

        assert_eq!(err.status(), axum::http::StatusCode::BAD_GATEWAY);
        assert!(err.body().details.is_some());
    }
}
