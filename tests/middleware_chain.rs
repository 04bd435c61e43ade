//! Middleware chain ordering and short-circuit behavior.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use api_gateway::http::middleware::{layer_chain, ChainState};
use api_gateway::security::RateLimiter;
use api_gateway::HttpServer;
use axum::{
    body::{Body, Bytes},
    extract::ConnectInfo,
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use tower::ServiceExt;

mod common;
use common::*;

fn from_client(mut request: Request<Body>, ip: &str) -> Request<Body> {
    let addr: SocketAddr = format!("{}:40000", ip).parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(addr));
    request
}

fn products(base_url: &str) -> api_gateway::config::ServiceConfig {
    service(
        "catalog",
        base_url,
        "/api",
        vec![route("/Products", &["GET", "POST"])],
    )
}

#[tokio::test]
async fn test_oversized_body_rejected_before_proxy() {
    let (backend, hits) = start_echo_backend().await;
    let mut config = gateway_config(vec![products(&format!("http://{}", backend))]);
    config.security.max_body_size = 16;
    let server = HttpServer::new(config).unwrap();

    let response = server
        .router()
        .oneshot(Request::post("/gw/Products").body(Body::from(vec![b'x'; 17])).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body_json(response).await["error"], "Request size exceeds limit");

    // No Content-Length: counted while streaming.
    let stream = futures_util::stream::iter(vec![
        Ok::<_, Infallible>(Bytes::from_static(b"0123456789")),
        Ok(Bytes::from_static(b"0123456789")),
    ]);
    let response = server
        .router()
        .oneshot(Request::post("/gw/Products").body(Body::from_stream(stream)).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_body_at_limit_is_forwarded() {
    let (backend, hits) = start_echo_backend().await;
    let mut config = gateway_config(vec![products(&format!("http://{}", backend))]);
    config.security.max_body_size = 16;
    let server = HttpServer::new(config).unwrap();

    let response = server
        .router()
        .oneshot(Request::post("/gw/Products").body(Body::from(vec![b'y'; 16])).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["body"], "y".repeat(16));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_rate_limit_per_client() {
    let (backend, hits) = start_echo_backend().await;
    let mut config = gateway_config(vec![products(&format!("http://{}", backend))]);
    config.rate_limit.requests_per_window = 3;
    config.rate_limit.window_secs = 60;
    let server = HttpServer::new(config).unwrap();
    let router = server.router();

    for _ in 0..3 {
        let request = from_client(Request::get("/gw/Products").body(Body::empty()).unwrap(), "10.0.0.1");
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let request = from_client(Request::get("/gw/Products").body(Body::empty()).unwrap(), "10.0.0.1");
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body_json(response).await["error"], "Rate limit exceeded");

    let request = from_client(Request::get("/gw/Products").body(Body::empty()).unwrap(), "10.0.0.2");
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(hits.load(Ordering::SeqCst), 4);
    assert_eq!(server.limiter().tracked_clients(), 2);
}

#[tokio::test]
async fn test_rate_limit_runs_before_size_guard() {
    let (backend, _) = start_echo_backend().await;
    let mut config = gateway_config(vec![products(&format!("http://{}", backend))]);
    config.rate_limit.requests_per_window = 1;
    config.security.max_body_size = 4;
    let server = HttpServer::new(config).unwrap();
    let router = server.router();

    let oversized = || {
        from_client(
            Request::post("/gw/Products").body(Body::from("too large")).unwrap(),
            "10.0.0.9",
        )
    };

    let response = router.clone().oneshot(oversized()).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let response = router.oneshot(oversized()).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_disabled_rate_limit_admits_everything() {
    let (backend, _) = start_echo_backend().await;
    let mut config = gateway_config(vec![products(&format!("http://{}", backend))]);
    config.rate_limit.enabled = false;
    config.rate_limit.requests_per_window = 1;
    let server = HttpServer::new(config).unwrap();

    for _ in 0..5 {
        let response = server
            .router()
            .oneshot(Request::get("/gw/Products").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(server.limiter().tracked_clients(), 0);
}

async fn exploding_handler() -> &'static str {
    panic!("handler exploded")
}

async fn exploding_stage(_request: Request<Body>, _next: Next) -> Response {
    panic!("stage exploded");
}

fn chained_app() -> Router {
    let config = gateway_config(Vec::new());
    let limiter = Arc::new(RateLimiter::new(100, Duration::from_secs(60)));

    let app = Router::new()
        .route("/ok", get(|| async { "fine" }))
        .route("/boom", get(exploding_handler))
        .route(
            "/stage",
            get(|| async { "unreachable" }).layer(middleware::from_fn(exploding_stage)),
        );

    layer_chain(app, ChainState::from_config(&config, limiter))
}

#[tokio::test]
async fn test_panics_become_500_and_service_continues() {
    let app = chained_app();

    for path in ["/boom", "/stage"] {
        let response = app
            .clone()
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR, "{}", path);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Internal Server Error");
        assert!(body.get("details").is_none());
    }

    let response = app
        .oneshot(Request::get("/ok").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limit_over_real_socket() {
    let (backend, _) = start_echo_backend().await;
    let mut config = gateway_config(vec![products(&format!("http://{}", backend))]);
    config.rate_limit.requests_per_window = 2;
    let (gateway, shutdown) = start_gateway(config).await;
    let client = http_client();
    let url = format!("http://{}/gw/Products", gateway);

    let mut statuses = Vec::new();
    for _ in 0..3 {
        statuses.push(client.get(&url).send().await.unwrap().status().as_u16());
    }
    assert_eq!(statuses, vec![200, 200, 429]);

    shutdown.trigger();
}
