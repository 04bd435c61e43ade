//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the axum Router: proxied routes, documentation endpoints, fallback
//! - Wire up the middleware chain and the request-id / trace layers
//! - Bind the server to a listener and stop on the shutdown broadcast
//! - Run the rate limiter's idle-counter sweeper alongside the server

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::docs::handlers::{doc_index, doc_json};
use crate::docs::{DocAggregator, DocInfo, DocSource, DocsError};
use crate::error::GatewayError;
use crate::http::middleware::{layer_chain, ChainState};
use crate::http::request::MakeRequestUuid;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::proxy::director::parse_base_url;
use crate::proxy::{Director, ServiceTarget};
use crate::routing::RouteTable;
use crate::security::RateLimiter;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub director: Arc<Director>,
    pub docs: Arc<DocAggregator>,
    pub doc_sources: Arc<[DocSource]>,
    pub public_prefix: Arc<str>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    limiter: Arc<RateLimiter>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, DocsError> {
        let limiter = Arc::new(RateLimiter::new(
            config.rate_limit.requests_per_window,
            Duration::from_secs(config.rate_limit.window_secs),
        ));

        for service in &config.services {
            if parse_base_url(&service.base_url).is_none() {
                tracing::warn!(
                    service = %service.name,
                    base_url = %service.base_url,
                    "Backend base URL is malformed; requests to this service will fail with 500"
                );
            }
        }

        let director = Arc::new(Director::new(
            config.gateway.public_prefix.clone(),
            &config.timeouts,
        ));
        let docs = Arc::new(DocAggregator::new(
            Duration::from_secs(config.timeouts.docs_secs),
            DocInfo {
                title: config.docs.title.clone(),
                version: config.docs.version.clone(),
            },
        )?);

        let state = AppState {
            director,
            docs,
            doc_sources: DocSource::from_config(&config).into(),
            public_prefix: config.gateway.public_prefix.as_str().into(),
        };

        let router = Self::build_router(&config, state, limiter.clone());
        Ok(Self {
            router,
            config,
            limiter,
        })
    }

    /// Build the axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState, limiter: Arc<RateLimiter>) -> Router {
        let prefix = &config.gateway.public_prefix;
        let routes = RouteTable::from_config(config);
        tracing::info!(
            routes = routes.len(),
            services = config.services.len(),
            public_prefix = %prefix,
            "Route table compiled"
        );

        let app = routes
            .into_router()
            .route(
                &format!("{}/docs/doc.json", prefix),
                get(doc_json).options(preflight),
            )
            .route(
                &format!("{}/docs/index.html", prefix),
                get(doc_index).options(preflight),
            )
            .fallback(unmatched)
            .with_state(state);

        layer_chain(app, ChainState::from_config(config, limiter)).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
    }

    /// The fully layered router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn limiter(&self) -> Arc<RateLimiter> {
        self.limiter.clone()
    }

    /// Run the server, accepting connections until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: &Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        let sweeper = self
            .config
            .rate_limit
            .enabled
            .then(|| self.limiter.spawn_sweeper(shutdown.subscribe()));

        let mut stop = shutdown.subscribe();
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        if let Some(sweeper) = sweeper {
            let _ = sweeper.await;
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Forward a routed request and record its outcome.
pub async fn proxy_handler(
    state: AppState,
    target: Arc<ServiceTarget>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();

    match state.director.forward(&target, request).await {
        Ok(response) => {
            metrics::record_request(&method, response.status().as_u16(), &target.name, start);
            response
        }
        Err(err) => {
            metrics::record_request(&method, err.status().as_u16(), &target.name, start);
            err.into_response()
        }
    }
}

/// CORS preflight: always 200, no body.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn unmatched(method: Method) -> Response {
    if method == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        GatewayError::NotFound.into_response()
    }
}
