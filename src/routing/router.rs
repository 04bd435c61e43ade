//! Static route table.
//!
//! # Responsibilities
//! - Expand every configured route to its full public path
//! - Bind each (method, path) to the service that serves it
//! - Turn the table into axum routes dispatching to the proxy handler

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request},
    routing::{MethodFilter, MethodRouter},
    Router,
};

use crate::config::validation::{parse_method, route_shape};
use crate::config::GatewayConfig;
use crate::http::server::{preflight, proxy_handler, AppState};
use crate::proxy::ServiceTarget;

/// One method on one public path.
#[derive(Debug, Clone)]
pub struct RouteRule {
    pub method: Method,
    /// Full public path, prefix included (e.g. "/gateway/api/Products/{id}").
    pub path: String,
    pub service: Arc<ServiceTarget>,
}

/// Every proxied route, in configuration order.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
}

impl RouteTable {
    pub fn from_config(config: &GatewayConfig) -> Self {
        let prefix = &config.gateway.public_prefix;
        let mut seen = HashSet::new();
        let mut shapes: HashMap<String, String> = HashMap::new();
        let mut rules = Vec::new();

        for service in &config.services {
            let target = Arc::new(ServiceTarget {
                name: service.name.clone(),
                base_url: service.base_url.clone(),
                path_prefix: service.path_prefix.clone(),
            });

            for route in &service.routes {
                let path = format!("{}{}", prefix, route.path);
                let existing = shapes
                    .entry(route_shape(&path))
                    .or_insert_with(|| path.clone());
                if *existing != path {
                    tracing::warn!(path = %path, existing = %existing, "Skipping route that conflicts with an existing pattern");
                    continue;
                }
                for raw in &route.methods {
                    let Some(method) = parse_method(raw) else {
                        tracing::warn!(service = %service.name, method = %raw, "Skipping route with unknown method");
                        continue;
                    };
                    if !seen.insert((method.clone(), path.clone())) {
                        tracing::warn!(method = %method, path = %path, "Skipping duplicate route");
                        continue;
                    }
                    rules.push(RouteRule {
                        method,
                        path: path.clone(),
                        service: target.clone(),
                    });
                }
            }
        }

        Self { rules }
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Build the axum routes for this table.
    pub fn into_router(self) -> Router<AppState> {
        let mut by_path: BTreeMap<String, (MethodRouter<AppState>, bool)> = BTreeMap::new();

        for rule in self.rules {
            let Ok(filter) = MethodFilter::try_from(rule.method.clone()) else {
                continue;
            };
            let target = rule.service;
            let handler = move |State(state): State<AppState>, request: Request<Body>| {
                let target = target.clone();
                async move { proxy_handler(state, target, request).await }
            };

            let (method_router, has_options) = by_path
                .remove(&rule.path)
                .unwrap_or_else(|| (MethodRouter::new(), false));
            by_path.insert(
                rule.path,
                (
                    method_router.on(filter, handler),
                    has_options || rule.method == Method::OPTIONS,
                ),
            );
        }

        by_path
            .into_iter()
            .fold(Router::new(), |router, (path, (method_router, has_options))| {
                let method_router = if has_options {
                    method_router
                } else {
                    method_router.options(preflight)
                };
                router.route(&path, method_router)
            })
    }
}
