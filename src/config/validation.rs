//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (windows > 0, limits > 0, timeouts > 0)
//! - Check route patterns are ones the router can compile
//! - Detect duplicate routes, same-shape routes and duplicate services
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system
//! - Backend base URLs are not checked here; a malformed one is answered
//!   with 500 by the proxy at request time

use std::collections::{HashMap, HashSet};

use axum::http::Method;
use axum::routing::MethodFilter;
use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// Paths the gateway serves itself under the public prefix.
pub const RESERVED_PATHS: [&str; 2] = ["/docs/doc.json", "/docs/index.html"];

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("public prefix '{0}' must start with '/' and must not end with '/'")]
    InvalidPublicPrefix(String),

    #[error("rate limit window must be greater than zero")]
    ZeroWindow,

    #[error("rate limit must allow at least one request per window")]
    ZeroRequestLimit,

    #[error("max body size must be greater than zero")]
    ZeroBodyLimit,

    #[error("timeout '{0}' must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("service name '{0}' is empty or defined more than once")]
    DuplicateService(String),

    #[error("service '{service}': path prefix '{prefix}' must be empty or start with '/'")]
    InvalidPathPrefix { service: String, prefix: String },

    #[error("service '{service}': unsupported method '{method}'")]
    InvalidMethod { service: String, method: String },

    #[error("service '{service}': route '{path}' {reason}")]
    InvalidRoutePath {
        service: String,
        path: String,
        reason: &'static str,
    },

    #[error("route {method} {path} is defined more than once")]
    DuplicateRoute { method: String, path: String },

    #[error("route '{path}' has the same shape as '{existing}' with different parameter names")]
    ConflictingRoute { path: String, existing: String },

    #[error("route '{0}' collides with a path served by the gateway itself")]
    ReservedRoute(String),
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let prefix = &config.gateway.public_prefix;
    if !prefix.starts_with('/') || prefix.ends_with('/') {
        errors.push(ValidationError::InvalidPublicPrefix(prefix.clone()));
    }

    if config.rate_limit.enabled {
        if config.rate_limit.window_secs == 0 {
            errors.push(ValidationError::ZeroWindow);
        }
        if config.rate_limit.requests_per_window == 0 {
            errors.push(ValidationError::ZeroRequestLimit);
        }
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    for (name, value) in [
        ("connect_secs", config.timeouts.connect_secs),
        ("upstream_secs", config.timeouts.upstream_secs),
        ("docs_secs", config.timeouts.docs_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout(name));
        }
    }

    let mut service_names = HashSet::new();
    let mut routes = HashSet::new();
    let mut shapes: HashMap<String, &str> = HashMap::new();

    for service in &config.services {
        if service.name.is_empty() || !service_names.insert(service.name.as_str()) {
            errors.push(ValidationError::DuplicateService(service.name.clone()));
        }

        if !service.path_prefix.is_empty() && !service.path_prefix.starts_with('/') {
            errors.push(ValidationError::InvalidPathPrefix {
                service: service.name.clone(),
                prefix: service.path_prefix.clone(),
            });
        }

        for route in &service.routes {
            if let Err(reason) = check_route_path(&route.path) {
                errors.push(ValidationError::InvalidRoutePath {
                    service: service.name.clone(),
                    path: route.path.clone(),
                    reason,
                });
                continue;
            }

            if RESERVED_PATHS.contains(&route.path.as_str()) {
                errors.push(ValidationError::ReservedRoute(route.path.clone()));
                continue;
            }

            let existing = *shapes
                .entry(route_shape(&route.path))
                .or_insert(route.path.as_str());
            if existing != route.path {
                errors.push(ValidationError::ConflictingRoute {
                    path: route.path.clone(),
                    existing: existing.to_string(),
                });
                continue;
            }

            for method in &route.methods {
                let Some(method) = parse_method(method) else {
                    errors.push(ValidationError::InvalidMethod {
                        service: service.name.clone(),
                        method: method.clone(),
                    });
                    continue;
                };

                if !routes.insert((method.clone(), route.path.as_str())) {
                    errors.push(ValidationError::DuplicateRoute {
                        method: method.to_string(),
                        path: route.path.clone(),
                    });
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Parse a configured method name into one the router can dispatch on.
pub fn parse_method(raw: &str) -> Option<Method> {
    let method = Method::from_bytes(raw.trim().to_ascii_uppercase().as_bytes()).ok()?;
    MethodFilter::try_from(method.clone()).ok()?;
    Some(method)
}

/// `path` with every parameter name erased: `/Items/{id}` becomes `/Items/{}`.
///
/// Two routes with the same shape but different text cannot share a router.
pub fn route_shape(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(inner) if inner.starts_with('*') => "{*}",
                Some(_) => "{}",
                None => segment,
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn check_route_path(path: &str) -> Result<(), &'static str> {
    if !path.starts_with('/') {
        return Err("must start with '/'");
    }

    let segments: Vec<&str> = path[1..].split('/').collect();
    let last = segments.len() - 1;

    for (i, segment) in segments.iter().enumerate() {
        if segment.starts_with(':') {
            return Err("uses ':param' syntax; use '{param}'");
        }
        if segment.starts_with('*') {
            return Err("uses '*wildcard' syntax; use '{*wildcard}'");
        }
        if segment.contains('{') || segment.contains('}') {
            let inner = segment
                .strip_prefix('{')
                .and_then(|s| s.strip_suffix('}'))
                .ok_or("has a malformed '{param}' segment")?;
            let name = inner.strip_prefix('*').unwrap_or(inner);
            if name.is_empty() || name.contains(['{', '}', '*']) {
                return Err("has a malformed '{param}' segment");
            }
            if inner.starts_with('*') && i != last {
                return Err("may only use a wildcard in its last segment");
            }
        }
    }

    Ok(())
}
