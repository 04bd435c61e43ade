//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the API gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Public surface of the gateway.
    pub gateway: GatewaySettings,

    /// Backend services and the routes forwarded to them.
    pub services: Vec<ServiceConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Request size limits.
    pub security: SecurityConfig,

    /// Aggregated documentation envelope.
    pub docs: DocsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            gateway: GatewaySettings::default(),
            services: default_services(),
            timeouts: TimeoutConfig::default(),
            rate_limit: RateLimitConfig::default(),
            security: SecurityConfig::default(),
            docs: DocsConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Public routing settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewaySettings {
    /// Prefix every public route lives under (e.g., "/gateway/api").
    pub public_prefix: String,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            public_prefix: "/gateway/api".to_string(),
        }
    }
}

/// One logical backend service with exactly one upstream URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Service identifier for logging/metrics and env overrides.
    pub name: String,

    /// Upstream base URL (e.g., "http://product-service:8080").
    pub base_url: String,

    /// Path prefix the backend serves its API under.
    #[serde(default = "default_path_prefix")]
    pub path_prefix: String,

    /// Path of the backend's documentation payload, relative to `base_url`.
    #[serde(default)]
    pub docs_path: Option<String>,

    /// Routes forwarded to this service, relative to the public prefix.
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

impl ServiceConfig {
    /// Absolute documentation URL, when the service publishes one.
    pub fn docs_url(&self) -> Option<String> {
        self.docs_path
            .as_ref()
            .map(|path| format!("{}{}", self.base_url.trim_end_matches('/'), path))
    }
}

/// A static route: path pattern plus the methods forwarded on it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Path pattern relative to the public prefix (e.g., "/Products/{id}").
    pub path: String,

    /// HTTP methods forwarded on this path.
    pub methods: Vec<String>,
}

fn default_path_prefix() -> String {
    "/api".to_string()
}

/// Timeout configuration for upstream calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Deadline for a proxied request to produce response headers, in seconds.
    pub upstream_secs: u64,

    /// Deadline for each documentation fetch, in seconds.
    pub docs_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 30,
            docs_secs: 10,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum requests per client within one window.
    pub requests_per_window: u64,

    /// Window length in seconds.
    pub window_secs: u64,

    /// Key clients by the first X-Forwarded-For hop instead of the peer address.
    pub trust_forwarded_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_window: 100,
            window_secs: 60,
            trust_forwarded_headers: false,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Envelope of the merged documentation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DocsConfig {
    pub title: String,
    pub version: String,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            title: "Gateway API Documentation".to_string(),
            version: "1.0.0".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,

    /// How many leading body bytes the request log keeps.
    pub body_snapshot_bytes: usize,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
            body_snapshot_bytes: 2048,
        }
    }
}

/// Route table shipped with the gateway: the product service.
pub fn default_services() -> Vec<ServiceConfig> {
    fn route(path: &str, methods: &[&str]) -> RouteConfig {
        RouteConfig {
            path: path.to_string(),
            methods: methods.iter().map(|m| m.to_string()).collect(),
        }
    }

    vec![ServiceConfig {
        name: "product".to_string(),
        base_url: "http://product-service:8080".to_string(),
        path_prefix: default_path_prefix(),
        docs_path: Some("/swagger/v1/swagger.json".to_string()),
        routes: vec![
            route("/Products", &["GET", "POST", "PUT"]),
            route("/Products/{id}", &["GET", "DELETE"]),
            route("/ProductDetails", &["GET", "POST"]),
            route("/ProductDetails/{productId}", &["GET", "PUT", "DELETE"]),
            route("/Categories", &["GET", "POST"]),
            route("/Categories/{id}", &["GET", "PUT", "DELETE"]),
            route("/Tags", &["GET", "POST"]),
            route("/Tags/{id}", &["GET", "PUT", "DELETE"]),
            route("/Auth/login", &["POST"]),
            route("/Auth/register", &["POST"]),
            route("/Auth/promote/{userId}", &["POST"]),
            route("/Auth/demote/{userId}", &["POST"]),
            route("/Orders", &["GET", "POST"]),
            route("/Orders/{id}", &["GET", "PUT", "DELETE"]),
            route("/Orders/{id}/status", &["PUT"]),
            route("/Orders/user/{userId}", &["GET"]),
        ],
    }]
}
