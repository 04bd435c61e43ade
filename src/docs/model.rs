//! Documentation payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `info` block of an OpenAPI / Swagger document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocInfo {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub version: String,
}

/// What a backend publishes. Anything beyond these fields is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BackendDoc {
    pub swagger: Option<String>,
    pub openapi: Option<String>,
    pub info: DocInfo,
    pub paths: Map<String, Value>,
    pub components: Map<String, Value>,
    /// Swagger 2 schema definitions.
    pub definitions: Map<String, Value>,
}

/// The document served by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedDoc {
    pub openapi: String,
    pub info: DocInfo,
    pub paths: Map<String, Value>,
    pub components: Map<String, Value>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub definitions: Map<String, Value>,
}

impl AggregatedDoc {
    pub const OPENAPI_VERSION: &'static str = "3.0.1";

    pub fn new(info: DocInfo) -> Self {
        Self {
            openapi: Self::OPENAPI_VERSION.to_string(),
            info,
            paths: Map::new(),
            components: Map::new(),
            definitions: Map::new(),
        }
    }

    /// Fold one backend document in. Later documents win on collisions.
    ///
    /// Each path loses the backend's `api_prefix` and gains `public_prefix`.
    pub fn merge(&mut self, doc: BackendDoc, api_prefix: &str, public_prefix: &str) {
        for (path, operations) in doc.paths {
            self.paths
                .insert(rewrite_doc_path(&path, api_prefix, public_prefix), operations);
        }

        for (section, entries) in doc.components {
            match (self.components.get_mut(&section), entries) {
                (Some(Value::Object(existing)), Value::Object(entries)) => existing.extend(entries),
                (_, entries) => {
                    self.components.insert(section, entries);
                }
            }
        }

        self.definitions.extend(doc.definitions);
    }
}

/// Public form of a backend documentation path.
pub fn rewrite_doc_path(path: &str, api_prefix: &str, public_prefix: &str) -> String {
    format!("{}{}", public_prefix, strip_api_prefix(path, api_prefix))
}

/// Drop the backend's API prefix from `path`.
///
/// The configured prefix is tried first (segment boundary only). Failing that,
/// everything up to the first `/api/` marker goes, so `/orders/api/Orders`
/// becomes `/Orders`. A backend with no prefix keeps its paths as published.
fn strip_api_prefix<'a>(path: &'a str, api_prefix: &str) -> &'a str {
    let api_prefix = api_prefix.trim_end_matches('/');
    if api_prefix.is_empty() {
        return path;
    }

    if let Some(rest) = path.strip_prefix(api_prefix) {
        if rest.is_empty() || rest.starts_with('/') {
            return rest;
        }
    }

    const MARKER: &str = "/api/";
    match path.find(MARKER) {
        Some(idx) => &path[idx + MARKER.len() - 1..],
        None => path,
    }
}
