//! Concurrent documentation fetch and merge.
//!
//! # Responsibilities
//! - Fetch every backend's documentation at once, each under its own deadline
//! - Drop backends that fail (bad URL, transport, status, decode) with a log line
//! - Merge the survivors in configuration order
//!
//! # Design Decisions
//! - Total latency is bounded by the slowest single deadline
//! - No single source can fail the whole document

use std::time::Duration;

use futures_util::future::join_all;
use thiserror::Error;
use url::Url;

use crate::config::GatewayConfig;
use crate::docs::model::{AggregatedDoc, BackendDoc, DocInfo};
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum DocsError {
    #[error("failed to build documentation client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Where one service publishes its documentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocSource {
    pub service: String,
    pub url: String,
    /// Prefix the service's own paths are published under.
    pub api_prefix: String,
}

impl DocSource {
    /// Sources for every configured service that publishes documentation.
    pub fn from_config(config: &GatewayConfig) -> Vec<DocSource> {
        config
            .services
            .iter()
            .filter_map(|service| {
                service.docs_url().map(|url| DocSource {
                    service: service.name.clone(),
                    url,
                    api_prefix: service.path_prefix.clone(),
                })
            })
            .collect()
    }
}

/// Builds the gateway's combined documentation.
pub struct DocAggregator {
    client: reqwest::Client,
    timeout: Duration,
    info: DocInfo,
}

impl DocAggregator {
    pub fn new(timeout: Duration, info: DocInfo) -> Result<Self, DocsError> {
        let client = reqwest::Client::builder().no_proxy().build()?;
        Ok(Self {
            client,
            timeout,
            info,
        })
    }

    /// Fetch and merge documentation from `sources`.
    pub async fn aggregate(&self, sources: &[DocSource], public_prefix: &str) -> AggregatedDoc {
        let fetched = join_all(sources.iter().map(|source| self.fetch(source))).await;

        let mut doc = AggregatedDoc::new(self.info.clone());
        let mut merged = 0;
        for (source, backend) in sources.iter().zip(fetched) {
            if let Some(backend) = backend {
                doc.merge(backend, &source.api_prefix, public_prefix);
                merged += 1;
            }
        }

        tracing::debug!(
            sources = sources.len(),
            merged,
            paths = doc.paths.len(),
            "Documentation aggregated"
        );
        doc
    }

    async fn fetch(&self, source: &DocSource) -> Option<BackendDoc> {
        let Ok(url) = Url::parse(&source.url) else {
            tracing::warn!(service = %source.service, url = %source.url, "Documentation URL is malformed");
            metrics::record_docs_fetch(&source.service, "invalid");
            return None;
        };

        let response = match self.client.get(url).timeout(self.timeout).send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(service = %source.service, url = %source.url, error = %err, "Documentation fetch failed");
                metrics::record_docs_fetch(&source.service, "unreachable");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(service = %source.service, url = %source.url, status = status.as_u16(), "Documentation fetch returned an error status");
            metrics::record_docs_fetch(&source.service, "status");
            return None;
        }

        match response.json::<BackendDoc>().await {
            Ok(doc) => {
                metrics::record_docs_fetch(&source.service, "ok");
                Some(doc)
            }
            Err(err) => {
                tracing::warn!(service = %source.service, url = %source.url, error = %err, "Documentation payload could not be decoded");
                metrics::record_docs_fetch(&source.service, "decode");
                None
            }
        }
    }
}
