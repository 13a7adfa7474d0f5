//! Capabilities document sources.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;
use wms_common::{CatalogError, CatalogResult};
use wms_protocol::WmsCapabilities;

/// Fetches GetCapabilities documents.
///
/// Implementations own transport and caching; `cache_duration` is the
/// item's requested cache lifetime (e.g. `"1d"`).
#[async_trait]
pub trait CapabilitiesLoader: Send + Sync {
    async fn fetch_capabilities(
        &self,
        url: &str,
        cache_duration: &str,
    ) -> CatalogResult<Arc<WmsCapabilities>>;
}

/// Serves documents registered in memory, keyed by URL.
///
/// Query strings are ignored when matching so a document registered under
/// the service URL answers the derived GetCapabilities URL too.
#[derive(Debug, Default)]
pub struct StaticCapabilitiesLoader {
    documents: RwLock<HashMap<String, Arc<WmsCapabilities>>>,
}

impl StaticCapabilitiesLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, url: impl AsRef<str>, document: Arc<WmsCapabilities>) {
        self.documents
            .write()
            .insert(strip_query(url.as_ref()).to_string(), document);
    }

    pub fn with_document(self, url: impl AsRef<str>, document: Arc<WmsCapabilities>) -> Self {
        self.insert(url, document);
        self
    }
}

#[async_trait]
impl CapabilitiesLoader for StaticCapabilitiesLoader {
    async fn fetch_capabilities(
        &self,
        url: &str,
        _cache_duration: &str,
    ) -> CatalogResult<Arc<WmsCapabilities>> {
        let key = strip_query(url);
        debug!(url = %key, "Serving capabilities from memory");
        self.documents.read().get(key).cloned().ok_or_else(|| {
            CatalogError::network_or_parse(
                "Unable to load GetCapabilities",
                format!("no capabilities document is available at {url}"),
            )
        })
    }
}

fn strip_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_loader_ignores_query() {
        let loader = StaticCapabilitiesLoader::new()
            .with_document("http://a/wms", Arc::new(WmsCapabilities::default()));
        assert!(loader
            .fetch_capabilities("http://a/wms?service=WMS&request=GetCapabilities", "1d")
            .await
            .is_ok());

        let err = loader.fetch_capabilities("http://b/wms", "1d").await.unwrap_err();
        assert!(err.is_retryable());
    }
}
