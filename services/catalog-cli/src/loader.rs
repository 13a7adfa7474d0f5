//! Capabilities documents read from local files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use wms_catalog::CapabilitiesLoader;
use wms_common::{CatalogError, CatalogResult};
use wms_protocol::WmsCapabilities;

/// Resolves capabilities URLs to JSON files.
///
/// `file://` URLs and absolute paths are read as-is; anything else is taken
/// relative to `root`. Query strings are ignored, so an item whose `url` is
/// `weather.json` reads `root/weather.json` for its GetCapabilities request.
#[derive(Debug, Clone)]
pub struct FileCapabilitiesLoader {
    root: PathBuf,
}

impl FileCapabilitiesLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, url: &str) -> PathBuf {
        let without_query = url.split_once('?').map_or(url, |(path, _)| path);
        let path = without_query
            .strip_prefix("file://")
            .unwrap_or(without_query);
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

#[async_trait]
impl CapabilitiesLoader for FileCapabilitiesLoader {
    async fn fetch_capabilities(
        &self,
        url: &str,
        _cache_duration: &str,
    ) -> CatalogResult<Arc<WmsCapabilities>> {
        let path = self.resolve(url);
        debug!(url = %url, path = %path.display(), "Reading capabilities file");
        let text = tokio::fs::read_to_string(&path).await.map_err(|e| {
            CatalogError::network_or_parse(
                "Unable to load GetCapabilities",
                format!("failed to read {}: {}", path.display(), e),
            )
        })?;
        Ok(Arc::new(WmsCapabilities::from_json_str(&text)?))
    }
}
