//! Offline catalog inspection.
//!
//! Reads a catalog file (JSON or YAML), builds every item through the
//! session's member factory, loads their metadata from capabilities files
//! on disk and reports what each item resolved to.

pub mod loader;
pub mod report;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use catalog_model::{BaseModel, CatalogConfig, Session};
use futures::future::join_all;
use serde_json::Value;
use tracing::{info, warn};

pub use loader::FileCapabilitiesLoader;
pub use report::{ItemReport, MapItemReport, WmsReport};

/// Parse a catalog file. `.yaml` and `.yml` files are read as YAML,
/// everything else as JSON.
pub fn read_catalog(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let catalog = if is_yaml {
        serde_yaml::from_str(&text)
            .with_context(|| format!("failed to parse YAML catalog {}", path.display()))?
    } else {
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse JSON catalog {}", path.display()))?
    };
    Ok(catalog)
}

/// A session that knows the `group` and `wms` types, with WMS items reading
/// capabilities through `loader`.
pub fn build_session(config: CatalogConfig, loader: FileCapabilitiesLoader) -> Arc<Session> {
    let session = Session::new(config);
    wms_catalog::register(session.factory(), Arc::new(loader));
    session
}

/// Add `catalog` to `session`, load every item's metadata concurrently and
/// report on each item in id order.
///
/// A failed load is recorded on that item's report; it does not stop the
/// others.
pub async fn inspect(session: &Session, catalog: &Value) -> Result<Vec<ItemReport>> {
    session
        .add_catalog_from_json(catalog)
        .context("failed to build catalog")?;

    let models: Vec<Arc<dyn BaseModel>> = session
        .model_ids()
        .iter()
        .filter_map(|id| session.get_model(id))
        .collect();
    info!(items = models.len(), "Loading catalog metadata");

    let loads = models.iter().map(|model| async move {
        let Some(member) = model.as_catalog_member() else {
            return None;
        };
        match member.load_metadata().await {
            Ok(()) => None,
            Err(err) => {
                warn!(item = %model.id(), error = %err, "Failed to load metadata");
                Some(err.to_string())
            }
        }
    });
    let errors = join_all(loads).await;

    Ok(models
        .iter()
        .zip(errors)
        .map(|(model, error)| ItemReport::describe(model.as_ref(), error))
        .collect())
}
