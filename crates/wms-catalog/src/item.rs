//! The WMS catalog item.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use catalog_model::mixins::{
    CatalogMemberMixin, GetCapabilitiesMixin, MapItem, MappableMixin, RasterLayerMixin,
    TimeVaryingMixin, UrlMixin,
};
use catalog_model::{
    BaseModel, CatalogConfig, CatalogMemberFactory, LoadStatus, Model, ModelTraits, Session,
    Stratum,
};
use catalog_reactive::{Computed, MemoCache};
use serde_json::Value;
use tracing::{debug, info};
use wms_common::{CatalogError, CatalogResult};
use wms_protocol::{is_reserved_parameter, WmsCapabilities, DEFAULT_GETMAP_PARAMETERS};

use crate::capabilities_stratum::GetCapabilitiesStratum;
use crate::imagery::{
    scale_denominator_to_level, ImageryConfig, ImageryKey, RectangleKey,
    WebMapServiceImageryProvider,
};
use crate::loader::CapabilitiesLoader;
use crate::traits::{wms_traits, LayerStyles, Legend, DEFAULT_TILE_SIZE};
use crate::urls::{default_get_capabilities_url, imagery_base_url};

/// A catalog item that draws one or more layers from a Web Map Service.
///
/// Metadata (styles, legends, time dimension, extent, descriptions) comes
/// from the server's capabilities document, held in a
/// [`GetCapabilitiesStratum`] that sits just above `defaults`. Anything set
/// in the catalog definition or by the user overrides it.
pub struct WebMapServiceCatalogItem {
    model: Model,
    capabilities: Arc<GetCapabilitiesStratum>,
    loader: Arc<dyn CapabilitiesLoader>,
    imagery_cache: MemoCache<ImageryKey, WebMapServiceImageryProvider>,
    map_items: Computed<Vec<MapItem>>,
}

impl WebMapServiceCatalogItem {
    pub const TYPE: &'static str = "wms";

    pub fn new(
        id: impl Into<String>,
        session: Weak<Session>,
        loader: Arc<dyn CapabilitiesLoader>,
    ) -> Arc<Self> {
        let id = id.into();
        let config = session
            .upgrade()
            .map(|s| s.config().clone())
            .unwrap_or_else(CatalogConfig::default);

        let model = Model::new(id.clone(), Self::TYPE, Self::traits(), session);
        let capabilities = Arc::new(GetCapabilitiesStratum::new(
            model.downgrade(),
            &id,
            config.max_discrete_times,
        ));
        model.set_stratum(Arc::clone(&capabilities) as Arc<dyn Stratum>);

        Arc::new_cyclic(|weak: &Weak<Self>| {
            let weak = weak.clone();
            let map_items = Computed::new(format!("{id}.mapItems"), move || {
                weak.upgrade()
                    .map(|item| item.build_map_items())
                    .unwrap_or_default()
            });
            Self {
                model,
                capabilities,
                loader,
                imagery_cache: MemoCache::new(
                    format!("{id}.imagery"),
                    config.imagery_cache_capacity,
                ),
                map_items,
            }
        })
    }

    pub fn traits() -> Arc<ModelTraits> {
        wms_traits()
    }

    pub fn capabilities_stratum(&self) -> &GetCapabilitiesStratum {
        &self.capabilities
    }

    /// The loaded capabilities document, if any.
    pub fn capabilities(&self) -> Option<Arc<WmsCapabilities>> {
        self.capabilities.capabilities()
    }

    pub fn is_loading(&self) -> bool {
        self.capabilities.is_loading()
    }

    pub fn load_status(&self) -> LoadStatus {
        self.capabilities.status()
    }

    pub fn load_error(&self) -> Option<CatalogError> {
        self.capabilities.error()
    }

    pub fn imagery_cache(&self) -> &MemoCache<ImageryKey, WebMapServiceImageryProvider> {
        &self.imagery_cache
    }

    /// Selected layer names, in order.
    pub fn layers(&self) -> Vec<String> {
        self.model
            .get_string("layers")
            .map(|layers| {
                layers
                    .split(',')
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn tile_size(&self) -> u32 {
        self.model
            .get_f64("tileSize")
            .filter(|size| *size >= 1.0)
            .map_or(DEFAULT_TILE_SIZE, |size| size as u32)
    }

    pub fn min_scale_denominator(&self) -> Option<f64> {
        self.model.get_f64("minScaleDenominator")
    }

    pub fn is_geoserver(&self) -> bool {
        self.model.get_bool("isGeoServer").unwrap_or(false)
    }

    pub fn available_styles(&self) -> Vec<LayerStyles> {
        self.model.get_as("availableStyles").unwrap_or_default()
    }

    pub fn legends(&self) -> Vec<Legend> {
        self.model.get_as("legends").unwrap_or_default()
    }

    pub fn legend_urls(&self) -> Vec<String> {
        self.legends().into_iter().map(|legend| legend.url).collect()
    }

    /// Parameters sent with every GetMap request apart from `time`: the
    /// defaults, then `styles`, then the `parameters` trait. Names are
    /// lowercased and sorted.
    pub fn get_map_parameters(&self) -> Vec<(String, String)> {
        let mut merged: BTreeMap<String, String> = DEFAULT_GETMAP_PARAMETERS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        if let Some(styles) = self.model.get_string("styles") {
            merged.insert("styles".to_string(), styles);
        }
        for (key, value) in self.extra_parameters() {
            if key == "time" {
                continue;
            }
            if is_reserved_parameter(&key) {
                debug!(item = %self.id(), parameter = %key, "Ignoring reserved GetMap parameter");
                continue;
            }
            merged.insert(key, value);
        }
        merged.into_iter().collect()
    }

    fn extra_parameters(&self) -> Vec<(String, String)> {
        let Some(parameters) = self.model.get("parameters") else {
            return Vec::new();
        };
        let Value::Object(map) = parameters.as_ref() else {
            debug!(item = %self.id(), "Ignoring non-object `parameters`");
            return Vec::new();
        };
        map.iter()
            .filter_map(|(key, value)| {
                let value = match value {
                    Value::Null => return None,
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                Some((key.to_ascii_lowercase(), value))
            })
            .collect()
    }

    fn proxied(&self, url: &str, cache_duration: Option<&str>) -> String {
        match self.model.session() {
            Some(session) => session.proxy_url(self, url, cache_duration),
            None => url.to_string(),
        }
    }

    /// Everything but time that the providers for the current state are
    /// built from. `None` until the item has a URL and at least one layer.
    fn imagery_config(&self, capabilities_request: u64) -> Option<ImageryConfig> {
        let url = self.url()?;
        let layers = self.layers();
        if layers.is_empty() {
            return None;
        }
        let cache_duration = self.cache_duration();
        Some(ImageryConfig {
            url: self.proxied(&imagery_base_url(&url), cache_duration.as_deref()),
            layers: layers.join(","),
            parameters: self.get_map_parameters(),
            tile_size: self.tile_size(),
            maximum_level: scale_denominator_to_level(self.min_scale_denominator()),
            rectangle: self.rectangle().map(RectangleKey),
            capabilities_request,
        })
    }

    /// The provider for `config` at `time`, built at most once per key.
    ///
    /// Building for a new configuration drops providers of every other
    /// configuration; providers for other times of the same configuration
    /// are kept so stepping through time reuses them.
    fn provider(&self, config: &ImageryConfig, time: Option<String>) -> Arc<WebMapServiceImageryProvider> {
        let key = ImageryKey {
            config: config.clone(),
            time,
        };
        if let Some(existing) = self.imagery_cache.get(&key) {
            debug!(item = %self.id(), time = ?key.time, "Reusing imagery provider");
            return existing;
        }
        self.imagery_cache.retain(|cached, _| &cached.config == config);
        self.imagery_cache.get_or_insert_with(key, |key| {
            info!(
                item = %self.id(),
                layers = %key.config.layers,
                time = ?key.time,
                "Creating imagery provider"
            );
            WebMapServiceImageryProvider::new(key)
        })
    }

    fn build_map_items(&self) -> Vec<MapItem> {
        if self.capabilities.is_loading() {
            return Vec::new();
        }
        let Some(request) = self.capabilities.payload_request() else {
            return Vec::new();
        };
        let Some(config) = self.imagery_config(request) else {
            return Vec::new();
        };

        // A `time` in `parameters` applies only to items without a time
        // dimension.
        let fixed_time = self
            .extra_parameters()
            .into_iter()
            .find(|(key, _)| key == "time")
            .map(|(_, value)| value);
        let current = self.current_discrete_time().map(|t| t.tag).or(fixed_time);

        let show = self.show();
        let mut items = vec![MapItem {
            provider: self.provider(&config, current),
            opacity: self.opacity(),
            visible: show,
        }];
        if show {
            if let Some(next) = self.next_discrete_time() {
                items.push(MapItem {
                    provider: self.provider(&config, Some(next.tag)),
                    opacity: 0.0,
                    visible: true,
                });
            }
        }
        items
    }
}

impl fmt::Debug for WebMapServiceCatalogItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebMapServiceCatalogItem")
            .field("model", &self.model)
            .field("status", &self.capabilities.cell().snapshot().status())
            .field("imagery_cache", &self.imagery_cache)
            .finish_non_exhaustive()
    }
}

impl BaseModel for WebMapServiceCatalogItem {
    fn model(&self) -> &Model {
        &self.model
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_catalog_member(&self) -> Option<&dyn CatalogMemberMixin> {
        Some(self)
    }

    fn as_mappable(&self) -> Option<&dyn MappableMixin> {
        Some(self)
    }
}

#[async_trait]
impl CatalogMemberMixin for WebMapServiceCatalogItem {
    /// Fetch the capabilities document. Fails without touching load state
    /// when neither `url` nor `getCapabilitiesUrl` is set.
    async fn load_metadata(&self) -> CatalogResult<()> {
        let Some(url) = self.get_capabilities_url() else {
            return Err(CatalogError::configuration(
                "Unable to load GetCapabilities",
                format!(
                    "`{}` has neither a `url` nor a `getCapabilitiesUrl`",
                    self.id()
                ),
            ));
        };
        let cache_duration = self.get_capabilities_cache_duration();
        let url = self.proxied(&url, Some(&cache_duration));
        info!(item = %self.id(), url = %url, "Loading capabilities");
        let capabilities = self
            .capabilities
            .load(self.loader.as_ref(), &url, &cache_duration)
            .await?;
        info!(
            item = %self.id(),
            layers = capabilities.all_layers().len(),
            "Capabilities loaded"
        );
        Ok(())
    }

    async fn load_data(&self) -> CatalogResult<()> {
        self.load_metadata().await
    }
}

impl UrlMixin for WebMapServiceCatalogItem {}

impl MappableMixin for WebMapServiceCatalogItem {
    fn map_items(&self) -> Vec<MapItem> {
        self.map_items.get()
    }
}

impl RasterLayerMixin for WebMapServiceCatalogItem {}

impl TimeVaryingMixin for WebMapServiceCatalogItem {}

impl GetCapabilitiesMixin for WebMapServiceCatalogItem {
    fn default_get_capabilities_url(&self) -> Option<String> {
        self.url().map(|url| default_get_capabilities_url(&url))
    }
}

/// Register the `wms` type, with every item fetching through `loader`.
pub fn register(factory: &CatalogMemberFactory, loader: Arc<dyn CapabilitiesLoader>) {
    factory.register(WebMapServiceCatalogItem::TYPE, move |id, session| {
        let item: Arc<dyn BaseModel> =
            WebMapServiceCatalogItem::new(id, session, Arc::clone(&loader));
        item
    });
}
