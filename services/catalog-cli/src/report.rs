//! Summaries of catalog items after their metadata has loaded.

use catalog_model::mixins::{
    CatalogMemberMixin, GroupMixin, ImageryProvider, InfoSection, MapItem, MappableMixin,
    TimeVaryingMixin,
};
use catalog_model::BaseModel;
use serde::Serialize;
use wms_catalog::{WebMapServiceCatalogItem, WebMapServiceImageryProvider};
use wms_common::Rectangle;

/// What one item resolved to.
#[derive(Debug, Clone, Serialize)]
pub struct ItemReport {
    pub id: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub info: Vec<InfoSection>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wms: Option<WmsReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WmsReport {
    pub layers: Vec<String>,
    pub is_geoserver: bool,
    pub legend_urls: Vec<String>,
    pub times: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rectangle: Option<Rectangle>,
    pub map_items: Vec<MapItemReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapItemReport {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    pub opacity: f64,
    pub visible: bool,
    /// A whole-world GetMap request, for checking the item by hand.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_request: Option<String>,
}

impl ItemReport {
    pub fn describe(model: &dyn BaseModel, error: Option<String>) -> Self {
        let member = model.as_catalog_member();
        Self {
            id: model.id().to_string(),
            type_name: model.type_name().to_string(),
            name: member.and_then(|m| m.name()),
            error,
            info: member.map(|m| m.info()).unwrap_or_default(),
            members: model.as_group().map(|g| g.member_ids()).unwrap_or_default(),
            wms: model
                .as_any()
                .downcast_ref::<WebMapServiceCatalogItem>()
                .map(WmsReport::describe),
        }
    }
}

impl WmsReport {
    fn describe(item: &WebMapServiceCatalogItem) -> Self {
        Self {
            layers: item.layers(),
            is_geoserver: item.is_geoserver(),
            legend_urls: item.legend_urls(),
            times: item.discrete_times().len(),
            current_time: item.current_discrete_time().map(|t| t.tag),
            rectangle: item.rectangle(),
            map_items: item.map_items().iter().map(MapItemReport::describe).collect(),
        }
    }
}

impl MapItemReport {
    fn describe(item: &MapItem) -> Self {
        let wms = item
            .provider
            .as_any()
            .downcast_ref::<WebMapServiceImageryProvider>();
        Self {
            url: item.provider.url().to_string(),
            time: wms.and_then(|p| p.time()).map(str::to_string),
            opacity: item.opacity,
            visible: item.visible,
            sample_request: wms.map(|p| p.get_map_url(&Rectangle::WORLD, 512, 256)),
        }
    }
}
