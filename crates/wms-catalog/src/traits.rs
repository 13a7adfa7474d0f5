//! Trait schema of the WMS catalog item.

use std::sync::Arc;

use catalog_model::mixins::{
    CatalogMemberTraits, GetCapabilitiesTraits, MappableTraits, RasterLayerTraits,
    TimeVaryingTraits, UrlTraits,
};
use catalog_model::{ModelTraits, TraitDefinition, TraitLayer};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Tile edge length in pixels when the item sets none.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// A legend image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Legend {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// One style a server offers for a layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WmsStyle {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#abstract: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legend: Option<Legend>,
}

/// The styles available for one selected layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerStyles {
    pub layer_name: String,
    pub styles: Vec<WmsStyle>,
}

static LEGEND_TRAITS: Lazy<Arc<ModelTraits>> = Lazy::new(|| {
    ModelTraits::object(
        "LegendTraits",
        vec![
            TraitDefinition::string("url", "The URL of the legend image."),
            TraitDefinition::string("urlMimeType", "The MIME type of the legend image."),
            TraitDefinition::string("title", "A title for the legend."),
        ],
    )
});

static STYLE_TRAITS: Lazy<Arc<ModelTraits>> = Lazy::new(|| {
    ModelTraits::object(
        "WebMapServiceStyleTraits",
        vec![
            TraitDefinition::string("name", "The name of the style."),
            TraitDefinition::string("title", "The title of the style."),
            TraitDefinition::string("abstract", "The abstract describing the style."),
            TraitDefinition::composite("legend", "The legend of the style.", Arc::clone(&LEGEND_TRAITS)),
        ],
    )
});

static LAYER_STYLES_TRAITS: Lazy<Arc<ModelTraits>> = Lazy::new(|| {
    ModelTraits::object(
        "WebMapServiceAvailableLayerStylesTraits",
        vec![
            TraitDefinition::string("layerName", "The name of the layer."),
            TraitDefinition::composite_array(
                "styles",
                "The styles available for this layer.",
                Arc::clone(&STYLE_TRAITS),
            ),
        ],
    )
});

pub struct WebMapServiceTraits;

impl TraitLayer for WebMapServiceTraits {
    const NAME: &'static str = "WebMapServiceCatalogItemTraits";
    const REQUIRES: &'static [&'static str] = &["url", "opacity", "discreteTimes"];

    fn definitions() -> Vec<TraitDefinition> {
        vec![
            TraitDefinition::string(
                "layers",
                "The layer or layers to display (comma separated values).",
            ),
            TraitDefinition::string(
                "styles",
                "The styles to use with each of the `layers` (comma separated values).",
            ),
            TraitDefinition::any(
                "parameters",
                "Additional parameters to pass to the server in GetMap requests.",
            ),
            TraitDefinition::number("tileSize", "The width and height of each tile in pixels.")
                .with_default(json!(DEFAULT_TILE_SIZE)),
            TraitDefinition::composite_array(
                "availableStyles",
                "The available styles for each selected layer.",
                Arc::clone(&LAYER_STYLES_TRAITS),
            ),
            TraitDefinition::composite_array(
                "legends",
                "The legends to display for the selected layers and styles.",
                Arc::clone(&LEGEND_TRAITS),
            ),
            TraitDefinition::boolean("isGeoServer", "True if this WMS is a GeoServer.")
                .with_default(json!(false)),
            TraitDefinition::number(
                "minScaleDenominator",
                "The denominator of the largest scale at which the layer should be shown.",
            ),
        ]
    }
}

static WMS_TRAITS: Lazy<Arc<ModelTraits>> = Lazy::new(|| {
    let schema = ModelTraits::new("WebMapServiceCatalogItemTraits")
        .apply::<CatalogMemberTraits>()
        .and_then(ModelTraits::apply::<UrlTraits>)
        .and_then(ModelTraits::apply::<MappableTraits>)
        .and_then(ModelTraits::apply::<RasterLayerTraits>)
        .and_then(ModelTraits::apply::<TimeVaryingTraits>)
        .and_then(ModelTraits::apply::<GetCapabilitiesTraits>)
        .and_then(ModelTraits::apply::<WebMapServiceTraits>)
        .expect("WMS trait layers are consistent");
    Arc::new(schema)
});

/// The full schema: every mixin layer followed by the WMS-specific traits.
pub fn wms_traits() -> Arc<ModelTraits> {
    Arc::clone(&WMS_TRAITS)
}
