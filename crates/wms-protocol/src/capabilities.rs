//! WMS 1.3.0 capabilities document model.
//!
//! Field names follow the XML element names so a document converted to JSON
//! element-for-element deserializes directly. Parsing the XML itself is left
//! to whoever fetches the document.

use serde::{Deserialize, Serialize};

use wms_common::{CatalogError, CatalogResult, Rectangle};

/// A parsed GetCapabilities response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct WmsCapabilities {
    pub version: String,
    pub service: Service,
    pub capability: Capability,
}

/// Service-level metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Service {
    pub name: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "Abstract")]
    pub abstract_text: Option<String>,
    pub access_constraints: Option<String>,
    pub keyword_list: Vec<String>,
}

impl Service {
    /// Case-insensitive keyword lookup.
    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.keyword_list
            .iter()
            .any(|k| k.trim().eq_ignore_ascii_case(keyword))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Capability {
    /// The root of the layer tree.
    pub layer: Option<CapabilitiesLayer>,
}

/// One node of the layer tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CapabilitiesLayer {
    /// Absent for category layers that cannot be requested.
    pub name: Option<String>,
    pub title: String,
    #[serde(rename = "Abstract")]
    pub abstract_text: Option<String>,
    pub style: Vec<Style>,
    #[serde(rename = "EX_GeographicBoundingBox")]
    pub ex_geographic_bounding_box: Option<GeographicBoundingBox>,
    pub dimension: Vec<Dimension>,
    pub min_scale_denominator: Option<f64>,
    pub max_scale_denominator: Option<f64>,
    pub queryable: bool,
    pub layer: Vec<CapabilitiesLayer>,
}

impl CapabilitiesLayer {
    pub fn style(&self, name: &str) -> Option<&Style> {
        self.style.iter().find(|s| s.name == name)
    }

    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimension
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
    }
}

/// `EX_GeographicBoundingBox`, in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeographicBoundingBox {
    pub west_bound_longitude: f64,
    pub east_bound_longitude: f64,
    pub south_bound_latitude: f64,
    pub north_bound_latitude: f64,
}

impl GeographicBoundingBox {
    pub fn to_rectangle(&self) -> Rectangle {
        Rectangle::new(
            self.west_bound_longitude,
            self.south_bound_latitude,
            self.east_bound_longitude,
            self.north_bound_latitude,
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Style {
    pub name: String,
    pub title: Option<String>,
    #[serde(rename = "Abstract")]
    pub abstract_text: Option<String>,
    #[serde(rename = "LegendURL")]
    pub legend_url: Vec<LegendUrl>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LegendUrl {
    pub format: Option<String>,
    /// The `xlink:href` of the `OnlineResource` element, possibly
    /// percent-encoded.
    pub online_resource: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// A layer dimension such as `time` or `elevation`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Dimension {
    pub name: String,
    pub units: Option<String>,
    pub default: Option<String>,
    /// The element text: a comma-separated list of values or
    /// `start/end/period` intervals.
    pub values: String,
}

impl WmsCapabilities {
    pub fn from_json_str(json: &str) -> CatalogResult<Self> {
        serde_json::from_str(json).map_err(parse_error)
    }

    pub fn from_json_value(value: serde_json::Value) -> CatalogResult<Self> {
        serde_json::from_value(value).map_err(parse_error)
    }

    pub fn root_layer(&self) -> Option<&CapabilitiesLayer> {
        self.capability.layer.as_ref()
    }

    /// Every layer, depth first, parents before children.
    pub fn all_layers(&self) -> Vec<&CapabilitiesLayer> {
        fn walk<'a>(layer: &'a CapabilitiesLayer, out: &mut Vec<&'a CapabilitiesLayer>) {
            out.push(layer);
            for child in &layer.layer {
                walk(child, out);
            }
        }
        let mut out = Vec::new();
        if let Some(root) = self.root_layer() {
            walk(root, &mut out);
        }
        out
    }

    /// Find a layer by `Name`, falling back to `Title`.
    pub fn find_layer(&self, name: &str) -> Option<&CapabilitiesLayer> {
        self.layer_path(name).and_then(|path| path.last().copied())
    }

    /// The chain from the root layer down to the named layer, inclusive.
    pub fn layer_path(&self, name: &str) -> Option<Vec<&CapabilitiesLayer>> {
        fn search<'a>(
            layer: &'a CapabilitiesLayer,
            matches: &dyn Fn(&CapabilitiesLayer) -> bool,
            path: &mut Vec<&'a CapabilitiesLayer>,
        ) -> bool {
            path.push(layer);
            if matches(layer) || layer.layer.iter().any(|child| search(child, matches, path)) {
                return true;
            }
            path.pop();
            false
        }

        let root = self.root_layer()?;
        let by_name = |l: &CapabilitiesLayer| l.name.as_deref() == Some(name);
        let by_title = |l: &CapabilitiesLayer| l.title == name;
        for matches in [&by_name as &dyn Fn(&CapabilitiesLayer) -> bool, &by_title] {
            let mut path = Vec::new();
            if search(root, matches, &mut path) {
                return Some(path);
            }
        }
        None
    }

    /// The first value `get` yields walking from the named layer up to the
    /// root.
    pub fn inherited_value<'a, T>(
        &'a self,
        name: &str,
        get: impl Fn(&'a CapabilitiesLayer) -> Option<T>,
    ) -> Option<T> {
        self.layer_path(name)?.into_iter().rev().find_map(get)
    }

    /// Values from the named layer and all its ancestors, nearest first.
    pub fn inherited_values<'a, T>(
        &'a self,
        name: &str,
        get: impl Fn(&'a CapabilitiesLayer) -> &'a [T],
    ) -> Vec<&'a T> {
        self.layer_path(name)
            .map(|path| path.into_iter().rev().flat_map(get).collect())
            .unwrap_or_default()
    }

    /// Styles available for a layer, including inherited ones.
    pub fn styles_for(&self, name: &str) -> Vec<&Style> {
        self.inherited_values(name, |layer| layer.style.as_slice())
    }

    /// Geographic bounding box of a layer, inherited if the layer has none.
    pub fn bounding_box_for(&self, name: &str) -> Option<Rectangle> {
        self.inherited_value(name, |layer| {
            layer
                .ex_geographic_bounding_box
                .map(|bbox| bbox.to_rectangle())
        })
    }
}

fn parse_error(err: serde_json::Error) -> CatalogError {
    CatalogError::network_or_parse("Invalid GetCapabilities document", err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> WmsCapabilities {
        WmsCapabilities::from_json_value(json!({
            "Version": "1.3.0",
            "Service": {
                "Title": "Weather",
                "KeywordList": ["WMS", "GEOSERVER"]
            },
            "Capability": {
                "Layer": {
                    "Title": "Root",
                    "Style": [{"Name": "default"}],
                    "EX_GeographicBoundingBox": {
                        "westBoundLongitude": -180.0,
                        "eastBoundLongitude": 180.0,
                        "southBoundLatitude": -90.0,
                        "northBoundLatitude": 90.0
                    },
                    "Layer": [
                        {
                            "Title": "Surface",
                            "Layer": [
                                {
                                    "Name": "temperature",
                                    "Title": "Air Temperature",
                                    "Style": [{"Name": "heat"}]
                                }
                            ]
                        },
                        {
                            "Name": "precip",
                            "Title": "Precipitation",
                            "EX_GeographicBoundingBox": {
                                "westBoundLongitude": 100.0,
                                "eastBoundLongitude": 150.0,
                                "southBoundLatitude": -40.0,
                                "northBoundLatitude": -10.0
                            }
                        }
                    ]
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_find_layer_by_name_then_title() {
        let caps = document();
        assert_eq!(caps.find_layer("temperature").unwrap().title, "Air Temperature");
        assert_eq!(
            caps.find_layer("Air Temperature").unwrap().name.as_deref(),
            Some("temperature")
        );
        assert!(caps.find_layer("wind").is_none());
        assert_eq!(caps.all_layers().len(), 4);
    }

    #[test]
    fn test_layer_path_runs_root_to_leaf() {
        let caps = document();
        let titles: Vec<&str> = caps
            .layer_path("temperature")
            .unwrap()
            .iter()
            .map(|l| l.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Root", "Surface", "Air Temperature"]);
    }

    #[test]
    fn test_styles_are_inherited_nearest_first() {
        let caps = document();
        let names: Vec<&str> = caps
            .styles_for("temperature")
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["heat", "default"]);
    }

    #[test]
    fn test_bounding_box_inheritance() {
        let caps = document();
        assert_eq!(
            caps.bounding_box_for("temperature"),
            Some(Rectangle::new(-180.0, -90.0, 180.0, 90.0))
        );
        assert_eq!(
            caps.bounding_box_for("precip"),
            Some(Rectangle::new(100.0, -40.0, 150.0, -10.0))
        );
    }

    #[test]
    fn test_service_keywords() {
        let caps = document();
        assert!(caps.service.has_keyword("geoserver"));
        assert!(!caps.service.has_keyword("mapserver"));
    }

    #[test]
    fn test_malformed_document_is_parse_error() {
        let err = WmsCapabilities::from_json_str("{\"Capability\": 3}").unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.title(), "Invalid GetCapabilities document");
    }
}
