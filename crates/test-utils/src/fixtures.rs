//! Common test fixtures for catalog tests.
//!
//! Capabilities documents are written as JSON in the element layout
//! `WmsCapabilities` deserializes.

use std::sync::Arc;

use serde_json::{json, Value};
use wms_protocol::WmsCapabilities;

/// Service URL used by every fixture item.
pub const WMS_URL: &str = "http://example.com/geoserver/wms";

/// Boilerplate abstract some servers put on every layer.
pub const COMPLIANT_ABSTRACT: &str =
    "A compliant implementation of WMS plus most of the SLD extension (dynamic styling). Can also generate PDF, SVG, KML, GeoRSS";

/// Legend URL exactly as it appears in the document.
pub const RAINBOW_LEGEND_ENCODED: &str =
    "http://example.com/geoserver/wms?request=GetLegendGraphic%26style%3Drainbow%26layer%3Dprecipitation";

/// The same legend URL after percent-decoding.
pub const RAINBOW_LEGEND: &str =
    "http://example.com/geoserver/wms?request=GetLegendGraphic&style=rainbow&layer=precipitation";

/// Times advertised by the `precipitation` layer.
pub const PRECIPITATION_TIMES: [&str; 3] = [
    "2024-01-01T00:00:00Z",
    "2024-01-02T00:00:00Z",
    "2024-01-03T00:00:00Z",
];

/// A GeoServer document with a time-varying `precipitation` layer and a
/// `temperature` layer carrying the boilerplate abstract.
pub fn weather_capabilities_json() -> Value {
    json!({
        "Version": "1.3.0",
        "Service": {
            "Name": "WMS",
            "Title": "Weather Service",
            "Abstract": "Forecast layers from the weather bureau.",
            "AccessConstraints": "none",
            "KeywordList": ["WFS", "WMS", "GEOSERVER"]
        },
        "Capability": {
            "Layer": {
                "Title": "Weather",
                "EX_GeographicBoundingBox": {
                    "westBoundLongitude": -180.0,
                    "eastBoundLongitude": 180.0,
                    "southBoundLatitude": -90.0,
                    "northBoundLatitude": 90.0
                },
                "Layer": [
                    {
                        "Name": "precipitation",
                        "Title": "Precipitation",
                        "Abstract": "Accumulated rainfall over the previous day.",
                        "Style": [
                            {"Name": "raw", "Title": "Raw values"},
                            {
                                "Name": "rainbow",
                                "Title": "Rainbow",
                                "LegendURL": [{
                                    "Format": "image/png",
                                    "OnlineResource": RAINBOW_LEGEND_ENCODED
                                }]
                            }
                        ],
                        "EX_GeographicBoundingBox": {
                            "westBoundLongitude": 110.0,
                            "eastBoundLongitude": 155.0,
                            "southBoundLatitude": -45.0,
                            "northBoundLatitude": -10.0
                        },
                        "Dimension": [{
                            "Name": "time",
                            "Units": "ISO8601",
                            "Values": PRECIPITATION_TIMES.join(",")
                        }],
                        "MinScaleDenominator": 4000000.0
                    },
                    {
                        "Name": "temperature",
                        "Title": "Temperature",
                        "Abstract": COMPLIANT_ABSTRACT,
                        "Style": [{
                            "Name": "heat",
                            "LegendURL": [{
                                "Format": "image/png",
                                "OnlineResource": "http://example.com/legend/heat.png"
                            }]
                        }]
                    }
                ]
            }
        }
    })
}

pub fn weather_capabilities() -> Arc<WmsCapabilities> {
    Arc::new(
        WmsCapabilities::from_json_value(weather_capabilities_json())
            .expect("fixture document is valid"),
    )
}

/// A MapServer-style document whose only layer has the boilerplate
/// abstract and whose service carries access constraints.
pub fn compliant_capabilities_json() -> Value {
    json!({
        "Version": "1.3.0",
        "Service": {
            "Title": "Ocean Service",
            "Abstract": "Sea surface temperature analyses.",
            "AccessConstraints": "Licensed for research use only."
        },
        "Capability": {
            "Layer": {
                "Name": "sst",
                "Title": "Sea Surface Temperature",
                "Abstract": COMPLIANT_ABSTRACT,
                "EX_GeographicBoundingBox": {
                    "westBoundLongitude": 0.0,
                    "eastBoundLongitude": 90.0,
                    "southBoundLatitude": -60.0,
                    "northBoundLatitude": 0.0
                }
            }
        }
    })
}

pub fn compliant_capabilities() -> Arc<WmsCapabilities> {
    Arc::new(
        WmsCapabilities::from_json_value(compliant_capabilities_json())
            .expect("fixture document is valid"),
    )
}

/// A catalog with one group holding both weather layers.
pub fn weather_catalog_json() -> Value {
    json!({
        "catalog": [{
            "type": "group",
            "name": "Weather",
            "isOpen": true,
            "members": [
                {
                    "type": "wms",
                    "id": "rain",
                    "name": "Rainfall",
                    "url": WMS_URL,
                    "layers": "precipitation",
                    "styles": "rainbow"
                },
                {
                    "type": "wms",
                    "id": "temp",
                    "url": WMS_URL,
                    "layers": "temperature",
                    "opacity": 0.5
                }
            ]
        }]
    })
}
