//! GetMap request parameters.

use wms_common::Rectangle;

/// Parameters sent with every GetMap request unless overridden.
pub const DEFAULT_GETMAP_PARAMETERS: &[(&str, &str)] = &[
    ("transparent", "true"),
    ("format", "image/png"),
    ("exceptions", "application/vnd.ogc.se_xml"),
    ("styles", ""),
    ("tiled", "true"),
];

/// Query parameters owned by the request itself; a base URL carrying any of
/// these has them stripped.
pub const RESERVED_GETMAP_PARAMETERS: &[&str] = &[
    "request", "service", "x", "y", "width", "height", "bbox", "layers",
];

/// A WMS 1.3.0 GetMap request for one image in EPSG:4326.
#[derive(Debug, Clone, PartialEq)]
pub struct GetMapRequest<'a> {
    pub layers: &'a str,
    pub bbox: Rectangle,
    pub width: u32,
    pub height: u32,
    /// Additional parameters (format, styles, time, vendor options).
    pub parameters: &'a [(String, String)],
}

impl GetMapRequest<'_> {
    /// Query pairs in request order.
    ///
    /// WMS 1.3.0 uses latitude-first axis order for EPSG:4326, so the BBOX
    /// is `south,west,north,east`.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("service".to_string(), "WMS".to_string()),
            ("version".to_string(), "1.3.0".to_string()),
            ("request".to_string(), "GetMap".to_string()),
            ("layers".to_string(), self.layers.to_string()),
            ("crs".to_string(), "EPSG:4326".to_string()),
            (
                "bbox".to_string(),
                format!(
                    "{},{},{},{}",
                    self.bbox.south, self.bbox.west, self.bbox.north, self.bbox.east
                ),
            ),
            ("width".to_string(), self.width.to_string()),
            ("height".to_string(), self.height.to_string()),
        ];
        pairs.extend(self.parameters.iter().cloned());
        pairs
    }
}

/// Whether `key` names a parameter the request sets itself.
pub fn is_reserved_parameter(key: &str) -> bool {
    RESERVED_GETMAP_PARAMETERS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_pairs_use_latitude_first_bbox() {
        let parameters = vec![("time".to_string(), "2024-01-01T00:00:00Z".to_string())];
        let request = GetMapRequest {
            layers: "precip",
            bbox: Rectangle::new(100.0, -40.0, 150.0, -10.0),
            width: 256,
            height: 256,
            parameters: &parameters,
        };
        let pairs = request.query_pairs();
        assert!(pairs.contains(&("bbox".to_string(), "-40,100,-10,150".to_string())));
        assert_eq!(pairs.last().unwrap().0, "time");
    }

    #[test]
    fn test_reserved_parameters_any_case() {
        assert!(is_reserved_parameter("BBOX"));
        assert!(is_reserved_parameter("Layers"));
        assert!(!is_reserved_parameter("styles"));
    }
}
