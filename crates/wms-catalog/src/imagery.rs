//! Tiled WMS imagery providers and the keys they are cached under.

use std::any::Any;
use std::f64::consts::PI;
use std::hash::{Hash, Hasher};

use catalog_model::mixins::ImageryProvider;
use wms_common::Rectangle;
use wms_protocol::GetMapRequest;

use crate::urls::append_query;

/// Metres per pixel assumed by WMS 1.3.0 scale denominators (0.28 mm).
const METERS_PER_PIXEL: f64 = 0.00028;

/// WGS84 equatorial radius in metres.
const WGS84_RADIUS: f64 = 6_378_137.0;

/// The deepest tile level at which a layer with `min_scale_denominator` is
/// still drawn, for 256-pixel tiles.
pub fn scale_denominator_to_level(min_scale_denominator: Option<f64>) -> Option<u32> {
    let denominator = min_scale_denominator.filter(|d| d.is_finite() && *d > 0.0)?;
    let circumference = 2.0 * PI * WGS84_RADIUS;
    let level0_scale = circumference / 256.0 / METERS_PER_PIXEL;
    // 1e-6 is the scale tolerance WMS 1.3.0 allows (section 7.2.4.6.9).
    let level = (level0_scale / (denominator - 1e-6)).log2();
    (level >= 0.0).then_some(level as u32)
}

/// Rectangle compared by bit pattern so it can be part of a hash key.
#[derive(Debug, Clone, Copy)]
pub struct RectangleKey(pub Rectangle);

impl RectangleKey {
    fn bits(&self) -> [u64; 4] {
        let r = self.0;
        [r.west.to_bits(), r.south.to_bits(), r.east.to_bits(), r.north.to_bits()]
    }
}

impl PartialEq for RectangleKey {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

impl Eq for RectangleKey {}

impl Hash for RectangleKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
    }
}

/// Everything except time that determines how a provider is built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageryConfig {
    /// Proxied base URL with request parameters stripped.
    pub url: String,
    pub layers: String,
    /// GetMap parameters sorted by (lowercase) name, without `time`.
    pub parameters: Vec<(String, String)>,
    pub tile_size: u32,
    pub maximum_level: Option<u32>,
    pub rectangle: Option<RectangleKey>,
    /// Load that produced the capabilities document this config came from.
    pub capabilities_request: u64,
}

/// Cache key for one provider: a configuration at one time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageryKey {
    pub config: ImageryConfig,
    /// The time tag sent as the `time` parameter.
    pub time: Option<String>,
}

/// Requests 256-pixel (or `tile_size`) GetMap tiles for a fixed set of
/// layers and parameters.
#[derive(Debug)]
pub struct WebMapServiceImageryProvider {
    url: String,
    layers: String,
    parameters: Vec<(String, String)>,
    tile_size: u32,
    maximum_level: Option<u32>,
    rectangle: Option<Rectangle>,
    time: Option<String>,
}

impl WebMapServiceImageryProvider {
    pub fn new(key: &ImageryKey) -> Self {
        let config = &key.config;
        let mut parameters = config.parameters.clone();
        if let Some(time) = &key.time {
            parameters.push(("time".to_string(), time.clone()));
        }
        Self {
            url: config.url.clone(),
            layers: config.layers.clone(),
            parameters,
            tile_size: config.tile_size,
            maximum_level: config.maximum_level,
            rectangle: config.rectangle.map(|r| r.0),
            time: key.time.clone(),
        }
    }

    pub fn layers(&self) -> &str {
        &self.layers
    }

    pub fn time(&self) -> Option<&str> {
        self.time.as_deref()
    }

    /// Parameter value by case-insensitive name.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn parameters(&self) -> &[(String, String)] {
        &self.parameters
    }

    /// GetMap URL for one image.
    pub fn get_map_url(&self, bbox: &Rectangle, width: u32, height: u32) -> String {
        let request = GetMapRequest {
            layers: &self.layers,
            bbox: *bbox,
            width,
            height,
            parameters: &self.parameters,
        };
        append_query(&self.url, &request.query_pairs())
    }
}

impl ImageryProvider for WebMapServiceImageryProvider {
    fn url(&self) -> &str {
        &self.url
    }

    fn rectangle(&self) -> Option<Rectangle> {
        self.rectangle
    }

    fn tile_size(&self) -> u32 {
        self.tile_size
    }

    fn maximum_level(&self) -> Option<u32> {
        self.maximum_level
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
