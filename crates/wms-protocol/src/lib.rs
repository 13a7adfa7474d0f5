//! OGC WMS protocol model.
//!
//! Covers the parts of WMS 1.3.0 a catalog item needs:
//! - the GetCapabilities document and its layer-tree queries
//! - GetMap request parameters

pub mod capabilities;
pub mod getmap;

pub use capabilities::{
    CapabilitiesLayer, Capability, Dimension, GeographicBoundingBox, LegendUrl, Service, Style,
    WmsCapabilities,
};
pub use getmap::{
    is_reserved_parameter, GetMapRequest, DEFAULT_GETMAP_PARAMETERS, RESERVED_GETMAP_PARAMETERS,
};
