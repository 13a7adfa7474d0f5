//! Web Map Service catalog items.
//!
//! [`WebMapServiceCatalogItem`] combines the catalog-member, URL, mappable,
//! raster, time-varying and GetCapabilities capability layers. Loading its
//! metadata fetches the server's capabilities document through an injected
//! [`CapabilitiesLoader`]; styles, legends, times, extent and descriptions are
//! then derived from that document in a [`GetCapabilitiesStratum`].
//!
//! Once loaded, [`MappableMixin::map_items`](catalog_model::mixins::MappableMixin::map_items)
//! yields the current-time layer plus a hidden prefetch layer for the next
//! time. Imagery providers are memoized by their full configuration, so an
//! unchanged item hands the renderer the same provider instances.

pub mod capabilities_stratum;
pub mod imagery;
pub mod item;
pub mod loader;
pub mod traits;
pub mod urls;

pub use capabilities_stratum::{GetCapabilitiesStratum, ABSTRACTS_TO_IGNORE};
pub use imagery::{
    scale_denominator_to_level, ImageryConfig, ImageryKey, WebMapServiceImageryProvider,
};
pub use item::{register, WebMapServiceCatalogItem};
pub use loader::{CapabilitiesLoader, StaticCapabilitiesLoader};
pub use traits::{wms_traits, LayerStyles, Legend, WebMapServiceTraits, WmsStyle};
