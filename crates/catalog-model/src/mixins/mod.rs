//! Capability layers.
//!
//! Each mixin is a schema layer ([`TraitLayer`](crate::TraitLayer)) plus a
//! behavior trait whose default methods read the model's resolved values.
//! Concrete types build their schema by applying layers in order and then
//! implement the behavior traits they need.

mod catalog_member;
mod get_capabilities;
mod group;
mod mappable;
mod raster;
mod time_varying;
mod url;

pub use catalog_member::{CatalogMemberMixin, CatalogMemberTraits, InfoSection};
pub use get_capabilities::{
    GetCapabilitiesMixin, GetCapabilitiesTraits, CAPABILITIES_STRATUM,
    DEFAULT_CAPABILITIES_CACHE_DURATION,
};
pub use group::{GroupMixin, GroupTraits};
pub use mappable::{rectangle_traits, ImageryProvider, MapItem, MappableMixin, MappableTraits};
pub use raster::{RasterLayerMixin, RasterLayerTraits, DEFAULT_OPACITY};
pub use time_varying::{TimeVaryingMixin, TimeVaryingTraits};
pub use url::{UrlMixin, UrlTraits};
