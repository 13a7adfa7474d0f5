//! Layered catalog models.
//!
//! A model type declares its properties as a [`ModelTraits`] schema, built by
//! applying mixin layers in order. Each model instance holds several strata of
//! values; [`Model::get`] resolves a property from the highest-priority
//! stratum that defines it and memoizes the answer until one of its inputs
//! changes.
//!
//! Models live in a [`Session`], which also owns the member factory used to
//! build catalog items from JSON and the proxy applied to outbound URLs.

pub mod catalog_group;
pub mod config;
pub mod factory;
pub mod loadable;
pub mod mixins;
pub mod model;
pub mod proxy;
pub mod session;
pub mod stratum;
pub mod traits;

pub use catalog_group::CatalogGroup;
pub use config::CatalogConfig;
pub use factory::CatalogMemberFactory;
pub use loadable::{LoadCell, LoadSnapshot, LoadStatus, LoadTicket};
pub use model::{
    BaseModel, Model, WeakModel, DEFAULTS_STRATUM, DEFINITION_STRATUM, USER_STRATUM,
};
pub use proxy::{NoProxy, PrefixProxy, UrlProxy};
pub use session::Session;
pub use stratum::{InMemoryStratum, Stratum, TraitValue};
pub use traits::{ModelTraits, PrimitiveKind, TraitDefinition, TraitKind, TraitLayer};
