//! Common types and utilities shared across the catalog crates.

pub mod error;
pub mod rectangle;
pub mod time;

pub use error::{CatalogError, CatalogResult};
pub use rectangle::Rectangle;
pub use time::{DiscreteTime, TimeExtent};
