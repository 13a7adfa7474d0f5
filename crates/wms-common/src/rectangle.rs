//! Geographic rectangles.

use serde::{Deserialize, Serialize};

/// A rectangle in degrees of longitude and latitude (EPSG:4326).
///
/// Serializes with `west`/`south`/`east`/`north` keys, the layout of the
/// `rectangle` trait.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Rectangle {
    pub const WORLD: Rectangle = Rectangle {
        west: -180.0,
        south: -90.0,
        east: 180.0,
        north: 90.0,
    };

    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// True when every edge is finite and west/south do not exceed east/north.
    pub fn is_valid(&self) -> bool {
        [self.west, self.south, self.east, self.north]
            .iter()
            .all(|v| v.is_finite())
            && self.west <= self.east
            && self.south <= self.north
    }
}
