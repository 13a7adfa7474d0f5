use serde_json::json;

use crate::mixins::mappable::MappableMixin;
use crate::traits::{TraitDefinition, TraitLayer};

/// Opacity used when no stratum sets one.
pub const DEFAULT_OPACITY: f64 = 0.8;

pub struct RasterLayerTraits;

impl TraitLayer for RasterLayerTraits {
    const NAME: &'static str = "RasterLayerTraits";
    const REQUIRES: &'static [&'static str] = &["show"];

    fn definitions() -> Vec<TraitDefinition> {
        vec![TraitDefinition::number("opacity", "The opacity of the map layers.")
            .with_default(json!(DEFAULT_OPACITY))]
    }
}

pub trait RasterLayerMixin: MappableMixin {
    /// Opacity in `[0, 1]`.
    fn opacity(&self) -> f64 {
        self.model()
            .get_f64("opacity")
            .filter(|o| o.is_finite())
            .unwrap_or(DEFAULT_OPACITY)
            .clamp(0.0, 1.0)
    }
}
