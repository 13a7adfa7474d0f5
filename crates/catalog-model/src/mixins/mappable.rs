use std::any::Any;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde_json::json;
use wms_common::Rectangle;

use crate::model::BaseModel;
use crate::traits::{ModelTraits, TraitDefinition, TraitLayer};

static RECTANGLE_TRAITS: Lazy<Arc<ModelTraits>> = Lazy::new(|| {
    ModelTraits::object(
        "RectangleTraits",
        vec![
            TraitDefinition::number("west", "The westernmost longitude in degrees."),
            TraitDefinition::number("south", "The southernmost latitude in degrees."),
            TraitDefinition::number("east", "The easternmost longitude in degrees."),
            TraitDefinition::number("north", "The northernmost latitude in degrees."),
        ],
    )
});

/// Schema of the `rectangle` trait.
pub fn rectangle_traits() -> Arc<ModelTraits> {
    Arc::clone(&RECTANGLE_TRAITS)
}

pub struct MappableTraits;

impl TraitLayer for MappableTraits {
    const NAME: &'static str = "MappableTraits";

    fn definitions() -> Vec<TraitDefinition> {
        vec![
            TraitDefinition::composite(
                "rectangle",
                "The bounding box rectangle that contains all the data in this catalog item.",
                rectangle_traits(),
            ),
            TraitDefinition::boolean("show", "Show or hide a workbench item.")
                .with_default(json!(true)),
        ]
    }
}

/// Something a renderer can draw tiles from.
///
/// Renderers compare providers by identity, so implementations are shared
/// behind `Arc` and never mutated after construction.
pub trait ImageryProvider: Send + Sync + fmt::Debug {
    /// Base URL requests are made against.
    fn url(&self) -> &str;

    fn rectangle(&self) -> Option<Rectangle>;

    fn tile_size(&self) -> u32;

    /// Deepest zoom level worth requesting, if limited.
    fn maximum_level(&self) -> Option<u32>;

    fn as_any(&self) -> &dyn Any;
}

/// One renderable layer contributed by a catalog item.
#[derive(Clone, Debug)]
pub struct MapItem {
    pub provider: Arc<dyn ImageryProvider>,
    pub opacity: f64,
    pub visible: bool,
}

impl MapItem {
    /// Whether both items draw from the same provider instance.
    pub fn same_provider(&self, other: &MapItem) -> bool {
        Arc::ptr_eq(&self.provider, &other.provider)
    }
}

pub trait MappableMixin: BaseModel {
    fn rectangle(&self) -> Option<Rectangle> {
        self.model().get_as("rectangle")
    }

    fn show(&self) -> bool {
        self.model().get_bool("show").unwrap_or(true)
    }

    fn is_mappable(&self) -> bool {
        true
    }

    fn can_zoom_to(&self) -> bool {
        self.rectangle().is_some_and(|r| r.is_valid())
    }

    /// Layers to hand to the renderer. Empty until the item can be drawn.
    fn map_items(&self) -> Vec<MapItem>;
}
