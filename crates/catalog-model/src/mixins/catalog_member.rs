use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use wms_common::CatalogResult;

use crate::model::BaseModel;
use crate::traits::{ModelTraits, TraitDefinition, TraitLayer};

/// A titled block of descriptive text shown with an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoSection {
    pub name: String,
    pub content: String,
}

impl InfoSection {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

static INFO_SECTION_TRAITS: Lazy<Arc<ModelTraits>> = Lazy::new(|| {
    ModelTraits::object(
        "InfoSectionTraits",
        vec![
            TraitDefinition::string("name", "The name of the section."),
            TraitDefinition::string("content", "The content of the section."),
        ],
    )
});

pub struct CatalogMemberTraits;

impl TraitLayer for CatalogMemberTraits {
    const NAME: &'static str = "CatalogMemberTraits";

    fn definitions() -> Vec<TraitDefinition> {
        vec![
            TraitDefinition::string("name", "The name of the catalog item."),
            TraitDefinition::string("description", "The description of the catalog item."),
            TraitDefinition::composite_array(
                "info",
                "Human-readable information about this dataset.",
                Arc::clone(&INFO_SECTION_TRAITS),
            ),
            TraitDefinition::string(
                "shortReport",
                "A short report to show on the now viewing tab.",
            ),
        ]
    }
}

/// Anything that appears in the catalog.
#[async_trait]
pub trait CatalogMemberMixin: BaseModel {
    fn name(&self) -> Option<String> {
        self.model().get_string("name")
    }

    fn description(&self) -> Option<String> {
        self.model().get_string("description")
    }

    fn short_report(&self) -> Option<String> {
        self.model().get_string("shortReport")
    }

    /// The name shown in the catalog tree; falls back to the id.
    fn name_in_catalog(&self) -> String {
        self.name().unwrap_or_else(|| self.id().to_string())
    }

    fn info(&self) -> Vec<InfoSection> {
        self.model().get_as("info").unwrap_or_default()
    }

    /// Fetch whatever is needed to describe the item. Nothing by default.
    async fn load_metadata(&self) -> CatalogResult<()> {
        Ok(())
    }

    /// Fetch whatever is needed to display the item.
    async fn load_data(&self) -> CatalogResult<()> {
        self.load_metadata().await
    }
}
