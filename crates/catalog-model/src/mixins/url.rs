use crate::model::BaseModel;
use crate::traits::{TraitDefinition, TraitLayer};

pub struct UrlTraits;

impl TraitLayer for UrlTraits {
    const NAME: &'static str = "UrlTraits";

    fn definitions() -> Vec<TraitDefinition> {
        vec![
            TraitDefinition::string("url", "The base URL of the file or service."),
            TraitDefinition::string(
                "cacheDuration",
                "The cache duration to use for proxied URLs for this catalog member.",
            ),
        ]
    }
}

pub trait UrlMixin: BaseModel {
    fn url(&self) -> Option<String> {
        self.model()
            .get_string("url")
            .filter(|url| !url.trim().is_empty())
    }

    fn cache_duration(&self) -> Option<String> {
        self.model().get_string("cacheDuration")
    }
}
