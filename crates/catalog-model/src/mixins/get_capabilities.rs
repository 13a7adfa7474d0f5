use serde_json::json;

use crate::mixins::url::UrlMixin;
use crate::traits::{TraitDefinition, TraitLayer};

/// Id of the stratum holding values derived from a capabilities document.
pub const CAPABILITIES_STRATUM: &str = "getCapabilities";

pub const DEFAULT_CAPABILITIES_CACHE_DURATION: &str = "1d";

pub struct GetCapabilitiesTraits;

impl TraitLayer for GetCapabilitiesTraits {
    const NAME: &'static str = "GetCapabilitiesTraits";
    const REQUIRES: &'static [&'static str] = &["url"];

    fn definitions() -> Vec<TraitDefinition> {
        vec![
            TraitDefinition::string(
                "getCapabilitiesUrl",
                "The URL at which to access to the GetCapabilities service.",
            ),
            TraitDefinition::string(
                "getCapabilitiesCacheDuration",
                "The amount of time to cache GetCapabilities responses.",
            )
            .with_default(json!(DEFAULT_CAPABILITIES_CACHE_DURATION)),
        ]
    }
}

/// Items that describe themselves from a service capabilities document.
pub trait GetCapabilitiesMixin: UrlMixin {
    /// URL derived from `url` when `getCapabilitiesUrl` is not set.
    fn default_get_capabilities_url(&self) -> Option<String>;

    fn get_capabilities_url(&self) -> Option<String> {
        self.model()
            .get_string("getCapabilitiesUrl")
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.default_get_capabilities_url())
    }

    fn get_capabilities_cache_duration(&self) -> String {
        self.model()
            .get_string("getCapabilitiesCacheDuration")
            .unwrap_or_else(|| DEFAULT_CAPABILITIES_CACHE_DURATION.to_string())
    }
}
