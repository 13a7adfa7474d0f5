//! Outbound URL rewriting.

use crate::model::BaseModel;

/// Rewrites URLs before they leave the viewer, e.g. to route them through a
/// caching proxy. Policy is up to the deployment.
pub trait UrlProxy: Send + Sync {
    fn proxy_url(&self, item: &dyn BaseModel, url: &str, cache_duration: Option<&str>) -> String;
}

/// Leaves URLs untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProxy;

impl UrlProxy for NoProxy {
    fn proxy_url(&self, _item: &dyn BaseModel, url: &str, _cache_duration: Option<&str>) -> String {
        url.to_string()
    }
}

/// Routes URLs through `{prefix}_{duration}/{url}`, or `{prefix}{url}` when
/// no duration applies.
#[derive(Debug, Clone)]
pub struct PrefixProxy {
    prefix: String,
}

impl PrefixProxy {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl UrlProxy for PrefixProxy {
    fn proxy_url(&self, _item: &dyn BaseModel, url: &str, cache_duration: Option<&str>) -> String {
        if url.starts_with(&self.prefix) || !(url.starts_with("http://") || url.starts_with("https://")) {
            return url.to_string();
        }
        match cache_duration.filter(|d| !d.is_empty()) {
            Some(duration) => format!("{}_{}/{}", self.prefix.trim_end_matches('/'), duration, url),
            None => format!("{}{}", self.prefix, url),
        }
    }
}
