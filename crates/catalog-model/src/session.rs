//! The top-level container that owns every model.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Weak};

use catalog_reactive::{batch, Atom};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info, warn};
use wms_common::{CatalogError, CatalogResult};

use crate::catalog_group::CatalogGroup;
use crate::config::CatalogConfig;
use crate::factory::CatalogMemberFactory;
use crate::model::{BaseModel, DEFINITION_STRATUM};
use crate::proxy::{NoProxy, PrefixProxy, UrlProxy};

/// Owns the models of one viewer instance and the services they share.
pub struct Session {
    config: CatalogConfig,
    factory: CatalogMemberFactory,
    proxy: Arc<dyn UrlProxy>,
    models: RwLock<HashMap<String, Arc<dyn BaseModel>>>,
    // Reported when models are added or removed.
    models_atom: Arc<Atom>,
    weak: Weak<Session>,
}

impl Session {
    /// Create a session whose proxy follows `config.proxy_prefix`.
    pub fn new(config: CatalogConfig) -> Arc<Self> {
        let proxy: Arc<dyn UrlProxy> = match &config.proxy_prefix {
            Some(prefix) => Arc::new(PrefixProxy::new(prefix.clone())),
            None => Arc::new(NoProxy),
        };
        Self::with_proxy(config, proxy)
    }

    /// Create a session with an explicit proxy. The `group` type is
    /// registered; other member types are registered by their crates.
    pub fn with_proxy(config: CatalogConfig, proxy: Arc<dyn UrlProxy>) -> Arc<Self> {
        let session = Arc::new_cyclic(|weak| Session {
            config,
            factory: CatalogMemberFactory::new(),
            proxy,
            models: RwLock::new(HashMap::new()),
            models_atom: Atom::new("session.models"),
            weak: weak.clone(),
        });
        CatalogGroup::register(session.factory());
        session
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn factory(&self) -> &CatalogMemberFactory {
        &self.factory
    }

    /// Rewrite an outbound URL for `item`. Falls back to the configured
    /// default cache duration.
    pub fn proxy_url(&self, item: &dyn BaseModel, url: &str, cache_duration: Option<&str>) -> String {
        let duration = cache_duration.unwrap_or(&self.config.default_cache_duration);
        self.proxy.proxy_url(item, url, Some(duration))
    }

    pub fn add_model(&self, model: Arc<dyn BaseModel>) -> CatalogResult<()> {
        let id = model.id().to_string();
        {
            let mut models = self.models.write();
            if models.contains_key(&id) {
                return Err(CatalogError::DuplicateModelId(id));
            }
            models.insert(id.clone(), model);
        }
        debug!(model = %id, "Added model");
        self.models_atom.report_changed();
        Ok(())
    }

    pub fn get_model(&self, id: &str) -> Option<Arc<dyn BaseModel>> {
        self.models_atom.report_observed();
        self.models.read().get(id).cloned()
    }

    pub fn remove_model(&self, id: &str) -> Option<Arc<dyn BaseModel>> {
        let removed = self.models.write().remove(id);
        if removed.is_some() {
            debug!(model = %id, "Removed model");
            self.models_atom.report_changed();
        }
        removed
    }

    /// Ids of every model, sorted.
    pub fn model_ids(&self) -> Vec<String> {
        self.models_atom.report_observed();
        let mut ids: Vec<String> = self.models.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Build a model through the factory and add it to the session.
    pub fn create_model(&self, type_name: &str, id: &str) -> CatalogResult<Arc<dyn BaseModel>> {
        let model = self.factory.create(type_name, id, self.weak.clone())?;
        self.add_model(Arc::clone(&model))?;
        Ok(model)
    }

    /// Create one catalog member from its JSON definition.
    ///
    /// The member's id is its `id` key, else `{parent}/{name}`. Every other key
    /// goes to the `definition` stratum; a group's `members` are created
    /// recursively.
    pub fn create_member_from_json(
        &self,
        json: &Value,
        parent_id: Option<&str>,
    ) -> CatalogResult<Arc<dyn BaseModel>> {
        let object = json.as_object().ok_or_else(|| {
            CatalogError::configuration("Invalid catalog member", "expected a JSON object")
        })?;
        let type_name = object.get("type").and_then(Value::as_str).ok_or_else(|| {
            CatalogError::configuration("Invalid catalog member", "member has no 'type'")
        })?;
        let id = member_id(object, parent_id)?;

        if self.models.read().contains_key(&id) {
            return Err(CatalogError::DuplicateModelId(id));
        }

        // The model joins the session only once its own definition is valid.
        let model = self.factory.create(type_name, &id, self.weak.clone())?;
        let mut definition = object.clone();
        let members = definition.remove("members");
        model
            .model()
            .update_from_json(DEFINITION_STRATUM, &Value::Object(definition))?;

        let before = self.model_id_set();
        self.add_model(Arc::clone(&model))?;
        let added = batch(|| -> CatalogResult<()> {
            let Some(members) = members else {
                return Ok(());
            };
            let members = members.as_array().ok_or_else(|| {
                CatalogError::configuration(
                    "Invalid catalog member",
                    format!("'members' of '{id}' must be an array"),
                )
            })?;
            let group = model.as_group().ok_or_else(|| {
                CatalogError::configuration(
                    "Invalid catalog member",
                    format!("'{id}' has members but is not a group"),
                )
            })?;
            group.add_members_from_json(DEFINITION_STRATUM, members)?;
            Ok(())
        });
        if let Err(err) = added {
            self.remove_models_not_in(&before);
            return Err(err);
        }
        Ok(model)
    }

    fn model_id_set(&self) -> HashSet<String> {
        self.models.read().keys().cloned().collect()
    }

    /// Drop every model whose id is not in `keep`.
    fn remove_models_not_in(&self, keep: &HashSet<String>) {
        let stale: Vec<String> = self
            .models
            .read()
            .keys()
            .filter(|id| !keep.contains(*id))
            .cloned()
            .collect();
        for id in &stale {
            self.remove_model(id);
        }
        if !stale.is_empty() {
            warn!(models = ?stale, "Rolled back partially created catalog members");
        }
    }

    /// Load a catalog file: `{"catalog": [...]}` or a bare array of members.
    /// Returns the top-level members.
    pub fn add_catalog_from_json(&self, json: &Value) -> CatalogResult<Vec<Arc<dyn BaseModel>>> {
        let members = json
            .get("catalog")
            .unwrap_or(json)
            .as_array()
            .ok_or_else(|| {
                CatalogError::configuration("Invalid catalog", "expected an array of members")
            })?;
        let before = self.model_id_set();
        let created = members
            .iter()
            .map(|member| self.create_member_from_json(member, None))
            .collect::<CatalogResult<Vec<_>>>()
            .map_err(|err| {
                self.remove_models_not_in(&before);
                err
            })?;
        info!(members = created.len(), models = self.models.read().len(), "Catalog loaded");
        Ok(created)
    }
}

fn member_id(object: &serde_json::Map<String, Value>, parent_id: Option<&str>) -> CatalogResult<String> {
    if let Some(id) = object.get("id").and_then(Value::as_str) {
        return Ok(id.to_string());
    }
    let name = object.get("name").and_then(Value::as_str).ok_or_else(|| {
        CatalogError::configuration("Invalid catalog member", "member needs an 'id' or a 'name'")
    })?;
    Ok(match parent_id {
        Some(parent) => format!("{parent}/{name}"),
        None => name.to_string(),
    })
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("models", &self.models.read().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixins::{CatalogMemberMixin, GroupMixin};
    use serde_json::json;

    fn session() -> Arc<Session> {
        Session::new(CatalogConfig::default())
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let session = session();
        session.create_model("group", "a").unwrap();
        let err = session.create_model("group", "a").unwrap_err();
        assert_eq!(err, CatalogError::DuplicateModelId("a".into()));
    }

    #[test]
    fn test_nested_groups_from_json() {
        let session = session();
        let top = session
            .add_catalog_from_json(&json!({
                "catalog": [{
                    "type": "group",
                    "name": "Weather",
                    "members": [
                        {"type": "group", "name": "Radar"},
                        {"type": "group", "id": "sat", "name": "Satellite", "isOpen": true}
                    ]
                }]
            }))
            .unwrap();

        assert_eq!(top.len(), 1);
        let root = top[0].as_group().unwrap();
        assert_eq!(root.member_ids(), vec!["Weather/Radar", "sat"]);
        let members = root.member_models();
        assert_eq!(members.len(), 2);
        assert_eq!(
            members[1].as_catalog_member().unwrap().name().as_deref(),
            Some("Satellite")
        );
        assert!(members[1].as_group().unwrap().is_open());
        assert_eq!(session.model_ids(), vec!["Weather", "Weather/Radar", "sat"]);
    }

    #[test]
    fn test_invalid_definition_is_not_registered() {
        let session = session();
        let err = session
            .create_member_from_json(&json!({"type": "group", "id": "g", "isOpen": "yes"}), None)
            .unwrap_err();
        assert!(!matches!(err, CatalogError::DuplicateModelId(_)));
        assert!(session.model_ids().is_empty());

        let group = session
            .create_member_from_json(&json!({"type": "group", "id": "g", "isOpen": true}), None)
            .unwrap();
        assert!(group.as_group().unwrap().is_open());
        assert_eq!(session.model_ids(), vec!["g"]);
    }

    #[test]
    fn test_failed_member_rolls_back_the_catalog() {
        let session = session();
        let catalog = json!([
            {"type": "group", "id": "ok"},
            {
                "type": "group",
                "id": "parent",
                "members": [
                    {"type": "group", "id": "child"},
                    {"type": "group", "id": "bad", "isOpen": "yes"}
                ]
            }
        ]);
        assert!(session.add_catalog_from_json(&catalog).is_err());
        assert!(session.model_ids().is_empty());

        let fixed = json!([
            {"type": "group", "id": "ok"},
            {
                "type": "group",
                "id": "parent",
                "members": [
                    {"type": "group", "id": "child"},
                    {"type": "group", "id": "bad", "isOpen": true}
                ]
            }
        ]);
        session.add_catalog_from_json(&fixed).unwrap();
        assert_eq!(session.model_ids(), vec!["bad", "child", "ok", "parent"]);
    }

    #[test]
    fn test_unknown_member_type_fails() {
        let session = session();
        let err = session
            .add_catalog_from_json(&json!([{"type": "csv", "name": "x"}]))
            .unwrap_err();
        assert_eq!(err, CatalogError::UnknownType("csv".into()));
    }

    #[test]
    fn test_missing_members_are_skipped() {
        let session = session();
        let group = session.create_model("group", "g").unwrap();
        let group = group.as_group().unwrap();
        group.add_member(DEFINITION_STRATUM, "ghost").unwrap();
        assert!(group.member_models().is_empty());
    }

    #[test]
    fn test_proxy_uses_default_duration() {
        let session = Session::new(CatalogConfig {
            proxy_prefix: Some("/proxy/".into()),
            ..CatalogConfig::default()
        });
        let item = CatalogGroup::new("x", Weak::new());
        assert_eq!(
            session.proxy_url(&item, "http://a/wms", None),
            "/proxy_1d/http://a/wms"
        );
        assert_eq!(
            session.proxy_url(&item, "http://a/wms", Some("2h")),
            "/proxy_2h/http://a/wms"
        );
    }
}
