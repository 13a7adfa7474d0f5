//! Models: a trait schema plus an ordered set of strata.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use catalog_reactive::{Atom, Computed};
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use wms_common::{CatalogError, CatalogResult};

use crate::mixins::{CatalogMemberMixin, GroupMixin, MappableMixin};
use crate::session::Session;
use crate::stratum::{InMemoryStratum, Stratum, TraitValue};
use crate::traits::ModelTraits;

/// Values set by the user at runtime. Highest priority.
pub const USER_STRATUM: &str = "user";
/// Values from the catalog file.
pub const DEFINITION_STRATUM: &str = "definition";
/// Fallback values supplied by code. Lowest priority.
pub const DEFAULTS_STRATUM: &str = "defaults";

type Resolver = Computed<Option<TraitValue>>;

struct ModelCore {
    id: String,
    type_name: String,
    schema: Arc<ModelTraits>,
    priority: RwLock<Vec<String>>,
    strata: RwLock<HashMap<String, Arc<dyn Stratum>>>,
    // Reported on any change to `priority` or `strata`.
    strata_atom: Arc<Atom>,
    resolved: Mutex<HashMap<String, Resolver>>,
    session: Weak<Session>,
}

/// Shared handle to a model's strata and resolved values.
#[derive(Clone)]
pub struct Model {
    core: Arc<ModelCore>,
}

/// Non-owning handle, for closures stored inside the model itself.
#[derive(Clone)]
pub struct WeakModel {
    core: Weak<ModelCore>,
}

impl WeakModel {
    pub fn upgrade(&self) -> Option<Model> {
        self.core.upgrade().map(|core| Model { core })
    }
}

impl Model {
    /// Create a model with the `user`, `definition` and `defaults` strata.
    pub fn new(
        id: impl Into<String>,
        type_name: impl Into<String>,
        schema: Arc<ModelTraits>,
        session: Weak<Session>,
    ) -> Self {
        let id = id.into();
        let mut strata: HashMap<String, Arc<dyn Stratum>> = HashMap::new();
        let mut priority = Vec::new();
        for stratum_id in [USER_STRATUM, DEFINITION_STRATUM, DEFAULTS_STRATUM] {
            strata.insert(
                stratum_id.to_string(),
                Arc::new(InMemoryStratum::new(stratum_id, Arc::clone(&schema))),
            );
            priority.push(stratum_id.to_string());
        }
        Self {
            core: Arc::new(ModelCore {
                strata_atom: Atom::new(format!("{id}.strata")),
                id,
                type_name: type_name.into(),
                schema,
                priority: RwLock::new(priority),
                strata: RwLock::new(strata),
                resolved: Mutex::new(HashMap::new()),
                session,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.core.id
    }

    pub fn type_name(&self) -> &str {
        &self.core.type_name
    }

    pub fn schema(&self) -> &Arc<ModelTraits> {
        &self.core.schema
    }

    pub fn downgrade(&self) -> WeakModel {
        WeakModel {
            core: Arc::downgrade(&self.core),
        }
    }

    /// The session this model belongs to, if it is still alive.
    pub fn session(&self) -> Option<Arc<Session>> {
        self.core.session.upgrade()
    }

    /// Stratum ids, highest priority first.
    pub fn stratum_order(&self) -> Vec<String> {
        self.core.strata_atom.report_observed();
        self.core.priority.read().clone()
    }

    pub fn stratum(&self, id: &str) -> Option<Arc<dyn Stratum>> {
        self.core.strata_atom.report_observed();
        self.core.strata.read().get(id).cloned()
    }

    /// Add or replace a stratum. A new stratum is placed directly above
    /// `defaults`; a replacement keeps the old one's position.
    pub fn set_stratum(&self, stratum: Arc<dyn Stratum>) {
        let id = stratum.id().to_string();
        {
            let mut priority = self.core.priority.write();
            if !priority.contains(&id) {
                let at = priority
                    .iter()
                    .position(|s| s == DEFAULTS_STRATUM)
                    .unwrap_or(priority.len());
                priority.insert(at, id.clone());
            }
        }
        self.core.strata.write().insert(id.clone(), stratum);
        debug!(model = %self.core.id, stratum = %id, "Stratum set");
        self.core.strata_atom.report_changed();
    }

    pub fn remove_stratum(&self, id: &str) -> Option<Arc<dyn Stratum>> {
        self.core.priority.write().retain(|s| s != id);
        let removed = self.core.strata.write().remove(id);
        if removed.is_some() {
            debug!(model = %self.core.id, stratum = %id, "Stratum removed");
            self.core.strata_atom.report_changed();
        }
        removed
    }

    /// Effective value of a trait: the first stratum in priority order that
    /// defines it, else the schema default.
    ///
    /// The lookup is memoized per trait and recomputes only after a relevant
    /// stratum value changes or the set of strata changes.
    pub fn get(&self, name: &str) -> Option<TraitValue> {
        if !self.core.schema.contains(name) {
            return None;
        }
        let resolver = {
            let mut resolved = self.core.resolved.lock();
            resolved
                .entry(name.to_string())
                .or_insert_with(|| self.resolver(name))
                .clone()
        };
        resolver.get()
    }

    fn resolver(&self, name: &str) -> Resolver {
        let weak = Arc::downgrade(&self.core);
        let trait_name = name.to_string();
        Computed::new(format!("{}.{}", self.core.id, name), move || {
            let core = weak.upgrade()?;
            debug!(model = %core.id, name = %trait_name, "Resolving trait");
            core.resolve(&trait_name, None)
        })
    }

    /// Resolve a trait while ignoring one stratum. Not memoized.
    pub fn resolve_excluding(&self, name: &str, stratum_id: &str) -> Option<TraitValue> {
        self.core.resolve(name, Some(stratum_id))
    }

    pub fn get_string(&self, name: &str) -> Option<String> {
        self.get(name)?.as_str().map(str::to_string)
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name)?.as_f64()
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name)?.as_bool()
    }

    pub fn get_string_array(&self, name: &str) -> Option<Vec<String>> {
        let value = self.get(name)?;
        let items = value.as_array()?;
        Some(
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
        )
    }

    /// Deserialize a resolved value. `None` when unset or of the wrong shape.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let value = self.get(name)?;
        match T::deserialize(&*value) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                debug!(model = %self.core.id, name, error = %err, "Trait value has unexpected shape");
                None
            }
        }
    }

    fn in_memory<R>(
        &self,
        stratum_id: &str,
        f: impl FnOnce(&InMemoryStratum) -> CatalogResult<R>,
    ) -> CatalogResult<R> {
        let stratum = self
            .core
            .strata
            .read()
            .get(stratum_id)
            .cloned()
            .ok_or_else(|| CatalogError::UnknownStratum(stratum_id.to_string()))?;
        let writable = stratum
            .as_any()
            .downcast_ref::<InMemoryStratum>()
            .ok_or_else(|| CatalogError::ReadOnlyStratum(stratum_id.to_string()))?;
        f(writable)
    }

    /// Write one trait in a writable stratum. `Value::Null` clears it.
    pub fn set_trait(&self, stratum_id: &str, name: &str, value: Value) -> CatalogResult<()> {
        self.in_memory(stratum_id, |stratum| stratum.set(name, value))
    }

    /// Apply a JSON object to a writable stratum in one batch.
    pub fn update_from_json(&self, stratum_id: &str, json: &Value) -> CatalogResult<usize> {
        self.in_memory(stratum_id, |stratum| stratum.update_from_json(json))
    }

    /// Remove every value from a writable stratum.
    pub fn clear_stratum(&self, stratum_id: &str) -> CatalogResult<()> {
        self.in_memory(stratum_id, |stratum| {
            stratum.clear();
            Ok(())
        })
    }

    /// Serialize one writable stratum with the model's `type` and `id`.
    pub fn to_json(&self, stratum_id: &str) -> CatalogResult<Value> {
        self.in_memory(stratum_id, |stratum| {
            let mut object = serde_json::Map::new();
            object.insert("type".into(), Value::String(self.core.type_name.clone()));
            object.insert("id".into(), Value::String(self.core.id.clone()));
            object.extend(stratum.to_json());
            Ok(Value::Object(object))
        })
    }
}

impl ModelCore {
    fn resolve(&self, name: &str, exclude: Option<&str>) -> Option<TraitValue> {
        self.strata_atom.report_observed();
        let ordered: Vec<Arc<dyn Stratum>> = {
            let priority = self.priority.read();
            let strata = self.strata.read();
            priority
                .iter()
                .filter(|id| Some(id.as_str()) != exclude)
                .filter_map(|id| strata.get(id).cloned())
                .collect()
        };
        // Strata are read without holding the locks; a loadable stratum's
        // `get` may resolve other traits of this model.
        for stratum in ordered {
            if let Some(value) = stratum.get(name) {
                if !value.is_null() {
                    return Some(value);
                }
            }
        }
        self.schema
            .get(name)
            .and_then(|definition| definition.default.clone())
            .map(Arc::new)
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("id", &self.core.id)
            .field("type", &self.core.type_name)
            .field("strata", &*self.core.priority.read())
            .finish()
    }
}

/// Behavior common to every model type.
///
/// Concrete types expose the capability mixins they implement through the
/// `as_*` accessors, so code holding a `dyn BaseModel` can discover them.
pub trait BaseModel: Send + Sync + 'static {
    fn model(&self) -> &Model;

    fn as_any(&self) -> &dyn Any;

    fn id(&self) -> &str {
        self.model().id()
    }

    fn type_name(&self) -> &str {
        self.model().type_name()
    }

    fn as_catalog_member(&self) -> Option<&dyn CatalogMemberMixin> {
        None
    }

    fn as_group(&self) -> Option<&dyn GroupMixin> {
        None
    }

    fn as_mappable(&self) -> Option<&dyn MappableMixin> {
        None
    }
}

impl fmt::Debug for dyn BaseModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseModel")
            .field("id", &self.id())
            .field("type", &self.type_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::TraitDefinition;
    use serde_json::json;

    struct FixedStratum {
        id: String,
        values: HashMap<String, TraitValue>,
    }

    impl Stratum for FixedStratum {
        fn id(&self) -> &str {
            &self.id
        }
        fn get(&self, name: &str) -> Option<TraitValue> {
            self.values.get(name).cloned()
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn schema() -> Arc<ModelTraits> {
        Arc::new(
            ModelTraits::new("TestTraits")
                .extend([
                    TraitDefinition::string("name", ""),
                    TraitDefinition::number("opacity", "").with_default(json!(0.8)),
                    TraitDefinition::string("url", ""),
                ])
                .unwrap(),
        )
    }

    fn model() -> Model {
        Model::new("item", "test", schema(), Weak::new())
    }

    #[test]
    fn test_schema_default_when_no_stratum_defines() {
        let model = model();
        assert_eq!(model.get_f64("opacity"), Some(0.8));
        assert_eq!(model.get_string("name"), None);
        assert_eq!(model.get("unknown"), None);
    }

    #[test]
    fn test_highest_priority_stratum_wins() {
        let model = model();
        model.set_trait(DEFAULTS_STRATUM, "name", json!("default")).unwrap();
        assert_eq!(model.get_string("name").as_deref(), Some("default"));
        model.set_trait(DEFINITION_STRATUM, "name", json!("definition")).unwrap();
        assert_eq!(model.get_string("name").as_deref(), Some("definition"));
        model.set_trait(USER_STRATUM, "name", json!("user")).unwrap();
        assert_eq!(model.get_string("name").as_deref(), Some("user"));

        model.set_trait(USER_STRATUM, "name", Value::Null).unwrap();
        assert_eq!(model.get_string("name").as_deref(), Some("definition"));
    }

    #[test]
    fn test_loadable_stratum_sits_above_defaults() {
        let model = model();
        model.set_trait(DEFAULTS_STRATUM, "url", json!("http://default")).unwrap();
        model.set_stratum(Arc::new(FixedStratum {
            id: "loaded".into(),
            values: HashMap::from([("url".to_string(), Arc::new(json!("http://loaded")))]),
        }));
        assert_eq!(
            model.stratum_order(),
            vec!["user", "definition", "loaded", "defaults"]
        );
        assert_eq!(model.get_string("url").as_deref(), Some("http://loaded"));

        model.set_trait(DEFINITION_STRATUM, "url", json!("http://defined")).unwrap();
        assert_eq!(model.get_string("url").as_deref(), Some("http://defined"));
        assert_eq!(
            model.resolve_excluding("url", DEFINITION_STRATUM).as_deref(),
            Some(&json!("http://loaded"))
        );
    }

    #[test]
    fn test_stratum_replacement_invalidates_resolution() {
        let model = model();
        let loaded = |url: &str| -> Arc<dyn Stratum> {
            Arc::new(FixedStratum {
                id: "loaded".into(),
                values: HashMap::from([("url".to_string(), Arc::new(json!(url)))]),
            })
        };
        model.set_stratum(loaded("http://a"));
        assert_eq!(model.get_string("url").as_deref(), Some("http://a"));
        model.set_stratum(loaded("http://b"));
        assert_eq!(model.get_string("url").as_deref(), Some("http://b"));
        model.remove_stratum("loaded");
        assert_eq!(model.get_string("url"), None);
    }

    #[test]
    fn test_resolution_is_memoized() {
        let model = model();
        model.set_trait(USER_STRATUM, "name", json!("a")).unwrap();
        let first = model.get("name").unwrap();
        let second = model.get("name").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_write_errors() {
        let model = model();
        model.set_stratum(Arc::new(FixedStratum {
            id: "loaded".into(),
            values: HashMap::new(),
        }));
        assert_eq!(
            model.set_trait("loaded", "name", json!("x")),
            Err(CatalogError::ReadOnlyStratum("loaded".into()))
        );
        assert_eq!(
            model.set_trait("nope", "name", json!("x")),
            Err(CatalogError::UnknownStratum("nope".into()))
        );
    }

    #[test]
    fn test_to_json_includes_identity() {
        let model = model();
        model.set_trait(DEFINITION_STRATUM, "name", json!("Rain")).unwrap();
        assert_eq!(
            model.to_json(DEFINITION_STRATUM).unwrap(),
            json!({"type": "test", "id": "item", "name": "Rain"})
        );
    }
}
