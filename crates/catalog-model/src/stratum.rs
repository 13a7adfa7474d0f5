//! Strata: named, partial sets of trait values.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use catalog_reactive::{batch, Observable};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use wms_common::{CatalogError, CatalogResult};

use crate::traits::ModelTraits;

/// A resolved trait value. Shared and read-only; callers that need to mutate
/// it clone the inner value first.
pub type TraitValue = Arc<Value>;

/// Keys that identify a model in catalog JSON rather than naming a trait.
pub(crate) const IDENTITY_KEYS: &[&str] = &["type", "id"];

/// One layer of trait values for a single model.
///
/// `get` must report its reads to the reactive engine so that resolution
/// recomputes when the value changes.
pub trait Stratum: Send + Sync + 'static {
    fn id(&self) -> &str;

    /// The stratum's value for a trait, or `None` if it does not define it.
    fn get(&self, name: &str) -> Option<TraitValue>;

    fn as_any(&self) -> &dyn Any;
}

/// A stratum whose values are written directly.
pub struct InMemoryStratum {
    id: String,
    schema: Arc<ModelTraits>,
    cells: HashMap<String, Observable<Option<TraitValue>>>,
}

impl InMemoryStratum {
    pub fn new(id: impl Into<String>, schema: Arc<ModelTraits>) -> Self {
        let id = id.into();
        let cells = schema
            .iter()
            .map(|definition| {
                let cell = Observable::new(format!("{id}.{}", definition.name), None);
                (definition.name.clone(), cell)
            })
            .collect();
        Self { id, schema, cells }
    }

    fn cell(&self, name: &str) -> CatalogResult<&Observable<Option<TraitValue>>> {
        self.cells.get(name).ok_or_else(|| CatalogError::UnknownTrait {
            schema: self.schema.name().to_string(),
            name: name.to_string(),
        })
    }

    /// Set a trait value. `Value::Null` clears it.
    pub fn set(&self, name: &str, value: Value) -> CatalogResult<()> {
        let cell = self.cell(name)?;
        self.schema.validate(name, &value)?;
        let value = (!value.is_null()).then(|| Arc::new(value));
        if cell.set(value) {
            debug!(stratum = %self.id, name, "Trait value changed");
        }
        Ok(())
    }

    pub fn unset(&self, name: &str) -> CatalogResult<()> {
        self.set(name, Value::Null)
    }

    /// Remove every value.
    pub fn clear(&self) {
        batch(|| {
            for cell in self.cells.values() {
                cell.set(None);
            }
        });
    }

    pub fn is_empty(&self) -> bool {
        self.cells.values().all(|cell| cell.with(Option::is_none))
    }

    /// Apply every key of a JSON object as one batch. Values are validated
    /// before anything is written; keys that are not traits are skipped.
    pub fn update_from_json(&self, json: &Value) -> CatalogResult<usize> {
        let object = json.as_object().ok_or_else(|| CatalogError::TraitTypeMismatch {
            name: self.id.clone(),
            expected: "an object".to_string(),
        })?;

        let mut writes = Vec::with_capacity(object.len());
        for (key, value) in object {
            if IDENTITY_KEYS.contains(&key.as_str()) {
                continue;
            }
            if !self.schema.contains(key) {
                warn!(stratum = %self.id, schema = %self.schema.name(), key = %key, "Skipping unknown trait");
                continue;
            }
            self.schema.validate(key, value)?;
            writes.push((key.as_str(), value));
        }

        batch(|| {
            for (key, value) in &writes {
                if let Ok(cell) = self.cell(key) {
                    cell.set((!value.is_null()).then(|| Arc::new((*value).clone())));
                }
            }
        });
        debug!(stratum = %self.id, count = writes.len(), "Applied JSON to stratum");
        Ok(writes.len())
    }

    /// Defined values only, in schema order.
    pub fn to_json(&self) -> Map<String, Value> {
        self.schema
            .iter()
            .filter_map(|definition| {
                let value = self.cells.get(&definition.name)?.get()?;
                Some((definition.name.clone(), (*value).clone()))
            })
            .collect()
    }
}

impl Stratum for InMemoryStratum {
    fn id(&self) -> &str {
        &self.id
    }

    fn get(&self, name: &str) -> Option<TraitValue> {
        self.cells.get(name)?.get()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for InMemoryStratum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryStratum")
            .field("id", &self.id)
            .field("values", &self.to_json())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::TraitDefinition;
    use catalog_reactive::Computed;
    use serde_json::json;

    fn schema() -> Arc<ModelTraits> {
        Arc::new(
            ModelTraits::new("TestTraits")
                .extend([
                    TraitDefinition::string("name", ""),
                    TraitDefinition::number("opacity", ""),
                    TraitDefinition::reference_array("members", ""),
                ])
                .unwrap(),
        )
    }

    #[test]
    fn test_unset_reads_as_none() {
        let stratum = InMemoryStratum::new("user", schema());
        assert!(stratum.get("name").is_none());
        assert!(stratum.get("not-a-trait").is_none());
        assert!(stratum.is_empty());
    }

    #[test]
    fn test_set_validates_and_null_clears() {
        let stratum = InMemoryStratum::new("user", schema());
        stratum.set("name", json!("Rain")).unwrap();
        assert_eq!(*stratum.get("name").unwrap(), json!("Rain"));

        assert!(matches!(
            stratum.set("name", json!(5)),
            Err(CatalogError::TraitTypeMismatch { .. })
        ));
        assert!(matches!(
            stratum.set("colour", json!("red")),
            Err(CatalogError::UnknownTrait { .. })
        ));

        stratum.set("name", Value::Null).unwrap();
        assert!(stratum.get("name").is_none());
    }

    #[test]
    fn test_update_from_json_skips_unknown_keys() {
        let stratum = InMemoryStratum::new("definition", schema());
        let applied = stratum
            .update_from_json(&json!({
                "type": "wms",
                "name": "Rain",
                "opacity": 0.5,
                "colour": "red"
            }))
            .unwrap();
        assert_eq!(applied, 2);
        assert_eq!(
            Value::Object(stratum.to_json()),
            json!({"name": "Rain", "opacity": 0.5})
        );
    }

    #[test]
    fn test_update_from_json_is_all_or_nothing() {
        let stratum = InMemoryStratum::new("definition", schema());
        let result = stratum.update_from_json(&json!({"name": "Rain", "opacity": "high"}));
        assert!(result.is_err());
        assert!(stratum.is_empty());
    }

    #[test]
    fn test_reads_are_tracked() {
        let stratum = Arc::new(InMemoryStratum::new("user", schema()));
        let name = Computed::new("name", {
            let stratum = stratum.clone();
            move || stratum.get("name")
        });
        assert!(name.get().is_none());
        stratum.set("name", json!("Rain")).unwrap();
        assert!(name.is_stale());
        assert_eq!(*name.get().unwrap(), json!("Rain"));
    }
}
