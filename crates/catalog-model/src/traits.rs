//! Trait schemas: the declared, typed properties of a model type.
//!
//! A schema is built by linear extension. Each mixin layer contributes a
//! [`TraitLayer`] whose definitions are appended after the base schema's, so
//! stacking layers always yields the same flat, ordered list.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use wms_common::{CatalogError, CatalogResult};

/// Scalar value kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    String,
    Number,
    Boolean,
    /// Free-form JSON (e.g. extra request parameters).
    Any,
}

/// The value type of a trait.
#[derive(Debug, Clone)]
pub enum TraitKind {
    Primitive(PrimitiveKind),
    /// Id of another model.
    Reference,
    /// Ids of other models.
    ReferenceArray,
    /// A nested object validated against its own schema.
    Composite(Arc<ModelTraits>),
    /// A list of nested objects.
    CompositeArray(Arc<ModelTraits>),
}

impl TraitKind {
    /// Human-readable description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            TraitKind::Primitive(PrimitiveKind::String) => "a string".to_string(),
            TraitKind::Primitive(PrimitiveKind::Number) => "a number".to_string(),
            TraitKind::Primitive(PrimitiveKind::Boolean) => "a boolean".to_string(),
            TraitKind::Primitive(PrimitiveKind::Any) => "any value".to_string(),
            TraitKind::Reference => "a model id".to_string(),
            TraitKind::ReferenceArray => "an array of model ids".to_string(),
            TraitKind::Composite(schema) => format!("an object of {}", schema.name()),
            TraitKind::CompositeArray(schema) => format!("an array of {}", schema.name()),
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            TraitKind::Primitive(PrimitiveKind::String) | TraitKind::Reference => {
                value.is_string()
            }
            TraitKind::Primitive(PrimitiveKind::Number) => value.is_number(),
            TraitKind::Primitive(PrimitiveKind::Boolean) => value.is_boolean(),
            TraitKind::Primitive(PrimitiveKind::Any) => true,
            TraitKind::ReferenceArray => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            TraitKind::Composite(schema) => schema.accepts_object(value),
            TraitKind::CompositeArray(schema) => value
                .as_array()
                .is_some_and(|items| items.iter().all(|item| schema.accepts_object(item))),
        }
    }
}

/// One declared property of a model type.
#[derive(Debug, Clone)]
pub struct TraitDefinition {
    pub name: String,
    pub description: String,
    pub kind: TraitKind,
    /// Value used when no stratum defines the trait.
    pub default: Option<Value>,
}

impl TraitDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, kind: TraitKind) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind,
            default: None,
        }
    }

    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, TraitKind::Primitive(PrimitiveKind::String))
    }

    pub fn number(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, TraitKind::Primitive(PrimitiveKind::Number))
    }

    pub fn boolean(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, TraitKind::Primitive(PrimitiveKind::Boolean))
    }

    pub fn any(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, TraitKind::Primitive(PrimitiveKind::Any))
    }

    pub fn reference(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, TraitKind::Reference)
    }

    pub fn reference_array(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, TraitKind::ReferenceArray)
    }

    pub fn composite(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: Arc<ModelTraits>,
    ) -> Self {
        Self::new(name, description, TraitKind::Composite(schema))
    }

    pub fn composite_array(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: Arc<ModelTraits>,
    ) -> Self {
        Self::new(name, description, TraitKind::CompositeArray(schema))
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Check a value against this trait's kind. `null` is always accepted and
    /// means "unset".
    pub fn validate(&self, value: &Value) -> CatalogResult<()> {
        if value.is_null() || self.kind.accepts(value) {
            Ok(())
        } else {
            Err(CatalogError::TraitTypeMismatch {
                name: self.name.clone(),
                expected: self.kind.describe(),
            })
        }
    }
}

/// A schema layer contributed by a mixin.
pub trait TraitLayer {
    const NAME: &'static str;

    /// Traits that must already be present in the schema being extended.
    const REQUIRES: &'static [&'static str] = &[];

    fn definitions() -> Vec<TraitDefinition>;
}

/// An ordered, named set of trait definitions.
#[derive(Clone)]
pub struct ModelTraits {
    name: String,
    definitions: Vec<TraitDefinition>,
    index: HashMap<String, usize>,
    layers: Vec<String>,
}

impl ModelTraits {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definitions: Vec::new(),
            index: HashMap::new(),
            layers: Vec::new(),
        }
    }

    /// Schema for a nested composite value. Later definitions with a repeated
    /// name replace earlier ones.
    pub fn object(name: impl Into<String>, definitions: Vec<TraitDefinition>) -> Arc<Self> {
        let mut schema = Self::new(name);
        for definition in definitions {
            match schema.index.get(&definition.name) {
                Some(&i) => schema.definitions[i] = definition,
                None => schema.push(definition),
            }
        }
        Arc::new(schema)
    }

    fn push(&mut self, definition: TraitDefinition) {
        self.index
            .insert(definition.name.clone(), self.definitions.len());
        self.definitions.push(definition);
    }

    /// New schema with `additions` appended after this schema's traits.
    pub fn extend(
        &self,
        additions: impl IntoIterator<Item = TraitDefinition>,
    ) -> CatalogResult<Self> {
        let mut extended = self.clone();
        for definition in additions {
            if extended.index.contains_key(&definition.name) {
                return Err(CatalogError::DuplicateTrait(definition.name));
            }
            extended.push(definition);
        }
        Ok(extended)
    }

    /// Apply a mixin layer.
    pub fn apply<L: TraitLayer>(self) -> CatalogResult<Self> {
        for required in L::REQUIRES {
            if !self.contains(required) {
                return Err(CatalogError::MissingTraitDependency {
                    layer: L::NAME.to_string(),
                    requires: (*required).to_string(),
                });
            }
        }
        let mut extended = self.extend(L::definitions())?;
        extended.layers.push(L::NAME.to_string());
        Ok(extended)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, name: &str) -> Option<&TraitDefinition> {
        self.index.get(name).map(|&i| &self.definitions[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TraitDefinition> {
        self.definitions.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.definitions.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Names of the layers applied, in order.
    pub fn layers(&self) -> &[String] {
        &self.layers
    }

    pub fn has_layer(&self, name: &str) -> bool {
        self.layers.iter().any(|l| l == name)
    }

    /// Validate a value for the named trait.
    pub fn validate(&self, name: &str, value: &Value) -> CatalogResult<()> {
        self.get(name)
            .ok_or_else(|| CatalogError::UnknownTrait {
                schema: self.name.clone(),
                name: name.to_string(),
            })?
            .validate(value)
    }

    fn accepts_object(&self, value: &Value) -> bool {
        let Some(object) = value.as_object() else {
            return false;
        };
        object.iter().all(|(key, field)| {
            self.get(key)
                .is_some_and(|definition| definition.validate(field).is_ok())
        })
    }
}

impl fmt::Debug for ModelTraits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelTraits")
            .field("name", &self.name)
            .field("traits", &self.names())
            .field("layers", &self.layers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Named;
    impl TraitLayer for Named {
        const NAME: &'static str = "NamedTraits";
        fn definitions() -> Vec<TraitDefinition> {
            vec![TraitDefinition::string("name", "Display name")]
        }
    }

    struct Located;
    impl TraitLayer for Located {
        const NAME: &'static str = "LocatedTraits";
        const REQUIRES: &'static [&'static str] = &["name"];
        fn definitions() -> Vec<TraitDefinition> {
            vec![
                TraitDefinition::string("url", "Where"),
                TraitDefinition::number("zoom", "How close").with_default(json!(3)),
            ]
        }
    }

    #[test]
    fn test_layers_append_in_order() {
        let schema = ModelTraits::new("Item")
            .apply::<Named>()
            .unwrap()
            .apply::<Located>()
            .unwrap();
        assert_eq!(schema.names(), vec!["name", "url", "zoom"]);
        assert_eq!(schema.layers(), ["NamedTraits", "LocatedTraits"]);
        assert_eq!(schema.get("zoom").unwrap().default, Some(json!(3)));
    }

    #[test]
    fn test_layer_dependency_must_come_first() {
        let err = ModelTraits::new("Item").apply::<Located>().unwrap_err();
        assert_eq!(
            err,
            CatalogError::MissingTraitDependency {
                layer: "LocatedTraits".into(),
                requires: "name".into()
            }
        );
    }

    #[test]
    fn test_extend_is_associative() {
        let a = ModelTraits::new("A")
            .extend([TraitDefinition::string("a", "")])
            .unwrap();
        let b = vec![TraitDefinition::string("b", "")];
        let c = vec![TraitDefinition::boolean("c", "")];

        let stepwise = a.extend(b.clone()).unwrap().extend(c.clone()).unwrap();
        let at_once = a.extend(b.into_iter().chain(c)).unwrap();
        assert_eq!(stepwise.names(), at_once.names());
    }

    #[test]
    fn test_duplicate_trait_rejected() {
        let base = ModelTraits::new("A").apply::<Named>().unwrap();
        let err = base
            .extend([TraitDefinition::string("name", "again")])
            .unwrap_err();
        assert_eq!(err, CatalogError::DuplicateTrait("name".into()));
    }

    #[test]
    fn test_validation() {
        let rect = ModelTraits::object(
            "RectangleTraits",
            vec![
                TraitDefinition::number("west", ""),
                TraitDefinition::number("east", ""),
            ],
        );
        let schema = ModelTraits::new("A")
            .extend([
                TraitDefinition::string("name", ""),
                TraitDefinition::reference_array("members", ""),
                TraitDefinition::composite("rectangle", "", rect),
            ])
            .unwrap();

        assert!(schema.validate("name", &json!("x")).is_ok());
        assert!(schema.validate("name", &json!(1)).is_err());
        assert!(schema.validate("name", &Value::Null).is_ok());
        assert!(schema.validate("members", &json!(["a", "b"])).is_ok());
        assert!(schema.validate("members", &json!(["a", 2])).is_err());
        assert!(schema
            .validate("rectangle", &json!({"west": 1.0, "east": 2.0}))
            .is_ok());
        assert!(schema
            .validate("rectangle", &json!({"west": "far"}))
            .is_err());
        assert!(schema
            .validate("rectangle", &json!({"up": 1.0}))
            .is_err());
        assert!(matches!(
            schema.validate("missing", &json!(1)),
            Err(CatalogError::UnknownTrait { .. })
        ));
    }
}
