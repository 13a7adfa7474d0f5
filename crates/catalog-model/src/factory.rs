//! Registry of catalog member constructors keyed by type name.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::debug;
use wms_common::{CatalogError, CatalogResult};

use crate::model::BaseModel;
use crate::session::Session;

/// Builds a model with the given id, attached to the given session.
pub type MemberConstructor =
    Arc<dyn Fn(String, Weak<Session>) -> Arc<dyn BaseModel> + Send + Sync>;

/// Lets a group create members from JSON without knowing concrete types.
#[derive(Default)]
pub struct CatalogMemberFactory {
    constructors: RwLock<BTreeMap<String, MemberConstructor>>,
}

impl CatalogMemberFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the constructor for `type_name`.
    pub fn register<F>(&self, type_name: impl Into<String>, constructor: F)
    where
        F: Fn(String, Weak<Session>) -> Arc<dyn BaseModel> + Send + Sync + 'static,
    {
        let type_name = type_name.into();
        debug!(type_name = %type_name, "Registered catalog member type");
        self.constructors
            .write()
            .insert(type_name, Arc::new(constructor));
    }

    pub fn create(
        &self,
        type_name: &str,
        id: impl Into<String>,
        session: Weak<Session>,
    ) -> CatalogResult<Arc<dyn BaseModel>> {
        let constructor = self
            .constructors
            .read()
            .get(type_name)
            .cloned()
            .ok_or_else(|| CatalogError::UnknownType(type_name.to_string()))?;
        Ok(constructor(id.into(), session))
    }

    pub fn is_registered(&self, type_name: &str) -> bool {
        self.constructors.read().contains_key(type_name)
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> Vec<String> {
        self.constructors.read().keys().cloned().collect()
    }
}

impl fmt::Debug for CatalogMemberFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogMemberFactory")
            .field("types", &self.type_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_group::CatalogGroup;

    #[test]
    fn test_create_registered_type() {
        let factory = CatalogMemberFactory::new();
        CatalogGroup::register(&factory);
        assert!(factory.is_registered("group"));

        let model = factory.create("group", "g1", Weak::new()).unwrap();
        assert_eq!(model.id(), "g1");
        assert_eq!(model.type_name(), "group");
        assert!(model.as_group().is_some());
    }

    #[test]
    fn test_unknown_type_is_structured_error() {
        let factory = CatalogMemberFactory::new();
        let err = factory.create("wms", "x", Weak::new()).unwrap_err();
        assert_eq!(err, CatalogError::UnknownType("wms".into()));
        assert_eq!(err.title(), "Unable to create catalog member");
    }
}
