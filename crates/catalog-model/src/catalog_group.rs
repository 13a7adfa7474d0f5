//! The plain catalog folder type.

use std::any::Any;
use std::sync::{Arc, Weak};

use once_cell::sync::Lazy;

use crate::factory::CatalogMemberFactory;
use crate::mixins::{CatalogMemberMixin, CatalogMemberTraits, GroupMixin, GroupTraits};
use crate::model::{BaseModel, Model};
use crate::session::Session;
use crate::traits::ModelTraits;

static GROUP_TRAITS: Lazy<Arc<ModelTraits>> = Lazy::new(|| {
    let schema = ModelTraits::new("CatalogGroupTraits")
        .apply::<CatalogMemberTraits>()
        .and_then(ModelTraits::apply::<GroupTraits>)
        .expect("catalog group trait layers are consistent");
    Arc::new(schema)
});

/// A folder in the catalog tree.
#[derive(Debug)]
pub struct CatalogGroup {
    model: Model,
}

impl CatalogGroup {
    pub const TYPE: &'static str = "group";

    pub fn new(id: impl Into<String>, session: Weak<Session>) -> Self {
        Self {
            model: Model::new(id, Self::TYPE, Self::traits(), session),
        }
    }

    pub fn traits() -> Arc<ModelTraits> {
        Arc::clone(&GROUP_TRAITS)
    }

    pub fn register(factory: &CatalogMemberFactory) {
        factory.register(Self::TYPE, |id, session| -> Arc<dyn BaseModel> {
            Arc::new(CatalogGroup::new(id, session))
        });
    }
}

impl BaseModel for CatalogGroup {
    fn model(&self) -> &Model {
        &self.model
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_catalog_member(&self) -> Option<&dyn CatalogMemberMixin> {
        Some(self)
    }

    fn as_group(&self) -> Option<&dyn GroupMixin> {
        Some(self)
    }
}

impl CatalogMemberMixin for CatalogGroup {}

impl GroupMixin for CatalogGroup {}
