use std::sync::Arc;

use catalog_reactive::{batch, untracked};
use serde_json::{json, Value};
use tracing::warn;
use wms_common::{CatalogError, CatalogResult};

use crate::model::BaseModel;
use crate::traits::{TraitDefinition, TraitLayer};

pub struct GroupTraits;

impl TraitLayer for GroupTraits {
    const NAME: &'static str = "GroupTraits";

    fn definitions() -> Vec<TraitDefinition> {
        vec![
            TraitDefinition::reference_array("members", "The members of this group."),
            TraitDefinition::boolean("isOpen", "True if this group is open and its contents are visible.")
                .with_default(json!(false)),
        ]
    }
}

/// A catalog node whose children are other models, referenced by id.
pub trait GroupMixin: BaseModel {
    fn member_ids(&self) -> Vec<String> {
        self.model().get_string_array("members").unwrap_or_default()
    }

    fn is_open(&self) -> bool {
        self.model().get_bool("isOpen").unwrap_or(false)
    }

    /// Members resolved through the session. Ids with no model are skipped.
    fn member_models(&self) -> Vec<Arc<dyn BaseModel>> {
        let Some(session) = self.model().session() else {
            return Vec::new();
        };
        self.member_ids()
            .into_iter()
            .filter_map(|id| {
                let member = session.get_model(&id);
                if member.is_none() {
                    warn!(group = %self.id(), member = %id, "Group member not found");
                }
                member
            })
            .collect()
    }

    /// Append a member id to one stratum's list, if not already there.
    fn add_member(&self, stratum_id: &str, member_id: &str) -> CatalogResult<()> {
        let mut members = stratum_members(self, stratum_id);
        if members.iter().any(|m| m == member_id) {
            return Ok(());
        }
        members.push(member_id.to_string());
        self.model().set_trait(stratum_id, "members", json!(members))
    }

    fn remove_member(&self, stratum_id: &str, member_id: &str) -> CatalogResult<bool> {
        let mut members = stratum_members(self, stratum_id);
        let before = members.len();
        members.retain(|m| m != member_id);
        if members.len() == before {
            return Ok(false);
        }
        self.model().set_trait(stratum_id, "members", json!(members))?;
        Ok(true)
    }

    /// Create members from catalog JSON and add them to `stratum_id`.
    ///
    /// Objects are built through the session's factory (nested groups recurse);
    /// plain strings reference models that already exist.
    fn add_members_from_json(
        &self,
        stratum_id: &str,
        members: &[Value],
    ) -> CatalogResult<Vec<Arc<dyn BaseModel>>> {
        let session = self.model().session().ok_or_else(|| {
            CatalogError::configuration(
                "Unable to add group members",
                format!("group '{}' is not attached to a session", self.id()),
            )
        })?;
        batch(|| -> CatalogResult<Vec<Arc<dyn BaseModel>>> {
            let mut created = Vec::new();
            for member in members {
                match member {
                    Value::String(id) => self.add_member(stratum_id, id)?,
                    _ => {
                        let model = session.create_member_from_json(member, Some(self.id()))?;
                        self.add_member(stratum_id, model.id())?;
                        created.push(model);
                    }
                }
            }
            Ok(created)
        })
    }
}

fn stratum_members<G: GroupMixin + ?Sized>(group: &G, stratum_id: &str) -> Vec<String> {
    untracked(|| {
        group
            .model()
            .stratum(stratum_id)
            .and_then(|stratum| stratum.get("members"))
            .and_then(|value| {
                value.as_array().map(|items| {
                    items
                        .iter()
                        .filter_map(|item| item.as_str().map(str::to_string))
                        .collect()
                })
            })
            .unwrap_or_default()
    })
}
