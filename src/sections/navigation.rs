//! Navigation items: admin tree editing and the cached public header tree.

use std::collections::HashSet;

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map};
use tracing::{info, warn};

use crate::cache::{self, NAVIGATION};
use crate::cms::Cms;
use crate::error::CmsError;
use crate::forms::{optional, parse_order, FormState, Saved, Validator};
use crate::hierarchy::{self, ParentOption};
use crate::models::{new_id, NavigationRecord, PopulatedNavItem};
use crate::store::{Record, RowPatch};

const PUBLIC_CACHE_KEY: &str = "navigation-items-public";

/// Raw admin form, every field as submitted.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NavigationForm {
    pub id: Option<String>,
    pub label: Option<String>,
    pub href: Option<String>,
    pub order: Option<String>,
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NavigationDraft {
    pub id: Option<String>,
    pub label: String,
    pub href: String,
    pub order: i32,
    pub parent_id: Option<String>,
}

impl NavigationForm {
    pub fn validate(self) -> Result<NavigationDraft, CmsError> {
        let mut v = Validator::new();
        let label = v.required("label", self.label, "Label is required.");
        let href = v.required("href", self.href, "Link/Href is required.");
        v.finish()?;

        Ok(NavigationDraft {
            id: optional(self.id),
            label,
            href,
            order: parse_order(self.order.as_deref()),
            // The picker sends "" for "no parent".
            parent_id: optional(self.parent_id),
        })
    }
}

/// One row of a drag-and-drop reorder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorderEntry {
    pub id: String,
    pub order: i32,
    /// Absent leaves the parent as is; `null` or `""` makes the item a root.
    #[serde(default, deserialize_with = "present")]
    pub parent_id: Option<Option<String>>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(Some(value.filter(|v| !v.trim().is_empty())))
}

impl Cms {
    /// Every navigation item as a tree, for the admin manager.
    pub async fn admin_navigation(&self) -> Result<Vec<PopulatedNavItem>, CmsError> {
        let records = self.repo.list::<NavigationRecord>().await?;
        Ok(hierarchy::build_hierarchy(&records))
    }

    /// Cached header tree, optionally capped at `max_depth`.
    pub async fn navigation(&self, max_depth: Option<usize>) -> Result<Vec<PopulatedNavItem>, CmsError> {
        let forest: Vec<PopulatedNavItem> = self
            .cache
            .get_or_load(PUBLIC_CACHE_KEY, &[cache::CONTENT, NAVIGATION], || async {
                let records = self.repo.list::<NavigationRecord>().await?;
                Ok::<_, CmsError>(hierarchy::build_hierarchy(&records))
            })
            .await?;

        Ok(match max_depth {
            Some(depth) => hierarchy::prune_depth(forest, depth),
            None => forest,
        })
    }

    pub async fn navigation_item(&self, id: &str) -> Result<NavigationRecord, CmsError> {
        self.require(id).await
    }

    /// Parent picker options; `exclude` is the item being edited.
    pub async fn navigation_parent_options(
        &self,
        exclude: Option<&str>,
    ) -> Result<Vec<ParentOption>, CmsError> {
        let forest = self.admin_navigation().await?;
        Ok(hierarchy::parent_options(&forest, exclude))
    }

    pub async fn upsert_navigation_item(
        &self,
        form: NavigationForm,
    ) -> Result<FormState<NavigationRecord>, CmsError> {
        let draft = form.validate()?;
        let records = self.repo.list::<NavigationRecord>().await?;

        if let Some(parent) = draft.parent_id.as_deref() {
            if !records.iter().any(|r| r.id == parent) {
                return Err(CmsError::field("parent_id", "Parent item does not exist."));
            }
        }

        let now = Utc::now();
        let (record, saved) = match draft.id {
            Some(id) => {
                let existing = records
                    .iter()
                    .find(|r| r.id == id)
                    .ok_or_else(|| CmsError::not_found(NavigationRecord::ENTITY, &id))?;
                // Checked against this read only; a reorder committed in between
                // can still close a loop, which the tree builder then skips.
                hierarchy::ensure_acyclic(&records, &id, draft.parent_id.as_deref())?;
                let record = NavigationRecord {
                    id,
                    label: draft.label,
                    href: draft.href,
                    order: draft.order,
                    parent_id: draft.parent_id,
                    created_at: existing.created_at,
                    updated_at: now,
                };
                (record, Saved::Updated)
            }
            None => {
                let record = NavigationRecord {
                    id: new_id("nav"),
                    label: draft.label,
                    href: draft.href,
                    order: draft.order,
                    parent_id: draft.parent_id,
                    created_at: now,
                    updated_at: now,
                };
                (record, Saved::Created)
            }
        };

        let record = self.persist(&record, saved).await?;
        self.revalidate(&[NAVIGATION]);

        Ok(FormState::success(
            format!(
                "Navigation item \"{}\" {} successfully!",
                record.label,
                saved.as_str()
            ),
            Some(record),
        ))
    }

    /// Delete an item together with everything nested under it.
    pub async fn delete_navigation_item(&self, id: &str) -> Result<FormState<()>, CmsError> {
        if id.trim().is_empty() {
            return Err(CmsError::MissingId(NavigationRecord::ENTITY));
        }
        let records = self.repo.list::<NavigationRecord>().await?;
        if !records.iter().any(|r| r.id == id) {
            return Err(CmsError::not_found(NavigationRecord::ENTITY, id));
        }

        let doomed = hierarchy::subtree_ids(&records, id);
        let removed = self.repo.delete_many::<NavigationRecord>(&doomed).await?;
        info!("Navigation item {} deleted ({} rows including children)", id, removed);
        self.revalidate(&[NAVIGATION]);

        Ok(FormState::success(
            "Navigation item deleted successfully.",
            None,
        ))
    }

    /// Apply a batch of order/parent changes atomically. The post-update
    /// snapshot is checked for dangling parents and cycles first.
    pub async fn reorder_navigation_items(
        &self,
        entries: Vec<ReorderEntry>,
    ) -> Result<FormState<()>, CmsError> {
        let mut snapshot = self.repo.list::<NavigationRecord>().await?;
        let known: HashSet<String> = snapshot.iter().map(|r| r.id.clone()).collect();

        let mut v = Validator::new();
        for entry in &entries {
            if !known.contains(&entry.id) {
                return Err(CmsError::not_found(NavigationRecord::ENTITY, &entry.id));
            }
            if let Some(Some(parent)) = &entry.parent_id {
                if !known.contains(parent) {
                    v.push("parent_id", format!("Parent item {} does not exist.", parent));
                }
            }
        }
        v.finish()?;

        for entry in &entries {
            if let Some(record) = snapshot.iter_mut().find(|r| r.id == entry.id) {
                record.order = entry.order;
                if let Some(parent) = &entry.parent_id {
                    record.parent_id = parent.clone();
                }
            }
        }

        if let Some((id, parent_id)) = hierarchy::find_cycle(&snapshot) {
            warn!("Rejected navigation reorder: {} under {} forms a cycle", id, parent_id);
            return Err(CmsError::CyclicParent { id, parent_id });
        }

        let now = Utc::now();
        let patches: Vec<RowPatch> = entries
            .into_iter()
            .map(|entry| {
                let mut fields = Map::new();
                fields.insert("order".to_string(), json!(entry.order));
                if let Some(parent) = entry.parent_id {
                    fields.insert("parent_id".to_string(), json!(parent));
                }
                fields.insert("updated_at".to_string(), json!(now));
                RowPatch {
                    key: entry.id,
                    fields,
                }
            })
            .collect();

        let count = patches.len();
        self.repo.update_many::<NavigationRecord>(patches).await?;
        info!("Reordered {} navigation items", count);
        self.revalidate(&[NAVIGATION]);

        Ok(FormState::success(
            "Navigation items reordered successfully.",
            None,
        ))
    }
}
