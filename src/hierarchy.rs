//! Navigation hierarchy: flat parent/child rows to an ordered forest.
//!
//! Pure functions, no async. The same builder serves the admin tree and the
//! public header; callers differ only in which rows they pass in.
//!
//! Cycles are kept out at write time by [`ensure_acyclic`] and
//! [`find_cycle`]. The builder still tracks visited ids so a cycle that
//! slips into storage ends the walk with a warning instead of recursing
//! forever.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::CmsError;
use crate::models::{NavigationRecord, PopulatedNavItem};

/// Assemble `records` into a forest ordered by ascending `order` at every
/// level, ties keeping input order.
///
/// Records whose parent id does not resolve become roots. Records on a
/// parent cycle, and everything hanging below one, cannot be reached from
/// any root and are left out.
pub fn build_hierarchy(records: &[NavigationRecord]) -> Vec<PopulatedNavItem> {
    // id -> position of its first occurrence
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(records.len());
    for (pos, record) in records.iter().enumerate() {
        match index.entry(record.id.as_str()) {
            Entry::Vacant(slot) => {
                slot.insert(pos);
            }
            Entry::Occupied(_) => {
                warn!("Duplicate navigation id {}; keeping the first row", record.id);
            }
        }
    }

    let mut children_of: Vec<Vec<usize>> = vec![Vec::new(); records.len()];
    let mut roots = Vec::new();
    for (pos, record) in records.iter().enumerate() {
        if index.get(record.id.as_str()) != Some(&pos) {
            continue;
        }
        match record
            .parent_id
            .as_deref()
            .and_then(|parent| index.get(parent))
        {
            Some(&parent) => children_of[parent].push(pos),
            None => roots.push(pos),
        }
    }

    let mut visited = vec![false; records.len()];
    let mut forest: Vec<PopulatedNavItem> = roots
        .into_iter()
        .filter_map(|pos| assemble(pos, records, &children_of, &mut visited))
        .collect();
    forest.sort_by_key(|item| item.record.order);

    let unreachable: Vec<&str> = index
        .iter()
        .filter(|(_, pos)| !visited[**pos])
        .map(|(id, _)| *id)
        .collect();
    if !unreachable.is_empty() {
        warn!(
            "Navigation invariant violated: {} item(s) unreachable from any root (parent cycle) were skipped: {:?}",
            unreachable.len(),
            unreachable
        );
    }

    debug!(
        "Built navigation hierarchy: {} records, {} roots",
        records.len(),
        forest.len()
    );
    forest
}

fn assemble(
    pos: usize,
    records: &[NavigationRecord],
    children_of: &[Vec<usize>],
    visited: &mut [bool],
) -> Option<PopulatedNavItem> {
    if visited[pos] {
        warn!(
            "Navigation invariant violated: {} reached twice, not descending again",
            records[pos].id
        );
        return None;
    }
    visited[pos] = true;

    let mut children: Vec<PopulatedNavItem> = children_of[pos]
        .iter()
        .filter_map(|&child| assemble(child, records, children_of, visited))
        .collect();
    // `sort_by_key` is stable.
    children.sort_by_key(|child| child.record.order);

    Some(PopulatedNavItem {
        record: records[pos].clone(),
        children,
    })
}

/// Total number of nodes in a forest, at every depth.
pub fn count_nodes(forest: &[PopulatedNavItem]) -> usize {
    forest
        .iter()
        .map(|item| 1 + count_nodes(&item.children))
        .sum()
}

/// Drop everything deeper than `max_depth` (roots are depth 0).
pub fn prune_depth(forest: Vec<PopulatedNavItem>, max_depth: usize) -> Vec<PopulatedNavItem> {
    forest
        .into_iter()
        .map(|mut item| {
            item.children = match max_depth {
                0 => Vec::new(),
                depth => prune_depth(item.children, depth - 1),
            };
            item
        })
        .collect()
}

/// One entry of the admin "parent item" picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParentOption {
    pub value: String,
    pub label: String,
}

/// Flatten a forest into picker options, prefixing labels by depth.
///
/// `exclude` (the item being edited) is skipped along with its whole
/// subtree, since none of those can become its parent.
pub fn parent_options(forest: &[PopulatedNavItem], exclude: Option<&str>) -> Vec<ParentOption> {
    let mut options = Vec::new();
    collect_options(forest, exclude, "", &mut options);
    options
}

fn collect_options(
    items: &[PopulatedNavItem],
    exclude: Option<&str>,
    prefix: &str,
    out: &mut Vec<ParentOption>,
) {
    for item in items {
        if Some(item.id()) == exclude {
            continue;
        }
        out.push(ParentOption {
            value: item.record.id.clone(),
            label: format!("{}{}", prefix, item.record.label),
        });
        collect_options(&item.children, exclude, &format!("{}-- ", prefix), out);
    }
}

/// `root_id` and every record below it, parents before children.
pub fn subtree_ids(records: &[NavigationRecord], root_id: &str) -> Vec<String> {
    let mut children_of: HashMap<&str, Vec<&str>> = HashMap::new();
    for record in records {
        if let Some(parent) = record.parent_id.as_deref() {
            children_of.entry(parent).or_default().push(record.id.as_str());
        }
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut out = Vec::new();
    let mut stack = vec![root_id];
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        out.push(id.to_string());
        if let Some(children) = children_of.get(id) {
            stack.extend(children.iter().rev());
        }
    }
    out
}

/// Reject making `proposed_parent` the parent of `id` when `id` already
/// appears on the proposed parent's ancestor chain (or is the parent).
pub fn ensure_acyclic(
    records: &[NavigationRecord],
    id: &str,
    proposed_parent: Option<&str>,
) -> Result<(), CmsError> {
    let Some(parent) = proposed_parent else {
        return Ok(());
    };

    let parents: HashMap<&str, Option<&str>> = records
        .iter()
        .map(|r| (r.id.as_str(), r.parent_id.as_deref()))
        .collect();

    let mut seen: HashSet<&str> = HashSet::new();
    let mut cursor = Some(parent);
    while let Some(current) = cursor {
        if current == id {
            return Err(CmsError::CyclicParent {
                id: id.to_string(),
                parent_id: parent.to_string(),
            });
        }
        // An existing cycle elsewhere must not trap the walk.
        if !seen.insert(current) {
            break;
        }
        cursor = parents.get(current).copied().flatten();
    }
    Ok(())
}

/// First record found whose ancestor chain loops back to itself, as
/// `(id, parent_id)`. Used to validate a whole snapshot before a batch write.
pub fn find_cycle(records: &[NavigationRecord]) -> Option<(String, String)> {
    records.iter().find_map(|record| {
        let parent = record.parent_id.as_deref()?;
        ensure_acyclic(records, &record.id, Some(parent))
            .err()
            .map(|_| (record.id.clone(), parent.to_string()))
    })
}
