//! In-memory record store.
//!
//! Tables are insertion-ordered row vectors behind a single `RwLock`, so a
//! batch update holds the write lock for its whole duration and either
//! applies completely or not at all.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{bail, Result};
use serde_json::Value;
use tracing::debug;

use super::{row_key, ListQuery, RecordStore, RowPatch};

type Tables = HashMap<String, Vec<Value>>;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from pre-loaded rows, keyed by table name.
    pub fn with_seed(seed: Tables) -> Self {
        let total: usize = seed.values().map(Vec::len).sum();
        debug!("MemoryStore: seeded {} tables ({} rows)", seed.len(), total);
        Self {
            tables: Arc::new(RwLock::new(seed)),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list(&self, table: &str, query: &ListQuery) -> Result<Vec<Value>> {
        let tables = self.read();
        let mut rows: Vec<Value> = tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| !query.published_only || is_published(row))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        // Stable: rows equal on every key keep insertion order.
        rows.sort_by(|a, b| {
            query
                .order_by
                .iter()
                .map(|column| compare_column(a.get(column), b.get(column)))
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });

        Ok(rows)
    }

    async fn get(&self, table: &str, key_column: &str, key: &str) -> Result<Option<Value>> {
        let tables = self.read();
        Ok(tables
            .get(table)
            .and_then(|rows| rows.iter().find(|row| row_key(row, key_column) == Some(key)))
            .cloned())
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value> {
        if !row.is_object() {
            bail!("Row for {} must be a JSON object", table);
        }
        let mut tables = self.write();
        let rows = tables.entry(table.to_string()).or_default();

        if let Some(id) = row_key(&row, "id") {
            if rows.iter().any(|r| row_key(r, "id") == Some(id)) {
                bail!("Unique constraint failed on {}.id = {}", table, id);
            }
        }

        rows.push(row.clone());
        debug!("MemoryStore: inserted into {} ({} rows)", table, rows.len());
        Ok(row)
    }

    async fn update(
        &self,
        table: &str,
        key_column: &str,
        key: &str,
        row: Value,
    ) -> Result<Option<Value>> {
        if !row.is_object() {
            bail!("Row for {} must be a JSON object", table);
        }
        let mut tables = self.write();
        let Some(existing) = tables
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|r| row_key(r, key_column) == Some(key)))
        else {
            return Ok(None);
        };

        *existing = row.clone();
        debug!("MemoryStore: updated {}.{} = {}", table, key_column, key);
        Ok(Some(row))
    }

    async fn delete_many(&self, table: &str, key_column: &str, keys: &[String]) -> Result<usize> {
        let wanted: HashSet<&str> = keys.iter().map(String::as_str).collect();
        let mut tables = self.write();
        let Some(rows) = tables.get_mut(table) else {
            return Ok(0);
        };

        let before = rows.len();
        rows.retain(|row| {
            row_key(row, key_column)
                .map(|k| !wanted.contains(k))
                .unwrap_or(true)
        });
        let removed = before - rows.len();
        debug!("MemoryStore: deleted {} rows from {}", removed, table);
        Ok(removed)
    }

    async fn update_many(&self, table: &str, key_column: &str, patches: Vec<RowPatch>) -> Result<()> {
        let mut tables = self.write();
        let rows = tables.entry(table.to_string()).or_default();

        // Resolve every target before touching anything.
        let mut targets = Vec::with_capacity(patches.len());
        for patch in &patches {
            match rows
                .iter()
                .position(|r| row_key(r, key_column) == Some(patch.key.as_str()))
            {
                Some(idx) => targets.push(idx),
                None => bail!(
                    "Record to update not found: {}.{} = {}",
                    table,
                    key_column,
                    patch.key
                ),
            }
        }

        let count = patches.len();
        for (idx, patch) in targets.into_iter().zip(patches) {
            if let Some(object) = rows[idx].as_object_mut() {
                object.extend(patch.fields);
            }
        }

        debug!("MemoryStore: batch-updated {} rows in {}", count, table);
        Ok(())
    }
}

fn is_published(row: &Value) -> bool {
    row.get("published").and_then(Value::as_bool).unwrap_or(false)
}

/// Ascending comparison of one column; missing and null values sort last.
fn compare_column(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}
