//! Record store abstraction.
//!
//! Defines the [`RecordStore`] trait over JSON rows so the in-memory store
//! and the Supabase REST backend can be swapped via configuration, plus the
//! typed [`Repository`] the content services work through.

pub mod memory;
pub mod supabase;

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// A typed row living in one table of the store.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const TABLE: &'static str;
    /// Human-readable name used in messages ("Hero slide").
    const ENTITY: &'static str;
    /// Column that uniquely identifies a row.
    const KEY: &'static str = "id";
    /// Default list ordering, ascending.
    const ORDER_BY: &'static [&'static str] = &["order", "id"];

    fn key(&self) -> &str;
}

/// Filter and ordering for a table listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Only rows whose `published` column is true.
    pub published_only: bool,
    /// Ascending sort keys; nulls sort last.
    pub order_by: Vec<String>,
}

impl ListQuery {
    pub fn ordered(columns: &[&str]) -> Self {
        Self {
            published_only: false,
            order_by: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn published(mut self) -> Self {
        self.published_only = true;
        self
    }
}

/// Partial update of one row, applied as part of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct RowPatch {
    pub key: String,
    pub fields: Map<String, Value>,
}

/// Async trait implemented by each storage backend.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    fn name(&self) -> &str;

    async fn list(&self, table: &str, query: &ListQuery) -> Result<Vec<Value>>;

    async fn get(&self, table: &str, key_column: &str, key: &str) -> Result<Option<Value>>;

    async fn insert(&self, table: &str, row: Value) -> Result<Value>;

    /// Replace the row's fields with `row`'s. `None` when no row matched.
    async fn update(
        &self,
        table: &str,
        key_column: &str,
        key: &str,
        row: Value,
    ) -> Result<Option<Value>>;

    /// Delete every row whose key is in `keys`; returns the number removed.
    async fn delete_many(&self, table: &str, key_column: &str, keys: &[String]) -> Result<usize>;

    /// Apply all patches or none of them.
    async fn update_many(&self, table: &str, key_column: &str, patches: Vec<RowPatch>) -> Result<()>;
}

/// Typed access to a [`RecordStore`].
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn RecordStore>,
}

impl Repository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub fn backend(&self) -> &str {
        self.store.name()
    }

    /// All rows of `T` in its default order.
    pub async fn list<T: Record>(&self) -> Result<Vec<T>> {
        self.list_where(&ListQuery::ordered(T::ORDER_BY)).await
    }

    /// Published rows of `T` in its default order.
    pub async fn list_published<T: Record>(&self) -> Result<Vec<T>> {
        self.list_where(&ListQuery::ordered(T::ORDER_BY).published())
            .await
    }

    pub async fn list_where<T: Record>(&self, query: &ListQuery) -> Result<Vec<T>> {
        let rows = self.store.list(T::TABLE, query).await?;
        rows.into_iter().map(decode::<T>).collect()
    }

    pub async fn get<T: Record>(&self, key: &str) -> Result<Option<T>> {
        self.store
            .get(T::TABLE, T::KEY, key)
            .await?
            .map(decode::<T>)
            .transpose()
    }

    pub async fn insert<T: Record>(&self, record: &T) -> Result<T> {
        let row = serde_json::to_value(record)?;
        decode(self.store.insert(T::TABLE, row).await?)
    }

    pub async fn update<T: Record>(&self, record: &T) -> Result<Option<T>> {
        let row = serde_json::to_value(record)?;
        self.store
            .update(T::TABLE, T::KEY, record.key(), row)
            .await?
            .map(decode::<T>)
            .transpose()
    }

    pub async fn delete<T: Record>(&self, key: &str) -> Result<bool> {
        let removed = self
            .store
            .delete_many(T::TABLE, T::KEY, &[key.to_string()])
            .await?;
        Ok(removed > 0)
    }

    pub async fn delete_many<T: Record>(&self, keys: &[String]) -> Result<usize> {
        if keys.is_empty() {
            return Ok(0);
        }
        self.store.delete_many(T::TABLE, T::KEY, keys).await
    }

    pub async fn update_many<T: Record>(&self, patches: Vec<RowPatch>) -> Result<()> {
        if patches.is_empty() {
            return Ok(());
        }
        self.store.update_many(T::TABLE, T::KEY, patches).await
    }
}

fn decode<T: Record>(row: Value) -> Result<T> {
    serde_json::from_value(row).with_context(|| format!("Malformed {} row", T::TABLE))
}

/// Read a row's string key column.
pub(crate) fn row_key<'a>(row: &'a Value, key_column: &str) -> Option<&'a str> {
    row.get(key_column).and_then(Value::as_str)
}
