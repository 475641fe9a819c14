//! Supabase (PostgREST) record store.

use anyhow::{anyhow, Result};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use tracing::{debug, info};

use super::{ListQuery, RecordStore, RowPatch};

/// Supabase client configuration.
#[derive(Clone)]
pub struct SupabaseStore {
    client: Client,
    base_url: String,
    service_role_key: String,
    schema: String,
}

impl SupabaseStore {
    pub fn new(
        base_url: impl Into<String>,
        service_role_key: impl Into<String>,
        schema: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let schema = schema.into();
        info!("Supabase store at {} (schema {})", base_url, schema);
        Self {
            client: Client::new(),
            base_url,
            service_role_key: service_role_key.into(),
            schema,
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Attach auth and schema headers shared by every request.
    fn authed(&self, builder: RequestBuilder, write: bool) -> RequestBuilder {
        let profile_header = if write { "Content-Profile" } else { "Accept-Profile" };
        builder
            .header("apikey", &self.service_role_key)
            .header("Authorization", format!("Bearer {}", self.service_role_key))
            .header(profile_header, &self.schema)
    }

    async fn rows(resp: Response, action: &str) -> Result<Vec<Value>> {
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("Supabase {} failed: {} - {}", action, status, text));
        }
        Ok(resp.json().await?)
    }
}

/// Build the query-string pairs for a listing.
pub(crate) fn list_params(query: &ListQuery) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    if query.published_only {
        params.push(("published".to_string(), "eq.true".to_string()));
    }
    if !query.order_by.is_empty() {
        let order = query
            .order_by
            .iter()
            .map(|c| format!("{}.asc.nullslast", c))
            .collect::<Vec<_>>()
            .join(",");
        params.push(("order".to_string(), order));
    }
    params
}

/// PostgREST `in` filter: `in.("a","b")`.
pub(crate) fn in_filter(keys: &[String]) -> String {
    let quoted: Vec<String> = keys
        .iter()
        .map(|k| format!("\"{}\"", k.replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}

/// Overlay each patch on its current row. Every patch must match a row.
pub(crate) fn merge_patches(
    table: &str,
    key_column: &str,
    current: &[Value],
    patches: Vec<RowPatch>,
) -> Result<Vec<Value>> {
    let mut merged = Vec::with_capacity(patches.len());
    for patch in patches {
        let mut row = current
            .iter()
            .find(|r| super::row_key(r, key_column) == Some(patch.key.as_str()))
            .cloned()
            .ok_or_else(|| {
                anyhow!("Record to update not found: {}.{} = {}", table, key_column, patch.key)
            })?;
        if let Some(object) = row.as_object_mut() {
            object.extend(patch.fields);
        }
        merged.push(row);
    }
    Ok(merged)
}

#[async_trait::async_trait]
impl RecordStore for SupabaseStore {
    fn name(&self) -> &str {
        "supabase"
    }

    async fn list(&self, table: &str, query: &ListQuery) -> Result<Vec<Value>> {
        let resp = self
            .authed(self.client.get(self.table_url(table)), false)
            .query(&list_params(query))
            .send()
            .await?;
        let rows = Self::rows(resp, &format!("GET {}", table)).await?;
        debug!("Fetched {} rows from {}", rows.len(), table);
        Ok(rows)
    }

    async fn get(&self, table: &str, key_column: &str, key: &str) -> Result<Option<Value>> {
        let resp = self
            .authed(self.client.get(self.table_url(table)), false)
            .query(&[
                ("select", "*".to_string()),
                (key_column, format!("eq.{}", key)),
                ("limit", "1".to_string()),
            ])
            .send()
            .await?;
        let rows = Self::rows(resp, &format!("GET {}", table)).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value> {
        let resp = self
            .authed(self.client.post(self.table_url(table)), true)
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;
        let rows = Self::rows(resp, &format!("POST {}", table)).await?;
        debug!("Inserted row into {}", table);
        rows.into_iter()
            .next()
            .ok_or_else(|| anyhow!("Supabase POST {} returned no row", table))
    }

    async fn update(
        &self,
        table: &str,
        key_column: &str,
        key: &str,
        row: Value,
    ) -> Result<Option<Value>> {
        let resp = self
            .authed(self.client.patch(self.table_url(table)), true)
            .query(&[(key_column, format!("eq.{}", key))])
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;
        let rows = Self::rows(resp, &format!("PATCH {}", table)).await?;
        debug!("Updated {}.{} = {}", table, key_column, key);
        Ok(rows.into_iter().next())
    }

    async fn delete_many(&self, table: &str, key_column: &str, keys: &[String]) -> Result<usize> {
        let resp = self
            .authed(self.client.delete(self.table_url(table)), true)
            .query(&[(key_column, in_filter(keys))])
            .header("Prefer", "return=representation")
            .send()
            .await?;
        let rows = Self::rows(resp, &format!("DELETE {}", table)).await?;
        debug!("Deleted {} rows from {}", rows.len(), table);
        Ok(rows.len())
    }

    /// One bulk upsert statement, so PostgREST applies it in a single
    /// transaction. Patches are merged onto the current rows first because
    /// an upsert writes whole rows.
    ///
    /// Columns outside the patches are written back as read, so an edit to
    /// the same rows landing between the read and the upsert is lost. That
    /// matches the store's last-writer-wins rule; reorders only carry
    /// `order`, `parent_id` and `updated_at`.
    async fn update_many(&self, table: &str, key_column: &str, patches: Vec<RowPatch>) -> Result<()> {
        let keys: Vec<String> = patches.iter().map(|p| p.key.clone()).collect();
        let resp = self
            .authed(self.client.get(self.table_url(table)), false)
            .query(&[("select", "*".to_string()), (key_column, in_filter(&keys))])
            .send()
            .await?;
        let current = Self::rows(resp, &format!("GET {}", table)).await?;

        let merged = merge_patches(table, key_column, &current, patches)?;

        let resp = self
            .authed(self.client.post(self.table_url(table)), true)
            .query(&[("on_conflict", key_column)])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&merged)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("Supabase batch update of {} failed: {} - {}", table, status, text));
        }

        debug!("Batch-updated {} rows in {}", merged.len(), table);
        Ok(())
    }
}
