//! Runtime settings.
//!
//! Read from the environment (after `.env` is loaded) once at startup. The
//! store backend is chosen here; the memory store can be pre-filled from a
//! JSON seed file shaped as `{ "<table>": [rows...] }`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value;
use tracing::{info, warn};

use crate::models::{FeaturedItem, FooterContent, HeroSlide, NavigationRecord, ValuePropositionItem};
use crate::store::memory::MemoryStore;
use crate::store::supabase::SupabaseStore;
use crate::store::{Record, RecordStore};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_SCHEMA: &str = "public";
const DEFAULT_NAV_MAX_DEPTH: usize = 3;

/// Tables the content sections read and write.
pub const TABLES: &[&str] = &[
    NavigationRecord::TABLE,
    HeroSlide::TABLE,
    FeaturedItem::TABLE,
    ValuePropositionItem::TABLE,
    FooterContent::TABLE,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory {
        seed_file: Option<PathBuf>,
    },
    Supabase {
        url: String,
        service_role_key: String,
        schema: String,
    },
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: String,
    pub store: StoreBackend,
    /// Depth cap applied to the public navigation tree.
    pub nav_max_depth: usize,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let store = match var("SITE_STORE").as_deref().unwrap_or("memory") {
            "memory" => StoreBackend::Memory {
                seed_file: var("SITE_SEED_FILE").map(PathBuf::from),
            },
            "supabase" => StoreBackend::Supabase {
                url: var("SUPABASE_URL").ok_or_else(|| anyhow!("SUPABASE_URL not set"))?,
                service_role_key: var("SUPABASE_SERVICE_ROLE_KEY")
                    .ok_or_else(|| anyhow!("SUPABASE_SERVICE_ROLE_KEY not set"))?,
                schema: var("SUPABASE_SCHEMA").unwrap_or_else(|| DEFAULT_SCHEMA.to_string()),
            },
            other => bail!("Unknown SITE_STORE '{}' (expected memory or supabase)", other),
        };

        let nav_max_depth = match var("SITE_NAV_MAX_DEPTH") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("SITE_NAV_MAX_DEPTH is not a number: {}", raw))?,
            None => DEFAULT_NAV_MAX_DEPTH,
        };

        Ok(Self {
            bind_addr: var("SITE_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            store,
            nav_max_depth,
        })
    }

    /// Construct the configured store.
    pub fn open_store(&self) -> Result<Arc<dyn RecordStore>> {
        match &self.store {
            StoreBackend::Memory { seed_file: None } => {
                info!("Using in-memory store");
                Ok(Arc::new(MemoryStore::new()))
            }
            StoreBackend::Memory {
                seed_file: Some(path),
            } => {
                let seed = load_seed(path)?;
                info!("Using in-memory store seeded from {:?}", path);
                Ok(Arc::new(MemoryStore::with_seed(seed)))
            }
            StoreBackend::Supabase {
                url,
                service_role_key,
                schema,
            } => Ok(Arc::new(SupabaseStore::new(
                url.as_str(),
                service_role_key.as_str(),
                schema.as_str(),
            ))),
        }
    }
}

/// Load a seed document mapping table names to row arrays.
pub fn load_seed(path: &Path) -> Result<HashMap<String, Vec<Value>>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed file: {:?}", path))?;
    parse_seed(&content).with_context(|| format!("Failed to parse seed file: {:?}", path))
}

fn parse_seed(content: &str) -> Result<HashMap<String, Vec<Value>>> {
    let seed: HashMap<String, Vec<Value>> = serde_json::from_str(content)?;
    for (table, rows) in &seed {
        if !TABLES.contains(&table.as_str()) {
            warn!("Seed table '{}' is not used by any section ({} rows)", table, rows.len());
        }
        if let Some(pos) = rows.iter().position(|row| !row.is_object()) {
            bail!("Row {} of table '{}' is not an object", pos, table);
        }
    }
    Ok(seed)
}
