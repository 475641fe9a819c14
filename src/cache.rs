//! Tag-based cache for public reads.
//!
//! Each entry is stored under a key together with a set of tags. Writes on
//! the admin side invalidate by tag, dropping every entry that carries it,
//! so readers never need to know which keys a write touched.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::CmsError;

/// Global tag carried by every public entry.
pub const CONTENT: &str = "content";
pub const NAVIGATION: &str = "navigation";
pub const HERO_SLIDES: &str = "heroSlides-public";
pub const FEATURED_ITEMS: &str = "featuredItems-public";
pub const VALUE_PROPOSITIONS: &str = "valuePropositionItems-public";
pub const FOOTER: &str = "footer";

pub fn hero_slide_tag(id: &str) -> String {
    format!("heroSlide-{}", id)
}

pub fn featured_item_tag(id: &str) -> String {
    format!("featuredItem-{}", id)
}

pub fn value_proposition_tag(id: &str) -> String {
    format!("valuePropositionItem-{}", id)
}

pub fn footer_tag(identifier: &str) -> String {
    format!("footer-{}", identifier)
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    tags: HashSet<String>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: RwLock<HashMap<String, CacheEntry>>,
    /// Bumped on every invalidation; loads that straddle one are not stored.
    generation: AtomicU64,
}

#[derive(Debug, Clone, Default)]
pub struct TagCache {
    inner: Arc<Inner>,
}

impl TagCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key`, or run `producer`, cache its
    /// result under `tags` and return it. Producer errors are not cached.
    pub async fn get_or_load<T, F, Fut>(
        &self,
        key: &str,
        tags: &[&str],
        producer: F,
    ) -> Result<T, CmsError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CmsError>>,
    {
        self.load(key, tags, producer, |_| true).await
    }

    /// Like [`TagCache::get_or_load`], but a `None` result is returned
    /// without being stored. Keys derived from request paths go through
    /// here so lookups of ids that do not exist leave the cache untouched.
    pub async fn get_or_load_found<T, F, Fut>(
        &self,
        key: &str,
        tags: &[&str],
        producer: F,
    ) -> Result<Option<T>, CmsError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, CmsError>>,
    {
        self.load(key, tags, producer, Option::is_some).await
    }

    async fn load<T, F, Fut>(
        &self,
        key: &str,
        tags: &[&str],
        producer: F,
        keep: impl FnOnce(&T) -> bool,
    ) -> Result<T, CmsError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CmsError>>,
    {
        if let Some(value) = self.lookup(key) {
            match serde_json::from_value::<T>(value) {
                Ok(hit) => {
                    debug!("Cache hit: {}", key);
                    return Ok(hit);
                }
                Err(e) => warn!("Discarding unreadable cache entry {}: {}", key, e),
            }
        }

        let generation = self.inner.generation.load(Ordering::Acquire);
        debug!("Cache miss: {}", key);
        let fresh = producer().await?;
        if !keep(&fresh) {
            debug!("Not caching {}: nothing found", key);
            return Ok(fresh);
        }

        let value = serde_json::to_value(&fresh).map_err(anyhow::Error::from)?;
        let mut entries = self
            .inner
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if self.inner.generation.load(Ordering::Acquire) == generation {
            entries.insert(
                key.to_string(),
                CacheEntry {
                    value,
                    tags: tags.iter().map(|t| t.to_string()).collect(),
                },
            );
        } else {
            debug!("Not caching {}: invalidated while loading", key);
        }

        Ok(fresh)
    }

    /// Drop every entry tagged with `tag`. Returns how many were removed.
    pub fn invalidate(&self, tag: &str) -> usize {
        let mut entries = self
            .inner
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        self.inner.generation.fetch_add(1, Ordering::AcqRel);

        let before = entries.len();
        entries.retain(|_, entry| !entry.tags.contains(tag));
        let removed = before - entries.len();
        debug!("Invalidated tag '{}' ({} entries)", tag, removed);
        removed
    }

    pub fn invalidate_all<S: AsRef<str>>(&self, tags: &[S]) -> usize {
        tags.iter().map(|t| self.invalidate(t.as_ref())).sum()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, key: &str) -> Option<Value> {
        self.inner
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(|entry| entry.value.clone())
    }
}
