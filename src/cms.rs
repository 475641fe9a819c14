//! Content service shared by the admin and public handlers.
//!
//! Owns the typed repository and the tag cache. Section-specific operations
//! live in `crate::sections`, each as its own `impl Cms` block.

use tracing::{debug, info};

use crate::cache::TagCache;
use crate::error::CmsError;
use crate::forms::Saved;
use crate::models::{HomePage, DEFAULT_FOOTER};
use crate::store::{Record, Repository};

#[derive(Clone)]
pub struct Cms {
    pub(crate) repo: Repository,
    pub(crate) cache: TagCache,
}

impl Cms {
    pub fn new(repo: Repository, cache: TagCache) -> Self {
        info!("Content service ready (store: {})", repo.backend());
        Self { repo, cache }
    }

    pub fn cache(&self) -> &TagCache {
        &self.cache
    }

    /// Invalidate cache tags after a write.
    pub(crate) fn revalidate<S: AsRef<str>>(&self, tags: &[S]) {
        let removed = self.cache.invalidate_all(tags);
        debug!(
            "Revalidated {:?}: {} cached entries dropped",
            tags.iter().map(AsRef::as_ref).collect::<Vec<_>>(),
            removed
        );
    }

    pub(crate) async fn require<T: Record>(&self, key: &str) -> Result<T, CmsError> {
        self.repo
            .get::<T>(key)
            .await?
            .ok_or_else(|| CmsError::not_found(T::ENTITY, key))
    }

    /// Insert or update depending on what the form resolved to.
    pub(crate) async fn persist<T: Record>(&self, record: &T, saved: Saved) -> Result<T, CmsError> {
        let stored = match saved {
            Saved::Created => self.repo.insert(record).await?,
            Saved::Updated => self
                .repo
                .update(record)
                .await?
                .ok_or_else(|| CmsError::not_found(T::ENTITY, record.key()))?,
        };
        info!("{} {} {}", T::ENTITY, stored.key(), saved.as_str());
        Ok(stored)
    }

    pub(crate) async fn remove<T: Record>(&self, key: &str) -> Result<(), CmsError> {
        if key.trim().is_empty() {
            return Err(CmsError::MissingId(T::ENTITY));
        }
        if !self.repo.delete::<T>(key).await? {
            return Err(CmsError::not_found(T::ENTITY, key));
        }
        info!("{} {} deleted", T::ENTITY, key);
        Ok(())
    }

    /// The public homepage: every section, fetched concurrently through the
    /// cache, navigation capped at `nav_max_depth`.
    pub async fn home_page(&self, nav_max_depth: usize) -> Result<HomePage, CmsError> {
        let (navigation, hero_slides, featured_items, value_propositions, footer) = tokio::try_join!(
            self.navigation(Some(nav_max_depth)),
            self.published_hero_slides(),
            self.published_featured_items(),
            self.published_value_propositions(),
            self.footer(DEFAULT_FOOTER),
        )?;

        Ok(HomePage {
            navigation,
            hero_slides,
            featured_items,
            value_propositions,
            footer,
        })
    }
}
