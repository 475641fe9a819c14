//! Hero carousel slides.

use chrono::Utc;
use serde::Deserialize;

use crate::cache::{self, hero_slide_tag, HERO_SLIDES};
use crate::cms::Cms;
use crate::error::CmsError;
use crate::forms::{optional, parse_flag, parse_order, FormState, Saved, Validator};
use crate::models::{new_id, CarouselSlide, HeroSlide};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HeroSlideForm {
    pub id: Option<String>,
    pub slide_label: Option<String>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub cta_text: Option<String>,
    pub cta_link: Option<String>,
    pub image_url: Option<String>,
    pub image_alt: Option<String>,
    pub order: Option<String>,
    pub published: Option<String>,
}

impl HeroSlideForm {
    /// Validate into a slide with placeholder id and timestamps; the caller
    /// fills those in once it knows whether this is a create or an update.
    fn validate(self) -> Result<(Option<String>, HeroSlide), CmsError> {
        let mut v = Validator::new();
        let title = v.required("title", self.title, "Title is required.");
        let cta_link = v.optional_url(
            "cta_link",
            self.cta_link,
            "CTA Link must be a valid URL if provided.",
        );
        let image_url = v.optional_url(
            "image_url",
            self.image_url,
            "Image URL must be a valid URL if provided.",
        );
        v.finish()?;

        let now = Utc::now();
        let slide = HeroSlide {
            id: String::new(),
            slide_label: optional(self.slide_label),
            title,
            subtitle: optional(self.subtitle),
            cta_text: optional(self.cta_text),
            cta_link,
            image_url,
            image_alt: optional(self.image_alt),
            order: parse_order(self.order.as_deref()),
            published: parse_flag(self.published.as_deref()),
            created_at: now,
            updated_at: now,
        };
        Ok((optional(self.id), slide))
    }
}

impl Cms {
    pub async fn admin_hero_slides(&self) -> Result<Vec<HeroSlide>, CmsError> {
        Ok(self.repo.list::<HeroSlide>().await?)
    }

    pub async fn hero_slide(&self, id: &str) -> Result<HeroSlide, CmsError> {
        self.require(id).await
    }

    /// Published slides in carousel order.
    pub async fn published_hero_slides(&self) -> Result<Vec<CarouselSlide>, CmsError> {
        self.cache
            .get_or_load("published-hero-slides", &[HERO_SLIDES, cache::CONTENT], || async {
                let slides = self.repo.list_published::<HeroSlide>().await?;
                Ok::<_, CmsError>(slides.into_iter().map(CarouselSlide::from).collect())
            })
            .await
    }

    /// A single published slide; `None` when missing or unpublished.
    pub async fn published_hero_slide(&self, id: &str) -> Result<Option<CarouselSlide>, CmsError> {
        let tag = hero_slide_tag(id);
        self.cache
            .get_or_load_found(&format!("hero-{}", id), &[tag.as_str(), cache::CONTENT], || async {
                let slide = self.repo.get::<HeroSlide>(id).await?;
                Ok::<_, CmsError>(slide.filter(|s| s.published).map(CarouselSlide::from))
            })
            .await
    }

    pub async fn upsert_hero_slide(
        &self,
        form: HeroSlideForm,
    ) -> Result<FormState<HeroSlide>, CmsError> {
        let (id, mut slide) = form.validate()?;

        let saved = match id {
            Some(id) => {
                let existing: HeroSlide = self.require(&id).await?;
                slide.id = id;
                slide.created_at = existing.created_at;
                Saved::Updated
            }
            None => {
                slide.id = new_id("hero");
                Saved::Created
            }
        };

        let slide = self.persist(&slide, saved).await?;
        self.revalidate(&[hero_slide_tag(&slide.id), HERO_SLIDES.to_string()]);

        Ok(FormState::success(
            format!("Slide \"{}\" {} successfully!", slide.title, saved.as_str()),
            Some(slide),
        ))
    }

    pub async fn delete_hero_slide(&self, id: &str) -> Result<FormState<()>, CmsError> {
        self.remove::<HeroSlide>(id).await?;
        self.revalidate(&[hero_slide_tag(id), HERO_SLIDES.to_string()]);
        Ok(FormState::success("Slide deleted successfully.", None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::testing::{cms, form};

    #[test]
    fn test_validation_messages() {
        let form: HeroSlideForm = form(&[("cta_link", "nope"), ("image_url", "also nope")]);
        match form.validate() {
            Err(CmsError::Validation(errors)) => {
                assert_eq!(errors["title"], vec!["Title is required."]);
                assert_eq!(
                    errors["cta_link"],
                    vec!["CTA Link must be a valid URL if provided."]
                );
                assert!(errors.contains_key("image_url"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_optionals_collapse() {
        let form: HeroSlideForm = form(&[
            ("title", "Hi"),
            ("cta_link", ""),
            ("image_url", ""),
            ("subtitle", ""),
            ("order", "2"),
            ("published", "true"),
        ]);
        let (id, slide) = form.validate().unwrap();
        assert!(id.is_none());
        assert!(slide.cta_link.is_none());
        assert!(slide.image_url.is_none());
        assert!(slide.subtitle.is_none());
        assert_eq!(slide.order, 2);
        assert!(slide.published);
    }

    #[tokio::test]
    async fn test_create_update_delete() {
        let cms = cms();
        let created = cms
            .upsert_hero_slide(form(&[("title", "Spring sale"), ("published", "on")]))
            .await
            .unwrap();
        assert_eq!(created.message, "Slide \"Spring sale\" created successfully!");
        let slide = created.item.unwrap();
        assert!(slide.id.starts_with("hero_"));

        let updated = cms
            .upsert_hero_slide(form(&[
                ("id", slide.id.as_str()),
                ("title", "Summer sale"),
                ("published", "on"),
            ]))
            .await
            .unwrap();
        assert_eq!(updated.message, "Slide \"Summer sale\" updated successfully!");
        let stored = cms.hero_slide(&slide.id).await.unwrap();
        assert_eq!(stored.title, "Summer sale");
        assert_eq!(stored.created_at, slide.created_at);

        cms.delete_hero_slide(&slide.id).await.unwrap();
        assert!(matches!(
            cms.hero_slide(&slide.id).await,
            Err(CmsError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_public_list_filters_and_refreshes() {
        let cms = cms();
        cms.upsert_hero_slide(form(&[("title", "B"), ("order", "2"), ("published", "on")]))
            .await
            .unwrap();
        cms.upsert_hero_slide(form(&[("title", "A"), ("order", "1"), ("published", "on")]))
            .await
            .unwrap();
        cms.upsert_hero_slide(form(&[("title", "Hidden"), ("order", "0")]))
            .await
            .unwrap();

        let titles: Vec<String> = cms
            .published_hero_slides()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, vec!["A", "B"]);

        cms.upsert_hero_slide(form(&[("title", "C"), ("order", "3"), ("published", "on")]))
            .await
            .unwrap();
        assert_eq!(cms.published_hero_slides().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_published_single_slide() {
        let cms = cms();
        let draft = cms
            .upsert_hero_slide(form(&[("title", "Draft")]))
            .await
            .unwrap()
            .item
            .unwrap();
        assert!(cms.published_hero_slide(&draft.id).await.unwrap().is_none());

        cms.upsert_hero_slide(form(&[
            ("id", draft.id.as_str()),
            ("title", "Draft"),
            ("published", "on"),
        ]))
        .await
        .unwrap();
        let public = cms.published_hero_slide(&draft.id).await.unwrap();
        assert_eq!(public.map(|s| s.title).as_deref(), Some("Draft"));
    }

    #[tokio::test]
    async fn test_unknown_slide_lookups_leave_cache_empty() {
        let cms = cms();
        for i in 0..100 {
            let id = format!("ghost{}", i);
            assert!(cms.published_hero_slide(&id).await.unwrap().is_none());
        }
        assert_eq!(cms.cache().len(), 0);
    }
}
