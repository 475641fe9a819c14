//! Featured items with call-to-action buttons.

use chrono::Utc;
use serde::Deserialize;

use crate::cache::{self, featured_item_tag, FEATURED_ITEMS};
use crate::cms::Cms;
use crate::error::CmsError;
use crate::forms::{is_absolute_url, is_link_target, optional, parse_flag, parse_order, FormState, Saved, Validator};
use crate::models::{new_id, CtaButton, FeaturedItem};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FeaturedItemForm {
    pub id: Option<String>,
    pub admin_label: Option<String>,
    pub small_heading: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub image_alt: Option<String>,
    /// JSON array of `{text, url, variant?}`, sent from a hidden input.
    pub ctas: Option<String>,
    pub order: Option<String>,
    pub published: Option<String>,
}

impl FeaturedItemForm {
    fn validate(self) -> Result<(Option<String>, FeaturedItem), CmsError> {
        let mut v = Validator::new();
        let title = v.required("title", self.title, "Title is required.");

        let image_url = v.required("image_url", self.image_url, "Image URL must be a valid URL.");
        if !image_url.is_empty() && !is_absolute_url(&image_url) {
            v.push("image_url", "Image URL must be a valid URL.");
        }

        let ctas: Vec<CtaButton> = v.json_list(
            "ctas",
            self.ctas,
            "Invalid JSON format for CTAs. Please ensure it's a valid array of objects.",
        );
        for cta in &ctas {
            if cta.text.trim().is_empty() {
                v.push("ctas", "CTA text cannot be empty.");
            }
            if cta.url.trim().is_empty() {
                v.push("ctas", "CTA URL cannot be empty.");
            } else if !is_link_target(&cta.url) {
                v.push("ctas", "CTA URL must be a relative path or an absolute URL.");
            }
        }
        v.finish()?;

        let now = Utc::now();
        let item = FeaturedItem {
            id: String::new(),
            admin_label: optional(self.admin_label),
            small_heading: optional(self.small_heading),
            title,
            description: optional(self.description),
            image_url,
            image_alt: optional(self.image_alt),
            ctas,
            order: parse_order(self.order.as_deref()),
            published: parse_flag(self.published.as_deref()),
            created_at: now,
            updated_at: now,
        };
        Ok((optional(self.id), item))
    }
}

impl Cms {
    pub async fn admin_featured_items(&self) -> Result<Vec<FeaturedItem>, CmsError> {
        Ok(self.repo.list::<FeaturedItem>().await?)
    }

    pub async fn featured_item(&self, id: &str) -> Result<FeaturedItem, CmsError> {
        self.require(id).await
    }

    pub async fn published_featured_items(&self) -> Result<Vec<FeaturedItem>, CmsError> {
        self.cache
            .get_or_load("published-featured-items", &[FEATURED_ITEMS, cache::CONTENT], || async {
                Ok::<_, CmsError>(self.repo.list_published::<FeaturedItem>().await?)
            })
            .await
    }

    pub async fn upsert_featured_item(
        &self,
        form: FeaturedItemForm,
    ) -> Result<FormState<FeaturedItem>, CmsError> {
        let (id, mut item) = form.validate()?;

        let saved = match id {
            Some(id) => {
                let existing: FeaturedItem = self.require(&id).await?;
                item.id = id;
                item.created_at = existing.created_at;
                Saved::Updated
            }
            None => {
                item.id = new_id("feat");
                Saved::Created
            }
        };

        let item = self.persist(&item, saved).await?;
        self.revalidate(&[featured_item_tag(&item.id), FEATURED_ITEMS.to_string()]);

        Ok(FormState::success(
            format!("Featured Item \"{}\" {} successfully!", item.title, saved.as_str()),
            Some(item),
        ))
    }

    pub async fn delete_featured_item(&self, id: &str) -> Result<FormState<()>, CmsError> {
        self.remove::<FeaturedItem>(id).await?;
        self.revalidate(&[featured_item_tag(id), FEATURED_ITEMS.to_string()]);
        Ok(FormState::success("Featured Item deleted successfully.", None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::testing::{cms, form};
    use crate::models::CtaVariant;

    const IMAGE: &str = "https://cdn.example.com/a.jpg";

    #[test]
    fn test_ctas_parsed_with_default_variant() {
        let form: FeaturedItemForm = form(&[
            ("title", "Widgets"),
            ("image_url", IMAGE),
            (
                "ctas",
                r#"[{"text": "Buy", "url": "/buy"}, {"text": "Docs", "url": "https://docs.example.com", "variant": "outline"}]"#,
            ),
        ]);
        let (_, item) = form.validate().unwrap();
        assert_eq!(item.ctas.len(), 2);
        assert_eq!(item.ctas[0].variant, CtaVariant::Primary);
        assert_eq!(item.ctas[1].variant, CtaVariant::Outline);
    }

    #[test]
    fn test_blank_ctas_is_empty_list() {
        let form: FeaturedItemForm = form(&[("title", "W"), ("image_url", IMAGE), ("ctas", " ")]);
        let (_, item) = form.validate().unwrap();
        assert!(item.ctas.is_empty());
    }

    #[test]
    fn test_invalid_ctas_reported_on_field() {
        let bad_json: FeaturedItemForm =
            form(&[("title", "W"), ("image_url", IMAGE), ("ctas", "[{")]);
        assert!(matches!(
            bad_json.validate(),
            Err(CmsError::Validation(ref e)) if e.contains_key("ctas")
        ));

        let bad_url: FeaturedItemForm = form(&[
            ("title", "W"),
            ("image_url", IMAGE),
            ("ctas", r#"[{"text": "Go", "url": "example.com"}]"#),
        ]);
        match bad_url.validate() {
            Err(CmsError::Validation(errors)) => assert_eq!(
                errors["ctas"],
                vec!["CTA URL must be a relative path or an absolute URL."]
            ),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_image_url_required() {
        let form: FeaturedItemForm = form(&[("title", "W")]);
        assert!(matches!(
            form.validate(),
            Err(CmsError::Validation(ref e)) if e.contains_key("image_url")
        ));
    }

    #[tokio::test]
    async fn test_public_list_only_published() {
        let cms = cms();
        let shown = cms
            .upsert_featured_item(form(&[("title", "Shown"), ("image_url", IMAGE), ("published", "on")]))
            .await
            .unwrap()
            .item
            .unwrap();
        cms.upsert_featured_item(form(&[("title", "Hidden"), ("image_url", IMAGE)]))
            .await
            .unwrap();

        let public = cms.published_featured_items().await.unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].id, shown.id);
        assert_eq!(cms.admin_featured_items().await.unwrap().len(), 2);

        cms.delete_featured_item(&shown.id).await.unwrap();
        assert!(cms.published_featured_items().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_message() {
        let cms = cms();
        let item = cms
            .upsert_featured_item(form(&[("title", "One"), ("image_url", IMAGE)]))
            .await
            .unwrap()
            .item
            .unwrap();
        let state = cms
            .upsert_featured_item(form(&[
                ("id", item.id.as_str()),
                ("title", "Two"),
                ("image_url", IMAGE),
            ]))
            .await
            .unwrap();
        assert_eq!(state.message, "Featured Item \"Two\" updated successfully!");
        assert_eq!(cms.featured_item(&item.id).await.unwrap().title, "Two");
    }
}
