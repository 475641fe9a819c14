//! Value proposition grid items.

use chrono::Utc;
use serde::Deserialize;

use crate::cache::{self, value_proposition_tag, VALUE_PROPOSITIONS};
use crate::cms::Cms;
use crate::error::CmsError;
use crate::forms::{optional, parse_flag, parse_order, FormState, Saved, Validator};
use crate::models::{display_image, new_id, ValuePropositionItem};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ValuePropositionForm {
    pub id: Option<String>,
    pub title: Option<String>,
    pub image_url: Option<String>,
    pub image_alt: Option<String>,
    pub link_url: Option<String>,
    pub order: Option<String>,
    pub published: Option<String>,
}

impl ValuePropositionForm {
    fn validate(self) -> Result<(Option<String>, ValuePropositionItem), CmsError> {
        let mut v = Validator::new();
        let title = v.required("title", self.title, "Title is required.");
        let image_url = v.optional_url(
            "image_url",
            self.image_url,
            "Image URL must be a valid URL if provided.",
        );
        let link_url = v.optional_url(
            "link_url",
            self.link_url,
            "Link URL must be a valid URL if provided.",
        );
        v.finish()?;

        let now = Utc::now();
        Ok((
            optional(self.id),
            ValuePropositionItem {
                id: String::new(),
                title,
                image_url,
                image_alt: optional(self.image_alt),
                link_url,
                order: parse_order(self.order.as_deref()),
                published: parse_flag(self.published.as_deref()),
                created_at: now,
                updated_at: now,
            },
        ))
    }
}

impl Cms {
    pub async fn admin_value_propositions(&self) -> Result<Vec<ValuePropositionItem>, CmsError> {
        Ok(self.repo.list::<ValuePropositionItem>().await?)
    }

    pub async fn value_proposition(&self, id: &str) -> Result<ValuePropositionItem, CmsError> {
        self.require(id).await
    }

    pub async fn published_value_propositions(&self) -> Result<Vec<ValuePropositionItem>, CmsError> {
        self.cache
            .get_or_load(
                "published-value-proposition-items",
                &[VALUE_PROPOSITIONS, cache::CONTENT],
                || async {
                    let items = self.repo.list_published::<ValuePropositionItem>().await?;
                    Ok::<_, CmsError>(
                        items
                            .into_iter()
                            .map(|mut item| {
                                item.image_url = display_image(item.image_url);
                                item
                            })
                            .collect(),
                    )
                },
            )
            .await
    }

    pub async fn upsert_value_proposition(
        &self,
        form: ValuePropositionForm,
    ) -> Result<FormState<ValuePropositionItem>, CmsError> {
        let (id, mut item) = form.validate()?;

        let saved = match id {
            Some(id) => {
                let existing: ValuePropositionItem = self.require(&id).await?;
                item.id = id;
                item.created_at = existing.created_at;
                Saved::Updated
            }
            None => {
                item.id = new_id("vp");
                Saved::Created
            }
        };

        let item = self.persist(&item, saved).await?;
        self.revalidate(&[
            value_proposition_tag(&item.id),
            VALUE_PROPOSITIONS.to_string(),
        ]);

        Ok(FormState::success(
            format!(
                "Value Proposition Item \"{}\" {} successfully!",
                item.title,
                saved.as_str()
            ),
            Some(item),
        ))
    }

    pub async fn delete_value_proposition(&self, id: &str) -> Result<FormState<()>, CmsError> {
        self.remove::<ValuePropositionItem>(id).await?;
        self.revalidate(&[value_proposition_tag(id), VALUE_PROPOSITIONS.to_string()]);
        Ok(FormState::success(
            "Value Proposition Item deleted successfully.",
            None,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::testing::{cms, form};

    #[test]
    fn test_urls_validated_when_present() {
        let form: ValuePropositionForm = form(&[
            ("title", "Fast shipping"),
            ("image_url", "https://cdn.example.com/truck.png"),
            ("link_url", "/shipping"),
        ]);
        match form.validate() {
            Err(CmsError::Validation(errors)) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors["link_url"], vec!["Link URL must be a valid URL if provided."]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let cms = cms();
        let item = cms
            .upsert_value_proposition(form(&[
                ("title", "Support"),
                ("order", "1"),
                ("published", "on"),
            ]))
            .await
            .unwrap()
            .item
            .unwrap();
        cms.upsert_value_proposition(form(&[("title", "Quality"), ("order", "0"), ("published", "on")]))
            .await
            .unwrap();

        let titles: Vec<String> = cms
            .published_value_propositions()
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.title)
            .collect();
        assert_eq!(titles, vec!["Quality", "Support"]);

        // Unpublish: drops out of the public list after revalidation.
        cms.upsert_value_proposition(form(&[("id", item.id.as_str()), ("title", "Support")]))
            .await
            .unwrap();
        assert_eq!(cms.published_value_propositions().await.unwrap().len(), 1);
        assert_eq!(cms.admin_value_propositions().await.unwrap().len(), 2);

        cms.delete_value_proposition(&item.id).await.unwrap();
        assert!(matches!(
            cms.delete_value_proposition(&item.id).await,
            Err(CmsError::NotFound { .. })
        ));
    }
}
