//! Site footer, one row per identifier.

use chrono::Utc;
use serde::Deserialize;

use crate::cache::{self, footer_tag, FOOTER};
use crate::cms::Cms;
use crate::error::CmsError;
use crate::forms::{is_absolute_url, is_identifier, is_link_target, optional, parse_flag, FormState, Saved, Validator};
use crate::models::{new_id, FooterContent, FooterLink, SocialLink, DEFAULT_FOOTER};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FooterForm {
    pub identifier: Option<String>,
    pub copyright_text: Option<String>,
    /// JSON array of `{text, href}`.
    pub links: Option<String>,
    /// JSON array of `{platform, url}`.
    pub social_media: Option<String>,
    pub published: Option<String>,
}

impl FooterForm {
    fn validate(self) -> Result<FooterContent, CmsError> {
        let mut v = Validator::new();

        let identifier = optional(self.identifier)
            .map(|i| i.trim().to_string())
            .unwrap_or_else(|| DEFAULT_FOOTER.to_string());
        if !is_identifier(&identifier) {
            v.push(
                "identifier",
                "Identifier may only contain lowercase letters, digits, '-' and '_'.",
            );
        }

        let copyright_text = v.required(
            "copyright_text",
            self.copyright_text,
            "Copyright text is required.",
        );

        let links: Vec<FooterLink> = v.json_list(
            "links",
            self.links,
            "Invalid JSON structure for links. Please ensure it's a valid array of objects.",
        );
        for link in &links {
            if link.text.trim().is_empty() {
                v.push("links", "Link text cannot be empty.");
            }
            if !is_link_target(&link.href) {
                v.push(
                    "links",
                    "Link URL must be a relative path (e.g., /about) or an absolute URL (e.g., https://example.com).",
                );
            }
        }

        let social_media: Vec<SocialLink> = v.json_list(
            "social_media",
            self.social_media,
            "Invalid JSON structure for social media links. Please ensure it's a valid array of objects.",
        );
        for social in &social_media {
            if social.platform.trim().is_empty() {
                v.push("social_media", "Platform name cannot be empty.");
            }
            if !is_absolute_url(&social.url) {
                v.push("social_media", "Social media link must be a valid URL.");
            }
        }
        v.finish()?;

        let now = Utc::now();
        Ok(FooterContent {
            id: String::new(),
            identifier,
            copyright_text,
            links,
            social_media,
            published: parse_flag(self.published.as_deref()),
            created_at: now,
            updated_at: now,
        })
    }
}

impl Cms {
    /// Footer for editing, whatever its publish state.
    pub async fn admin_footer(&self, identifier: &str) -> Result<Option<FooterContent>, CmsError> {
        Ok(self.repo.get::<FooterContent>(identifier).await?)
    }

    /// Published footer for the public site.
    pub async fn footer(&self, identifier: &str) -> Result<Option<FooterContent>, CmsError> {
        if !is_identifier(identifier) {
            return Ok(None);
        }
        let tag = footer_tag(identifier);
        self.cache
            .get_or_load_found(
                &format!("footer-{}", identifier),
                &[FOOTER, tag.as_str(), cache::CONTENT],
                || async {
                    let footer = self.repo.get::<FooterContent>(identifier).await?;
                    Ok::<_, CmsError>(footer.filter(|f| f.published))
                },
            )
            .await
    }

    /// Create or replace the footer stored under the form's identifier.
    pub async fn upsert_footer(&self, form: FooterForm) -> Result<FormState<FooterContent>, CmsError> {
        let mut footer = form.validate()?;

        let saved = match self.repo.get::<FooterContent>(&footer.identifier).await? {
            Some(existing) => {
                footer.id = existing.id;
                footer.created_at = existing.created_at;
                Saved::Updated
            }
            None => {
                footer.id = new_id("footer");
                Saved::Created
            }
        };

        let footer = self.persist(&footer, saved).await?;
        self.revalidate(&[footer_tag(&footer.identifier), FOOTER.to_string()]);

        Ok(FormState::success(
            "Footer content updated successfully!",
            Some(footer),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::testing::{cms, form};

    #[test]
    fn test_identifier_defaults_and_is_checked() {
        let footer = form::<FooterForm>(&[("copyright_text", "(c) Acme")])
            .validate()
            .unwrap();
        assert_eq!(footer.identifier, DEFAULT_FOOTER);
        assert!(footer.links.is_empty());
        assert!(!footer.published);

        let bad: FooterForm = form(&[("identifier", "Main Footer"), ("copyright_text", "x")]);
        assert!(matches!(
            bad.validate(),
            Err(CmsError::Validation(ref e)) if e.contains_key("identifier")
        ));
    }

    #[test]
    fn test_link_and_social_errors() {
        let form: FooterForm = form(&[
            ("links", r#"[{"text": "", "href": "about"}]"#),
            ("social_media", r#"[{"platform": "X", "url": "/x"}]"#),
        ]);
        match form.validate() {
            Err(CmsError::Validation(errors)) => {
                assert_eq!(errors["copyright_text"], vec!["Copyright text is required."]);
                assert_eq!(errors["links"].len(), 2);
                assert_eq!(errors["links"][0], "Link text cannot be empty.");
                assert_eq!(
                    errors["social_media"],
                    vec!["Social media link must be a valid URL."]
                );
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_links_json() {
        let form: FooterForm = form(&[("copyright_text", "x"), ("links", "{\"text\": 1}")]);
        match form.validate() {
            Err(CmsError::Validation(errors)) => assert_eq!(
                errors["links"],
                vec!["Invalid JSON structure for links. Please ensure it's a valid array of objects."]
            ),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_upsert_by_identifier() {
        let cms = cms();
        let first = cms
            .upsert_footer(form(&[
                ("copyright_text", "(c) 2024 Acme"),
                ("links", r#"[{"text": "About", "href": "/about"}]"#),
            ]))
            .await
            .unwrap()
            .item
            .unwrap();
        assert!(first.id.starts_with("footer_"));

        // Unpublished footers stay off the public site.
        assert!(cms.footer(DEFAULT_FOOTER).await.unwrap().is_none());

        let state = cms
            .upsert_footer(form(&[
                ("identifier", DEFAULT_FOOTER),
                ("copyright_text", "(c) 2025 Acme"),
                ("social_media", r#"[{"platform": "GitHub", "url": "https://github.com/acme"}]"#),
                ("published", "on"),
            ]))
            .await
            .unwrap();
        assert_eq!(state.message, "Footer content updated successfully!");
        let second = state.item.unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);
        assert!(second.links.is_empty());

        let public = cms.footer(DEFAULT_FOOTER).await.unwrap().unwrap();
        assert_eq!(public.copyright_text, "(c) 2025 Acme");
        assert_eq!(public.social_media[0].platform, "GitHub");

        assert!(cms.admin_footer("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_footer_lookups_leave_cache_empty() {
        let cms = cms();
        for i in 0..100 {
            assert!(cms.footer(&format!("ghost{}", i)).await.unwrap().is_none());
        }
        assert!(cms.footer("Not An Identifier").await.unwrap().is_none());
        assert!(cms.cache().is_empty());

        cms.upsert_footer(form(&[("copyright_text", "(c) Acme"), ("published", "on")]))
            .await
            .unwrap();
        assert!(cms.footer(DEFAULT_FOOTER).await.unwrap().is_some());
        assert_eq!(cms.cache().len(), 1);
    }
}
