//! Content record types.
//!
//! Rows are stored flat with snake_case columns; the same structs are
//! serialized straight back out of the admin and public APIs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::Record;

/// Generate a prefixed record id, e.g. `nav_3f2a...`.
pub fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

// ============================================================================
// Navigation
// ============================================================================

/// One navigation entry as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationRecord {
    pub id: String,
    pub label: String,
    pub href: String,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl NavigationRecord {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        href: impl Into<String>,
        order: i32,
        parent_id: Option<&str>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            label: label.into(),
            href: href.into(),
            order,
            parent_id: parent_id.map(str::to_string),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Record for NavigationRecord {
    const TABLE: &'static str = "navigation_items";
    const ENTITY: &'static str = "Navigation item";
    // Parents first, then sibling rank; id keeps ties deterministic.
    const ORDER_BY: &'static [&'static str] = &["parent_id", "order", "id"];

    fn key(&self) -> &str {
        &self.id
    }
}

/// A navigation record with its children resolved, rebuilt per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulatedNavItem {
    #[serde(flatten)]
    pub record: NavigationRecord,
    pub children: Vec<PopulatedNavItem>,
}

impl PopulatedNavItem {
    pub fn id(&self) -> &str {
        &self.record.id
    }
}

// ============================================================================
// Hero slides
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeroSlide {
    pub id: String,
    #[serde(default)]
    pub slide_label: Option<String>,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub cta_text: Option<String>,
    #[serde(default)]
    pub cta_link: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub image_alt: Option<String>,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub published: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Record for HeroSlide {
    const TABLE: &'static str = "hero_slides";
    const ENTITY: &'static str = "Hero slide";

    fn key(&self) -> &str {
        &self.id
    }
}

/// What the public carousel needs from a slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarouselSlide {
    pub id: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub cta_text: Option<String>,
    pub cta_link: Option<String>,
    pub image_url: Option<String>,
    pub image_alt: Option<String>,
}

impl From<HeroSlide> for CarouselSlide {
    fn from(slide: HeroSlide) -> Self {
        Self {
            id: slide.id,
            title: slide.title,
            subtitle: slide.subtitle,
            cta_text: slide.cta_text,
            cta_link: slide.cta_link,
            image_url: display_image(slide.image_url),
            image_alt: slide.image_alt,
        }
    }
}

// ============================================================================
// Featured items
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CtaVariant {
    #[default]
    Primary,
    Secondary,
    Outline,
    Ghost,
    Link,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CtaButton {
    pub text: String,
    pub url: String,
    #[serde(default)]
    pub variant: CtaVariant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturedItem {
    pub id: String,
    #[serde(default)]
    pub admin_label: Option<String>,
    #[serde(default)]
    pub small_heading: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub image_url: String,
    #[serde(default)]
    pub image_alt: Option<String>,
    #[serde(default)]
    pub ctas: Vec<CtaButton>,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub published: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Record for FeaturedItem {
    const TABLE: &'static str = "featured_items";
    const ENTITY: &'static str = "Featured item";

    fn key(&self) -> &str {
        &self.id
    }
}

// ============================================================================
// Value propositions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuePropositionItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub image_alt: Option<String>,
    #[serde(default)]
    pub link_url: Option<String>,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub published: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Record for ValuePropositionItem {
    const TABLE: &'static str = "value_proposition_items";
    const ENTITY: &'static str = "Value proposition item";

    fn key(&self) -> &str {
        &self.id
    }
}

// ============================================================================
// Footer
// ============================================================================

pub const DEFAULT_FOOTER: &str = "main_footer";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FooterLink {
    pub text: String,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialLink {
    pub platform: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FooterContent {
    pub id: String,
    pub identifier: String,
    pub copyright_text: String,
    #[serde(default)]
    pub links: Vec<FooterLink>,
    #[serde(default)]
    pub social_media: Vec<SocialLink>,
    #[serde(default)]
    pub published: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Record for FooterContent {
    const TABLE: &'static str = "footer_contents";
    const ENTITY: &'static str = "Footer";
    const KEY: &'static str = "identifier";
    const ORDER_BY: &'static [&'static str] = &["identifier"];

    fn key(&self) -> &str {
        &self.identifier
    }
}

// ============================================================================
// Public payloads
// ============================================================================

/// Everything the public homepage renders, in one response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomePage {
    pub navigation: Vec<PopulatedNavItem>,
    pub hero_slides: Vec<CarouselSlide>,
    pub featured_items: Vec<FeaturedItem>,
    pub value_propositions: Vec<ValuePropositionItem>,
    pub footer: Option<FooterContent>,
}

/// Blank image URLs become `None` so renderers fall back to a placeholder.
pub fn display_image(url: Option<String>) -> Option<String> {
    url.filter(|u| !u.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_id_prefix() {
        let id = new_id("nav");
        assert!(id.starts_with("nav_"));
        assert_eq!(id.len(), "nav_".len() + 32);
        assert_ne!(id, new_id("nav"));
    }

    #[test]
    fn test_populated_item_serializes_flat_with_children() {
        let item = PopulatedNavItem {
            record: NavigationRecord::new("r1", "Home", "/", 0, None),
            children: Vec::new(),
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["id"], "r1");
        assert_eq!(json["label"], "Home");
        assert!(json["parent_id"].is_null());
        assert_eq!(json["children"], serde_json::json!([]));
    }

    #[test]
    fn test_cta_variant_defaults_to_primary() {
        let cta: CtaButton =
            serde_json::from_str(r#"{"text": "Shop", "url": "/shop"}"#).unwrap();
        assert_eq!(cta.variant, CtaVariant::Primary);

        let cta: CtaButton =
            serde_json::from_str(r#"{"text": "Read", "url": "/blog", "variant": "ghost"}"#)
                .unwrap();
        assert_eq!(cta.variant, CtaVariant::Ghost);
    }

    #[test]
    fn test_carousel_projection_drops_blank_image() {
        let slide: HeroSlide = serde_json::from_value(serde_json::json!({
            "id": "hero_1",
            "title": "Welcome",
            "image_url": "  ",
            "published": true
        }))
        .unwrap();
        let carousel = CarouselSlide::from(slide);
        assert_eq!(carousel.title, "Welcome");
        assert!(carousel.image_url.is_none());
    }

    #[test]
    fn test_record_rows_tolerate_missing_timestamps() {
        let record: NavigationRecord = serde_json::from_value(serde_json::json!({
            "id": "nav_1",
            "label": "About",
            "href": "/about"
        }))
        .unwrap();
        assert_eq!(record.order, 0);
        assert!(record.parent_id.is_none());
    }
}
