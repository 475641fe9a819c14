//! Form parsing and validation shared by the admin write paths.
//!
//! Admin forms arrive url-encoded, so every field is an optional string. The
//! helpers here normalize those strings the same way for every section: blank
//! optionals collapse to `None`, `order` falls back to 0, and checkbox flags
//! accept `true`/`on`.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CmsError;

/// Field name → list of messages, ordered for stable output.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Result envelope returned by every admin write.
#[derive(Debug, Clone, Serialize)]
pub struct FormState<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub field_errors: FieldErrors,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<T>,
}

impl<T> FormState<T> {
    pub fn success(message: impl Into<String>, item: Option<T>) -> Self {
        Self {
            success: true,
            message: message.into(),
            field_errors: FieldErrors::new(),
            item,
        }
    }

    pub fn failure(message: impl Into<String>, field_errors: FieldErrors) -> Self {
        Self {
            success: false,
            message: message.into(),
            field_errors,
            item: None,
        }
    }
}

/// Which verb a successful upsert performed, for the result message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Saved {
    Created,
    Updated,
}

impl Saved {
    pub fn as_str(self) -> &'static str {
        match self {
            Saved::Created => "created",
            Saved::Updated => "updated",
        }
    }
}

fn link_target_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(/|https?://)").expect("static regex"))
}

fn identifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9_-]+$").expect("static regex"))
}

/// Blank strings become `None`.
pub fn optional(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Lenient integer parse: missing, blank or malformed input yields 0.
pub fn parse_order(value: Option<&str>) -> i32 {
    value
        .map(str::trim)
        .and_then(|v| v.parse::<i32>().ok())
        .unwrap_or(0)
}

/// Checkbox semantics: `true` (any case) or `on` is set, anything else
/// (including an unchecked box that sends nothing) is unset.
pub fn parse_flag(value: Option<&str>) -> bool {
    value
        .map(|v| v.eq_ignore_ascii_case("true") || v == "on")
        .unwrap_or(false)
}

pub fn is_absolute_url(value: &str) -> bool {
    reqwest::Url::parse(value).is_ok()
}

/// Relative path (`/about`) or an absolute http(s) URL.
pub fn is_link_target(value: &str) -> bool {
    link_target_regex().is_match(value)
}

pub fn is_identifier(value: &str) -> bool {
    identifier_regex().is_match(value)
}

/// Accumulates field errors so a form reports every problem at once.
#[derive(Debug, Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Required, non-blank string. Returns an empty string when missing so
    /// validation can carry on collecting errors.
    pub fn required(&mut self, field: &str, value: Option<String>, message: &str) -> String {
        match optional(value) {
            Some(v) => v,
            None => {
                self.push(field, message);
                String::new()
            }
        }
    }

    /// Optional absolute URL; blank collapses to `None`.
    pub fn optional_url(&mut self, field: &str, value: Option<String>, message: &str) -> Option<String> {
        let value = optional(value)?;
        if !is_absolute_url(&value) {
            self.push(field, message);
        }
        Some(value)
    }

    /// Parse a JSON array field; blank input is an empty list.
    pub fn json_list<T: DeserializeOwned>(
        &mut self,
        field: &str,
        value: Option<String>,
        message: &str,
    ) -> Vec<T> {
        let Some(raw) = optional(value) else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<T>>(&raw) {
            Ok(list) => list,
            Err(e) => {
                tracing::debug!("Invalid JSON in field {}: {}", field, e);
                self.push(field, message);
                Vec::new()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> Result<(), CmsError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(CmsError::Validation(self.errors))
        }
    }
}
