//! Value types embedded in several entities.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use crate::shared::validation::{clean_list, clean_opt, Validation};

/// Search-engine metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SeoMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_description: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl SeoMeta {
    pub fn cleaned(self) -> Self {
        Self {
            meta_title: clean_opt(self.meta_title),
            meta_description: clean_opt(self.meta_description),
            keywords: clean_list(self.keywords),
        }
    }

    pub fn validate(&self, v: &mut Validation) {
        v.text_opt("seo.metaTitle", self.meta_title.as_deref(), 70);
        v.text_opt("seo.metaDescription", self.meta_description.as_deref(), 160);
        v.max_items("seo.keywords", self.keywords.len(), 20);
    }
}

/// An image held in the blob store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ImageAsset {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl ImageAsset {
    pub fn validate(&self, key: &str, v: &mut Validation) {
        if self.url.trim().is_empty() {
            v.record(key, "image url is required");
        } else {
            v.url(key, Some(self.url.trim()));
        }
        v.text_opt(key, self.caption.as_deref(), 200);
    }
}

/// Numeric min/max pair (price, area, budget, salary)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NumberRange {
    pub min: f64,
    pub max: f64,
}

impl NumberRange {
    /// Both bounds at least `floor` and `max >= min`.
    pub fn validate(&self, key: &str, floor: f64, v: &mut Validation) {
        v.at_least(&format!("{}.min", key), self.min, floor);
        v.at_least(&format!("{}.max", key), self.max, floor);
        v.min_max(key, self.min, self.max);
    }
}

/// Internal follow-up note on a lead or application
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Note {
    pub fn new(content: String, created_by: Option<&str>, now: DateTime<Utc>) -> crate::Result<Self> {
        let content = content.trim().to_string();
        let mut v = Validation::new();
        v.text("content", &content, 1, 2000);
        v.into_result()?;
        Ok(Self {
            content,
            created_by: created_by.map(String::from),
            created_at: now,
        })
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NoteResponse {
    pub content: String,
    pub created_by: Option<String>,
    pub created_at: String,
}

impl From<Note> for NoteResponse {
    fn from(n: Note) -> Self {
        Self {
            content: n.content,
            created_by: n.created_by,
            created_at: n.created_at.to_rfc3339(),
        }
    }
}

/// Lead handling priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    /// Default follow-up window for consultation requests.
    pub fn consultation_window(self) -> Duration {
        match self {
            Priority::Urgent => Duration::hours(2),
            Priority::High => Duration::days(1),
            Priority::Normal => Duration::days(3),
            Priority::Low => Duration::days(7),
        }
    }

    /// Default follow-up window for contact messages.
    pub fn contact_window(self) -> Duration {
        match self {
            Priority::Urgent => Duration::hours(4),
            Priority::High => Duration::days(1),
            Priority::Normal => Duration::days(2),
            Priority::Low => Duration::days(5),
        }
    }
}

pub fn to_rfc3339_opt(value: Option<DateTime<Utc>>) -> Option<String> {
    value.map(|v| v.to_rfc3339())
}

/// Patch field deserializer: absent stays `None`, an explicit `null` becomes
/// `Some(None)` (clear the value). Use with `#[serde(default)]`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seo_limits() {
        let seo = SeoMeta {
            meta_title: Some("t".repeat(71)),
            meta_description: Some("d".repeat(160)),
            keywords: (0..21).map(|i| i.to_string()).collect(),
        };
        let mut v = Validation::new();
        seo.validate(&mut v);
        let keys: Vec<_> = v.failed_keys().collect();
        assert_eq!(keys, vec!["seo.metaTitle", "seo.keywords"]);
    }

    #[test]
    fn test_range_validation() {
        let mut v = Validation::new();
        NumberRange { min: -1.0, max: 5.0 }.validate("priceRange", 0.0, &mut v);
        NumberRange { min: 5.0, max: 5.0 }.validate("areaRange", 0.0, &mut v);
        let keys: Vec<_> = v.failed_keys().collect();
        assert_eq!(keys, vec!["priceRange.min"]);
    }

    #[test]
    fn test_follow_up_windows() {
        assert_eq!(Priority::Urgent.consultation_window(), Duration::hours(2));
        assert_eq!(Priority::Low.consultation_window(), Duration::days(7));
        assert_eq!(Priority::Urgent.contact_window(), Duration::hours(4));
        assert_eq!(Priority::default(), Priority::Normal);
    }

    #[test]
    fn test_nullable_patch_field() {
        #[derive(Deserialize)]
        struct Patch {
            #[serde(default, deserialize_with = "nullable")]
            sale_price: Option<Option<f64>>,
        }
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.sale_price, None);
        let cleared: Patch = serde_json::from_str(r#"{"sale_price":null}"#).unwrap();
        assert_eq!(cleared.sale_price, Some(None));
        let set: Patch = serde_json::from_str(r#"{"sale_price":5.0}"#).unwrap();
        assert_eq!(set.sale_price, Some(Some(5.0)));
    }

    #[test]
    fn test_blank_note_rejected() {
        assert!(Note::new("   ".to_string(), None, Utc::now()).is_err());
        let note = Note::new(" called back ".to_string(), Some("U1"), Utc::now()).unwrap();
        assert_eq!(note.content, "called back");
    }
}
