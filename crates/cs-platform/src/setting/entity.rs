//! Site Setting Entity
//!
//! Key/value configuration edited from the back office. Values are stored as
//! JSON; `valueType` declares what kind of JSON value the key holds and every
//! write is checked against it.

use std::sync::OnceLock;

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use bson::{doc, Document};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::shared::query::PublicVisibility;
use crate::shared::validation::{clean_opt, Validation};
use crate::{Result, TsidGenerator};

fn key_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z][a-z0-9_.]{1,99}$").unwrap())
}

pub fn is_valid_key(key: &str) -> bool {
    key_regex().is_match(key)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    String,
    Number,
    Boolean,
    Json,
}

impl ValueType {
    /// The type a bare value would be stored as.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::String(_) => ValueType::String,
            Value::Number(_) => ValueType::Number,
            Value::Bool(_) => ValueType::Boolean,
            _ => ValueType::Json,
        }
    }

    pub fn accepts(self, value: &Value) -> bool {
        match self {
            ValueType::String => value.is_string(),
            ValueType::Number => value.is_number(),
            ValueType::Boolean => value.is_boolean(),
            ValueType::Json => value.is_object() || value.is_array(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SettingGroup {
    #[default]
    General,
    Contact,
    Social,
    Seo,
    Appearance,
    Email,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
    #[serde(rename = "_id")]
    pub id: String,

    pub key: String,

    pub value: Value,

    pub value_type: ValueType,

    pub group: SettingGroup,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Exposed through the public settings endpoint
    #[serde(default)]
    pub is_public: bool,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl PublicVisibility for Setting {
    fn public_filter(_now: DateTime<Utc>) -> Document {
        doc! { "isPublic": true }
    }
}

/// Body of `PUT /settings/:key`. A missing `valueType` keeps the stored one,
/// or is inferred from the value for a new key.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpsertSettingInput {
    #[schema(value_type = Object)]
    pub value: Value,
    pub value_type: Option<ValueType>,
    pub group: Option<SettingGroup>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
}

/// One entry of a bulk update
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BulkSettingEntry {
    pub key: String,
    #[schema(value_type = Object)]
    pub value: Value,
    pub value_type: Option<ValueType>,
    pub group: Option<SettingGroup>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
}

impl BulkSettingEntry {
    pub fn into_parts(self) -> (String, UpsertSettingInput) {
        (
            self.key,
            UpsertSettingInput {
                value: self.value,
                value_type: self.value_type,
                group: self.group,
                description: self.description,
                is_public: self.is_public,
            },
        )
    }
}

pub fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

impl Setting {
    pub fn create(key: &str, input: UpsertSettingInput, actor: Option<&str>, now: DateTime<Utc>) -> Result<Self> {
        let setting = Self {
            id: TsidGenerator::generate(),
            key: normalize_key(key),
            value_type: input.value_type.unwrap_or_else(|| ValueType::of(&input.value)),
            value: input.value,
            group: input.group.unwrap_or_default(),
            description: clean_opt(input.description),
            is_public: input.is_public.unwrap_or(false),
            created_at: now,
            updated_at: now,
            updated_by: actor.map(String::from),
        };
        setting.validate()?;
        Ok(setting)
    }

    pub fn apply(&mut self, input: UpsertSettingInput, actor: Option<&str>, now: DateTime<Utc>) -> Result<()> {
        self.value = input.value;
        if let Some(value_type) = input.value_type {
            self.value_type = value_type;
        }
        if let Some(group) = input.group {
            self.group = group;
        }
        if let Some(description) = input.description {
            self.description = clean_opt(Some(description));
        }
        if let Some(is_public) = input.is_public {
            self.is_public = is_public;
        }
        self.validate()?;
        self.updated_at = now;
        self.updated_by = actor.map(String::from).or(self.updated_by.take());
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let mut v = Validation::new();
        if !is_valid_key(&self.key) {
            v.record(
                "key",
                "must start with a letter and contain only lowercase letters, digits, '_' or '.' (2-100 characters)",
            );
        }
        if !self.value_type.accepts(&self.value) {
            v.record("value", format!("does not match valueType {:?}", self.value_type).to_lowercase());
        }
        v.text_opt("description", self.description.as_deref(), 500);
        v.into_result()
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettingResponse {
    pub id: String,
    pub key: String,
    #[schema(value_type = Object)]
    pub value: Value,
    pub value_type: ValueType,
    pub group: SettingGroup,
    pub description: Option<String>,
    pub is_public: bool,
    pub updated_at: String,
    pub updated_by: Option<String>,
}

impl From<Setting> for SettingResponse {
    fn from(s: Setting) -> Self {
        Self {
            id: s.id,
            key: s.key,
            value: s.value,
            value_type: s.value_type,
            group: s.group,
            description: s.description,
            is_public: s.is_public,
            updated_at: s.updated_at.to_rfc3339(),
            updated_by: s.updated_by,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn upsert(value: Value) -> UpsertSettingInput {
        UpsertSettingInput {
            value,
            value_type: None,
            group: None,
            description: None,
            is_public: None,
        }
    }

    #[test]
    fn test_key_pattern() {
        assert!(is_valid_key("site.name"));
        assert!(is_valid_key("contact_hotline"));
        assert!(!is_valid_key("a"));
        assert!(!is_valid_key("1site"));
        assert!(!is_valid_key("Site.Name"));
        assert!(!is_valid_key("site-name"));
    }

    #[test]
    fn test_value_type_inferred() {
        let s = Setting::create("site.name", upsert(json!("Corp")), None, Utc::now()).unwrap();
        assert_eq!(s.value_type, ValueType::String);
        let s = Setting::create("social.links", upsert(json!({"facebook": "x"})), None, Utc::now()).unwrap();
        assert_eq!(s.value_type, ValueType::Json);
        assert_eq!(s.group, SettingGroup::General);
        assert!(!s.is_public);
    }

    #[test]
    fn test_value_must_match_declared_type() {
        let mut input = upsert(json!("12"));
        input.value_type = Some(ValueType::Number);
        let err = Setting::create("home.items", input, None, Utc::now()).unwrap_err().to_string();
        assert!(err.contains("value"));
        assert!(Setting::create("site.flag", upsert(Value::Null), None, Utc::now()).is_err());
    }

    #[test]
    fn test_update_keeps_type() {
        let now = Utc::now();
        let mut s = Setting::create("home.items", upsert(json!(6)), None, now).unwrap();
        assert!(s.apply(upsert(json!("six")), Some("U1"), now).is_err());
        s.apply(upsert(json!(8)), Some("U1"), now).unwrap();
        assert_eq!(s.value, json!(8));
        assert_eq!(s.updated_by.as_deref(), Some("U1"));
    }

    #[test]
    fn test_key_normalized() {
        let s = Setting::create("  Site.Title ", upsert(json!("x")), None, Utc::now()).unwrap();
        assert_eq!(s.key, "site.title");
    }
}
