//! Listing filter construction.
//!
//! Untrusted query parameters are turned into MongoDB filters here and only
//! here: text search becomes escaped case-insensitive regexes over a fixed
//! field list, enum filters pass only when they name a known value, and
//! malformed reference ids are dropped.

use bson::{doc, Bson, Document};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

use crate::TsidGenerator;

/// Sentinel accepted by enum filters meaning "do not filter".
pub const ALL: &str = "all";

/// Per-entity "publicly visible" predicate. Client-facing queries always
/// combine it with the caller's filter via [`with_public_visibility`].
pub trait PublicVisibility {
    fn public_filter(now: DateTime<Utc>) -> Document;
}

/// `{$and: [filter, visible]}`; nothing in `filter` can loosen `visible`.
pub fn with_public_visibility<E: PublicVisibility>(filter: Document, now: DateTime<Utc>) -> Document {
    let visible = E::public_filter(now);
    if filter.is_empty() {
        visible
    } else {
        doc! { "$and": [filter, visible] }
    }
}

/// Parse a snake_case enum value the way request bodies are parsed.
pub fn parse_enum<E: DeserializeOwned>(raw: &str) -> Option<E> {
    serde_json::from_value(serde_json::Value::String(raw.trim().to_string())).ok()
}

pub fn to_bson_datetime(value: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_chrono(value)
}

/// Accumulates filter clauses.
#[derive(Debug, Default, Clone)]
pub struct FilterBuilder {
    clauses: Vec<Document>,
}

impl FilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Case-insensitive substring match of `term` across `fields`.
    pub fn text(mut self, term: Option<&str>, fields: &[&str]) -> Self {
        if let Some(term) = term.map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = regex::escape(term);
            let any: Vec<Bson> = fields
                .iter()
                .map(|field| Bson::Document(doc! { *field: { "$regex": pattern.as_str(), "$options": "i" } }))
                .collect();
            self.clauses.push(doc! { "$or": any });
        }
        self
    }

    /// Exact match on an enum field. Unknown values and the `all` sentinel
    /// add no clause.
    pub fn enum_value<E: DeserializeOwned + serde::Serialize>(mut self, field: &str, raw: Option<&str>) -> Self {
        if let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty() && !r.eq_ignore_ascii_case(ALL)) {
            if let Some(value) = parse_enum::<E>(raw) {
                if let Ok(Bson::String(s)) = bson::to_bson(&value) {
                    self.clauses.push(doc! { field: s });
                }
            }
        }
        self
    }

    /// Reference-id match; malformed ids add no clause.
    pub fn reference(mut self, field: &str, raw: Option<&str>) -> Self {
        if let Some(id) = raw.map(str::trim).filter(|id| TsidGenerator::is_valid(id)) {
            self.clauses.push(doc! { field: id.to_uppercase() });
        }
        self
    }

    pub fn flag(mut self, field: &str, value: Option<bool>) -> Self {
        if let Some(value) = value {
            self.clauses.push(doc! { field: value });
        }
        self
    }

    /// Exact, case-insensitive match of a free-text field (e.g. city).
    pub fn equals_ci(mut self, field: &str, raw: Option<&str>) -> Self {
        if let Some(value) = raw.map(str::trim).filter(|v| !v.is_empty()) {
            let pattern = format!("^{}$", regex::escape(value));
            self.clauses.push(doc! { field: { "$regex": pattern, "$options": "i" } });
        }
        self
    }

    /// Array-contains match (tags, interests).
    pub fn contains(mut self, field: &str, raw: Option<&str>) -> Self {
        if let Some(value) = raw.map(str::trim).filter(|v| !v.is_empty()) {
            self.clauses.push(doc! { field: value });
        }
        self
    }

    pub fn gte(mut self, field: &str, value: Option<f64>) -> Self {
        if let Some(value) = value.filter(|v| v.is_finite()) {
            self.clauses.push(doc! { field: { "$gte": value } });
        }
        self
    }

    pub fn lte(mut self, field: &str, value: Option<f64>) -> Self {
        if let Some(value) = value.filter(|v| v.is_finite()) {
            self.clauses.push(doc! { field: { "$lte": value } });
        }
        self
    }

    pub fn date_range(mut self, field: &str, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        let mut range = Document::new();
        if let Some(from) = from {
            range.insert("$gte", to_bson_datetime(from));
        }
        if let Some(to) = to {
            range.insert("$lte", to_bson_datetime(to));
        }
        if !range.is_empty() {
            self.clauses.push(doc! { field: range });
        }
        self
    }

    pub fn raw(mut self, clause: Document) -> Self {
        self.clauses.push(clause);
        self
    }

    pub fn build(self) -> Document {
        match self.clauses.len() {
            0 => Document::new(),
            1 => self.clauses.into_iter().next().unwrap_or_default(),
            _ => {
                let all: Vec<Bson> = self.clauses.into_iter().map(Bson::Document).collect();
                doc! { "$and": all }
            }
        }
    }
}

/// Parse an RFC 3339 timestamp or a plain `YYYY-MM-DD` date from a query string.
pub fn parse_datetime(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    #[serde(rename_all = "snake_case")]
    enum Status {
        New,
        Contacted,
    }

    struct Visible;

    impl PublicVisibility for Visible {
        fn public_filter(_now: DateTime<Utc>) -> Document {
            doc! { "isActive": true }
        }
    }

    #[test]
    fn test_text_is_escaped() {
        let filter = FilterBuilder::new().text(Some("a.b*"), &["name", "email"]).build();
        let or = filter.get_array("$or").unwrap();
        assert_eq!(or.len(), 2);
        let name = or[0].as_document().unwrap().get_document("name").unwrap();
        assert_eq!(name.get_str("$regex").unwrap(), r"a\.b\*");
        assert_eq!(name.get_str("$options").unwrap(), "i");
    }

    #[test]
    fn test_enum_values() {
        let f = FilterBuilder::new().enum_value::<Status>("status", Some("contacted")).build();
        assert_eq!(f, doc! { "status": "contacted" });

        let f = FilterBuilder::new().enum_value::<Status>("status", Some("all")).build();
        assert!(f.is_empty());

        let f = FilterBuilder::new()
            .enum_value::<Status>("status", Some("{\"$ne\":null}"))
            .build();
        assert!(f.is_empty());
    }

    #[test]
    fn test_malformed_reference_dropped() {
        let f = FilterBuilder::new().reference("categoryId", Some("not-an-id")).build();
        assert!(f.is_empty());

        let id = TsidGenerator::generate();
        let f = FilterBuilder::new().reference("categoryId", Some(&id)).build();
        assert_eq!(f, doc! { "categoryId": id });
    }

    #[test]
    fn test_multiple_clauses_are_anded() {
        let f = FilterBuilder::new()
            .flag("isFeatured", Some(true))
            .gte("priceRange.min", Some(1.0))
            .flag("isActive", None)
            .build();
        assert_eq!(f.get_array("$and").unwrap().len(), 2);
    }

    #[test]
    fn test_visibility_cannot_be_overridden() {
        let caller = FilterBuilder::new().flag("isActive", Some(false)).build();
        let combined = with_public_visibility::<Visible>(caller, Utc::now());
        let and = combined.get_array("$and").unwrap();
        assert_eq!(and[1].as_document().unwrap(), &doc! { "isActive": true });

        let combined = with_public_visibility::<Visible>(Document::new(), Utc::now());
        assert_eq!(combined, doc! { "isActive": true });
    }

    #[test]
    fn test_parse_datetime() {
        assert!(parse_datetime(Some("2024-05-01")).is_some());
        assert!(parse_datetime(Some("2024-05-01T10:00:00Z")).is_some());
        assert!(parse_datetime(Some("yesterday")).is_none());
        assert!(parse_datetime(None).is_none());
    }
}
