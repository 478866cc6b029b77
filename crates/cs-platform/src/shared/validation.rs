//! Write-time validation.
//!
//! Entity constructors collect every failed rule into a [`Validation`] record
//! and turn it into a single [`PlatformError::Validation`] naming each
//! offending field.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

use crate::shared::error::{PlatformError, Result};

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap())
}

fn phone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\+84|84|0)[0-9]{9,10}$").unwrap())
}

fn slug_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap())
}

fn hex_color_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").unwrap())
}

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(https?://[^\s]+|/[^\s]*)$").unwrap())
}

/// Trim a required string.
pub fn clean(value: String) -> String {
    value.trim().to_string()
}

/// Trim an optional string; blank becomes `None`.
pub fn clean_opt(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trim every entry and drop blanks.
pub fn clean_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Strip separators commonly typed into phone numbers.
pub fn normalize_phone(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ' ' | '.' | '-' | '(' | ')'))
        .collect()
}

pub fn is_valid_email(value: &str) -> bool {
    email_regex().is_match(value)
}

pub fn is_valid_slug(value: &str) -> bool {
    slug_regex().is_match(value)
}

/// A record of failed validation rules.
#[derive(Debug, Default)]
pub struct Validation {
    failed_entries: Vec<(String, String)>,
}

impl Validation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failed rule for `key`.
    pub fn record(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.failed_entries.push((key.into(), message.into()));
    }

    pub fn is_success(&self) -> bool {
        self.failed_entries.is_empty()
    }

    pub fn failed_keys(&self) -> impl Iterator<Item = &str> {
        self.failed_entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn into_result(self) -> Result<()> {
        if self.failed_entries.is_empty() {
            return Ok(());
        }
        let message = self
            .failed_entries
            .iter()
            .map(|(key, message)| format!("{}: {}", key, message))
            .collect::<Vec<_>>()
            .join("; ");
        Err(PlatformError::validation(message))
    }

    /// Character length of a required, already trimmed value.
    pub fn text(&mut self, key: &str, value: &str, min: usize, max: usize) {
        let len = value.chars().count();
        if len == 0 {
            self.record(key, "is required");
        } else if len < min {
            self.record(key, format!("must be at least {} characters", min));
        } else if len > max {
            self.record(key, format!("must be at most {} characters", max));
        }
    }

    /// Maximum length of an optional value.
    pub fn text_opt(&mut self, key: &str, value: Option<&str>, max: usize) {
        if let Some(value) = value {
            if value.chars().count() > max {
                self.record(key, format!("must be at most {} characters", max));
            }
        }
    }

    pub fn email(&mut self, key: &str, value: &str) {
        if value.is_empty() {
            self.record(key, "is required");
        } else if !is_valid_email(value) {
            self.record(key, "must be a valid email address");
        }
    }

    pub fn phone(&mut self, key: &str, value: &str) {
        if value.is_empty() {
            self.record(key, "is required");
        } else if !phone_regex().is_match(value) {
            self.record(key, "must be a valid phone number");
        }
    }

    pub fn phone_opt(&mut self, key: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.phone(key, value);
        }
    }

    pub fn slug(&mut self, key: &str, value: &str) {
        if value.is_empty() {
            self.record(key, "could not be derived; provide a slug");
        } else if !is_valid_slug(value) {
            self.record(key, "may contain only lowercase letters, digits and single hyphens");
        } else if value.len() > 200 {
            self.record(key, "must be at most 200 characters");
        }
    }

    pub fn hex_color(&mut self, key: &str, value: Option<&str>) {
        if let Some(value) = value {
            if !hex_color_regex().is_match(value) {
                self.record(key, "must be a hex colour like #1a2b3c");
            }
        }
    }

    pub fn url(&mut self, key: &str, value: Option<&str>) {
        if let Some(value) = value {
            if !url_regex().is_match(value) {
                self.record(key, "must be an http(s) URL or a site-relative path");
            }
        }
    }

    pub fn range(&mut self, key: &str, value: f64, min: f64, max: f64) {
        if !value.is_finite() || value < min || value > max {
            self.record(key, format!("must be between {} and {}", min, max));
        }
    }

    pub fn at_least(&mut self, key: &str, value: f64, min: f64) {
        if !value.is_finite() || value < min {
            self.record(key, format!("must be at least {}", min));
        }
    }

    pub fn positive(&mut self, key: &str, value: f64) {
        if !value.is_finite() || value <= 0.0 {
            self.record(key, "must be greater than 0");
        }
    }

    pub fn latitude(&mut self, key: &str, value: Option<f64>) {
        if let Some(value) = value {
            self.range(key, value, -90.0, 90.0);
        }
    }

    pub fn longitude(&mut self, key: &str, value: Option<f64>) {
        if let Some(value) = value {
            self.range(key, value, -180.0, 180.0);
        }
    }

    /// `max` must not be below its paired `min`; equal bounds are allowed.
    pub fn min_max(&mut self, key: &str, min: f64, max: f64) {
        if max < min {
            self.record(key, "max must be greater than or equal to min");
        }
    }

    /// End must be strictly after start when both are present.
    pub fn date_order(
        &mut self,
        key: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) {
        if let (Some(start), Some(end)) = (start, end) {
            if end <= start {
                self.record(key, "end date must be after start date");
            }
        }
    }

    /// A used/sold counter must not exceed its total.
    pub fn within_total(&mut self, key: &str, used: u64, total: u64) {
        if used > total {
            self.record(key, format!("must not exceed the total ({})", total));
        }
    }

    pub fn max_items(&mut self, key: &str, len: usize, max: usize) {
        if len > max {
            self.record(key, format!("must contain at most {} items", max));
        }
    }

    pub fn each_text(&mut self, key: &str, values: &[String], max: usize) {
        if values.iter().any(|v| v.chars().count() > max) {
            self.record(key, format!("entries must be at most {} characters", max));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_text_rules() {
        let mut v = Validation::new();
        v.text("name", "", 2, 10);
        v.text("title", "a", 2, 10);
        v.text("subject", "Nhân sâm Hàn", 2, 12);
        v.text("code", "abcdefghijk", 2, 10);
        v.text_opt("note", Some("abc"), 2);
        let keys: Vec<_> = v.failed_keys().collect();
        assert_eq!(keys, vec!["name", "title", "code", "note"]);
    }

    #[test]
    fn test_error_names_every_field() {
        let mut v = Validation::new();
        v.email("email", "nope");
        v.min_max("priceRange", 10.0, 5.0);
        let err = v.into_result().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("email"));
        assert!(message.contains("priceRange"));
    }

    #[test]
    fn test_min_max_boundaries() {
        for (min, max, ok) in [(10.0, 5.0, false), (10.0, 10.0, true), (10.0, 20.0, true)] {
            let mut v = Validation::new();
            v.min_max("areaRange", min, max);
            assert_eq!(v.is_success(), ok, "min={} max={}", min, max);
        }
    }

    #[test]
    fn test_date_order() {
        let now = Utc::now();
        let mut v = Validation::new();
        v.date_order("dates", Some(now), Some(now + Duration::days(1)));
        v.date_order("dates", Some(now), None);
        assert!(v.is_success());
        v.date_order("dates", Some(now), Some(now));
        assert!(!v.is_success());
    }

    #[test]
    fn test_patterns() {
        assert!(is_valid_email("khach@example.vn"));
        assert!(!is_valid_email("khach@example"));
        assert!(is_valid_slug("sam-ngoc-linh-6-nam"));
        assert!(!is_valid_slug("-bad--slug"));

        let mut v = Validation::new();
        v.phone("phone", &normalize_phone("0912 345 678"));
        v.phone("phone", "+84912345678");
        v.hex_color("color", Some("#1A2b3C"));
        v.url("linkUrl", Some("/du-an"));
        v.url("linkUrl", Some("https://example.vn/a"));
        v.latitude("lat", Some(21.03));
        v.longitude("lng", Some(105.85));
        assert!(v.is_success());

        v.phone("phone", "12345");
        v.latitude("lat", Some(91.0));
        v.url("linkUrl", Some("javascript:alert(1)"));
        assert_eq!(v.failed_keys().count(), 3);
    }

    #[test]
    fn test_clean_helpers() {
        assert_eq!(clean("  Sâm  ".to_string()), "Sâm");
        assert_eq!(clean_opt(Some("   ".to_string())), None);
        assert_eq!(
            clean_list(vec![" a ".to_string(), "".to_string()]),
            vec!["a".to_string()]
        );
    }
}
