//! Newsletter Subscriber Entity
//!
//! One record per email address. Unsubscribing keeps the record so the
//! address can come back later; subscribing again reactivates it.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::middleware::ClientMeta;
use crate::shared::types::to_rfc3339_opt;
use crate::shared::validation::{clean_opt, Validation};
use crate::{Result, TsidGenerator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Interest {
    Projects,
    Ginseng,
    News,
    Careers,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubscriberStatus {
    #[default]
    Active,
    Unsubscribed,
    Bounced,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterSubscriber {
    #[serde(rename = "_id")]
    pub id: String,

    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub interests: Vec<Interest>,

    pub status: SubscriberStatus,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub subscribed_at: DateTime<Utc>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime_optional"
    )]
    pub unsubscribed_at: Option<DateTime<Utc>>,

    /// Where the sign-up came from (footer, popup, news page...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SubscribeInput {
    pub email: String,
    pub name: Option<String>,
    pub interests: Option<Vec<Interest>>,
    pub source: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UnsubscribeInput {
    pub email: String,
}

/// Interests sorted and de-duplicated.
fn normalize_interests(mut interests: Vec<Interest>) -> Vec<Interest> {
    interests.sort();
    interests.dedup();
    interests
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl NewsletterSubscriber {
    pub fn create(input: SubscribeInput, client: ClientMeta, now: DateTime<Utc>) -> Result<Self> {
        let subscriber = Self {
            id: TsidGenerator::generate(),
            email: normalize_email(&input.email),
            name: clean_opt(input.name),
            interests: normalize_interests(input.interests.unwrap_or_default()),
            status: SubscriberStatus::Active,
            subscribed_at: now,
            unsubscribed_at: None,
            source: clean_opt(input.source),
            ip_address: client.ip_address,
            created_at: now,
            updated_at: now,
            updated_by: None,
        };
        subscriber.validate()?;
        Ok(subscriber)
    }

    /// Reactivate an existing address. Name and interests are replaced only
    /// when the new sign-up supplies them.
    pub fn resubscribe(&mut self, input: SubscribeInput, now: DateTime<Utc>) -> Result<()> {
        if let Some(name) = clean_opt(input.name) {
            self.name = Some(name);
        }
        if let Some(interests) = input.interests {
            self.interests = normalize_interests(interests);
        }
        if let Some(source) = clean_opt(input.source) {
            self.source = Some(source);
        }
        if self.status != SubscriberStatus::Active {
            self.status = SubscriberStatus::Active;
            self.subscribed_at = now;
            self.unsubscribed_at = None;
        }
        self.validate()?;
        self.updated_at = now;
        Ok(())
    }

    pub fn set_status(&mut self, status: SubscriberStatus, now: DateTime<Utc>) {
        match status {
            SubscriberStatus::Unsubscribed if self.status != SubscriberStatus::Unsubscribed => {
                self.unsubscribed_at = Some(now);
            }
            SubscriberStatus::Active if self.status != SubscriberStatus::Active => {
                self.subscribed_at = now;
                self.unsubscribed_at = None;
            }
            _ => {}
        }
        self.status = status;
    }

    pub fn change_status(&mut self, status: SubscriberStatus, actor: Option<&str>, now: DateTime<Utc>) {
        self.set_status(status, now);
        self.updated_at = now;
        self.updated_by = actor.map(String::from).or(self.updated_by.take());
    }

    pub fn is_active(&self) -> bool {
        self.status == SubscriberStatus::Active
    }

    fn validate(&self) -> Result<()> {
        let mut v = Validation::new();
        v.email("email", &self.email);
        v.text_opt("name", self.name.as_deref(), 100);
        v.text_opt("source", self.source.as_deref(), 50);
        v.into_result()
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberResponse {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub interests: Vec<Interest>,
    pub status: SubscriberStatus,
    pub subscribed_at: String,
    pub unsubscribed_at: Option<String>,
    pub source: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<NewsletterSubscriber> for SubscriberResponse {
    fn from(s: NewsletterSubscriber) -> Self {
        Self {
            id: s.id,
            email: s.email,
            name: s.name,
            interests: s.interests,
            status: s.status,
            subscribed_at: s.subscribed_at.to_rfc3339(),
            unsubscribed_at: to_rfc3339_opt(s.unsubscribed_at),
            source: s.source,
            created_at: s.created_at.to_rfc3339(),
            updated_at: s.updated_at.to_rfc3339(),
        }
    }
}

/// Public view after subscribing: no ids or audit data.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionReceipt {
    pub email: String,
    pub interests: Vec<Interest>,
    pub subscribed_at: String,
}

impl From<&NewsletterSubscriber> for SubscriptionReceipt {
    fn from(s: &NewsletterSubscriber) -> Self {
        Self {
            email: s.email.clone(),
            interests: s.interests.clone(),
            subscribed_at: s.subscribed_at.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn input() -> SubscribeInput {
        SubscribeInput {
            email: " Reader@Example.com ".to_string(),
            name: Some("Reader".to_string()),
            interests: Some(vec![Interest::News, Interest::Projects, Interest::News]),
            source: Some("footer".to_string()),
        }
    }

    #[test]
    fn test_create_normalizes() {
        let s = NewsletterSubscriber::create(input(), ClientMeta::default(), Utc::now()).unwrap();
        assert_eq!(s.email, "reader@example.com");
        assert_eq!(s.interests, vec![Interest::Projects, Interest::News]);
        assert!(s.is_active());
        assert!(s.unsubscribed_at.is_none());
    }

    #[test]
    fn test_invalid_email_rejected() {
        let mut bad = input();
        bad.email = "not-an-email".to_string();
        assert!(NewsletterSubscriber::create(bad, ClientMeta::default(), Utc::now()).is_err());
    }

    #[test]
    fn test_unsubscribe_then_resubscribe() {
        let t0 = Utc::now();
        let mut s = NewsletterSubscriber::create(input(), ClientMeta::default(), t0).unwrap();
        let t1 = t0 + Duration::days(1);
        s.change_status(SubscriberStatus::Unsubscribed, None, t1);
        assert_eq!(s.unsubscribed_at, Some(t1));

        let t2 = t1 + Duration::days(1);
        let again = SubscribeInput { email: s.email.clone(), name: None, interests: None, source: None };
        s.resubscribe(again, t2).unwrap();
        assert!(s.is_active());
        assert_eq!(s.subscribed_at, t2);
        assert!(s.unsubscribed_at.is_none());
        assert_eq!(s.name.as_deref(), Some("Reader"));
        assert_eq!(s.interests.len(), 2);
    }

    #[test]
    fn test_repeat_unsubscribe_keeps_first_stamp() {
        let t0 = Utc::now();
        let mut s = NewsletterSubscriber::create(input(), ClientMeta::default(), t0).unwrap();
        s.set_status(SubscriberStatus::Unsubscribed, t0);
        s.set_status(SubscriberStatus::Unsubscribed, t0 + Duration::hours(1));
        assert_eq!(s.unsubscribed_at, Some(t0));
    }

    #[test]
    fn test_unknown_interest_rejected() {
        let body = r#"{"email":"a@b.vn","interests":["sports"]}"#;
        assert!(serde_json::from_str::<SubscribeInput>(body).is_err());
    }
}
