//! Analytics Event Entity
//!
//! One row per tracked front-end event. Rows expire after two years
//! (TTL index on `createdAt`).

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::middleware::ClientMeta;
use crate::shared::validation::{clean, clean_opt, Validation};
use crate::{Result, TsidGenerator};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    #[default]
    PageView,
    Click,
    FormSubmit,
    Download,
    Search,
    Share,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    Desktop,
    Mobile,
    Tablet,
    #[default]
    Other,
}

impl Device {
    /// Coarse device class from a user agent string.
    pub fn from_user_agent(user_agent: Option<&str>) -> Self {
        let Some(ua) = user_agent.map(str::to_lowercase) else {
            return Device::Other;
        };
        if ua.contains("ipad") || ua.contains("tablet") || (ua.contains("android") && !ua.contains("mobile")) {
            Device::Tablet
        } else if ua.contains("mobi") || ua.contains("iphone") || ua.contains("ipod") {
            Device::Mobile
        } else if ua.contains("windows") || ua.contains("macintosh") || ua.contains("x11") || ua.contains("linux") {
            Device::Desktop
        } else {
            Device::Other
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    #[serde(rename = "_id")]
    pub id: String,

    pub event_type: EventType,

    /// Path of the page the event happened on
    pub page: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,

    pub session_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,

    pub device: Device,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /analytics/track`
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TrackEventInput {
    pub event_type: EventType,
    pub page: String,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub session_id: String,
    pub referrer: Option<String>,
    /// Overrides the class inferred from the user agent
    pub device: Option<Device>,
}

impl AnalyticsEvent {
    pub fn create(input: TrackEventInput, client: ClientMeta, now: DateTime<Utc>) -> Result<Self> {
        let event = Self {
            id: TsidGenerator::generate(),
            event_type: input.event_type,
            page: clean(input.page),
            resource_type: clean_opt(input.resource_type).map(|t| t.to_lowercase()),
            resource_id: clean_opt(input.resource_id),
            session_id: clean(input.session_id),
            referrer: clean_opt(input.referrer),
            device: input
                .device
                .unwrap_or_else(|| Device::from_user_agent(client.user_agent.as_deref())),
            user_agent: client.user_agent,
            ip_address: client.ip_address,
            created_at: now,
        };
        event.validate()?;
        Ok(event)
    }

    fn validate(&self) -> Result<()> {
        let mut v = Validation::new();
        v.text("page", &self.page, 1, 500);
        v.text("sessionId", &self.session_id, 1, 100);
        v.text_opt("resourceType", self.resource_type.as_deref(), 50);
        v.text_opt("resourceId", self.resource_id.as_deref(), 100);
        v.text_opt("referrer", self.referrer.as_deref(), 500);
        v.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> TrackEventInput {
        TrackEventInput {
            event_type: EventType::PageView,
            page: " /du-an/sunrise ".to_string(),
            resource_type: Some("Project".to_string()),
            resource_id: None,
            session_id: "s-1".to_string(),
            referrer: None,
            device: None,
        }
    }

    #[test]
    fn test_device_detection() {
        let iphone = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) Mobile/15E148";
        let ipad = "Mozilla/5.0 (iPad; CPU OS 17_0 like Mac OS X)";
        let android_tab = "Mozilla/5.0 (Linux; Android 13; SM-X700) AppleWebKit/537.36";
        let android_phone = "Mozilla/5.0 (Linux; Android 13; Pixel 7) Mobile Safari/537.36";
        let desktop = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";
        assert_eq!(Device::from_user_agent(Some(iphone)), Device::Mobile);
        assert_eq!(Device::from_user_agent(Some(ipad)), Device::Tablet);
        assert_eq!(Device::from_user_agent(Some(android_tab)), Device::Tablet);
        assert_eq!(Device::from_user_agent(Some(android_phone)), Device::Mobile);
        assert_eq!(Device::from_user_agent(Some(desktop)), Device::Desktop);
        assert_eq!(Device::from_user_agent(Some("curl/8.0")), Device::Other);
        assert_eq!(Device::from_user_agent(None), Device::Other);
    }

    #[test]
    fn test_create_cleans_and_infers_device() {
        let client = ClientMeta {
            ip_address: Some("10.0.0.1".to_string()),
            user_agent: Some("Mozilla/5.0 (Macintosh; Intel Mac OS X 14_0)".to_string()),
        };
        let event = AnalyticsEvent::create(input(), client, Utc::now()).unwrap();
        assert_eq!(event.page, "/du-an/sunrise");
        assert_eq!(event.resource_type.as_deref(), Some("project"));
        assert_eq!(event.device, Device::Desktop);
    }

    #[test]
    fn test_explicit_device_wins() {
        let mut input = input();
        input.device = Some(Device::Tablet);
        let event = AnalyticsEvent::create(input, ClientMeta::default(), Utc::now()).unwrap();
        assert_eq!(event.device, Device::Tablet);
    }

    #[test]
    fn test_session_required() {
        let mut input = input();
        input.session_id = "  ".to_string();
        let err = AnalyticsEvent::create(input, ClientMeta::default(), Utc::now()).unwrap_err();
        assert!(err.to_string().contains("sessionId"));
    }
}
