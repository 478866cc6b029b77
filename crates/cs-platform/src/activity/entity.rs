//! Activity Log Entity
//!
//! Append-only record of back-office actions. Rows expire after a year
//! (TTL index on `createdAt`).

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use bson::Document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::authorization_service::AuthContext;
use crate::shared::middleware::ClientMeta;
use crate::TsidGenerator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Create,
    Update,
    Delete,
    Login,
    Logout,
    Upload,
    Publish,
    StatusChange,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,

    pub action: ActivityAction,

    /// Entity kind, e.g. `project`
    pub resource_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,

    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Document>,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl ActivityLog {
    pub fn new(action: ActivityAction, resource_type: &str, description: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: TsidGenerator::generate(),
            user_id: None,
            user_email: None,
            action,
            resource_type: resource_type.to_string(),
            resource_id: None,
            description: description.into(),
            ip_address: None,
            user_agent: None,
            metadata: None,
            created_at: now,
        }
    }

    pub fn by(mut self, actor: &AuthContext) -> Self {
        self.user_id = Some(actor.user_id.clone());
        self.user_email = Some(actor.email.clone());
        self
    }

    pub fn by_user(mut self, user_id: &str, email: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self.user_email = Some(email.to_string());
        self
    }

    pub fn on(mut self, resource_id: &str) -> Self {
        self.resource_id = Some(resource_id.to_string());
        self
    }

    pub fn from_client(mut self, meta: &ClientMeta) -> Self {
        self.ip_address = meta.ip_address.clone();
        self.user_agent = meta.user_agent.clone();
        self
    }

    pub fn with_metadata(mut self, metadata: Document) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogResponse {
    pub id: String,
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub action: ActivityAction,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub description: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<serde_json::Value>,
    pub created_at: String,
}

impl From<ActivityLog> for ActivityLogResponse {
    fn from(a: ActivityLog) -> Self {
        Self {
            id: a.id,
            user_id: a.user_id,
            user_email: a.user_email,
            action: a.action,
            resource_type: a.resource_type,
            resource_id: a.resource_id,
            description: a.description,
            ip_address: a.ip_address,
            user_agent: a.user_agent,
            metadata: a.metadata.map(|m| bson::Bson::Document(m).into_relaxed_extjson()),
            created_at: a.created_at.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn test_builder() {
        let meta = ClientMeta {
            ip_address: Some("127.0.0.1".to_string()),
            user_agent: None,
        };
        let log = ActivityLog::new(ActivityAction::Publish, "news_article", "Published article", Utc::now())
            .by_user("0HZXEQ5Y8JY5Z", "editor@example.vn")
            .on("0HZXEQ5Y8JY60")
            .from_client(&meta)
            .with_metadata(doc! { "title": "Mở bán đợt 2" });

        assert_eq!(log.resource_id.as_deref(), Some("0HZXEQ5Y8JY60"));
        assert_eq!(log.ip_address.as_deref(), Some("127.0.0.1"));

        let response = ActivityLogResponse::from(log);
        assert_eq!(response.metadata.unwrap()["title"], "Mở bán đợt 2");
        let json = serde_json::to_value(&response.action).unwrap();
        assert_eq!(json, "publish");
    }
}
