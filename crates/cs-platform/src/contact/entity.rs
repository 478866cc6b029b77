//! Contact Message Entity
//!
//! Submitted from the public contact form. Any status can follow any other;
//! moving to `replied` stamps `repliedAt`.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::middleware::ClientMeta;
use crate::shared::types::{nullable, to_rfc3339_opt, Note, NoteResponse, Priority};
use crate::shared::validation::{clean, clean_opt, normalize_phone, Validation};
use crate::{Result, TsidGenerator};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum InquiryType {
    #[default]
    General,
    Project,
    Product,
    Partnership,
    Careers,
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    #[default]
    New,
    Read,
    Replied,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    #[serde(rename = "_id")]
    pub id: String,

    pub name: String,

    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    pub message: String,

    pub inquiry_type: InquiryType,

    pub status: ContactStatus,

    pub priority: Priority,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime_optional"
    )]
    pub follow_up_date: Option<DateTime<Utc>>,

    /// Active user handling the message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,

    #[serde(default)]
    pub notes: Vec<Note>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime_optional"
    )]
    pub replied_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

/// Public contact form body
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateContactInput {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
    pub inquiry_type: Option<InquiryType>,
}

/// Admin triage fields
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateContactInput {
    pub inquiry_type: Option<InquiryType>,
    pub priority: Option<Priority>,
    pub status: Option<ContactStatus>,
    /// `null` clears the follow-up date
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub follow_up_date: Option<Option<DateTime<Utc>>>,
}

impl ContactMessage {
    pub fn create(input: CreateContactInput, client: ClientMeta, now: DateTime<Utc>) -> Result<Self> {
        let priority = Priority::default();
        let message = Self {
            id: TsidGenerator::generate(),
            name: clean(input.name),
            email: clean(input.email).to_lowercase(),
            phone: clean_opt(input.phone).map(|p| normalize_phone(&p)),
            subject: clean_opt(input.subject),
            message: input.message.trim().to_string(),
            inquiry_type: input.inquiry_type.unwrap_or_default(),
            status: ContactStatus::New,
            priority,
            follow_up_date: Some(now + priority.contact_window()),
            assigned_to: None,
            notes: Vec::new(),
            replied_at: None,
            ip_address: client.ip_address,
            user_agent: client.user_agent.map(|ua| ua.chars().take(500).collect()),
            created_at: now,
            updated_at: now,
            updated_by: None,
        };
        message.validate()?;
        Ok(message)
    }

    pub fn apply(&mut self, patch: UpdateContactInput, actor: Option<&str>, now: DateTime<Utc>) -> Result<()> {
        if let Some(kind) = patch.inquiry_type {
            self.inquiry_type = kind;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(follow_up) = patch.follow_up_date {
            self.follow_up_date = follow_up;
        }
        if let Some(status) = patch.status {
            self.set_status(status, now);
        }
        self.validate()?;
        self.touch(actor, now);
        Ok(())
    }

    pub fn set_status(&mut self, status: ContactStatus, now: DateTime<Utc>) {
        if status == ContactStatus::Replied && self.status != ContactStatus::Replied {
            self.replied_at = Some(now);
        }
        self.status = status;
    }

    pub fn change_status(&mut self, status: ContactStatus, actor: Option<&str>, now: DateTime<Utc>) {
        self.set_status(status, now);
        self.touch(actor, now);
    }

    /// `new` becomes `read` the first time staff open the message.
    pub fn mark_read(&mut self, now: DateTime<Utc>) -> bool {
        if self.status == ContactStatus::New {
            self.status = ContactStatus::Read;
            self.updated_at = now;
            true
        } else {
            false
        }
    }

    pub fn assign(&mut self, user_id: Option<String>, actor: Option<&str>, now: DateTime<Utc>) {
        self.assigned_to = user_id;
        self.touch(actor, now);
    }

    pub fn add_note(&mut self, content: String, actor: Option<&str>, now: DateTime<Utc>) -> Result<()> {
        self.notes.push(Note::new(content, actor, now)?);
        self.touch(actor, now);
        Ok(())
    }

    fn touch(&mut self, actor: Option<&str>, now: DateTime<Utc>) {
        self.updated_at = now;
        self.updated_by = actor.map(String::from).or(self.updated_by.take());
    }

    fn validate(&self) -> Result<()> {
        let mut v = Validation::new();
        v.text("name", &self.name, 2, 100);
        v.email("email", &self.email);
        v.phone_opt("phone", self.phone.as_deref());
        v.text_opt("subject", self.subject.as_deref(), 200);
        v.text("message", &self.message, 10, 5000);
        v.into_result()
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
    pub inquiry_type: InquiryType,
    pub status: ContactStatus,
    pub priority: Priority,
    pub follow_up_date: Option<String>,
    pub assigned_to: Option<String>,
    pub notes: Vec<NoteResponse>,
    pub replied_at: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ContactMessage> for ContactResponse {
    fn from(m: ContactMessage) -> Self {
        Self {
            id: m.id,
            name: m.name,
            email: m.email,
            phone: m.phone,
            subject: m.subject,
            message: m.message,
            inquiry_type: m.inquiry_type,
            status: m.status,
            priority: m.priority,
            follow_up_date: to_rfc3339_opt(m.follow_up_date),
            assigned_to: m.assigned_to,
            notes: m.notes.into_iter().map(Into::into).collect(),
            replied_at: to_rfc3339_opt(m.replied_at),
            ip_address: m.ip_address,
            user_agent: m.user_agent,
            created_at: m.created_at.to_rfc3339(),
            updated_at: m.updated_at.to_rfc3339(),
        }
    }
}

/// What the public submitter gets back
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactReceipt {
    pub id: String,
    pub created_at: String,
}

impl From<&ContactMessage> for ContactReceipt {
    fn from(m: &ContactMessage) -> Self {
        Self {
            id: m.id.clone(),
            created_at: m.created_at.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn input() -> CreateContactInput {
        CreateContactInput {
            name: "Trần Thị B".to_string(),
            email: " B.Tran@Example.COM ".to_string(),
            phone: Some("0912 345 678".to_string()),
            subject: Some("Hỏi giá".to_string()),
            message: "Tôi muốn biết thêm về dự án.".to_string(),
            inquiry_type: Some(InquiryType::Project),
        }
    }

    #[test]
    fn test_create_defaults() {
        let now = Utc::now();
        let client = ClientMeta { ip_address: Some("10.0.0.1".to_string()), user_agent: None };
        let message = ContactMessage::create(input(), client, now).unwrap();
        assert_eq!(message.email, "b.tran@example.com");
        assert_eq!(message.status, ContactStatus::New);
        assert_eq!(message.priority, Priority::Normal);
        assert_eq!(message.follow_up_date, Some(now + Duration::days(2)));
        assert_eq!(message.ip_address.as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn test_short_message_rejected() {
        let mut short = input();
        short.message = "hi".to_string();
        assert!(ContactMessage::create(short, ClientMeta::default(), Utc::now()).is_err());
    }

    #[test]
    fn test_mark_read_only_from_new() {
        let now = Utc::now();
        let mut message = ContactMessage::create(input(), ClientMeta::default(), now).unwrap();
        assert!(message.mark_read(now));
        assert!(!message.mark_read(now));
        message.change_status(ContactStatus::Closed, None, now);
        assert!(!message.mark_read(now));
    }

    #[test]
    fn test_replied_stamps_and_transitions_unrestricted() {
        let now = Utc::now();
        let mut message = ContactMessage::create(input(), ClientMeta::default(), now).unwrap();
        message.change_status(ContactStatus::Replied, Some("U1"), now);
        assert_eq!(message.replied_at, Some(now));
        message.change_status(ContactStatus::New, None, now);
        assert_eq!(message.status, ContactStatus::New);
        assert_eq!(message.updated_by.as_deref(), Some("U1"));
    }

    #[test]
    fn test_notes() {
        let now = Utc::now();
        let mut message = ContactMessage::create(input(), ClientMeta::default(), now).unwrap();
        message.add_note("Đã gọi lại".to_string(), Some("U1"), now).unwrap();
        assert!(message.add_note("   ".to_string(), Some("U1"), now).is_err());
        assert_eq!(message.notes.len(), 1);
    }

    #[test]
    fn test_clear_follow_up() {
        let now = Utc::now();
        let mut message = ContactMessage::create(input(), ClientMeta::default(), now).unwrap();
        message
            .apply(UpdateContactInput { follow_up_date: Some(None), ..Default::default() }, None, now)
            .unwrap();
        assert!(message.follow_up_date.is_none());
    }
}
