//! Consultation Request Entity
//!
//! Sales leads. Lifecycle `new → contacted → qualified → converted | lost →
//! closed`, though any status may follow any other. A follow-up deadline is
//! scheduled from the priority when the request is created without one.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use bson::{doc, Bson, Document};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::middleware::ClientMeta;
use crate::shared::query::to_bson_datetime;
use crate::shared::types::{nullable, to_rfc3339_opt, Note, NoteResponse, NumberRange, Priority};
use crate::shared::validation::{clean, clean_opt, normalize_phone, Validation};
use crate::{Result, TsidGenerator};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationType {
    #[default]
    Project,
    Product,
    Investment,
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PreferredContact {
    #[default]
    Phone,
    Email,
    Zalo,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationStatus {
    #[default]
    New,
    Contacted,
    Qualified,
    Converted,
    Lost,
    Closed,
}

impl ConsultationStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Converted | Self::Lost | Self::Closed)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LeadSource {
    #[default]
    Website,
    Hotline,
    Facebook,
    Zalo,
    Referral,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationRequest {
    #[serde(rename = "_id")]
    pub id: String,

    pub full_name: String,

    pub email: String,

    pub phone: String,

    pub consultation_type: ConsultationType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,

    pub preferred_contact: PreferredContact,

    /// Free text, e.g. "weekday mornings"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<NumberRange>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    pub status: ConsultationStatus,

    pub priority: Priority,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime_optional"
    )]
    pub follow_up_date: Option<DateTime<Utc>>,

    /// Stamped whenever the status moves to `contacted`
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime_optional"
    )]
    pub last_contact_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,

    #[serde(default)]
    pub notes: Vec<Note>,

    pub source: LeadSource,

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

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateConsultationInput {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub consultation_type: Option<ConsultationType>,
    pub project_id: Option<String>,
    pub product_id: Option<String>,
    pub preferred_contact: Option<PreferredContact>,
    pub preferred_time: Option<String>,
    pub budget: Option<NumberRange>,
    pub message: Option<String>,
    pub priority: Option<Priority>,
    pub follow_up_date: Option<DateTime<Utc>>,
    pub source: Option<LeadSource>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateConsultationInput {
    pub consultation_type: Option<ConsultationType>,
    pub preferred_contact: Option<PreferredContact>,
    pub preferred_time: Option<String>,
    pub budget: Option<NumberRange>,
    pub status: Option<ConsultationStatus>,
    pub priority: Option<Priority>,
    /// `null` clears the follow-up date
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub follow_up_date: Option<Option<DateTime<Utc>>>,
    pub source: Option<LeadSource>,
}

impl ConsultationRequest {
    pub fn create(input: CreateConsultationInput, client: ClientMeta, now: DateTime<Utc>) -> Result<Self> {
        let priority = input.priority.unwrap_or_default();
        let request = Self {
            id: TsidGenerator::generate(),
            full_name: clean(input.full_name),
            email: clean(input.email).to_lowercase(),
            phone: normalize_phone(input.phone.trim()),
            consultation_type: input.consultation_type.unwrap_or_default(),
            project_id: clean_opt(input.project_id).map(|id| id.to_uppercase()),
            product_id: clean_opt(input.product_id).map(|id| id.to_uppercase()),
            preferred_contact: input.preferred_contact.unwrap_or_default(),
            preferred_time: clean_opt(input.preferred_time),
            budget: input.budget,
            message: clean_opt(input.message),
            status: ConsultationStatus::New,
            priority,
            follow_up_date: Some(input.follow_up_date.unwrap_or(now + priority.consultation_window())),
            last_contact_at: None,
            assigned_to: None,
            notes: Vec::new(),
            source: input.source.unwrap_or_default(),
            ip_address: client.ip_address,
            user_agent: client.user_agent.map(|ua| ua.chars().take(500).collect()),
            created_at: now,
            updated_at: now,
            updated_by: None,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn apply(&mut self, patch: UpdateConsultationInput, actor: Option<&str>, now: DateTime<Utc>) -> Result<()> {
        if let Some(kind) = patch.consultation_type {
            self.consultation_type = kind;
        }
        if let Some(contact) = patch.preferred_contact {
            self.preferred_contact = contact;
        }
        if let Some(time) = patch.preferred_time {
            self.preferred_time = clean_opt(Some(time));
        }
        if let Some(budget) = patch.budget {
            self.budget = Some(budget);
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(follow_up) = patch.follow_up_date {
            self.follow_up_date = follow_up;
        }
        if let Some(source) = patch.source {
            self.source = source;
        }
        if let Some(status) = patch.status {
            self.set_status(status, now);
        }
        self.validate()?;
        self.touch(actor, now);
        Ok(())
    }

    pub fn set_status(&mut self, status: ConsultationStatus, now: DateTime<Utc>) {
        if status == ConsultationStatus::Contacted {
            self.last_contact_at = Some(now);
        }
        self.status = status;
    }

    pub fn change_status(&mut self, status: ConsultationStatus, actor: Option<&str>, now: DateTime<Utc>) {
        self.set_status(status, now);
        self.touch(actor, now);
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

    /// Open and past its follow-up date.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.status.is_terminal() && self.follow_up_date.is_some_and(|at| at < now)
    }

    fn touch(&mut self, actor: Option<&str>, now: DateTime<Utc>) {
        self.updated_at = now;
        self.updated_by = actor.map(String::from).or(self.updated_by.take());
    }

    fn validate(&self) -> Result<()> {
        let mut v = Validation::new();
        v.text("fullName", &self.full_name, 2, 100);
        v.email("email", &self.email);
        v.phone("phone", &self.phone);
        for (key, id) in [("projectId", &self.project_id), ("productId", &self.product_id)] {
            if id.as_deref().is_some_and(|id| !TsidGenerator::is_valid(id)) {
                v.record(key, "must be a valid id");
            }
        }
        v.text_opt("preferredTime", self.preferred_time.as_deref(), 100);
        if let Some(budget) = &self.budget {
            budget.validate("budget", 0.0, &mut v);
        }
        v.text_opt("message", self.message.as_deref(), 2000);
        v.into_result()
    }
}

/// Filter for open requests past their follow-up date.
pub fn overdue_filter(now: DateTime<Utc>) -> Document {
    let terminal: Vec<Bson> = ["converted", "lost", "closed"].iter().map(|s| Bson::from(*s)).collect();
    doc! {
        "followUpDate": { "$lt": to_bson_datetime(now) },
        "status": { "$nin": terminal },
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationResponse {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub consultation_type: ConsultationType,
    pub project_id: Option<String>,
    pub product_id: Option<String>,
    pub preferred_contact: PreferredContact,
    pub preferred_time: Option<String>,
    pub budget: Option<NumberRange>,
    pub message: Option<String>,
    pub status: ConsultationStatus,
    pub priority: Priority,
    pub follow_up_date: Option<String>,
    pub is_overdue: bool,
    pub last_contact_at: Option<String>,
    pub assigned_to: Option<String>,
    pub notes: Vec<NoteResponse>,
    pub source: LeadSource,
    pub ip_address: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ConsultationRequest> for ConsultationResponse {
    fn from(c: ConsultationRequest) -> Self {
        Self {
            is_overdue: c.is_overdue(Utc::now()),
            id: c.id,
            full_name: c.full_name,
            email: c.email,
            phone: c.phone,
            consultation_type: c.consultation_type,
            project_id: c.project_id,
            product_id: c.product_id,
            preferred_contact: c.preferred_contact,
            preferred_time: c.preferred_time,
            budget: c.budget,
            message: c.message,
            status: c.status,
            priority: c.priority,
            follow_up_date: to_rfc3339_opt(c.follow_up_date),
            last_contact_at: to_rfc3339_opt(c.last_contact_at),
            assigned_to: c.assigned_to,
            notes: c.notes.into_iter().map(Into::into).collect(),
            source: c.source,
            ip_address: c.ip_address,
            created_at: c.created_at.to_rfc3339(),
            updated_at: c.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationReceipt {
    pub id: String,
    pub follow_up_date: Option<String>,
}

impl From<&ConsultationRequest> for ConsultationReceipt {
    fn from(c: &ConsultationRequest) -> Self {
        Self {
            id: c.id.clone(),
            follow_up_date: to_rfc3339_opt(c.follow_up_date),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn input(priority: Option<Priority>) -> CreateConsultationInput {
        CreateConsultationInput {
            full_name: "Lê Văn C".to_string(),
            email: "c@example.com".to_string(),
            phone: "+84 912 345 678".to_string(),
            consultation_type: None,
            project_id: None,
            product_id: None,
            preferred_contact: Some(PreferredContact::Zalo),
            preferred_time: None,
            budget: Some(NumberRange { min: 2e9, max: 3e9 }),
            message: None,
            priority,
            follow_up_date: None,
            source: None,
        }
    }

    #[test]
    fn test_follow_up_from_priority() {
        let now = Utc::now();
        let urgent = ConsultationRequest::create(input(Some(Priority::Urgent)), ClientMeta::default(), now).unwrap();
        assert_eq!(urgent.follow_up_date, Some(now + Duration::hours(2)));
        let low = ConsultationRequest::create(input(Some(Priority::Low)), ClientMeta::default(), now).unwrap();
        assert_eq!(low.follow_up_date, Some(now + Duration::days(7)));
        let normal = ConsultationRequest::create(input(None), ClientMeta::default(), now).unwrap();
        assert_eq!(normal.follow_up_date, Some(now + Duration::days(3)));
    }

    #[test]
    fn test_explicit_follow_up_kept() {
        let now = Utc::now();
        let mut explicit = input(Some(Priority::Urgent));
        explicit.follow_up_date = Some(now + Duration::days(10));
        let request = ConsultationRequest::create(explicit, ClientMeta::default(), now).unwrap();
        assert_eq!(request.follow_up_date, Some(now + Duration::days(10)));
    }

    #[test]
    fn test_phone_required_and_budget_order() {
        let mut missing = input(None);
        missing.phone = "  ".to_string();
        assert!(ConsultationRequest::create(missing, ClientMeta::default(), Utc::now()).is_err());

        let mut inverted = input(None);
        inverted.budget = Some(NumberRange { min: 3e9, max: 2e9 });
        assert!(ConsultationRequest::create(inverted, ClientMeta::default(), Utc::now()).is_err());
    }

    #[test]
    fn test_contacted_stamps_last_contact() {
        let now = Utc::now();
        let mut request = ConsultationRequest::create(input(None), ClientMeta::default(), now).unwrap();
        assert_eq!(request.phone, "+84912345678");
        request.change_status(ConsultationStatus::Contacted, Some("U1"), now);
        assert_eq!(request.last_contact_at, Some(now));

        // any status may follow any other
        request.change_status(ConsultationStatus::Closed, None, now);
        request.change_status(ConsultationStatus::New, None, now);
        assert_eq!(request.status, ConsultationStatus::New);
    }

    #[test]
    fn test_overdue() {
        let now = Utc::now();
        let request = ConsultationRequest::create(input(Some(Priority::Urgent)), ClientMeta::default(), now).unwrap();
        assert!(!request.is_overdue(now));
        assert!(request.is_overdue(now + Duration::hours(3)));

        let mut converted = request.clone();
        converted.change_status(ConsultationStatus::Converted, None, now);
        assert!(!converted.is_overdue(now + Duration::hours(3)));
    }

    #[test]
    fn test_overdue_filter_excludes_terminal() {
        let filter = overdue_filter(Utc::now());
        let nin = filter.get_document("status").unwrap().get_array("$nin").unwrap();
        assert_eq!(nin.len(), 3);
    }
}
