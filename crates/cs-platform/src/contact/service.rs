//! Contact Service

use std::sync::Arc;

use bson::Document;
use chrono::Utc;
use tracing::{info, warn};

use crate::activity::{ActivityAction, ActivityService};
use crate::contact::entity::{ContactMessage, ContactStatus, CreateContactInput, UpdateContactInput};
use crate::contact::repository::{ContactRepository, ContactStats};
use crate::shared::api_common::{Page, PageRequest};
use crate::shared::authorization_service::AuthContext;
use crate::shared::error::{PlatformError, Result};
use crate::shared::middleware::ClientMeta;
use crate::user::repository::UserRepository;

#[derive(Clone)]
pub struct ContactService {
    messages: Arc<ContactRepository>,
    users: Arc<UserRepository>,
    activity: ActivityService,
}

impl ContactService {
    pub fn new(messages: Arc<ContactRepository>, users: Arc<UserRepository>, activity: ActivityService) -> Self {
        Self {
            messages,
            users,
            activity,
        }
    }

    /// Public form submission.
    pub async fn submit(&self, input: CreateContactInput, client: ClientMeta) -> Result<ContactMessage> {
        let message = ContactMessage::create(input, client, Utc::now())?;
        self.messages.insert(&message).await?;
        info!(
            contact_id = %message.id,
            inquiry_type = ?message.inquiry_type,
            "Contact message received"
        );
        Ok(message)
    }

    pub async fn search(&self, filter: Document, page: PageRequest) -> Result<Page<ContactMessage>> {
        self.messages.search(filter, page).await
    }

    /// Admin detail view; the first one marks the message read.
    pub async fn open(&self, id: &str) -> Result<ContactMessage> {
        let mut message = self.messages.get(id).await?;
        if message.mark_read(Utc::now()) {
            if let Err(e) = self.messages.update(&message).await {
                warn!(contact_id = %message.id, error = %e, "Failed to mark contact message read");
            }
        }
        Ok(message)
    }

    pub async fn update(&self, id: &str, patch: UpdateContactInput, actor: &AuthContext) -> Result<ContactMessage> {
        let mut message = self.messages.get(id).await?;
        message.apply(patch, Some(actor.actor()), Utc::now())?;
        self.messages.update(&message).await?;
        self.activity
            .log(actor, ActivityAction::Update, "contact", &message.id, format!("Updated contact from {}", message.email))
            .await;
        Ok(message)
    }

    pub async fn change_status(&self, id: &str, status: ContactStatus, actor: &AuthContext) -> Result<ContactMessage> {
        let mut message = self.messages.get(id).await?;
        let previous = message.status;
        message.change_status(status, Some(actor.actor()), Utc::now());
        self.messages.update(&message).await?;
        self.activity
            .log(
                actor,
                ActivityAction::StatusChange,
                "contact",
                &message.id,
                format!("Contact status {:?} -> {:?}", previous, status),
            )
            .await;
        Ok(message)
    }

    /// `None` unassigns; otherwise the user must exist and be active.
    pub async fn assign(&self, id: &str, user_id: Option<String>, actor: &AuthContext) -> Result<ContactMessage> {
        let mut message = self.messages.get(id).await?;
        let assignee = self.resolve_assignee(user_id).await?;
        message.assign(assignee.clone(), Some(actor.actor()), Utc::now());
        self.messages.update(&message).await?;
        self.activity
            .log(
                actor,
                ActivityAction::Update,
                "contact",
                &message.id,
                match assignee {
                    Some(user) => format!("Assigned contact to {}", user),
                    None => "Unassigned contact".to_string(),
                },
            )
            .await;
        Ok(message)
    }

    pub async fn add_note(&self, id: &str, content: String, actor: &AuthContext) -> Result<ContactMessage> {
        let mut message = self.messages.get(id).await?;
        message.add_note(content, Some(actor.actor()), Utc::now())?;
        self.messages.update(&message).await?;
        Ok(message)
    }

    pub async fn delete(&self, id: &str, actor: &AuthContext) -> Result<()> {
        let message = self.messages.get(id).await?;
        self.messages.delete(&message.id).await?;
        self.activity
            .log(actor, ActivityAction::Delete, "contact", &message.id, format!("Deleted contact from {}", message.email))
            .await;
        Ok(())
    }

    pub async fn stats(&self) -> Result<ContactStats> {
        self.messages.stats(Utc::now()).await
    }

    pub async fn count(&self, filter: Document) -> Result<u64> {
        self.messages.count(filter).await
    }

    async fn resolve_assignee(&self, user_id: Option<String>) -> Result<Option<String>> {
        let Some(user_id) = user_id.map(|u| u.trim().to_uppercase()).filter(|u| !u.is_empty()) else {
            return Ok(None);
        };
        match self.users.find_active_by_id(&user_id).await? {
            Some(user) => Ok(Some(user.id)),
            None => Err(PlatformError::validation(format!(
                "assignedTo: user {} does not exist or is not active",
                user_id
            ))),
        }
    }
}
