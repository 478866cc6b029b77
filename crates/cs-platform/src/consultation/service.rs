//! Consultation Service

use std::sync::Arc;

use bson::Document;
use chrono::Utc;
use tracing::info;

use crate::activity::{ActivityAction, ActivityService};
use crate::consultation::entity::{
    ConsultationRequest, ConsultationStatus, CreateConsultationInput, UpdateConsultationInput,
};
use crate::consultation::repository::{ConsultationRepository, ConsultationStats};
use crate::shared::api_common::{Page, PageRequest};
use crate::shared::authorization_service::AuthContext;
use crate::shared::error::{PlatformError, Result};
use crate::shared::middleware::ClientMeta;
use crate::user::repository::UserRepository;

#[derive(Clone)]
pub struct ConsultationService {
    requests: Arc<ConsultationRepository>,
    users: Arc<UserRepository>,
    activity: ActivityService,
}

impl ConsultationService {
    pub fn new(requests: Arc<ConsultationRepository>, users: Arc<UserRepository>, activity: ActivityService) -> Self {
        Self {
            requests,
            users,
            activity,
        }
    }

    pub async fn submit(&self, input: CreateConsultationInput, client: ClientMeta) -> Result<ConsultationRequest> {
        let request = ConsultationRequest::create(input, client, Utc::now())?;
        self.requests.insert(&request).await?;
        info!(
            consultation_id = %request.id,
            priority = ?request.priority,
            source = ?request.source,
            "Consultation request received"
        );
        Ok(request)
    }

    pub async fn search(&self, filter: Document, page: PageRequest) -> Result<Page<ConsultationRequest>> {
        self.requests.search(filter, page).await
    }

    pub async fn overdue(&self, page: PageRequest) -> Result<Page<ConsultationRequest>> {
        self.requests.overdue(Utc::now(), page).await
    }

    pub async fn get(&self, id: &str) -> Result<ConsultationRequest> {
        self.requests.get(id).await
    }

    pub async fn update(
        &self,
        id: &str,
        patch: UpdateConsultationInput,
        actor: &AuthContext,
    ) -> Result<ConsultationRequest> {
        let mut request = self.requests.get(id).await?;
        request.apply(patch, Some(actor.actor()), Utc::now())?;
        self.requests.update(&request).await?;
        self.activity
            .log(
                actor,
                ActivityAction::Update,
                "consultation",
                &request.id,
                format!("Updated consultation for {}", request.full_name),
            )
            .await;
        Ok(request)
    }

    pub async fn change_status(
        &self,
        id: &str,
        status: ConsultationStatus,
        actor: &AuthContext,
    ) -> Result<ConsultationRequest> {
        let mut request = self.requests.get(id).await?;
        let previous = request.status;
        request.change_status(status, Some(actor.actor()), Utc::now());
        self.requests.update(&request).await?;
        self.activity
            .log(
                actor,
                ActivityAction::StatusChange,
                "consultation",
                &request.id,
                format!("Consultation status {:?} -> {:?}", previous, status),
            )
            .await;
        Ok(request)
    }

    pub async fn assign(&self, id: &str, user_id: Option<String>, actor: &AuthContext) -> Result<ConsultationRequest> {
        let mut request = self.requests.get(id).await?;
        let assignee = match user_id.map(|u| u.trim().to_uppercase()).filter(|u| !u.is_empty()) {
            Some(user_id) => match self.users.find_active_by_id(&user_id).await? {
                Some(user) => Some(user.id),
                None => {
                    return Err(PlatformError::validation(format!(
                        "assignedTo: user {} does not exist or is not active",
                        user_id
                    )))
                }
            },
            None => None,
        };

        request.assign(assignee.clone(), Some(actor.actor()), Utc::now());
        self.requests.update(&request).await?;
        self.activity
            .log(
                actor,
                ActivityAction::Update,
                "consultation",
                &request.id,
                match assignee {
                    Some(user) => format!("Assigned consultation to {}", user),
                    None => "Unassigned consultation".to_string(),
                },
            )
            .await;
        Ok(request)
    }

    pub async fn add_note(&self, id: &str, content: String, actor: &AuthContext) -> Result<ConsultationRequest> {
        let mut request = self.requests.get(id).await?;
        request.add_note(content, Some(actor.actor()), Utc::now())?;
        self.requests.update(&request).await?;
        Ok(request)
    }

    pub async fn delete(&self, id: &str, actor: &AuthContext) -> Result<()> {
        let request = self.requests.get(id).await?;
        self.requests.delete(&request.id).await?;
        self.activity
            .log(
                actor,
                ActivityAction::Delete,
                "consultation",
                &request.id,
                format!("Deleted consultation for {}", request.full_name),
            )
            .await;
        Ok(())
    }

    pub async fn stats(&self) -> Result<ConsultationStats> {
        self.requests.stats(Utc::now()).await
    }

    pub async fn count(&self, filter: Document) -> Result<u64> {
        self.requests.count(filter).await
    }
}
