//! Activity Service
//!
//! Records back-office actions. Recording never fails the calling request:
//! storage errors are logged and dropped.

use std::sync::Arc;

use bson::Document;
use chrono::Utc;
use tracing::warn;

use crate::activity::entity::{ActivityAction, ActivityLog};
use crate::activity::repository::ActivityRepository;
use crate::shared::api_common::{Page, PageRequest};
use crate::shared::authorization_service::AuthContext;
use crate::shared::error::Result;

#[derive(Clone)]
pub struct ActivityService {
    repo: Arc<ActivityRepository>,
}

impl ActivityService {
    pub fn new(repo: Arc<ActivityRepository>) -> Self {
        Self { repo }
    }

    /// Persist an entry; failures are logged, not returned.
    pub async fn record(&self, entry: ActivityLog) {
        if let Err(e) = self.repo.insert(&entry).await {
            warn!(
                action = ?entry.action,
                resource_type = %entry.resource_type,
                error = %e,
                "Failed to record activity"
            );
        }
    }

    /// Shorthand for an action by an authenticated back-office user.
    pub async fn log(
        &self,
        actor: &AuthContext,
        action: ActivityAction,
        resource_type: &str,
        resource_id: &str,
        description: impl Into<String>,
    ) {
        let entry = ActivityLog::new(action, resource_type, description, Utc::now())
            .by(actor)
            .on(resource_id);
        self.record(entry).await;
    }

    pub async fn get(&self, id: &str) -> Result<ActivityLog> {
        self.repo.get(id).await
    }

    pub async fn search(&self, filter: Document, page: PageRequest) -> Result<Page<ActivityLog>> {
        self.repo.search(filter, page).await
    }

    pub async fn recent(&self, limit: i64) -> Result<Vec<ActivityLog>> {
        self.repo.recent(limit).await
    }
}
