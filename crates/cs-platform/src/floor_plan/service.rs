//! Floor Plan Service

use std::sync::Arc;

use bson::{doc, Document};
use chrono::Utc;

use crate::activity::{ActivityAction, ActivityService};
use crate::floor_plan::entity::{CreateFloorPlanInput, FloorPlan, UpdateFloorPlanInput};
use crate::floor_plan::repository::FloorPlanRepository;
use crate::project::repository::ProjectRepository;
use crate::shared::api_common::{Page, PageRequest};
use crate::shared::authorization_service::AuthContext;
use crate::shared::error::{PlatformError, Result};
use crate::shared::query::with_public_visibility;

#[derive(Clone)]
pub struct FloorPlanService {
    plans: Arc<FloorPlanRepository>,
    projects: Arc<ProjectRepository>,
    activity: ActivityService,
}

impl FloorPlanService {
    pub fn new(plans: Arc<FloorPlanRepository>, projects: Arc<ProjectRepository>, activity: ActivityService) -> Self {
        Self {
            plans,
            projects,
            activity,
        }
    }

    pub async fn search(&self, filter: Document, page: PageRequest) -> Result<Page<FloorPlan>> {
        self.plans.search(filter, page).await
    }

    /// Active plans of a project, in layout order.
    pub async fn list_public_for_project(&self, project_id: &str) -> Result<Vec<FloorPlan>> {
        let filter = with_public_visibility::<FloorPlan>(doc! { "projectId": project_id }, Utc::now());
        self.plans.find_many(filter).await
    }

    pub async fn get(&self, id: &str) -> Result<FloorPlan> {
        self.plans.get(id).await
    }

    pub async fn create(&self, input: CreateFloorPlanInput, actor: &AuthContext) -> Result<FloorPlan> {
        let plan = FloorPlan::create(input, Some(actor.actor()), Utc::now())?;
        self.ensure_project(&plan.project_id).await?;

        self.plans.insert(&plan).await?;
        self.activity
            .log(actor, ActivityAction::Create, "floor_plan", &plan.id, format!("Created floor plan {}", plan.name))
            .await;
        Ok(plan)
    }

    pub async fn update(&self, id: &str, patch: UpdateFloorPlanInput, actor: &AuthContext) -> Result<FloorPlan> {
        let mut plan = self.plans.get(id).await?;
        let previous_project = plan.project_id.clone();
        plan.apply(patch, Some(actor.actor()), Utc::now())?;
        if plan.project_id != previous_project {
            self.ensure_project(&plan.project_id).await?;
        }

        self.plans.update(&plan).await?;
        self.activity
            .log(actor, ActivityAction::Update, "floor_plan", &plan.id, format!("Updated floor plan {}", plan.name))
            .await;
        Ok(plan)
    }

    pub async fn delete(&self, id: &str, actor: &AuthContext) -> Result<()> {
        let plan = self.plans.get(id).await?;
        self.plans.delete(id).await?;
        self.activity
            .log(actor, ActivityAction::Delete, "floor_plan", id, format!("Deleted floor plan {}", plan.name))
            .await;
        Ok(())
    }

    async fn ensure_project(&self, project_id: &str) -> Result<()> {
        if self.projects.exists(project_id).await? {
            Ok(())
        } else {
            Err(PlatformError::validation(format!("projectId: project {} does not exist", project_id)))
        }
    }
}
