//! Project Service
//!
//! Admin reads see every project; client reads are always narrowed by
//! [`Project`]'s public visibility predicate.

use std::sync::Arc;

use bson::{doc, Document};
use chrono::Utc;
use tracing::{info, warn};

use crate::activity::{ActivityAction, ActivityService};
use crate::floor_plan::repository::FloorPlanRepository;
use crate::project::entity::{CreateProjectInput, Project, UpdateProjectInput};
use crate::project::repository::{ProjectRepository, ProjectStats};
use crate::shared::api_common::{Page, PageRequest};
use crate::shared::authorization_service::AuthContext;
use crate::shared::error::{PlatformError, Result};
use crate::shared::query::with_public_visibility;
use crate::upload::{FileType, IncomingFile, UploadService};

#[derive(Clone)]
pub struct ProjectService {
    projects: Arc<ProjectRepository>,
    floor_plans: Arc<FloorPlanRepository>,
    uploads: UploadService,
    activity: ActivityService,
}

impl ProjectService {
    pub fn new(
        projects: Arc<ProjectRepository>,
        floor_plans: Arc<FloorPlanRepository>,
        uploads: UploadService,
        activity: ActivityService,
    ) -> Self {
        Self {
            projects,
            floor_plans,
            uploads,
            activity,
        }
    }

    pub async fn search(&self, filter: Document, sort: Document, page: PageRequest) -> Result<Page<Project>> {
        self.projects.search(filter, sort, page).await
    }

    pub async fn search_public(&self, filter: Document, sort: Document, page: PageRequest) -> Result<Page<Project>> {
        let filter = with_public_visibility::<Project>(filter, Utc::now());
        self.projects.search(filter, sort, page).await
    }

    pub async fn featured(&self, limit: i64) -> Result<Vec<Project>> {
        let filter = with_public_visibility::<Project>(doc! { "isFeatured": true }, Utc::now());
        self.projects
            .find_many(filter, doc! { "updatedAt": -1 }, limit)
            .await
    }

    pub async fn get(&self, id: &str) -> Result<Project> {
        self.projects.get(id).await
    }

    pub async fn get_public(&self, id: &str) -> Result<Project> {
        let filter = with_public_visibility::<Project>(doc! { "_id": id }, Utc::now());
        self.projects
            .find_one(filter)
            .await?
            .ok_or_else(|| PlatformError::not_found("Project", id))
    }

    /// Public lookup by slug; counts a view.
    pub async fn view_by_slug(&self, slug: &str) -> Result<Project> {
        let filter = with_public_visibility::<Project>(doc! { "slug": slug.to_lowercase() }, Utc::now());
        let mut project = self
            .projects
            .find_one(filter)
            .await?
            .ok_or_else(|| PlatformError::not_found("Project", slug))?;

        match self.projects.increment_views(&project.id).await {
            Ok(_) => project.view_count += 1,
            Err(e) => warn!(project_id = %project.id, error = %e, "Failed to count project view"),
        }
        Ok(project)
    }

    pub async fn create(&self, input: CreateProjectInput, actor: &AuthContext) -> Result<Project> {
        let project = Project::create(input, Some(actor.actor()), Utc::now())?;
        if self.projects.exists_by_slug(&project.slug).await? {
            return Err(PlatformError::duplicate("Project", "slug", &project.slug));
        }

        self.projects.insert(&project).await?;
        info!(project_id = %project.id, slug = %project.slug, "Project created");
        self.activity
            .log(actor, ActivityAction::Create, "project", &project.id, format!("Created project {}", project.name))
            .await;
        Ok(project)
    }

    pub async fn update(&self, id: &str, patch: UpdateProjectInput, actor: &AuthContext) -> Result<Project> {
        let mut project = self.projects.get(id).await?;
        let previous_slug = project.slug.clone();
        project.apply(patch, Some(actor.actor()), Utc::now())?;

        if project.slug != previous_slug && self.projects.exists_by_slug(&project.slug).await? {
            return Err(PlatformError::duplicate("Project", "slug", &project.slug));
        }

        self.projects.update(&project).await?;
        self.activity
            .log(actor, ActivityAction::Update, "project", &project.id, format!("Updated project {}", project.name))
            .await;
        Ok(project)
    }

    /// Deletes the project and its floor plans; image blobs are removed best effort.
    pub async fn delete(&self, id: &str, actor: &AuthContext) -> Result<()> {
        let project = self.projects.get(id).await?;

        let plans = self.floor_plans.delete_for_project(&project.id).await?;
        self.projects.delete(&project.id).await?;

        let blobs = project
            .gallery
            .iter()
            .chain(project.featured_image.iter())
            .filter_map(|image| image.public_id.as_deref());
        for public_id in blobs {
            if let Err(e) = self.uploads.delete_by_public_id(public_id, FileType::Image).await {
                warn!(public_id = %public_id, error = %e, "Failed to remove project image");
            }
        }

        info!(project_id = %project.id, floor_plans = plans, "Project deleted");
        self.activity
            .log(actor, ActivityAction::Delete, "project", &project.id, format!("Deleted project {}", project.name))
            .await;
        Ok(())
    }

    pub async fn add_gallery_images(&self, id: &str, files: Vec<IncomingFile>, actor: &AuthContext) -> Result<Project> {
        let mut project = self.projects.get(id).await?;
        let folder = format!("projects/{}", project.slug);
        let images = self.uploads.upload_image_assets(files, &folder, actor).await?;
        let added = images.len();

        project.add_images(images, Some(actor.actor()), Utc::now())?;
        self.projects.update(&project).await?;
        self.activity
            .log(
                actor,
                ActivityAction::Upload,
                "project",
                &project.id,
                format!("Added {} image(s) to {}", added, project.name),
            )
            .await;
        Ok(project)
    }

    pub async fn remove_gallery_image(&self, id: &str, public_id: &str, actor: &AuthContext) -> Result<Project> {
        let mut project = self.projects.get(id).await?;
        if !project.remove_image(public_id, Some(actor.actor()), Utc::now()) {
            return Err(PlatformError::not_found("Gallery image", public_id));
        }

        self.projects.update(&project).await?;
        self.uploads.delete_by_public_id(public_id, FileType::Image).await?;
        self.activity
            .log(
                actor,
                ActivityAction::Update,
                "project",
                &project.id,
                format!("Removed image {} from {}", public_id, project.name),
            )
            .await;
        Ok(project)
    }

    pub async fn stats(&self) -> Result<ProjectStats> {
        self.projects.stats().await
    }

    pub async fn count(&self, filter: Document) -> Result<u64> {
        self.projects.count(filter).await
    }
}
