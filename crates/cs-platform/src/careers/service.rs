//! Careers Service
//!
//! Applications can only be filed against postings that are publicly
//! visible at the time of applying. The posting's `applicationCount` is a
//! display counter; failing to bump it does not fail the application.

use std::sync::Arc;

use bson::{doc, Document};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::activity::{ActivityAction, ActivityService};
use crate::careers::entity::{
    ApplicationStatus, ApplyInput, CreateJobInput, JobApplication, JobPosting, UpdateJobInput,
};
use crate::careers::repository::{ApplicationStats, JobApplicationRepository, JobPostingRepository, JobStats};
use crate::shared::api_common::{Page, PageRequest};
use crate::shared::authorization_service::AuthContext;
use crate::shared::error::{PlatformError, Result};
use crate::shared::middleware::ClientMeta;
use crate::shared::query::with_public_visibility;

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CareersStats {
    pub jobs: JobStats,
    pub applications: ApplicationStats,
}

#[derive(Clone)]
pub struct CareersService {
    jobs: Arc<JobPostingRepository>,
    applications: Arc<JobApplicationRepository>,
    activity: ActivityService,
}

impl CareersService {
    pub fn new(
        jobs: Arc<JobPostingRepository>,
        applications: Arc<JobApplicationRepository>,
        activity: ActivityService,
    ) -> Self {
        Self {
            jobs,
            applications,
            activity,
        }
    }

    // ---- postings ----

    pub async fn search_jobs(&self, filter: Document, sort: Document, page: PageRequest) -> Result<Page<JobPosting>> {
        self.jobs.search(filter, sort, page).await
    }

    pub async fn search_public_jobs(
        &self,
        filter: Document,
        sort: Document,
        page: PageRequest,
    ) -> Result<Page<JobPosting>> {
        let filter = with_public_visibility::<JobPosting>(filter, Utc::now());
        self.jobs.search(filter, sort, page).await
    }

    pub async fn get_job(&self, id: &str) -> Result<JobPosting> {
        self.jobs.get(id).await
    }

    pub async fn get_public_job(&self, id: &str) -> Result<JobPosting> {
        self.public_job(doc! { "_id": id }, id).await
    }

    /// Public detail by slug; counts a view.
    pub async fn view_job_by_slug(&self, slug: &str) -> Result<JobPosting> {
        let mut job = self.public_job(doc! { "slug": slug.to_lowercase() }, slug).await?;
        match self.jobs.increment_views(&job.id).await {
            Ok(_) => job.view_count += 1,
            Err(e) => warn!(job_id = %job.id, error = %e, "Failed to count job view"),
        }
        Ok(job)
    }

    async fn public_job(&self, filter: Document, key: &str) -> Result<JobPosting> {
        let filter = with_public_visibility::<JobPosting>(filter, Utc::now());
        self.jobs
            .find_one(filter)
            .await?
            .ok_or_else(|| PlatformError::not_found("Job posting", key))
    }

    pub async fn create_job(&self, input: CreateJobInput, actor: &AuthContext) -> Result<JobPosting> {
        let job = JobPosting::create(input, Some(actor.actor()), Utc::now())?;
        if self.jobs.exists_by_slug(&job.slug).await? {
            return Err(PlatformError::duplicate("Job posting", "slug", &job.slug));
        }

        self.jobs.insert(&job).await?;
        info!(job_id = %job.id, status = ?job.status, "Job posting created");
        self.activity
            .log(actor, ActivityAction::Create, "job_posting", &job.id, format!("Created job {}", job.title))
            .await;
        Ok(job)
    }

    pub async fn update_job(&self, id: &str, patch: UpdateJobInput, actor: &AuthContext) -> Result<JobPosting> {
        let mut job = self.jobs.get(id).await?;
        let previous_slug = job.slug.clone();
        job.apply(patch, Some(actor.actor()), Utc::now())?;

        if job.slug != previous_slug && self.jobs.exists_by_slug(&job.slug).await? {
            return Err(PlatformError::duplicate("Job posting", "slug", &job.slug));
        }

        self.jobs.update(&job).await?;
        self.activity
            .log(actor, ActivityAction::Update, "job_posting", &job.id, format!("Updated job {}", job.title))
            .await;
        Ok(job)
    }

    /// Postings that already have applications are closed, not deleted.
    pub async fn delete_job(&self, id: &str, actor: &AuthContext) -> Result<()> {
        let job = self.jobs.get(id).await?;
        let applications = self.applications.count_for_job(&job.id).await?;
        if applications > 0 {
            return Err(PlatformError::conflict(format!(
                "Job {} has {} application(s); close it instead",
                job.title, applications
            )));
        }

        self.jobs.delete(&job.id).await?;
        self.activity
            .log(actor, ActivityAction::Delete, "job_posting", &job.id, format!("Deleted job {}", job.title))
            .await;
        Ok(())
    }

    // ---- applications ----

    pub async fn apply(&self, job_id: &str, input: ApplyInput, client: ClientMeta) -> Result<JobApplication> {
        let job = self.get_public_job(job_id).await?;
        let application = JobApplication::create(&job, input, client, Utc::now())?;
        self.applications.insert(&application).await?;

        if let Err(e) = self.jobs.increment_applications(&job.id).await {
            warn!(job_id = %job.id, error = %e, "Failed to bump application count");
        }
        info!(application_id = %application.id, job_id = %job.id, "Job application received");
        Ok(application)
    }

    pub async fn search_applications(&self, filter: Document, page: PageRequest) -> Result<Page<JobApplication>> {
        self.applications.search(filter, page).await
    }

    pub async fn get_application(&self, id: &str) -> Result<JobApplication> {
        self.applications.get(id).await
    }

    pub async fn change_application_status(
        &self,
        id: &str,
        status: ApplicationStatus,
        actor: &AuthContext,
    ) -> Result<JobApplication> {
        let mut application = self.applications.get(id).await?;
        let previous = application.status;
        application.change_status(status, Some(actor.actor()), Utc::now());
        self.applications.update(&application).await?;
        self.activity
            .log(
                actor,
                ActivityAction::StatusChange,
                "job_application",
                &application.id,
                format!(
                    "Application of {} for {}: {:?} -> {:?}",
                    application.full_name, application.job_title, previous, status
                ),
            )
            .await;
        Ok(application)
    }

    pub async fn add_application_note(&self, id: &str, content: String, actor: &AuthContext) -> Result<JobApplication> {
        let mut application = self.applications.get(id).await?;
        application.add_note(content, Some(actor.actor()), Utc::now())?;
        self.applications.update(&application).await?;
        Ok(application)
    }

    pub async fn delete_application(&self, id: &str, actor: &AuthContext) -> Result<()> {
        let application = self.applications.get(id).await?;
        if self.applications.delete(&application.id).await? {
            if let Err(e) = self.jobs.decrement_applications(&application.job_id).await {
                warn!(job_id = %application.job_id, error = %e, "Failed to lower application count");
            }
        }
        self.activity
            .log(
                actor,
                ActivityAction::Delete,
                "job_application",
                &application.id,
                format!("Deleted application of {}", application.full_name),
            )
            .await;
        Ok(())
    }

    pub async fn stats(&self) -> Result<CareersStats> {
        let (jobs, applications) = futures::try_join!(self.jobs.stats(), self.applications.stats())?;
        Ok(CareersStats { jobs, applications })
    }

    pub async fn count_jobs(&self, filter: Document) -> Result<u64> {
        self.jobs.count(filter).await
    }

    pub async fn count_applications(&self, filter: Document) -> Result<u64> {
        self.applications.count(filter).await
    }
}
