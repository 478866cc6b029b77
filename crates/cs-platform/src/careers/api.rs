//! Careers API

use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Router,
};
use bson::{doc, Document};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::careers::entity::{
    ApplicationReceipt, ApplicationResponse, ApplicationStatus, ApplyInput, CreateJobInput, EmploymentType,
    ExperienceLevel, JobResponse, JobStatus, UpdateJobInput,
};
use crate::careers::service::{CareersService, CareersStats};
use crate::shared::api_common::{query_de, ApiResponse, JsonBody, NoteRequest, PaginationParams, QueryParams};
use crate::shared::error::PlatformError;
use crate::shared::middleware::{ClientMeta, RequireAdmin};
use crate::shared::query::{parse_datetime, FilterBuilder};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobsQuery {
    #[serde(flatten)]
    pub pagination: PaginationParams,
    pub q: Option<String>,
    pub department: Option<String>,
    pub location: Option<String>,
    pub employment_type: Option<String>,
    pub experience_level: Option<String>,
    /// Admin listings only
    pub status: Option<String>,
    #[serde(default, deserialize_with = "query_de::bool_opt")]
    pub is_active: Option<bool>,
    /// `newest` (default), `deadline`, `title`, `views`
    pub sort: Option<String>,
}

impl JobsQuery {
    pub fn to_filter(&self) -> Document {
        self.builder().build()
    }

    pub fn to_admin_filter(&self) -> Document {
        self.builder()
            .enum_value::<JobStatus>("status", self.status.as_deref())
            .flag("isActive", self.is_active)
            .build()
    }

    fn builder(&self) -> FilterBuilder {
        FilterBuilder::new()
            .text(self.q.as_deref(), &["title", "department", "description"])
            .equals_ci("department", self.department.as_deref())
            .text(self.location.as_deref(), &["location"])
            .enum_value::<EmploymentType>("employmentType", self.employment_type.as_deref())
            .enum_value::<ExperienceLevel>("experienceLevel", self.experience_level.as_deref())
    }

    pub fn sort(&self) -> Document {
        match self.sort.as_deref().map(str::trim) {
            Some("deadline") => doc! { "deadline": 1 },
            Some("title") => doc! { "title": 1 },
            Some("views") => doc! { "viewCount": -1 },
            _ => doc! { "publishedAt": -1, "createdAt": -1 },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationsQuery {
    #[serde(flatten)]
    pub pagination: PaginationParams,
    pub q: Option<String>,
    pub status: Option<String>,
    pub job_id: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl ApplicationsQuery {
    pub fn to_filter(&self) -> Document {
        FilterBuilder::new()
            .text(self.q.as_deref(), &["fullName", "email", "phone", "jobTitle"])
            .enum_value::<ApplicationStatus>("status", self.status.as_deref())
            .reference("jobId", self.job_id.as_deref())
            .date_range(
                "createdAt",
                parse_datetime(self.from.as_deref()),
                parse_datetime(self.to.as_deref()),
            )
            .build()
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ApplicationStatusRequest {
    pub status: ApplicationStatus,
}

#[derive(Clone)]
pub struct CareersState {
    pub careers: CareersService,
}

// ---- client ----

pub async fn list_jobs(
    State(state): State<CareersState>,
    QueryParams(query): QueryParams<JobsQuery>,
) -> Result<ApiResponse<Vec<JobResponse>>, PlatformError> {
    let page = state
        .careers
        .search_public_jobs(query.to_filter(), query.sort(), query.pagination.to_request())
        .await?;
    Ok(ApiResponse::paginated(page.map(Into::into)))
}

pub async fn get_job_by_slug(
    State(state): State<CareersState>,
    Path(slug): Path<String>,
) -> Result<ApiResponse<JobResponse>, PlatformError> {
    Ok(ApiResponse::ok(state.careers.view_job_by_slug(&slug).await?.into()))
}

pub async fn get_public_job(
    State(state): State<CareersState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<JobResponse>, PlatformError> {
    Ok(ApiResponse::ok(state.careers.get_public_job(&id).await?.into()))
}

pub async fn apply_for_job(
    State(state): State<CareersState>,
    client: ClientMeta,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<ApplyInput>,
) -> Result<ApiResponse<ApplicationReceipt>, PlatformError> {
    let application = state.careers.apply(&id, input, client).await?;
    Ok(ApiResponse::created(ApplicationReceipt::from(&application))
        .with_message("Your application has been submitted"))
}

// ---- admin: postings ----

pub async fn admin_list_jobs(
    State(state): State<CareersState>,
    _admin: RequireAdmin,
    QueryParams(query): QueryParams<JobsQuery>,
) -> Result<ApiResponse<Vec<JobResponse>>, PlatformError> {
    let page = state
        .careers
        .search_jobs(query.to_admin_filter(), query.sort(), query.pagination.to_request())
        .await?;
    Ok(ApiResponse::paginated(page.map(Into::into)))
}

pub async fn admin_get_job(
    State(state): State<CareersState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<ApiResponse<JobResponse>, PlatformError> {
    Ok(ApiResponse::ok(state.careers.get_job(&id).await?.into()))
}

pub async fn create_job(
    State(state): State<CareersState>,
    admin: RequireAdmin,
    JsonBody(input): JsonBody<CreateJobInput>,
) -> Result<ApiResponse<JobResponse>, PlatformError> {
    let job = state.careers.create_job(input, &admin).await?;
    Ok(ApiResponse::created(job.into()).with_message("Job posting created"))
}

pub async fn update_job(
    State(state): State<CareersState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<UpdateJobInput>,
) -> Result<ApiResponse<JobResponse>, PlatformError> {
    let job = state.careers.update_job(&id, patch, &admin).await?;
    Ok(ApiResponse::ok(job.into()).with_message("Job posting updated"))
}

pub async fn delete_job(
    State(state): State<CareersState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, PlatformError> {
    state.careers.delete_job(&id, &admin).await?;
    Ok(ApiResponse::message("Job posting deleted"))
}

// ---- admin: applications ----

pub async fn list_applications(
    State(state): State<CareersState>,
    _admin: RequireAdmin,
    QueryParams(query): QueryParams<ApplicationsQuery>,
) -> Result<ApiResponse<Vec<ApplicationResponse>>, PlatformError> {
    let page = state
        .careers
        .search_applications(query.to_filter(), query.pagination.to_request())
        .await?;
    Ok(ApiResponse::paginated(page.map(Into::into)))
}

pub async fn get_application(
    State(state): State<CareersState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<ApiResponse<ApplicationResponse>, PlatformError> {
    Ok(ApiResponse::ok(state.careers.get_application(&id).await?.into()))
}

pub async fn update_application_status(
    State(state): State<CareersState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<ApplicationStatusRequest>,
) -> Result<ApiResponse<ApplicationResponse>, PlatformError> {
    let application = state.careers.change_application_status(&id, body.status, &admin).await?;
    Ok(ApiResponse::ok(application.into()).with_message("Status updated"))
}

pub async fn add_application_note(
    State(state): State<CareersState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<NoteRequest>,
) -> Result<ApiResponse<ApplicationResponse>, PlatformError> {
    let application = state.careers.add_application_note(&id, body.content, &admin).await?;
    Ok(ApiResponse::ok(application.into()).with_message("Note added"))
}

pub async fn delete_application(
    State(state): State<CareersState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, PlatformError> {
    state.careers.delete_application(&id, &admin).await?;
    Ok(ApiResponse::message("Application deleted"))
}

pub async fn careers_stats(
    State(state): State<CareersState>,
    _admin: RequireAdmin,
) -> Result<ApiResponse<CareersStats>, PlatformError> {
    Ok(ApiResponse::ok(state.careers.stats().await?))
}

pub fn careers_router(state: CareersState) -> Router {
    Router::new()
        .route("/jobs", get(list_jobs))
        .route("/jobs/slug/:slug", get(get_job_by_slug))
        .route("/jobs/:id", get(get_public_job))
        .route("/jobs/:id/apply", post(apply_for_job))
        .with_state(state)
}

pub fn careers_admin_router(state: CareersState) -> Router {
    Router::new()
        .route("/stats", get(careers_stats))
        .route("/jobs", get(admin_list_jobs).post(create_job))
        .route("/jobs/:id", get(admin_get_job).put(update_job).delete(delete_job))
        .route("/applications", get(list_applications))
        .route("/applications/:id", get(get_application).delete(delete_application))
        .route("/applications/:id/status", put(update_application_status))
        .route("/applications/:id/notes", post(add_application_note))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::Uri;

    fn jobs_query(uri: &str) -> JobsQuery {
        let uri: Uri = uri.parse().unwrap();
        Query::<JobsQuery>::try_from_uri(&uri).unwrap().0
    }

    #[test]
    fn test_status_filter_is_admin_only() {
        let q = jobs_query("/?status=draft&employmentType=internship");
        assert_eq!(q.to_filter(), doc! { "employmentType": "internship" });
        let admin = q.to_admin_filter();
        assert_eq!(admin.get_array("$and").unwrap().len(), 2);
    }

    #[test]
    fn test_sort_defaults_to_newest_published() {
        assert_eq!(jobs_query("/").sort(), doc! { "publishedAt": -1, "createdAt": -1 });
        assert_eq!(jobs_query("/?sort=deadline").sort(), doc! { "deadline": 1 });
    }

    #[test]
    fn test_applications_filter_drops_bad_job_id() {
        let uri: Uri = "/?jobId=not-a-tsid&status=hired".parse().unwrap();
        let q = Query::<ApplicationsQuery>::try_from_uri(&uri).unwrap().0;
        assert_eq!(q.to_filter(), doc! { "status": "hired" });
    }
}
