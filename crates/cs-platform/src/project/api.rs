//! Project API
//!
//! Client: list, featured, by slug (counts a view), by id, floor plans.
//! Admin: CRUD, gallery upload/removal, stats.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    routing::{delete, get, post},
    Router,
};
use bson::{doc, Document};
use serde::Deserialize;

use crate::floor_plan::entity::FloorPlanResponse;
use crate::floor_plan::service::FloorPlanService;
use crate::project::entity::{CreateProjectInput, ProjectResponse, ProjectStatus, ProjectType, UpdateProjectInput};
use crate::project::repository::ProjectStats;
use crate::project::service::ProjectService;
use crate::shared::api_common::{query_de, ApiResponse, JsonBody, LimitQuery, PaginationParams, QueryParams};
use crate::shared::error::PlatformError;
use crate::shared::middleware::RequireAdmin;
use crate::shared::query::FilterBuilder;
use crate::upload::api::read_multipart;

const FEATURED_LIMIT: u64 = 6;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectsQuery {
    #[serde(flatten)]
    pub pagination: PaginationParams,
    pub q: Option<String>,
    #[serde(alias = "projectType")]
    pub r#type: Option<String>,
    pub status: Option<String>,
    pub city: Option<String>,
    #[serde(default, deserialize_with = "query_de::bool_opt")]
    pub featured: Option<bool>,
    #[serde(default, deserialize_with = "query_de::f64_opt")]
    pub min_price: Option<f64>,
    #[serde(default, deserialize_with = "query_de::f64_opt")]
    pub max_price: Option<f64>,
    #[serde(default, deserialize_with = "query_de::f64_opt")]
    pub min_area: Option<f64>,
    #[serde(default, deserialize_with = "query_de::f64_opt")]
    pub max_area: Option<f64>,
    /// Admin listings only
    #[serde(default, deserialize_with = "query_de::bool_opt")]
    pub is_active: Option<bool>,
    /// `newest` (default), `oldest`, `price_asc`, `price_desc`, `name`, `views`
    pub sort: Option<String>,
}

impl ProjectsQuery {
    /// Caller filters shared by client and admin listings.
    pub fn to_filter(&self) -> Document {
        self.builder().build()
    }

    pub fn to_admin_filter(&self) -> Document {
        self.builder().flag("isActive", self.is_active).build()
    }

    fn builder(&self) -> FilterBuilder {
        FilterBuilder::new()
            .text(
                self.q.as_deref(),
                &["name", "shortDescription", "developer", "location.address", "location.city"],
            )
            .enum_value::<ProjectType>("projectType", self.r#type.as_deref())
            .enum_value::<ProjectStatus>("status", self.status.as_deref())
            .equals_ci("location.city", self.city.as_deref())
            .flag("isFeatured", self.featured)
            .gte("priceRange.min", self.min_price)
            .lte("priceRange.max", self.max_price)
            .gte("areaRange.min", self.min_area)
            .lte("areaRange.max", self.max_area)
    }

    pub fn sort(&self) -> Document {
        match self.sort.as_deref().map(str::trim) {
            Some("oldest") => doc! { "createdAt": 1 },
            Some("price_asc") => doc! { "priceRange.min": 1 },
            Some("price_desc") => doc! { "priceRange.min": -1 },
            Some("name") => doc! { "name": 1 },
            Some("views") => doc! { "viewCount": -1 },
            _ => doc! { "createdAt": -1 },
        }
    }
}

#[derive(Clone)]
pub struct ProjectsState {
    pub projects: ProjectService,
    pub floor_plans: FloorPlanService,
}

// ---- client ----

pub async fn list_projects(
    State(state): State<ProjectsState>,
    QueryParams(query): QueryParams<ProjectsQuery>,
) -> Result<ApiResponse<Vec<ProjectResponse>>, PlatformError> {
    let page = state
        .projects
        .search_public(query.to_filter(), query.sort(), query.pagination.to_request())
        .await?;
    Ok(ApiResponse::paginated(page.map(Into::into)))
}

pub async fn featured_projects(
    State(state): State<ProjectsState>,
    QueryParams(query): QueryParams<LimitQuery>,
) -> Result<ApiResponse<Vec<ProjectResponse>>, PlatformError> {
    let projects = state.projects.featured(query.or(FEATURED_LIMIT)).await?;
    Ok(ApiResponse::ok(projects.into_iter().map(Into::into).collect()))
}

pub async fn get_project_by_slug(
    State(state): State<ProjectsState>,
    Path(slug): Path<String>,
) -> Result<ApiResponse<ProjectResponse>, PlatformError> {
    Ok(ApiResponse::ok(state.projects.view_by_slug(&slug).await?.into()))
}

pub async fn get_public_project(
    State(state): State<ProjectsState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<ProjectResponse>, PlatformError> {
    Ok(ApiResponse::ok(state.projects.get_public(&id).await?.into()))
}

pub async fn project_floor_plans(
    State(state): State<ProjectsState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Vec<FloorPlanResponse>>, PlatformError> {
    let project = state.projects.get_public(&id).await?;
    let plans = state.floor_plans.list_public_for_project(&project.id).await?;
    Ok(ApiResponse::ok(plans.into_iter().map(Into::into).collect()))
}

// ---- admin ----

pub async fn admin_list_projects(
    State(state): State<ProjectsState>,
    _admin: RequireAdmin,
    QueryParams(query): QueryParams<ProjectsQuery>,
) -> Result<ApiResponse<Vec<ProjectResponse>>, PlatformError> {
    let page = state
        .projects
        .search(query.to_admin_filter(), query.sort(), query.pagination.to_request())
        .await?;
    Ok(ApiResponse::paginated(page.map(Into::into)))
}

pub async fn admin_get_project(
    State(state): State<ProjectsState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<ApiResponse<ProjectResponse>, PlatformError> {
    Ok(ApiResponse::ok(state.projects.get(&id).await?.into()))
}

pub async fn create_project(
    State(state): State<ProjectsState>,
    admin: RequireAdmin,
    JsonBody(input): JsonBody<CreateProjectInput>,
) -> Result<ApiResponse<ProjectResponse>, PlatformError> {
    let project = state.projects.create(input, &admin).await?;
    Ok(ApiResponse::created(project.into()).with_message("Project created"))
}

pub async fn update_project(
    State(state): State<ProjectsState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<UpdateProjectInput>,
) -> Result<ApiResponse<ProjectResponse>, PlatformError> {
    let project = state.projects.update(&id, patch, &admin).await?;
    Ok(ApiResponse::ok(project.into()).with_message("Project updated"))
}

pub async fn delete_project(
    State(state): State<ProjectsState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, PlatformError> {
    state.projects.delete(&id, &admin).await?;
    Ok(ApiResponse::message("Project deleted"))
}

pub async fn upload_gallery(
    State(state): State<ProjectsState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<ApiResponse<ProjectResponse>, PlatformError> {
    let (files, _folder) = read_multipart(multipart).await?;
    let project = state.projects.add_gallery_images(&id, files, &admin).await?;
    Ok(ApiResponse::ok(project.into()).with_message("Gallery updated"))
}

pub async fn remove_gallery_image(
    State(state): State<ProjectsState>,
    admin: RequireAdmin,
    Path((id, public_id)): Path<(String, String)>,
) -> Result<ApiResponse<ProjectResponse>, PlatformError> {
    let project = state.projects.remove_gallery_image(&id, &public_id, &admin).await?;
    Ok(ApiResponse::ok(project.into()).with_message("Image removed"))
}

pub async fn project_stats(
    State(state): State<ProjectsState>,
    _admin: RequireAdmin,
) -> Result<ApiResponse<ProjectStats>, PlatformError> {
    Ok(ApiResponse::ok(state.projects.stats().await?))
}

pub fn projects_router(state: ProjectsState) -> Router {
    Router::new()
        .route("/", get(list_projects))
        .route("/featured", get(featured_projects))
        .route("/slug/:slug", get(get_project_by_slug))
        .route("/:id", get(get_public_project))
        .route("/:id/floor-plans", get(project_floor_plans))
        .with_state(state)
}

pub fn projects_admin_router(state: ProjectsState, upload_body_limit: usize) -> Router {
    Router::new()
        .route("/", get(admin_list_projects).post(create_project))
        .route("/stats", get(project_stats))
        .route("/:id", get(admin_get_project).put(update_project).delete(delete_project))
        .route(
            "/:id/gallery",
            post(upload_gallery).layer(DefaultBodyLimit::max(upload_body_limit)),
        )
        .route("/:id/gallery/*public_id", delete(remove_gallery_image))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::Uri;

    fn query(q: &str) -> ProjectsQuery {
        let uri: Uri = format!("/?{}", q).parse().unwrap();
        Query::<ProjectsQuery>::try_from_uri(&uri).unwrap().0
    }

    #[test]
    fn test_client_filter_ignores_is_active() {
        let q = query("isActive=false&type=villa");
        assert_eq!(q.to_filter(), doc! { "projectType": "villa" });
        assert_eq!(q.to_admin_filter().get_array("$and").unwrap().len(), 2);
    }

    #[test]
    fn test_unknown_values_dropped() {
        assert!(query("type=castle&status=all").to_filter().is_empty());
        let uri: Uri = "/?minPrice=abc".parse().unwrap();
        assert!(Query::<ProjectsQuery>::try_from_uri(&uri).is_err());
    }

    #[test]
    fn test_bounds_and_sort() {
        let q = query("minPrice=1000000000&maxArea=100&sort=price_desc");
        let filter = q.to_filter();
        let and = filter.get_array("$and").unwrap();
        assert_eq!(and.len(), 2);
        assert_eq!(q.sort(), doc! { "priceRange.min": -1 });
        assert_eq!(query("sort=bogus").sort(), doc! { "createdAt": -1 });
    }
}
