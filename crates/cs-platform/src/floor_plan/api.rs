//! Floor Plan Admin API

use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};
use bson::Document;
use serde::Deserialize;

use crate::floor_plan::entity::{CreateFloorPlanInput, FloorPlanResponse, UpdateFloorPlanInput};
use crate::floor_plan::service::FloorPlanService;
use crate::shared::api_common::{query_de, ApiResponse, JsonBody, PaginationParams, QueryParams};
use crate::shared::error::PlatformError;
use crate::shared::middleware::RequireAdmin;
use crate::shared::query::FilterBuilder;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloorPlansQuery {
    #[serde(flatten)]
    pub pagination: PaginationParams,
    pub project_id: Option<String>,
    pub q: Option<String>,
    #[serde(default, deserialize_with = "query_de::u64_opt")]
    pub bedrooms: Option<u64>,
    #[serde(default, deserialize_with = "query_de::bool_opt")]
    pub is_active: Option<bool>,
}

impl FloorPlansQuery {
    pub fn to_filter(&self) -> Document {
        let mut filter = FilterBuilder::new()
            .reference("projectId", self.project_id.as_deref())
            .text(self.q.as_deref(), &["name", "description"])
            .flag("isActive", self.is_active);
        if let Some(bedrooms) = self.bedrooms {
            filter = filter.raw(bson::doc! { "bedrooms": bedrooms as i64 });
        }
        filter.build()
    }
}

#[derive(Clone)]
pub struct FloorPlansState {
    pub floor_plans: FloorPlanService,
}

pub async fn list_floor_plans(
    State(state): State<FloorPlansState>,
    _admin: RequireAdmin,
    QueryParams(query): QueryParams<FloorPlansQuery>,
) -> Result<ApiResponse<Vec<FloorPlanResponse>>, PlatformError> {
    let page = state
        .floor_plans
        .search(query.to_filter(), query.pagination.to_request())
        .await?;
    Ok(ApiResponse::paginated(page.map(Into::into)))
}

pub async fn get_floor_plan(
    State(state): State<FloorPlansState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<ApiResponse<FloorPlanResponse>, PlatformError> {
    Ok(ApiResponse::ok(state.floor_plans.get(&id).await?.into()))
}

pub async fn create_floor_plan(
    State(state): State<FloorPlansState>,
    admin: RequireAdmin,
    JsonBody(input): JsonBody<CreateFloorPlanInput>,
) -> Result<ApiResponse<FloorPlanResponse>, PlatformError> {
    let plan = state.floor_plans.create(input, &admin).await?;
    Ok(ApiResponse::created(plan.into()).with_message("Floor plan created"))
}

pub async fn update_floor_plan(
    State(state): State<FloorPlansState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<UpdateFloorPlanInput>,
) -> Result<ApiResponse<FloorPlanResponse>, PlatformError> {
    let plan = state.floor_plans.update(&id, patch, &admin).await?;
    Ok(ApiResponse::ok(plan.into()).with_message("Floor plan updated"))
}

pub async fn delete_floor_plan(
    State(state): State<FloorPlansState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, PlatformError> {
    state.floor_plans.delete(&id, &admin).await?;
    Ok(ApiResponse::message("Floor plan deleted"))
}

pub fn floor_plans_admin_router(state: FloorPlansState) -> Router {
    Router::new()
        .route("/", get(list_floor_plans).post(create_floor_plan))
        .route("/:id", get(get_floor_plan).put(update_floor_plan).delete(delete_floor_plan))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::Uri;
    use bson::doc;

    #[test]
    fn test_filter() {
        let uri: Uri = "/?bedrooms=2&isActive=false&projectId=x".parse().unwrap();
        let Query(query) = Query::<FloorPlansQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(
            query.to_filter(),
            doc! { "$and": [ { "isActive": false }, { "bedrooms": 2_i64 } ] }
        );
    }
}
