//! Banner API

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Router,
};
use bson::Document;
use serde::Deserialize;

use crate::banner::entity::{BannerPosition, BannerResponse, CreateBannerInput, UpdateBannerInput};
use crate::banner::repository::BannerStats;
use crate::banner::service::{BannerEvent, BannerService};
use crate::shared::api_common::{query_de, ApiResponse, JsonBody, PaginationParams, QueryParams};
use crate::shared::error::PlatformError;
use crate::shared::middleware::RequireAdmin;
use crate::shared::query::{parse_enum, FilterBuilder};

#[derive(Debug, Default, Deserialize)]
pub struct PositionQuery {
    pub position: Option<String>,
}

impl PositionQuery {
    /// Unknown slot names list every slot.
    pub fn position(&self) -> Option<BannerPosition> {
        self.position.as_deref().and_then(parse_enum::<BannerPosition>)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BannersQuery {
    #[serde(flatten)]
    pub pagination: PaginationParams,
    pub q: Option<String>,
    pub position: Option<String>,
    #[serde(default, deserialize_with = "query_de::bool_opt")]
    pub is_active: Option<bool>,
}

impl BannersQuery {
    pub fn to_filter(&self) -> Document {
        FilterBuilder::new()
            .text(self.q.as_deref(), &["title", "subtitle"])
            .enum_value::<BannerPosition>("position", self.position.as_deref())
            .flag("isActive", self.is_active)
            .build()
    }
}

#[derive(Clone)]
pub struct BannerState {
    pub banners: BannerService,
}

pub async fn list_live_banners(
    State(state): State<BannerState>,
    QueryParams(query): QueryParams<PositionQuery>,
) -> Result<ApiResponse<Vec<BannerResponse>>, PlatformError> {
    let banners = state.banners.live(query.position()).await?;
    Ok(ApiResponse::ok(banners.into_iter().map(Into::into).collect()))
}

pub async fn track_impression(
    State(state): State<BannerState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, PlatformError> {
    state.banners.track(&id, BannerEvent::Impression).await?;
    Ok(ApiResponse::message("Impression recorded"))
}

pub async fn track_click(
    State(state): State<BannerState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, PlatformError> {
    state.banners.track(&id, BannerEvent::Click).await?;
    Ok(ApiResponse::message("Click recorded"))
}

pub async fn list_banners(
    State(state): State<BannerState>,
    _admin: RequireAdmin,
    QueryParams(query): QueryParams<BannersQuery>,
) -> Result<ApiResponse<Vec<BannerResponse>>, PlatformError> {
    let page = state.banners.search(query.to_filter(), query.pagination.to_request()).await?;
    Ok(ApiResponse::paginated(page.map(Into::into)))
}

pub async fn get_banner(
    State(state): State<BannerState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<ApiResponse<BannerResponse>, PlatformError> {
    Ok(ApiResponse::ok(state.banners.get(&id).await?.into()))
}

pub async fn create_banner(
    State(state): State<BannerState>,
    admin: RequireAdmin,
    JsonBody(input): JsonBody<CreateBannerInput>,
) -> Result<ApiResponse<BannerResponse>, PlatformError> {
    let banner = state.banners.create(input, &admin).await?;
    Ok(ApiResponse::created(banner.into()).with_message("Banner created"))
}

pub async fn update_banner(
    State(state): State<BannerState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<UpdateBannerInput>,
) -> Result<ApiResponse<BannerResponse>, PlatformError> {
    let banner = state.banners.update(&id, patch, &admin).await?;
    Ok(ApiResponse::ok(banner.into()).with_message("Banner updated"))
}

pub async fn delete_banner(
    State(state): State<BannerState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, PlatformError> {
    state.banners.delete(&id, &admin).await?;
    Ok(ApiResponse::message("Banner deleted"))
}

pub async fn banner_stats(
    State(state): State<BannerState>,
    _admin: RequireAdmin,
) -> Result<ApiResponse<BannerStats>, PlatformError> {
    Ok(ApiResponse::ok(state.banners.stats().await?))
}

pub fn banners_router(state: BannerState) -> Router {
    Router::new()
        .route("/", get(list_live_banners))
        .route("/:id/impression", post(track_impression))
        .route("/:id/click", post(track_click))
        .with_state(state)
}

pub fn banners_admin_router(state: BannerState) -> Router {
    Router::new()
        .route("/", get(list_banners).post(create_banner))
        .route("/stats", get(banner_stats))
        .route("/:id", get(get_banner).put(update_banner).delete(delete_banner))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::Uri;
    use bson::doc;

    #[test]
    fn test_position_query() {
        let uri: Uri = "/?position=sidebar".parse().unwrap();
        let q = Query::<PositionQuery>::try_from_uri(&uri).unwrap().0;
        assert_eq!(q.position(), Some(BannerPosition::Sidebar));

        let uri: Uri = "/?position=footer".parse().unwrap();
        let q = Query::<PositionQuery>::try_from_uri(&uri).unwrap().0;
        assert_eq!(q.position(), None);
    }

    #[test]
    fn test_admin_filter() {
        let uri: Uri = "/?position=popup&isActive=false".parse().unwrap();
        let q = Query::<BannersQuery>::try_from_uri(&uri).unwrap().0;
        assert_eq!(
            q.to_filter(),
            doc! { "$and": [ { "position": "popup" }, { "isActive": false } ] }
        );
    }
}
