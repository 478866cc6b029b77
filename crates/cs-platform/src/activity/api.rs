//! Activity Log Admin API

use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};
use bson::Document;
use serde::Deserialize;

use crate::activity::entity::{ActivityAction, ActivityLogResponse};
use crate::activity::service::ActivityService;
use crate::shared::api_common::{ApiResponse, PaginationParams, QueryParams};
use crate::shared::error::PlatformError;
use crate::shared::middleware::RequireAdmin;
use crate::shared::query::{parse_datetime, FilterBuilder};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityQuery {
    #[serde(flatten)]
    pub pagination: PaginationParams,
    pub user_id: Option<String>,
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub q: Option<String>,
}

impl ActivityQuery {
    pub fn to_filter(&self) -> Document {
        FilterBuilder::new()
            .reference("userId", self.user_id.as_deref())
            .enum_value::<ActivityAction>("action", self.action.as_deref())
            .equals_ci("resourceType", self.resource_type.as_deref())
            .reference("resourceId", self.resource_id.as_deref())
            .date_range("createdAt", parse_datetime(self.from.as_deref()), parse_datetime(self.to.as_deref()))
            .text(self.q.as_deref(), &["description", "userEmail"])
            .build()
    }
}

#[derive(Clone)]
pub struct ActivityState {
    pub activity: ActivityService,
}

pub async fn list_activity(
    State(state): State<ActivityState>,
    _admin: RequireAdmin,
    QueryParams(query): QueryParams<ActivityQuery>,
) -> Result<ApiResponse<Vec<ActivityLogResponse>>, PlatformError> {
    let page = state
        .activity
        .search(query.to_filter(), query.pagination.to_request())
        .await?;
    Ok(ApiResponse::paginated(page.map(Into::into)))
}

pub async fn get_activity(
    State(state): State<ActivityState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<ApiResponse<ActivityLogResponse>, PlatformError> {
    let log = state.activity.get(&id).await?;
    Ok(ApiResponse::ok(log.into()))
}

pub fn activity_admin_router(state: ActivityState) -> Router {
    Router::new()
        .route("/", get(list_activity))
        .route("/:id", get(get_activity))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::Uri;
    use bson::doc;

    #[test]
    fn test_filter_drops_bad_values() {
        let uri: Uri = "/?action=hack&userId=not-an-id&resourceType=Project".parse().unwrap();
        let Query(query) = Query::<ActivityQuery>::try_from_uri(&uri).unwrap();
        let filter = query.to_filter();
        assert_eq!(filter, doc! { "resourceType": { "$regex": "^Project$", "$options": "i" } });
    }

    #[test]
    fn test_filter_known_action() {
        let uri: Uri = "/?action=status_change".parse().unwrap();
        let Query(query) = Query::<ActivityQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(query.to_filter(), doc! { "action": "status_change" });
    }
}
