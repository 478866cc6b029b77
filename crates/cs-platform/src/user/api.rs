//! Users Admin API

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Router,
};
use bson::Document;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::shared::api_common::{ApiResponse, JsonBody, PaginationParams, QueryParams};
use crate::shared::error::PlatformError;
use crate::shared::middleware::RequireAdmin;
use crate::shared::query::FilterBuilder;
use crate::user::entity::{CreateUserInput, UpdateUserInput, UserResponse, UserRole, UserStatus};
use crate::user::service::UserService;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsersQuery {
    #[serde(flatten)]
    pub pagination: PaginationParams,
    /// Matches name, email or phone
    pub q: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
}

impl UsersQuery {
    pub fn to_filter(&self) -> Document {
        FilterBuilder::new()
            .text(self.q.as_deref(), &["fullName", "email", "phone"])
            .enum_value::<UserRole>("role", self.role.as_deref())
            .enum_value::<UserStatus>("status", self.status.as_deref())
            .build()
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserStatusRequest {
    pub status: UserStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AssignRolesRequest {
    pub role_ids: Vec<String>,
}

#[derive(Clone)]
pub struct UsersState {
    pub users: UserService,
}

pub async fn list_users(
    State(state): State<UsersState>,
    _admin: RequireAdmin,
    QueryParams(query): QueryParams<UsersQuery>,
) -> Result<ApiResponse<Vec<UserResponse>>, PlatformError> {
    let page = state.users.search(query.to_filter(), query.pagination.to_request()).await?;
    Ok(ApiResponse::paginated(page.map(Into::into)))
}

pub async fn get_user(
    State(state): State<UsersState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<ApiResponse<UserResponse>, PlatformError> {
    Ok(ApiResponse::ok(state.users.get(&id).await?.into()))
}

pub async fn create_user(
    State(state): State<UsersState>,
    admin: RequireAdmin,
    JsonBody(input): JsonBody<CreateUserInput>,
) -> Result<ApiResponse<UserResponse>, PlatformError> {
    let user = state.users.create(input, &admin).await?;
    Ok(ApiResponse::created(user.into()).with_message("User created"))
}

pub async fn update_user(
    State(state): State<UsersState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<UpdateUserInput>,
) -> Result<ApiResponse<UserResponse>, PlatformError> {
    let user = state.users.update(&id, patch, &admin).await?;
    Ok(ApiResponse::ok(user.into()).with_message("User updated"))
}

pub async fn update_user_status(
    State(state): State<UsersState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UserStatusRequest>,
) -> Result<ApiResponse<UserResponse>, PlatformError> {
    let user = state.users.set_status(&id, req.status, &admin).await?;
    Ok(ApiResponse::ok(user.into()).with_message("Status updated"))
}

pub async fn assign_roles(
    State(state): State<UsersState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<AssignRolesRequest>,
) -> Result<ApiResponse<UserResponse>, PlatformError> {
    let user = state.users.assign_roles(&id, req.role_ids, &admin).await?;
    Ok(ApiResponse::ok(user.into()).with_message("Roles assigned"))
}

pub async fn delete_user(
    State(state): State<UsersState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, PlatformError> {
    state.users.delete(&id, &admin).await?;
    Ok(ApiResponse::message("User deleted"))
}

pub fn users_admin_router(state: UsersState) -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
        .route("/:id/status", put(update_user_status))
        .route("/:id/roles", put(assign_roles))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::Uri;
    use bson::doc;

    #[test]
    fn test_all_sentinel_adds_no_clause() {
        let uri: Uri = "/?role=all&status=active&page=2".parse().unwrap();
        let Query(query) = Query::<UsersQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(query.to_filter(), doc! { "status": "active" });
        assert_eq!(query.pagination.to_request().page, 2);
    }

    #[test]
    fn test_status_request_rejects_unknown_value() {
        assert!(serde_json::from_str::<UserStatusRequest>(r#"{"status":"banned"}"#).is_err());
        assert!(serde_json::from_str::<UserStatusRequest>(r#"{"status":"suspended"}"#).is_ok());
    }
}
