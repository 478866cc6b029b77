//! Roles and Permissions Admin API

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::role::entity::{
    CreatePermissionInput, CreateRoleInput, PermissionResponse, RoleResponse, UpdatePermissionInput,
    UpdateRoleInput,
};
use crate::role::service::RoleService;
use crate::shared::api_common::{ApiResponse, JsonBody, QueryParams};
use crate::shared::error::PlatformError;
use crate::shared::middleware::RequireAdmin;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SetPermissionsRequest {
    pub permissions: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionsQuery {
    pub resource: Option<String>,
}

#[derive(Clone)]
pub struct RolesState {
    pub roles: RoleService,
}

pub async fn list_roles(
    State(state): State<RolesState>,
    _admin: RequireAdmin,
) -> Result<ApiResponse<Vec<RoleResponse>>, PlatformError> {
    let roles = state.roles.list_roles().await?;
    Ok(ApiResponse::ok(roles.into_iter().map(Into::into).collect()))
}

pub async fn get_role(
    State(state): State<RolesState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<ApiResponse<RoleResponse>, PlatformError> {
    Ok(ApiResponse::ok(state.roles.get_role(&id).await?.into()))
}

pub async fn create_role(
    State(state): State<RolesState>,
    admin: RequireAdmin,
    JsonBody(input): JsonBody<CreateRoleInput>,
) -> Result<ApiResponse<RoleResponse>, PlatformError> {
    let role = state.roles.create_role(input, &admin).await?;
    Ok(ApiResponse::created(role.into()).with_message("Role created"))
}

pub async fn update_role(
    State(state): State<RolesState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<UpdateRoleInput>,
) -> Result<ApiResponse<RoleResponse>, PlatformError> {
    let role = state.roles.update_role(&id, patch, &admin).await?;
    Ok(ApiResponse::ok(role.into()).with_message("Role updated"))
}

pub async fn set_role_permissions(
    State(state): State<RolesState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<SetPermissionsRequest>,
) -> Result<ApiResponse<RoleResponse>, PlatformError> {
    let role = state.roles.set_role_permissions(&id, req.permissions, &admin).await?;
    Ok(ApiResponse::ok(role.into()).with_message("Permissions updated"))
}

pub async fn delete_role(
    State(state): State<RolesState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, PlatformError> {
    state.roles.delete_role(&id, &admin).await?;
    Ok(ApiResponse::message("Role deleted"))
}

pub async fn list_permissions(
    State(state): State<RolesState>,
    _admin: RequireAdmin,
    QueryParams(query): QueryParams<PermissionsQuery>,
) -> Result<ApiResponse<Vec<PermissionResponse>>, PlatformError> {
    let resource = query.resource.as_deref().map(str::trim).filter(|r| !r.is_empty());
    let permissions = state.roles.list_permissions(resource).await?;
    Ok(ApiResponse::ok(permissions.into_iter().map(Into::into).collect()))
}

pub async fn get_permission(
    State(state): State<RolesState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<ApiResponse<PermissionResponse>, PlatformError> {
    Ok(ApiResponse::ok(state.roles.get_permission(&id).await?.into()))
}

pub async fn create_permission(
    State(state): State<RolesState>,
    admin: RequireAdmin,
    JsonBody(input): JsonBody<CreatePermissionInput>,
) -> Result<ApiResponse<PermissionResponse>, PlatformError> {
    let permission = state.roles.create_permission(input, &admin).await?;
    Ok(ApiResponse::created(permission.into()).with_message("Permission created"))
}

pub async fn update_permission(
    State(state): State<RolesState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<UpdatePermissionInput>,
) -> Result<ApiResponse<PermissionResponse>, PlatformError> {
    let permission = state.roles.update_permission(&id, patch, &admin).await?;
    Ok(ApiResponse::ok(permission.into()).with_message("Permission updated"))
}

pub async fn delete_permission(
    State(state): State<RolesState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, PlatformError> {
    state.roles.delete_permission(&id, &admin).await?;
    Ok(ApiResponse::message("Permission deleted"))
}

pub fn roles_admin_router(state: RolesState) -> Router {
    Router::new()
        .route("/", get(list_roles).post(create_role))
        .route("/:id", get(get_role).put(update_role).delete(delete_role))
        .route("/:id/permissions", put(set_role_permissions))
        .with_state(state)
}

pub fn permissions_admin_router(state: RolesState) -> Router {
    Router::new()
        .route("/", get(list_permissions).post(create_permission))
        .route("/:id", get(get_permission).put(update_permission).delete(delete_permission))
        .with_state(state)
}
