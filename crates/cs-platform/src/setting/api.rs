//! Site Setting API

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::setting::entity::{BulkSettingEntry, SettingGroup, SettingResponse, UpsertSettingInput};
use crate::setting::service::SettingService;
use crate::shared::api_common::{ApiResponse, JsonBody, QueryParams};
use crate::shared::error::PlatformError;
use crate::shared::middleware::RequireAdmin;
use crate::shared::query::parse_enum;

#[derive(Debug, Default, Deserialize)]
pub struct GroupQuery {
    pub group: Option<String>,
}

impl GroupQuery {
    pub fn group(&self) -> Option<SettingGroup> {
        self.group.as_deref().and_then(parse_enum::<SettingGroup>)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct BulkSettingsRequest {
    pub settings: Vec<BulkSettingEntry>,
}

#[derive(Clone)]
pub struct SettingState {
    pub settings: SettingService,
}

pub async fn public_settings(
    State(state): State<SettingState>,
    QueryParams(query): QueryParams<GroupQuery>,
) -> Result<ApiResponse<BTreeMap<String, Value>>, PlatformError> {
    Ok(ApiResponse::ok(state.settings.public_values(query.group()).await?))
}

pub async fn list_settings(
    State(state): State<SettingState>,
    _admin: RequireAdmin,
    QueryParams(query): QueryParams<GroupQuery>,
) -> Result<ApiResponse<Vec<SettingResponse>>, PlatformError> {
    let settings = state.settings.list(query.group()).await?;
    Ok(ApiResponse::ok(settings.into_iter().map(Into::into).collect()))
}

pub async fn get_setting(
    State(state): State<SettingState>,
    _admin: RequireAdmin,
    Path(key): Path<String>,
) -> Result<ApiResponse<SettingResponse>, PlatformError> {
    Ok(ApiResponse::ok(state.settings.get(&key).await?.into()))
}

pub async fn upsert_setting(
    State(state): State<SettingState>,
    admin: RequireAdmin,
    Path(key): Path<String>,
    JsonBody(input): JsonBody<UpsertSettingInput>,
) -> Result<ApiResponse<SettingResponse>, PlatformError> {
    let (setting, created) = state.settings.upsert(&key, input, &admin).await?;
    Ok(if created {
        ApiResponse::created(setting.into()).with_message("Setting created")
    } else {
        ApiResponse::ok(setting.into()).with_message("Setting updated")
    })
}

pub async fn bulk_update_settings(
    State(state): State<SettingState>,
    admin: RequireAdmin,
    JsonBody(body): JsonBody<BulkSettingsRequest>,
) -> Result<ApiResponse<Vec<SettingResponse>>, PlatformError> {
    let saved = state.settings.bulk_upsert(body.settings, &admin).await?;
    let count = saved.len();
    Ok(ApiResponse::ok(saved.into_iter().map(Into::into).collect())
        .with_message(format!("{} setting(s) saved", count)))
}

pub async fn delete_setting(
    State(state): State<SettingState>,
    admin: RequireAdmin,
    Path(key): Path<String>,
) -> Result<ApiResponse<()>, PlatformError> {
    state.settings.delete(&key, &admin).await?;
    Ok(ApiResponse::message("Setting deleted"))
}

pub fn settings_router(state: SettingState) -> Router {
    Router::new().route("/public", get(public_settings)).with_state(state)
}

pub fn settings_admin_router(state: SettingState) -> Router {
    Router::new()
        .route("/", get(list_settings).put(bulk_update_settings))
        .route("/:key", get(get_setting).put(upsert_setting).delete(delete_setting))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_query() {
        let q = GroupQuery { group: Some("seo".to_string()) };
        assert_eq!(q.group(), Some(SettingGroup::Seo));
        let q = GroupQuery { group: Some("billing".to_string()) };
        assert_eq!(q.group(), None);
    }

    #[test]
    fn test_bulk_body() {
        let body = r#"{"settings":[{"key":"site.name","value":"Corp","isPublic":true},{"key":"home.items","value":6}]}"#;
        let parsed: BulkSettingsRequest = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.settings.len(), 2);
        assert!(serde_json::from_str::<BulkSettingsRequest>(r#"{"settings":[{"key":"a.b","value":1,"x":1}]}"#).is_err());
    }
}
