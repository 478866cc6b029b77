//! Analytics API

use axum::{extract::State, routing::{get, post}, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::analytics::entity::TrackEventInput;
use crate::analytics::repository::AnalyticsSummary;
use crate::analytics::service::AnalyticsService;
use crate::shared::api_common::{ApiResponse, JsonBody, QueryParams};
use crate::shared::error::PlatformError;
use crate::shared::middleware::{ClientMeta, RequireAdmin};
use crate::shared::query::parse_datetime;

#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TrackReceipt {
    pub id: String,
}

#[derive(Clone)]
pub struct AnalyticsState {
    pub analytics: AnalyticsService,
}

pub async fn track_event(
    State(state): State<AnalyticsState>,
    client: ClientMeta,
    JsonBody(input): JsonBody<TrackEventInput>,
) -> Result<ApiResponse<TrackReceipt>, PlatformError> {
    let event = state.analytics.track(input, client).await?;
    Ok(ApiResponse::created(TrackReceipt { id: event.id }))
}

pub async fn analytics_summary(
    State(state): State<AnalyticsState>,
    _admin: RequireAdmin,
    QueryParams(query): QueryParams<RangeQuery>,
) -> Result<ApiResponse<AnalyticsSummary>, PlatformError> {
    let summary = state
        .analytics
        .summary(parse_datetime(query.from.as_deref()), parse_datetime(query.to.as_deref()))
        .await?;
    Ok(ApiResponse::ok(summary))
}

pub fn analytics_router(state: AnalyticsState) -> Router {
    Router::new().route("/track", post(track_event)).with_state(state)
}

pub fn analytics_admin_router(state: AnalyticsState) -> Router {
    Router::new().route("/summary", get(analytics_summary)).with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::entity::EventType;

    #[test]
    fn test_track_body() {
        let body = r#"{"eventType":"form_submit","page":"/lien-he","sessionId":"abc","resourceType":"contact"}"#;
        let input: TrackEventInput = serde_json::from_str(body).unwrap();
        assert_eq!(input.event_type, EventType::FormSubmit);
        assert!(serde_json::from_str::<TrackEventInput>(r#"{"eventType":"hover","page":"/","sessionId":"a"}"#).is_err());
        assert!(serde_json::from_str::<TrackEventInput>(r#"{"eventType":"click","page":"/","sessionId":"a","ip":"1"}"#).is_err());
    }
}
