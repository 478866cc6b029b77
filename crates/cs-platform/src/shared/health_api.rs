//! Health Check Endpoint
//!
//! `GET /health` pings MongoDB and reports uptime. Answers 503 when the
//! database is unreachable.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use cs_common::ServiceInfo;
use serde::Serialize;
use utoipa::ToSchema;

use crate::shared::api_common::ApiResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Up,
    Down,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub database: HealthStatus,
    pub timestamp: String,
    pub uptime_secs: i64,
    pub service: String,
    pub version: String,
    /// Ping failure detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Clone)]
pub struct HealthState {
    pub db: Option<mongodb::Database>,
    pub service: ServiceInfo,
}

impl HealthState {
    pub fn new(db: Option<mongodb::Database>, service: ServiceInfo) -> Self {
        Self { db, service }
    }
}

async fn ping(db: &mongodb::Database) -> Result<(), String> {
    db.run_command(mongodb::bson::doc! { "ping": 1 })
        .await
        .map(|_| ())
        .map_err(|e| format!("Connection failed: {}", e))
}

pub async fn get_health(State(state): State<HealthState>) -> Response {
    let (database, message) = match &state.db {
        Some(db) => match ping(db).await {
            Ok(()) => (HealthStatus::Up, None),
            Err(e) => (HealthStatus::Down, Some(e)),
        },
        None => (HealthStatus::Up, None),
    };

    let now = Utc::now();
    let body = HealthResponse {
        status: database,
        database,
        timestamp: now.to_rfc3339(),
        uptime_secs: state.service.uptime_secs(now),
        service: state.service.name.clone(),
        version: state.service.version.clone(),
        message,
    };

    let status_code = if database == HealthStatus::Down {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (status_code, ApiResponse::ok(body)).into_response()
}

pub fn health_router(state: HealthState) -> Router {
    Router::new().route("/", get(get_health)).with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_without_database() {
        let app = health_router(HealthState::new(None, ServiceInfo::new("cs-server", "1.0.0")));
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["status"], "UP");
        assert_eq!(json["data"]["version"], "1.0.0");
    }
}
