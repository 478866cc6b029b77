//! Dashboard API

use axum::{extract::State, routing::get, Router};

use crate::dashboard::service::{DashboardOverview, DashboardService};
use crate::shared::api_common::ApiResponse;
use crate::shared::error::PlatformError;
use crate::shared::middleware::RequireAdmin;

#[derive(Clone)]
pub struct DashboardState {
    pub dashboard: DashboardService,
}

pub async fn dashboard_overview(
    State(state): State<DashboardState>,
    _admin: RequireAdmin,
) -> Result<ApiResponse<DashboardOverview>, PlatformError> {
    Ok(ApiResponse::ok(state.dashboard.overview().await?))
}

pub fn dashboard_admin_router(state: DashboardState) -> Router {
    Router::new().route("/overview", get(dashboard_overview)).with_state(state)
}
