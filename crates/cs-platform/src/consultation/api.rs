//! Consultation API

use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Router,
};
use bson::Document;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::consultation::entity::{
    ConsultationReceipt, ConsultationResponse, ConsultationStatus, ConsultationType, CreateConsultationInput,
    LeadSource, UpdateConsultationInput,
};
use crate::consultation::repository::ConsultationStats;
use crate::consultation::service::ConsultationService;
use crate::shared::api_common::{
    ApiResponse, AssignRequest, JsonBody, NoteRequest, PaginationParams, QueryParams,
};
use crate::shared::error::PlatformError;
use crate::shared::middleware::{ClientMeta, RequireAdmin};
use crate::shared::query::{parse_datetime, FilterBuilder};
use crate::shared::types::Priority;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationsQuery {
    #[serde(flatten)]
    pub pagination: PaginationParams,
    pub q: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    #[serde(alias = "consultationType")]
    pub r#type: Option<String>,
    pub source: Option<String>,
    pub assigned_to: Option<String>,
    pub project_id: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl ConsultationsQuery {
    pub fn to_filter(&self) -> Document {
        FilterBuilder::new()
            .text(self.q.as_deref(), &["fullName", "email", "phone", "message"])
            .enum_value::<ConsultationStatus>("status", self.status.as_deref())
            .enum_value::<Priority>("priority", self.priority.as_deref())
            .enum_value::<ConsultationType>("consultationType", self.r#type.as_deref())
            .enum_value::<LeadSource>("source", self.source.as_deref())
            .reference("assignedTo", self.assigned_to.as_deref())
            .reference("projectId", self.project_id.as_deref())
            .date_range(
                "createdAt",
                parse_datetime(self.from.as_deref()),
                parse_datetime(self.to.as_deref()),
            )
            .build()
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ConsultationStatusRequest {
    pub status: ConsultationStatus,
}

#[derive(Clone)]
pub struct ConsultationState {
    pub consultations: ConsultationService,
}

pub async fn submit_consultation(
    State(state): State<ConsultationState>,
    client: ClientMeta,
    JsonBody(input): JsonBody<CreateConsultationInput>,
) -> Result<ApiResponse<ConsultationReceipt>, PlatformError> {
    let request = state.consultations.submit(input, client).await?;
    Ok(ApiResponse::created(ConsultationReceipt::from(&request))
        .with_message("Your request has been received; our consultants will contact you soon"))
}

pub async fn list_consultations(
    State(state): State<ConsultationState>,
    _admin: RequireAdmin,
    QueryParams(query): QueryParams<ConsultationsQuery>,
) -> Result<ApiResponse<Vec<ConsultationResponse>>, PlatformError> {
    let page = state
        .consultations
        .search(query.to_filter(), query.pagination.to_request())
        .await?;
    Ok(ApiResponse::paginated(page.map(Into::into)))
}

pub async fn overdue_follow_ups(
    State(state): State<ConsultationState>,
    _admin: RequireAdmin,
    QueryParams(pagination): QueryParams<PaginationParams>,
) -> Result<ApiResponse<Vec<ConsultationResponse>>, PlatformError> {
    let page = state.consultations.overdue(pagination.to_request()).await?;
    Ok(ApiResponse::paginated(page.map(Into::into)))
}

pub async fn get_consultation(
    State(state): State<ConsultationState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<ApiResponse<ConsultationResponse>, PlatformError> {
    Ok(ApiResponse::ok(state.consultations.get(&id).await?.into()))
}

pub async fn update_consultation(
    State(state): State<ConsultationState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<UpdateConsultationInput>,
) -> Result<ApiResponse<ConsultationResponse>, PlatformError> {
    let request = state.consultations.update(&id, patch, &admin).await?;
    Ok(ApiResponse::ok(request.into()).with_message("Consultation updated"))
}

pub async fn update_consultation_status(
    State(state): State<ConsultationState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<ConsultationStatusRequest>,
) -> Result<ApiResponse<ConsultationResponse>, PlatformError> {
    let request = state.consultations.change_status(&id, body.status, &admin).await?;
    Ok(ApiResponse::ok(request.into()).with_message("Status updated"))
}

pub async fn assign_consultation(
    State(state): State<ConsultationState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<AssignRequest>,
) -> Result<ApiResponse<ConsultationResponse>, PlatformError> {
    let request = state.consultations.assign(&id, body.assigned_to, &admin).await?;
    Ok(ApiResponse::ok(request.into()).with_message("Assignment updated"))
}

pub async fn add_consultation_note(
    State(state): State<ConsultationState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<NoteRequest>,
) -> Result<ApiResponse<ConsultationResponse>, PlatformError> {
    let request = state.consultations.add_note(&id, body.content, &admin).await?;
    Ok(ApiResponse::ok(request.into()).with_message("Note added"))
}

pub async fn delete_consultation(
    State(state): State<ConsultationState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, PlatformError> {
    state.consultations.delete(&id, &admin).await?;
    Ok(ApiResponse::message("Consultation deleted"))
}

pub async fn consultation_stats(
    State(state): State<ConsultationState>,
    _admin: RequireAdmin,
) -> Result<ApiResponse<ConsultationStats>, PlatformError> {
    Ok(ApiResponse::ok(state.consultations.stats().await?))
}

pub fn consultations_router(state: ConsultationState) -> Router {
    Router::new().route("/", post(submit_consultation)).with_state(state)
}

pub fn consultations_admin_router(state: ConsultationState) -> Router {
    Router::new()
        .route("/", get(list_consultations))
        .route("/stats", get(consultation_stats))
        .route("/follow-ups", get(overdue_follow_ups))
        .route(
            "/:id",
            get(get_consultation).put(update_consultation).delete(delete_consultation),
        )
        .route("/:id/status", put(update_consultation_status))
        .route("/:id/assign", put(assign_consultation))
        .route("/:id/notes", post(add_consultation_note))
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
        let uri: Uri = "/?type=investment&source=zalo&assignedTo=bad".parse().unwrap();
        let q = Query::<ConsultationsQuery>::try_from_uri(&uri).unwrap().0;
        let filter = q.to_filter();
        let and = filter.get_array("$and").unwrap();
        assert_eq!(and.len(), 2);
        assert!(and.contains(&bson::Bson::Document(doc! { "source": "zalo" })));
    }

    #[test]
    fn test_create_input_rejects_unknown_fields() {
        let body = r#"{"fullName":"A B","email":"a@b.vn","phone":"0912345678","status":"converted"}"#;
        assert!(serde_json::from_str::<CreateConsultationInput>(body).is_err());
    }
}
