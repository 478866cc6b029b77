//! Contact API
//!
//! `POST /contact` is public; everything else is admin triage.

use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Router,
};
use bson::Document;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::contact::entity::{
    ContactReceipt, ContactResponse, ContactStatus, CreateContactInput, InquiryType, UpdateContactInput,
};
use crate::contact::repository::ContactStats;
use crate::contact::service::ContactService;
use crate::shared::api_common::{
    ApiResponse, AssignRequest, JsonBody, NoteRequest, PaginationParams, QueryParams,
};
use crate::shared::error::PlatformError;
use crate::shared::middleware::{ClientMeta, RequireAdmin};
use crate::shared::query::{parse_datetime, FilterBuilder};
use crate::shared::types::Priority;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactsQuery {
    #[serde(flatten)]
    pub pagination: PaginationParams,
    pub q: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub inquiry_type: Option<String>,
    pub assigned_to: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl ContactsQuery {
    pub fn to_filter(&self) -> Document {
        FilterBuilder::new()
            .text(self.q.as_deref(), &["name", "email", "phone", "subject", "message"])
            .enum_value::<ContactStatus>("status", self.status.as_deref())
            .enum_value::<Priority>("priority", self.priority.as_deref())
            .enum_value::<InquiryType>("inquiryType", self.inquiry_type.as_deref())
            .reference("assignedTo", self.assigned_to.as_deref())
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
pub struct ContactStatusRequest {
    pub status: ContactStatus,
}

#[derive(Clone)]
pub struct ContactState {
    pub contacts: ContactService,
}

pub async fn submit_contact(
    State(state): State<ContactState>,
    client: ClientMeta,
    JsonBody(input): JsonBody<CreateContactInput>,
) -> Result<ApiResponse<ContactReceipt>, PlatformError> {
    let message = state.contacts.submit(input, client).await?;
    Ok(ApiResponse::created(ContactReceipt::from(&message))
        .with_message("Thank you, we will get back to you shortly"))
}

pub async fn list_contacts(
    State(state): State<ContactState>,
    _admin: RequireAdmin,
    QueryParams(query): QueryParams<ContactsQuery>,
) -> Result<ApiResponse<Vec<ContactResponse>>, PlatformError> {
    let page = state.contacts.search(query.to_filter(), query.pagination.to_request()).await?;
    Ok(ApiResponse::paginated(page.map(Into::into)))
}

pub async fn get_contact(
    State(state): State<ContactState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<ApiResponse<ContactResponse>, PlatformError> {
    Ok(ApiResponse::ok(state.contacts.open(&id).await?.into()))
}

pub async fn update_contact(
    State(state): State<ContactState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<UpdateContactInput>,
) -> Result<ApiResponse<ContactResponse>, PlatformError> {
    let message = state.contacts.update(&id, patch, &admin).await?;
    Ok(ApiResponse::ok(message.into()).with_message("Contact updated"))
}

pub async fn update_contact_status(
    State(state): State<ContactState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<ContactStatusRequest>,
) -> Result<ApiResponse<ContactResponse>, PlatformError> {
    let message = state.contacts.change_status(&id, body.status, &admin).await?;
    Ok(ApiResponse::ok(message.into()).with_message("Status updated"))
}

pub async fn assign_contact(
    State(state): State<ContactState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<AssignRequest>,
) -> Result<ApiResponse<ContactResponse>, PlatformError> {
    let message = state.contacts.assign(&id, body.assigned_to, &admin).await?;
    Ok(ApiResponse::ok(message.into()).with_message("Assignment updated"))
}

pub async fn add_contact_note(
    State(state): State<ContactState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<NoteRequest>,
) -> Result<ApiResponse<ContactResponse>, PlatformError> {
    let message = state.contacts.add_note(&id, body.content, &admin).await?;
    Ok(ApiResponse::ok(message.into()).with_message("Note added"))
}

pub async fn delete_contact(
    State(state): State<ContactState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, PlatformError> {
    state.contacts.delete(&id, &admin).await?;
    Ok(ApiResponse::message("Contact deleted"))
}

pub async fn contact_stats(
    State(state): State<ContactState>,
    _admin: RequireAdmin,
) -> Result<ApiResponse<ContactStats>, PlatformError> {
    Ok(ApiResponse::ok(state.contacts.stats().await?))
}

pub fn contact_router(state: ContactState) -> Router {
    Router::new().route("/", post(submit_contact)).with_state(state)
}

pub fn contact_admin_router(state: ContactState) -> Router {
    Router::new()
        .route("/", get(list_contacts))
        .route("/stats", get(contact_stats))
        .route("/:id", get(get_contact).put(update_contact).delete(delete_contact))
        .route("/:id/status", put(update_contact_status))
        .route("/:id/assign", put(assign_contact))
        .route("/:id/notes", post(add_contact_note))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::Uri;
    use bson::doc;

    #[test]
    fn test_filter_drops_unknown_enums() {
        let uri: Uri = "/?status=read&priority=critical&inquiryType=project".parse().unwrap();
        let q = Query::<ContactsQuery>::try_from_uri(&uri).unwrap().0;
        let filter = q.to_filter();
        let and = filter.get_array("$and").unwrap();
        assert_eq!(and.len(), 2);
        assert!(and.contains(&bson::Bson::Document(doc! { "status": "read" })));
    }

    #[test]
    fn test_status_request_rejects_unknown_value() {
        assert!(serde_json::from_str::<ContactStatusRequest>(r#"{"status":"archived"}"#).is_err());
        assert!(serde_json::from_str::<ContactStatusRequest>(r#"{"status":"replied"}"#).is_ok());
    }
}
