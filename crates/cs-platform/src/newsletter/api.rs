//! Newsletter API

use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Router,
};
use bson::Document;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::newsletter::entity::{
    Interest, SubscribeInput, SubscriberResponse, SubscriberStatus, SubscriptionReceipt, UnsubscribeInput,
};
use crate::newsletter::repository::NewsletterStats;
use crate::newsletter::service::{NewsletterService, SubscribeOutcome};
use crate::shared::api_common::{ApiResponse, JsonBody, PaginationParams, QueryParams};
use crate::shared::error::PlatformError;
use crate::shared::middleware::{ClientMeta, RequireAdmin};
use crate::shared::query::{parse_datetime, FilterBuilder};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribersQuery {
    #[serde(flatten)]
    pub pagination: PaginationParams,
    pub q: Option<String>,
    pub status: Option<String>,
    pub interest: Option<String>,
    pub source: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl SubscribersQuery {
    pub fn to_filter(&self) -> Document {
        FilterBuilder::new()
            .text(self.q.as_deref(), &["email", "name"])
            .enum_value::<SubscriberStatus>("status", self.status.as_deref())
            .enum_value::<Interest>("interests", self.interest.as_deref())
            .equals_ci("source", self.source.as_deref())
            .date_range(
                "subscribedAt",
                parse_datetime(self.from.as_deref()),
                parse_datetime(self.to.as_deref()),
            )
            .build()
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct SubscriberStatusRequest {
    pub status: SubscriberStatus,
}

#[derive(Clone)]
pub struct NewsletterState {
    pub newsletter: NewsletterService,
}

pub async fn subscribe(
    State(state): State<NewsletterState>,
    client: ClientMeta,
    JsonBody(input): JsonBody<SubscribeInput>,
) -> Result<ApiResponse<SubscriptionReceipt>, PlatformError> {
    let (subscriber, outcome) = state.newsletter.subscribe(input, client).await?;
    let receipt = SubscriptionReceipt::from(&subscriber);
    Ok(match outcome {
        SubscribeOutcome::Created => ApiResponse::created(receipt).with_message("Subscribed successfully"),
        SubscribeOutcome::Resubscribed => ApiResponse::ok(receipt).with_message("Welcome back, you are subscribed again"),
        SubscribeOutcome::AlreadySubscribed => ApiResponse::ok(receipt).with_message("You are already subscribed"),
    })
}

pub async fn unsubscribe(
    State(state): State<NewsletterState>,
    JsonBody(input): JsonBody<UnsubscribeInput>,
) -> Result<ApiResponse<()>, PlatformError> {
    state.newsletter.unsubscribe(&input.email).await?;
    Ok(ApiResponse::message("You have been unsubscribed"))
}

pub async fn list_subscribers(
    State(state): State<NewsletterState>,
    _admin: RequireAdmin,
    QueryParams(query): QueryParams<SubscribersQuery>,
) -> Result<ApiResponse<Vec<SubscriberResponse>>, PlatformError> {
    let page = state
        .newsletter
        .search(query.to_filter(), query.pagination.to_request())
        .await?;
    Ok(ApiResponse::paginated(page.map(Into::into)))
}

pub async fn get_subscriber(
    State(state): State<NewsletterState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<ApiResponse<SubscriberResponse>, PlatformError> {
    Ok(ApiResponse::ok(state.newsletter.get(&id).await?.into()))
}

pub async fn update_subscriber_status(
    State(state): State<NewsletterState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<SubscriberStatusRequest>,
) -> Result<ApiResponse<SubscriberResponse>, PlatformError> {
    let subscriber = state.newsletter.change_status(&id, body.status, &admin).await?;
    Ok(ApiResponse::ok(subscriber.into()).with_message("Status updated"))
}

pub async fn delete_subscriber(
    State(state): State<NewsletterState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, PlatformError> {
    state.newsletter.delete(&id, &admin).await?;
    Ok(ApiResponse::message("Subscriber deleted"))
}

pub async fn newsletter_stats(
    State(state): State<NewsletterState>,
    _admin: RequireAdmin,
) -> Result<ApiResponse<NewsletterStats>, PlatformError> {
    Ok(ApiResponse::ok(state.newsletter.stats().await?))
}

pub fn newsletter_router(state: NewsletterState) -> Router {
    Router::new()
        .route("/subscribe", post(subscribe))
        .route("/unsubscribe", post(unsubscribe))
        .with_state(state)
}

pub fn newsletter_admin_router(state: NewsletterState) -> Router {
    Router::new()
        .route("/", get(list_subscribers))
        .route("/stats", get(newsletter_stats))
        .route("/:id", get(get_subscriber).delete(delete_subscriber))
        .route("/:id/status", put(update_subscriber_status))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::Uri;
    use bson::doc;

    #[test]
    fn test_interest_filter_matches_array_member() {
        let uri: Uri = "/?interest=ginseng&status=all".parse().unwrap();
        let q = Query::<SubscribersQuery>::try_from_uri(&uri).unwrap().0;
        assert_eq!(q.to_filter(), doc! { "interests": "ginseng" });
    }

    #[test]
    fn test_unknown_status_ignored() {
        let uri: Uri = "/?status=deleted".parse().unwrap();
        let q = Query::<SubscribersQuery>::try_from_uri(&uri).unwrap().0;
        assert!(q.to_filter().is_empty());
    }
}
