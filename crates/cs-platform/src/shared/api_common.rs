//! Common API types and utilities
//!
//! Every endpoint answers with the same envelope:
//! `{ success, data?, pagination?, message? }` on success and
//! `{ success: false, message, error? }` on failure (see [`PlatformError`]).

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Json, Query, Request},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::shared::error::PlatformError;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Lenient deserializers for query strings.
///
/// Flattened query structs receive every value as a string, so numbers and
/// booleans are accepted in either form.
pub mod query_de {
    use serde::{de, Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw<T> {
        Typed(T),
        Str(String),
    }

    pub fn u64_opt<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Raw<u64>>::deserialize(deserializer)? {
            Some(Raw::Typed(n)) => Ok(Some(n)),
            Some(Raw::Str(s)) if s.trim().is_empty() => Ok(None),
            Some(Raw::Str(s)) => s.trim().parse().map(Some).map_err(de::Error::custom),
            None => Ok(None),
        }
    }

    pub fn f64_opt<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Raw<f64>>::deserialize(deserializer)? {
            Some(Raw::Typed(n)) => Ok(Some(n)),
            Some(Raw::Str(s)) if s.trim().is_empty() => Ok(None),
            Some(Raw::Str(s)) => s.trim().parse().map(Some).map_err(de::Error::custom),
            None => Ok(None),
        }
    }

    pub fn bool_opt<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Raw<bool>>::deserialize(deserializer)? {
            Some(Raw::Typed(b)) => Ok(Some(b)),
            Some(Raw::Str(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(Some(true)),
                "false" | "0" | "no" => Ok(Some(false)),
                // "all" and anything unrecognised means "no filter"
                _ => Ok(None),
            },
            None => Ok(None),
        }
    }
}

/// Pagination parameters (`page` is 1-based)
#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    #[serde(default, deserialize_with = "query_de::u64_opt")]
    pub page: Option<u64>,
    #[serde(default, alias = "size", deserialize_with = "query_de::u64_opt")]
    pub limit: Option<u64>,
}

impl PaginationParams {
    pub fn to_request(&self) -> PageRequest {
        PageRequest::new(self.page.unwrap_or(1), self.limit.unwrap_or(DEFAULT_PAGE_SIZE))
    }
}

/// `?limit=` for short, unpaginated lists such as "featured"
#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    #[serde(default, deserialize_with = "query_de::u64_opt")]
    pub limit: Option<u64>,
}

impl LimitQuery {
    /// Requested limit clamped to `1..=50`.
    pub fn or(&self, default: u64) -> i64 {
        self.limit.unwrap_or(default).clamp(1, 50) as i64
    }
}

/// `PUT /:id/assign` body; `null` unassigns
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AssignRequest {
    pub assigned_to: Option<String>,
}

/// `POST /:id/notes` body
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct NoteRequest {
    pub content: String,
}

/// A normalized page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    /// Clamp to `page >= 1` and `1 <= limit <= 100`. The page is also capped
    /// so that `skip()` fits the store's signed 64-bit offset.
    pub fn new(page: u64, limit: u64) -> Self {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let last_page = i64::MAX as u64 / limit + 1;
        Self {
            page: page.clamp(1, last_page),
            limit,
        }
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Whether the page starts at or after the last of `total` rows.
    pub fn is_past(&self, total: u64) -> bool {
        self.skip() >= total
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

/// One page of results plus the total row count for the filter.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            limit: request.limit,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
        }
    }

    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.limit, self.total)
    }
}

/// Pagination block of the envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub pages: u64,
}

impl Pagination {
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        let pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self { page, limit, total, pages }
    }
}

/// Success envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    #[serde(skip)]
    status: StatusCode,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            success: true,
            data: Some(data),
            pagination: None,
            message: None,
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::ok(data)
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl<T> ApiResponse<Vec<T>> {
    pub fn paginated(page: Page<T>) -> Self {
        let pagination = page.pagination();
        Self {
            pagination: Some(pagination),
            ..Self::ok(page.items)
        }
    }
}

impl ApiResponse<()> {
    /// Envelope carrying only a message (deletes, acknowledgements).
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            success: true,
            data: None,
            pagination: None,
            message: Some(message.into()),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, axum::Json(self)).into_response()
    }
}

/// JSON body extractor that reports malformed or unknown-field bodies through
/// the failure envelope instead of axum's plain-text rejection.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = PlatformError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(PlatformError::validation(rejection.body_text())),
        }
    }
}

/// Query string extractor with the same error behaviour as [`JsonBody`].
pub struct QueryParams<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = PlatformError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(QueryParams(value)),
            Err(rejection) => Err(PlatformError::validation(rejection.body_text())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_clamps() {
        assert_eq!(PageRequest::new(0, 0), PageRequest { page: 1, limit: 1 });
        assert_eq!(PageRequest::new(3, 500), PageRequest { page: 3, limit: 100 });
        assert_eq!(PageRequest::new(3, 20).skip(), 40);
        assert_eq!(PaginationParams::default().to_request(), PageRequest { page: 1, limit: 10 });
    }

    #[test]
    fn test_huge_page_skip_fits_signed_offset() {
        let request = PageRequest::new(100_000_000_000_000_000, 100);
        assert!(request.skip() <= i64::MAX as u64);
        assert!(i64::try_from(request.skip()).is_ok());
        assert!(request.is_past(1_000_000));

        let request = PageRequest::new(u64::MAX, 1);
        assert_eq!(request.skip(), i64::MAX as u64);

        assert!(!PageRequest::new(2, 10).is_past(11));
        assert!(PageRequest::new(2, 10).is_past(10));
    }

    #[test]
    fn test_pages_is_ceiling() {
        assert_eq!(Pagination::new(1, 10, 0).pages, 0);
        assert_eq!(Pagination::new(1, 10, 10).pages, 1);
        assert_eq!(Pagination::new(1, 10, 11).pages, 2);
        assert_eq!(Pagination::new(7, 10, 11).pages, 2);
    }

    #[test]
    fn test_envelope_shape() {
        let page = Page::new(vec![1, 2], 12, PageRequest::new(2, 2));
        let body = serde_json::to_value(ApiResponse::paginated(page)).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"], serde_json::json!([1, 2]));
        assert_eq!(body["pagination"]["pages"], 6);
        assert!(body.get("message").is_none());
        assert!(body.get("status").is_none());

        let created = ApiResponse::created("x");
        assert_eq!(created.status(), StatusCode::CREATED);

        let msg = serde_json::to_value(ApiResponse::message("Deleted")).unwrap();
        assert_eq!(msg, serde_json::json!({"success": true, "message": "Deleted"}));
    }

    #[test]
    fn test_lenient_query_values() {
        #[derive(Deserialize)]
        struct Q {
            #[serde(flatten)]
            pagination: PaginationParams,
            #[serde(default, deserialize_with = "query_de::bool_opt")]
            featured: Option<bool>,
            #[serde(default, deserialize_with = "query_de::f64_opt")]
            min_price: Option<f64>,
        }

        let q: Q = serde_urlencoded_like("page=2&limit=5&featured=true&min_price=1.5");
        assert_eq!(q.pagination.to_request(), PageRequest { page: 2, limit: 5 });
        assert_eq!(q.featured, Some(true));
        assert_eq!(q.min_price, Some(1.5));

        let q: Q = serde_urlencoded_like("featured=all");
        assert_eq!(q.featured, None);
    }

    fn serde_urlencoded_like<T: DeserializeOwned>(query: &str) -> T {
        let uri: axum::http::Uri = format!("/?{}", query).parse().unwrap();
        Query::<T>::try_from_uri(&uri).unwrap().0
    }
}
