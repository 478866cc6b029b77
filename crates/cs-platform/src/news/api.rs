//! News API

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Router,
};
use bson::{doc, Document};
use serde::Deserialize;

use crate::news::entity::{
    ArticleResponse, ArticleStatus, CreateArticleInput, CreateNewsCategoryInput, NewsCategoryResponse,
    UpdateArticleInput, UpdateNewsCategoryInput,
};
use crate::news::repository::NewsStats;
use crate::news::service::NewsService;
use crate::shared::api_common::{query_de, ApiResponse, JsonBody, LimitQuery, PaginationParams, QueryParams};
use crate::shared::error::PlatformError;
use crate::shared::middleware::RequireAdmin;
use crate::shared::query::{parse_datetime, FilterBuilder};

const FEATURED_LIMIT: u64 = 5;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlesQuery {
    #[serde(flatten)]
    pub pagination: PaginationParams,
    pub q: Option<String>,
    #[serde(alias = "categoryId")]
    pub category: Option<String>,
    pub tag: Option<String>,
    #[serde(default, deserialize_with = "query_de::bool_opt")]
    pub featured: Option<bool>,
    /// Admin listings only
    pub status: Option<String>,
    pub author: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    /// `newest` (default), `oldest`, `views`, `title`
    pub sort: Option<String>,
}

impl ArticlesQuery {
    pub fn to_filter(&self) -> Document {
        self.builder().build()
    }

    pub fn to_admin_filter(&self) -> Document {
        self.builder()
            .enum_value::<ArticleStatus>("status", self.status.as_deref())
            .reference("author.id", self.author.as_deref())
            .build()
    }

    fn builder(&self) -> FilterBuilder {
        FilterBuilder::new()
            .text(self.q.as_deref(), &["title", "excerpt", "tags"])
            .reference("categoryId", self.category.as_deref())
            .contains("tags", self.tag.as_deref().map(str::to_lowercase).as_deref())
            .flag("isFeatured", self.featured)
            .date_range(
                "publishedAt",
                parse_datetime(self.from.as_deref()),
                parse_datetime(self.to.as_deref()),
            )
    }

    pub fn sort(&self) -> Document {
        match self.sort.as_deref().map(str::trim) {
            Some("oldest") => doc! { "publishedAt": 1, "createdAt": 1 },
            Some("views") => doc! { "viewCount": -1 },
            Some("title") => doc! { "title": 1 },
            _ => doc! { "publishedAt": -1, "createdAt": -1 },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsCategoriesQuery {
    #[serde(flatten)]
    pub pagination: PaginationParams,
    pub q: Option<String>,
    #[serde(default, deserialize_with = "query_de::bool_opt")]
    pub is_active: Option<bool>,
}

#[derive(Clone)]
pub struct NewsState {
    pub news: NewsService,
}

// ---- client ----

pub async fn list_articles(
    State(state): State<NewsState>,
    QueryParams(query): QueryParams<ArticlesQuery>,
) -> Result<ApiResponse<Vec<ArticleResponse>>, PlatformError> {
    let page = state
        .news
        .search_public(query.to_filter(), query.sort(), query.pagination.to_request())
        .await?;
    Ok(ApiResponse::paginated(page.map(Into::into)))
}

pub async fn featured_articles(
    State(state): State<NewsState>,
    QueryParams(query): QueryParams<LimitQuery>,
) -> Result<ApiResponse<Vec<ArticleResponse>>, PlatformError> {
    let articles = state.news.featured(query.or(FEATURED_LIMIT)).await?;
    Ok(ApiResponse::ok(articles.into_iter().map(Into::into).collect()))
}

pub async fn get_article_by_slug(
    State(state): State<NewsState>,
    Path(slug): Path<String>,
) -> Result<ApiResponse<ArticleResponse>, PlatformError> {
    Ok(ApiResponse::ok(state.news.view_by_slug(&slug).await?.into()))
}

pub async fn get_public_article(
    State(state): State<NewsState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<ArticleResponse>, PlatformError> {
    Ok(ApiResponse::ok(state.news.view_by_id(&id).await?.into()))
}

pub async fn list_categories(
    State(state): State<NewsState>,
) -> Result<ApiResponse<Vec<NewsCategoryResponse>>, PlatformError> {
    let categories = state.news.public_categories().await?;
    Ok(ApiResponse::ok(categories.into_iter().map(Into::into).collect()))
}

// ---- admin: articles ----

pub async fn admin_list_articles(
    State(state): State<NewsState>,
    _admin: RequireAdmin,
    QueryParams(query): QueryParams<ArticlesQuery>,
) -> Result<ApiResponse<Vec<ArticleResponse>>, PlatformError> {
    let page = state
        .news
        .search(query.to_admin_filter(), query.sort(), query.pagination.to_request())
        .await?;
    Ok(ApiResponse::paginated(page.map(Into::into)))
}

pub async fn admin_get_article(
    State(state): State<NewsState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<ApiResponse<ArticleResponse>, PlatformError> {
    Ok(ApiResponse::ok(state.news.get(&id).await?.into()))
}

pub async fn create_article(
    State(state): State<NewsState>,
    admin: RequireAdmin,
    JsonBody(input): JsonBody<CreateArticleInput>,
) -> Result<ApiResponse<ArticleResponse>, PlatformError> {
    let article = state.news.create(input, &admin).await?;
    Ok(ApiResponse::created(article.into()).with_message("Article created"))
}

pub async fn update_article(
    State(state): State<NewsState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<UpdateArticleInput>,
) -> Result<ApiResponse<ArticleResponse>, PlatformError> {
    let article = state.news.update(&id, patch, &admin).await?;
    Ok(ApiResponse::ok(article.into()).with_message("Article updated"))
}

pub async fn publish_article(
    State(state): State<NewsState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<ApiResponse<ArticleResponse>, PlatformError> {
    let article = state.news.publish(&id, &admin).await?;
    Ok(ApiResponse::ok(article.into()).with_message("Article published"))
}

pub async fn unpublish_article(
    State(state): State<NewsState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<ApiResponse<ArticleResponse>, PlatformError> {
    let article = state.news.unpublish(&id, &admin).await?;
    Ok(ApiResponse::ok(article.into()).with_message("Article unpublished"))
}

pub async fn delete_article(
    State(state): State<NewsState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, PlatformError> {
    state.news.delete(&id, &admin).await?;
    Ok(ApiResponse::message("Article deleted"))
}

pub async fn news_stats(
    State(state): State<NewsState>,
    _admin: RequireAdmin,
) -> Result<ApiResponse<NewsStats>, PlatformError> {
    Ok(ApiResponse::ok(state.news.stats().await?))
}

// ---- admin: categories ----

pub async fn admin_list_categories(
    State(state): State<NewsState>,
    _admin: RequireAdmin,
    QueryParams(query): QueryParams<NewsCategoriesQuery>,
) -> Result<ApiResponse<Vec<NewsCategoryResponse>>, PlatformError> {
    let filter = FilterBuilder::new()
        .text(query.q.as_deref(), &["name", "description"])
        .flag("isActive", query.is_active)
        .build();
    let page = state.news.search_categories(filter, query.pagination.to_request()).await?;
    Ok(ApiResponse::paginated(page.map(Into::into)))
}

pub async fn admin_get_category(
    State(state): State<NewsState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<ApiResponse<NewsCategoryResponse>, PlatformError> {
    Ok(ApiResponse::ok(state.news.get_category(&id).await?.into()))
}

pub async fn create_category(
    State(state): State<NewsState>,
    admin: RequireAdmin,
    JsonBody(input): JsonBody<CreateNewsCategoryInput>,
) -> Result<ApiResponse<NewsCategoryResponse>, PlatformError> {
    let category = state.news.create_category(input, &admin).await?;
    Ok(ApiResponse::created(category.into()).with_message("Category created"))
}

pub async fn update_category(
    State(state): State<NewsState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<UpdateNewsCategoryInput>,
) -> Result<ApiResponse<NewsCategoryResponse>, PlatformError> {
    let category = state.news.update_category(&id, patch, &admin).await?;
    Ok(ApiResponse::ok(category.into()).with_message("Category updated"))
}

pub async fn delete_category(
    State(state): State<NewsState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, PlatformError> {
    state.news.delete_category(&id, &admin).await?;
    Ok(ApiResponse::message("Category deleted"))
}

pub fn news_router(state: NewsState) -> Router {
    Router::new()
        .route("/", get(list_articles))
        .route("/featured", get(featured_articles))
        .route("/categories", get(list_categories))
        .route("/slug/:slug", get(get_article_by_slug))
        .route("/:id", get(get_public_article))
        .with_state(state)
}

pub fn news_admin_router(state: NewsState) -> Router {
    Router::new()
        .route("/", get(admin_list_articles).post(create_article))
        .route("/stats", get(news_stats))
        .route("/categories", get(admin_list_categories).post(create_category))
        .route(
            "/categories/:id",
            get(admin_get_category).put(update_category).delete(delete_category),
        )
        .route("/:id", get(admin_get_article).put(update_article).delete(delete_article))
        .route("/:id/publish", post(publish_article))
        .route("/:id/unpublish", post(unpublish_article))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::Uri;

    fn query(q: &str) -> ArticlesQuery {
        let uri: Uri = format!("/?{}", q).parse().unwrap();
        Query::<ArticlesQuery>::try_from_uri(&uri).unwrap().0
    }

    #[test]
    fn test_client_filter_cannot_request_drafts() {
        let q = query("status=draft&tag=BDS");
        assert_eq!(q.to_filter(), doc! { "tags": "bds" });
        let admin = q.to_admin_filter();
        assert_eq!(admin.get_array("$and").unwrap().len(), 2);
    }

    #[test]
    fn test_date_range() {
        let filter = query("from=2024-01-01&to=bogus").to_filter();
        let range = filter.get_document("publishedAt").unwrap();
        assert!(range.contains_key("$gte"));
        assert!(!range.contains_key("$lte"));
    }

    #[test]
    fn test_default_sort_newest_published() {
        assert_eq!(query("").sort(), doc! { "publishedAt": -1, "createdAt": -1 });
    }
}
