//! Ginseng Catalog API
//!
//! Client: products (list, featured, by slug, by id), categories, origins.
//! Admin: CRUD for all three plus product stats.

use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};
use bson::{doc, Document};
use serde::Deserialize;

use crate::ginseng::entity::{
    CategoryResponse, CreateCategoryInput, CreateOriginInput, CreateProductInput, GinsengGrade, OriginResponse,
    ProductResponse, ProductStatus, UpdateCategoryInput, UpdateOriginInput, UpdateProductInput,
};
use crate::ginseng::repository::ProductStats;
use crate::ginseng::service::GinsengService;
use crate::shared::api_common::{query_de, ApiResponse, JsonBody, LimitQuery, PaginationParams, QueryParams};
use crate::shared::error::PlatformError;
use crate::shared::middleware::RequireAdmin;
use crate::shared::query::FilterBuilder;

const FEATURED_LIMIT: u64 = 8;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductsQuery {
    #[serde(flatten)]
    pub pagination: PaginationParams,
    pub q: Option<String>,
    #[serde(alias = "categoryId")]
    pub category: Option<String>,
    #[serde(alias = "originId")]
    pub origin: Option<String>,
    pub grade: Option<String>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "query_de::bool_opt")]
    pub featured: Option<bool>,
    #[serde(default, deserialize_with = "query_de::f64_opt")]
    pub min_price: Option<f64>,
    #[serde(default, deserialize_with = "query_de::f64_opt")]
    pub max_price: Option<f64>,
    #[serde(default, deserialize_with = "query_de::u64_opt")]
    pub min_age: Option<u64>,
    #[serde(default, deserialize_with = "query_de::u64_opt")]
    pub max_age: Option<u64>,
    #[serde(default, deserialize_with = "query_de::bool_opt")]
    pub in_stock: Option<bool>,
    /// Admin listings only
    #[serde(default, deserialize_with = "query_de::bool_opt")]
    pub is_active: Option<bool>,
    /// `newest` (default), `price_asc`, `price_desc`, `name`, `views`
    pub sort: Option<String>,
}

impl ProductsQuery {
    pub fn to_filter(&self) -> Document {
        self.builder().build()
    }

    pub fn to_admin_filter(&self) -> Document {
        self.builder().flag("isActive", self.is_active).build()
    }

    fn builder(&self) -> FilterBuilder {
        let mut builder = FilterBuilder::new()
            .text(self.q.as_deref(), &["name", "sku", "shortDescription"])
            .reference("categoryId", self.category.as_deref())
            .reference("originId", self.origin.as_deref())
            .enum_value::<GinsengGrade>("grade", self.grade.as_deref())
            .enum_value::<ProductStatus>("status", self.status.as_deref())
            .flag("isFeatured", self.featured)
            .gte("price", self.min_price)
            .lte("price", self.max_price)
            .gte("ageYears", self.min_age.map(|v| v as f64))
            .lte("ageYears", self.max_age.map(|v| v as f64));
        match self.in_stock {
            Some(true) => builder = builder.raw(doc! { "stock": { "$gt": 0 } }),
            Some(false) => builder = builder.raw(doc! { "stock": 0 }),
            None => {}
        }
        builder
    }

    pub fn sort(&self) -> Document {
        match self.sort.as_deref().map(str::trim) {
            Some("price_asc") => doc! { "price": 1 },
            Some("price_desc") => doc! { "price": -1 },
            Some("name") => doc! { "name": 1 },
            Some("views") => doc! { "viewCount": -1 },
            _ => doc! { "createdAt": -1 },
        }
    }
}

/// Admin listing of categories or origins
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogQuery {
    #[serde(flatten)]
    pub pagination: PaginationParams,
    pub q: Option<String>,
    #[serde(default, deserialize_with = "query_de::bool_opt")]
    pub is_active: Option<bool>,
}

impl CatalogQuery {
    pub fn to_filter(&self, text_fields: &[&str]) -> Document {
        FilterBuilder::new()
            .text(self.q.as_deref(), text_fields)
            .flag("isActive", self.is_active)
            .build()
    }
}

#[derive(Clone)]
pub struct GinsengState {
    pub ginseng: GinsengService,
}

// ---- client ----

pub async fn list_products(
    State(state): State<GinsengState>,
    QueryParams(query): QueryParams<ProductsQuery>,
) -> Result<ApiResponse<Vec<ProductResponse>>, PlatformError> {
    let page = state
        .ginseng
        .search_public_products(query.to_filter(), query.sort(), query.pagination.to_request())
        .await?;
    Ok(ApiResponse::paginated(page.map(Into::into)))
}

pub async fn featured_products(
    State(state): State<GinsengState>,
    QueryParams(query): QueryParams<LimitQuery>,
) -> Result<ApiResponse<Vec<ProductResponse>>, PlatformError> {
    let products = state.ginseng.featured_products(query.or(FEATURED_LIMIT)).await?;
    Ok(ApiResponse::ok(products.into_iter().map(Into::into).collect()))
}

pub async fn get_product_by_slug(
    State(state): State<GinsengState>,
    Path(slug): Path<String>,
) -> Result<ApiResponse<ProductResponse>, PlatformError> {
    let product = state.ginseng.view_product_by_slug(&slug).await?;
    Ok(ApiResponse::ok(state.ginseng.product_detail(product).await?))
}

pub async fn get_public_product(
    State(state): State<GinsengState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<ProductResponse>, PlatformError> {
    let product = state.ginseng.get_public_product(&id).await?;
    Ok(ApiResponse::ok(state.ginseng.product_detail(product).await?))
}

pub async fn list_categories(
    State(state): State<GinsengState>,
) -> Result<ApiResponse<Vec<CategoryResponse>>, PlatformError> {
    let categories = state.ginseng.public_categories().await?;
    Ok(ApiResponse::ok(categories.into_iter().map(Into::into).collect()))
}

pub async fn get_category_by_slug(
    State(state): State<GinsengState>,
    Path(slug): Path<String>,
) -> Result<ApiResponse<CategoryResponse>, PlatformError> {
    Ok(ApiResponse::ok(state.ginseng.public_category_by_slug(&slug).await?.into()))
}

pub async fn list_origins(
    State(state): State<GinsengState>,
) -> Result<ApiResponse<Vec<OriginResponse>>, PlatformError> {
    let origins = state.ginseng.public_origins().await?;
    Ok(ApiResponse::ok(origins.into_iter().map(Into::into).collect()))
}

pub async fn get_origin_by_slug(
    State(state): State<GinsengState>,
    Path(slug): Path<String>,
) -> Result<ApiResponse<OriginResponse>, PlatformError> {
    Ok(ApiResponse::ok(state.ginseng.public_origin_by_slug(&slug).await?.into()))
}

// ---- admin: products ----

pub async fn admin_list_products(
    State(state): State<GinsengState>,
    _admin: RequireAdmin,
    QueryParams(query): QueryParams<ProductsQuery>,
) -> Result<ApiResponse<Vec<ProductResponse>>, PlatformError> {
    let page = state
        .ginseng
        .search_products(query.to_admin_filter(), query.sort(), query.pagination.to_request())
        .await?;
    Ok(ApiResponse::paginated(page.map(Into::into)))
}

pub async fn admin_get_product(
    State(state): State<GinsengState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<ApiResponse<ProductResponse>, PlatformError> {
    let product = state.ginseng.get_product(&id).await?;
    Ok(ApiResponse::ok(state.ginseng.product_detail(product).await?))
}

pub async fn create_product(
    State(state): State<GinsengState>,
    admin: RequireAdmin,
    JsonBody(input): JsonBody<CreateProductInput>,
) -> Result<ApiResponse<ProductResponse>, PlatformError> {
    let product = state.ginseng.create_product(input, &admin).await?;
    Ok(ApiResponse::created(product.into()).with_message("Product created"))
}

pub async fn update_product(
    State(state): State<GinsengState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<UpdateProductInput>,
) -> Result<ApiResponse<ProductResponse>, PlatformError> {
    let product = state.ginseng.update_product(&id, patch, &admin).await?;
    Ok(ApiResponse::ok(product.into()).with_message("Product updated"))
}

pub async fn delete_product(
    State(state): State<GinsengState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, PlatformError> {
    state.ginseng.delete_product(&id, &admin).await?;
    Ok(ApiResponse::message("Product deleted"))
}

pub async fn product_stats(
    State(state): State<GinsengState>,
    _admin: RequireAdmin,
) -> Result<ApiResponse<ProductStats>, PlatformError> {
    Ok(ApiResponse::ok(state.ginseng.stats().await?))
}

// ---- admin: categories ----

pub async fn admin_list_categories(
    State(state): State<GinsengState>,
    _admin: RequireAdmin,
    QueryParams(query): QueryParams<CatalogQuery>,
) -> Result<ApiResponse<Vec<CategoryResponse>>, PlatformError> {
    let page = state
        .ginseng
        .search_categories(query.to_filter(&["name", "description"]), query.pagination.to_request())
        .await?;
    Ok(ApiResponse::paginated(page.map(Into::into)))
}

pub async fn admin_get_category(
    State(state): State<GinsengState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<ApiResponse<CategoryResponse>, PlatformError> {
    Ok(ApiResponse::ok(state.ginseng.get_category(&id).await?.into()))
}

pub async fn create_category(
    State(state): State<GinsengState>,
    admin: RequireAdmin,
    JsonBody(input): JsonBody<CreateCategoryInput>,
) -> Result<ApiResponse<CategoryResponse>, PlatformError> {
    let category = state.ginseng.create_category(input, &admin).await?;
    Ok(ApiResponse::created(category.into()).with_message("Category created"))
}

pub async fn update_category(
    State(state): State<GinsengState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<UpdateCategoryInput>,
) -> Result<ApiResponse<CategoryResponse>, PlatformError> {
    let category = state.ginseng.update_category(&id, patch, &admin).await?;
    Ok(ApiResponse::ok(category.into()).with_message("Category updated"))
}

pub async fn delete_category(
    State(state): State<GinsengState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, PlatformError> {
    state.ginseng.delete_category(&id, &admin).await?;
    Ok(ApiResponse::message("Category deleted"))
}

// ---- admin: origins ----

pub async fn admin_list_origins(
    State(state): State<GinsengState>,
    _admin: RequireAdmin,
    QueryParams(query): QueryParams<CatalogQuery>,
) -> Result<ApiResponse<Vec<OriginResponse>>, PlatformError> {
    let page = state
        .ginseng
        .search_origins(query.to_filter(&["name", "country", "region"]), query.pagination.to_request())
        .await?;
    Ok(ApiResponse::paginated(page.map(Into::into)))
}

pub async fn admin_get_origin(
    State(state): State<GinsengState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<ApiResponse<OriginResponse>, PlatformError> {
    Ok(ApiResponse::ok(state.ginseng.get_origin(&id).await?.into()))
}

pub async fn create_origin(
    State(state): State<GinsengState>,
    admin: RequireAdmin,
    JsonBody(input): JsonBody<CreateOriginInput>,
) -> Result<ApiResponse<OriginResponse>, PlatformError> {
    let origin = state.ginseng.create_origin(input, &admin).await?;
    Ok(ApiResponse::created(origin.into()).with_message("Origin created"))
}

pub async fn update_origin(
    State(state): State<GinsengState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<UpdateOriginInput>,
) -> Result<ApiResponse<OriginResponse>, PlatformError> {
    let origin = state.ginseng.update_origin(&id, patch, &admin).await?;
    Ok(ApiResponse::ok(origin.into()).with_message("Origin updated"))
}

pub async fn delete_origin(
    State(state): State<GinsengState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, PlatformError> {
    state.ginseng.delete_origin(&id, &admin).await?;
    Ok(ApiResponse::message("Origin deleted"))
}

pub fn ginseng_router(state: GinsengState) -> Router {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/featured", get(featured_products))
        .route("/products/slug/:slug", get(get_product_by_slug))
        .route("/products/:id", get(get_public_product))
        .route("/categories", get(list_categories))
        .route("/categories/slug/:slug", get(get_category_by_slug))
        .route("/origins", get(list_origins))
        .route("/origins/slug/:slug", get(get_origin_by_slug))
        .with_state(state)
}

pub fn ginseng_admin_router(state: GinsengState) -> Router {
    Router::new()
        .route("/products", get(admin_list_products).post(create_product))
        .route("/products/stats", get(product_stats))
        .route(
            "/products/:id",
            get(admin_get_product).put(update_product).delete(delete_product),
        )
        .route("/categories", get(admin_list_categories).post(create_category))
        .route(
            "/categories/:id",
            get(admin_get_category).put(update_category).delete(delete_category),
        )
        .route("/origins", get(admin_list_origins).post(create_origin))
        .route(
            "/origins/:id",
            get(admin_get_origin).put(update_origin).delete(delete_origin),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::Uri;

    fn query(q: &str) -> ProductsQuery {
        let uri: Uri = format!("/?{}", q).parse().unwrap();
        Query::<ProductsQuery>::try_from_uri(&uri).unwrap().0
    }

    #[test]
    fn test_malformed_references_dropped() {
        assert!(query("category=not-an-id&origin=%24ne").to_filter().is_empty());
    }

    #[test]
    fn test_grade_and_stock_filters() {
        let filter = query("grade=grade_a&inStock=true").to_filter();
        let and = filter.get_array("$and").unwrap();
        assert_eq!(and.len(), 2);
        assert!(and.contains(&bson::Bson::Document(doc! { "grade": "grade_a" })));
        assert!(and.contains(&bson::Bson::Document(doc! { "stock": { "$gt": 0 } })));
    }

    #[test]
    fn test_sorts() {
        assert_eq!(query("sort=price_asc").sort(), doc! { "price": 1 });
        assert_eq!(query("").sort(), doc! { "createdAt": -1 });
    }

    #[test]
    fn test_catalog_query_flags() {
        let uri: Uri = "/?isActive=false".parse().unwrap();
        let q = Query::<CatalogQuery>::try_from_uri(&uri).unwrap().0;
        assert_eq!(q.to_filter(&["name"]), doc! { "isActive": false });
    }
}
