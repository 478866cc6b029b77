//! Ginseng Catalog Service
//!
//! Categories and origins cannot be deleted while products reference them.

use std::sync::Arc;

use bson::{doc, Document};
use chrono::Utc;
use tracing::{info, warn};

use crate::activity::{ActivityAction, ActivityService};
use crate::ginseng::entity::{
    CreateCategoryInput, CreateOriginInput, CreateProductInput, GinsengCategory, GinsengOrigin, GinsengProduct,
    ProductResponse, UpdateCategoryInput, UpdateOriginInput, UpdateProductInput,
};
use crate::ginseng::repository::{CategoryRepository, OriginRepository, ProductRepository, ProductStats};
use crate::shared::api_common::{Page, PageRequest};
use crate::shared::authorization_service::AuthContext;
use crate::shared::error::{PlatformError, Result};
use crate::shared::query::with_public_visibility;

#[derive(Clone)]
pub struct GinsengService {
    categories: Arc<CategoryRepository>,
    origins: Arc<OriginRepository>,
    products: Arc<ProductRepository>,
    activity: ActivityService,
}

impl GinsengService {
    pub fn new(
        categories: Arc<CategoryRepository>,
        origins: Arc<OriginRepository>,
        products: Arc<ProductRepository>,
        activity: ActivityService,
    ) -> Self {
        Self {
            categories,
            origins,
            products,
            activity,
        }
    }

    // ---- categories ----

    pub async fn search_categories(&self, filter: Document, page: PageRequest) -> Result<Page<GinsengCategory>> {
        self.categories.search(filter, page).await
    }

    pub async fn public_categories(&self) -> Result<Vec<GinsengCategory>> {
        let filter = with_public_visibility::<GinsengCategory>(Document::new(), Utc::now());
        self.categories.find_many(filter).await
    }

    pub async fn public_category_by_slug(&self, slug: &str) -> Result<GinsengCategory> {
        let filter = with_public_visibility::<GinsengCategory>(doc! { "slug": slug.to_lowercase() }, Utc::now());
        self.categories
            .find_one(filter)
            .await?
            .ok_or_else(|| PlatformError::not_found("Ginseng category", slug))
    }

    pub async fn get_category(&self, id: &str) -> Result<GinsengCategory> {
        self.categories.get(id).await
    }

    pub async fn create_category(&self, input: CreateCategoryInput, actor: &AuthContext) -> Result<GinsengCategory> {
        let category = GinsengCategory::create(input, Some(actor.actor()), Utc::now())?;
        if self.categories.exists_by_name(&category.name, None).await? {
            return Err(PlatformError::duplicate("Ginseng category", "name", &category.name));
        }
        if self.categories.exists_by_slug(&category.slug).await? {
            return Err(PlatformError::duplicate("Ginseng category", "slug", &category.slug));
        }

        self.categories.insert(&category).await?;
        self.activity
            .log(
                actor,
                ActivityAction::Create,
                "ginseng_category",
                &category.id,
                format!("Created ginseng category {}", category.name),
            )
            .await;
        Ok(category)
    }

    pub async fn update_category(
        &self,
        id: &str,
        patch: UpdateCategoryInput,
        actor: &AuthContext,
    ) -> Result<GinsengCategory> {
        let mut category = self.categories.get(id).await?;
        let (previous_name, previous_slug) = (category.name.clone(), category.slug.clone());
        category.apply(patch, Some(actor.actor()), Utc::now())?;

        if category.name != previous_name && self.categories.exists_by_name(&category.name, Some(id)).await? {
            return Err(PlatformError::duplicate("Ginseng category", "name", &category.name));
        }
        if category.slug != previous_slug && self.categories.exists_by_slug(&category.slug).await? {
            return Err(PlatformError::duplicate("Ginseng category", "slug", &category.slug));
        }

        self.categories.update(&category).await?;
        self.activity
            .log(
                actor,
                ActivityAction::Update,
                "ginseng_category",
                &category.id,
                format!("Updated ginseng category {}", category.name),
            )
            .await;
        Ok(category)
    }

    pub async fn delete_category(&self, id: &str, actor: &AuthContext) -> Result<()> {
        let category = self.categories.get(id).await?;
        let products = self.products.count_in_category(&category.id).await?;
        ensure_unreferenced("Category", &category.name, products)?;

        self.categories.delete(&category.id).await?;
        self.activity
            .log(
                actor,
                ActivityAction::Delete,
                "ginseng_category",
                &category.id,
                format!("Deleted ginseng category {}", category.name),
            )
            .await;
        Ok(())
    }

    // ---- origins ----

    pub async fn search_origins(&self, filter: Document, page: PageRequest) -> Result<Page<GinsengOrigin>> {
        self.origins.search(filter, page).await
    }

    pub async fn public_origins(&self) -> Result<Vec<GinsengOrigin>> {
        let filter = with_public_visibility::<GinsengOrigin>(Document::new(), Utc::now());
        self.origins.find_many(filter).await
    }

    pub async fn public_origin_by_slug(&self, slug: &str) -> Result<GinsengOrigin> {
        let filter = with_public_visibility::<GinsengOrigin>(doc! { "slug": slug.to_lowercase() }, Utc::now());
        self.origins
            .find_one(filter)
            .await?
            .ok_or_else(|| PlatformError::not_found("Ginseng origin", slug))
    }

    pub async fn get_origin(&self, id: &str) -> Result<GinsengOrigin> {
        self.origins.get(id).await
    }

    pub async fn create_origin(&self, input: CreateOriginInput, actor: &AuthContext) -> Result<GinsengOrigin> {
        let origin = GinsengOrigin::create(input, Some(actor.actor()), Utc::now())?;
        if self.origins.exists_by_name(&origin.name, None).await? {
            return Err(PlatformError::duplicate("Ginseng origin", "name", &origin.name));
        }
        if self.origins.exists_by_slug(&origin.slug).await? {
            return Err(PlatformError::duplicate("Ginseng origin", "slug", &origin.slug));
        }

        self.origins.insert(&origin).await?;
        self.activity
            .log(
                actor,
                ActivityAction::Create,
                "ginseng_origin",
                &origin.id,
                format!("Created ginseng origin {}", origin.name),
            )
            .await;
        Ok(origin)
    }

    pub async fn update_origin(&self, id: &str, patch: UpdateOriginInput, actor: &AuthContext) -> Result<GinsengOrigin> {
        let mut origin = self.origins.get(id).await?;
        let (previous_name, previous_slug) = (origin.name.clone(), origin.slug.clone());
        origin.apply(patch, Some(actor.actor()), Utc::now())?;

        if origin.name != previous_name && self.origins.exists_by_name(&origin.name, Some(id)).await? {
            return Err(PlatformError::duplicate("Ginseng origin", "name", &origin.name));
        }
        if origin.slug != previous_slug && self.origins.exists_by_slug(&origin.slug).await? {
            return Err(PlatformError::duplicate("Ginseng origin", "slug", &origin.slug));
        }

        self.origins.update(&origin).await?;
        self.activity
            .log(
                actor,
                ActivityAction::Update,
                "ginseng_origin",
                &origin.id,
                format!("Updated ginseng origin {}", origin.name),
            )
            .await;
        Ok(origin)
    }

    pub async fn delete_origin(&self, id: &str, actor: &AuthContext) -> Result<()> {
        let origin = self.origins.get(id).await?;
        let products = self.products.count_from_origin(&origin.id).await?;
        ensure_unreferenced("Origin", &origin.name, products)?;

        self.origins.delete(&origin.id).await?;
        self.activity
            .log(
                actor,
                ActivityAction::Delete,
                "ginseng_origin",
                &origin.id,
                format!("Deleted ginseng origin {}", origin.name),
            )
            .await;
        Ok(())
    }

    // ---- products ----

    pub async fn search_products(&self, filter: Document, sort: Document, page: PageRequest) -> Result<Page<GinsengProduct>> {
        self.products.search(filter, sort, page).await
    }

    pub async fn search_public_products(
        &self,
        filter: Document,
        sort: Document,
        page: PageRequest,
    ) -> Result<Page<GinsengProduct>> {
        let filter = with_public_visibility::<GinsengProduct>(filter, Utc::now());
        self.products.search(filter, sort, page).await
    }

    pub async fn featured_products(&self, limit: i64) -> Result<Vec<GinsengProduct>> {
        let filter = with_public_visibility::<GinsengProduct>(doc! { "isFeatured": true }, Utc::now());
        self.products.find_many(filter, doc! { "updatedAt": -1 }, limit).await
    }

    pub async fn get_product(&self, id: &str) -> Result<GinsengProduct> {
        self.products.get(id).await
    }

    pub async fn get_public_product(&self, id: &str) -> Result<GinsengProduct> {
        let filter = with_public_visibility::<GinsengProduct>(doc! { "_id": id }, Utc::now());
        self.products
            .find_one(filter)
            .await?
            .ok_or_else(|| PlatformError::not_found("Ginseng product", id))
    }

    /// Public lookup by slug; counts a view.
    pub async fn view_product_by_slug(&self, slug: &str) -> Result<GinsengProduct> {
        let filter = with_public_visibility::<GinsengProduct>(doc! { "slug": slug.to_lowercase() }, Utc::now());
        let mut product = self
            .products
            .find_one(filter)
            .await?
            .ok_or_else(|| PlatformError::not_found("Ginseng product", slug))?;

        match self.products.increment_views(&product.id).await {
            Ok(_) => product.view_count += 1,
            Err(e) => warn!(product_id = %product.id, error = %e, "Failed to count product view"),
        }
        Ok(product)
    }

    /// Detail payload with category and origin summaries attached.
    pub async fn product_detail(&self, product: GinsengProduct) -> Result<ProductResponse> {
        let category = self.categories.find_by_id(&product.category_id).await?;
        let origin = self.origins.find_by_id(&product.origin_id).await?;
        Ok(ProductResponse::from(product).with_refs(category.as_ref(), origin.as_ref()))
    }

    pub async fn create_product(&self, input: CreateProductInput, actor: &AuthContext) -> Result<GinsengProduct> {
        let product = GinsengProduct::create(input, Some(actor.actor()), Utc::now())?;
        self.ensure_references(&product).await?;
        if self.products.exists_by_slug(&product.slug).await? {
            return Err(PlatformError::duplicate("Ginseng product", "slug", &product.slug));
        }
        if self.products.exists_by_sku(&product.sku).await? {
            return Err(PlatformError::duplicate("Ginseng product", "sku", &product.sku));
        }

        self.products.insert(&product).await?;
        info!(product_id = %product.id, sku = %product.sku, "Ginseng product created");
        self.activity
            .log(
                actor,
                ActivityAction::Create,
                "ginseng_product",
                &product.id,
                format!("Created product {}", product.name),
            )
            .await;
        Ok(product)
    }

    pub async fn update_product(
        &self,
        id: &str,
        patch: UpdateProductInput,
        actor: &AuthContext,
    ) -> Result<GinsengProduct> {
        let mut product = self.products.get(id).await?;
        let previous = (
            product.slug.clone(),
            product.sku.clone(),
            product.category_id.clone(),
            product.origin_id.clone(),
        );
        product.apply(patch, Some(actor.actor()), Utc::now())?;

        if product.category_id != previous.2 || product.origin_id != previous.3 {
            self.ensure_references(&product).await?;
        }
        if product.slug != previous.0 && self.products.exists_by_slug(&product.slug).await? {
            return Err(PlatformError::duplicate("Ginseng product", "slug", &product.slug));
        }
        if product.sku != previous.1 && self.products.exists_by_sku(&product.sku).await? {
            return Err(PlatformError::duplicate("Ginseng product", "sku", &product.sku));
        }

        self.products.update(&product).await?;
        self.activity
            .log(
                actor,
                ActivityAction::Update,
                "ginseng_product",
                &product.id,
                format!("Updated product {}", product.name),
            )
            .await;
        Ok(product)
    }

    pub async fn delete_product(&self, id: &str, actor: &AuthContext) -> Result<()> {
        let product = self.products.get(id).await?;
        self.products.delete(&product.id).await?;
        self.activity
            .log(
                actor,
                ActivityAction::Delete,
                "ginseng_product",
                &product.id,
                format!("Deleted product {}", product.name),
            )
            .await;
        Ok(())
    }

    pub async fn stats(&self) -> Result<ProductStats> {
        self.products.stats().await
    }

    pub async fn count_products(&self, filter: Document) -> Result<u64> {
        self.products.count(filter).await
    }

    async fn ensure_references(&self, product: &GinsengProduct) -> Result<()> {
        if !self.categories.exists(&product.category_id).await? {
            return Err(PlatformError::validation(format!(
                "categoryId: category {} does not exist",
                product.category_id
            )));
        }
        if !self.origins.exists(&product.origin_id).await? {
            return Err(PlatformError::validation(format!(
                "originId: origin {} does not exist",
                product.origin_id
            )));
        }
        Ok(())
    }
}

fn ensure_unreferenced(kind: &str, name: &str, products: u64) -> Result<()> {
    if products > 0 {
        return Err(PlatformError::conflict(format!(
            "{} {} still has {} product(s)",
            kind, name, products
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_referenced_category_cannot_be_deleted() {
        let err = ensure_unreferenced("Category", "Hồng sâm", 3).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Category Hồng sâm still has 3 product(s)");

        assert!(ensure_unreferenced("Category", "Hồng sâm", 0).is_ok());
    }
}
