//! Ginseng Catalog Entities
//!
//! Products reference one category and one origin. Category and origin
//! names are unique; product SKUs are derived from the name when omitted.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use bson::{doc, Document};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::display::{discount_percent, format_vnd};
use crate::shared::query::PublicVisibility;
use crate::shared::slug::{generate_sku, slugify};
use crate::shared::types::{nullable, ImageAsset, SeoMeta};
use crate::shared::validation::{clean, clean_list, clean_opt, Validation};
use crate::{Result, TsidGenerator};

fn slug_or_derived(slug: Option<String>, name: &str) -> String {
    clean_opt(slug)
        .map(|s| s.to_lowercase())
        .unwrap_or_else(|| slugify(name))
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GinsengCategory {
    #[serde(rename = "_id")]
    pub id: String,

    pub name: String,

    pub slug: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageAsset>,

    #[serde(default)]
    pub sort_order: i32,

    #[serde(default)]
    pub is_active: bool,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl PublicVisibility for GinsengCategory {
    fn public_filter(_now: DateTime<Utc>) -> Document {
        doc! { "isActive": true }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateCategoryInput {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub image: Option<ImageAsset>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateCategoryInput {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub image: Option<ImageAsset>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

impl GinsengCategory {
    pub fn create(input: CreateCategoryInput, actor: Option<&str>, now: DateTime<Utc>) -> Result<Self> {
        let name = clean(input.name);
        let category = Self {
            id: TsidGenerator::generate(),
            slug: slug_or_derived(input.slug, &name),
            name,
            description: clean_opt(input.description),
            image: input.image,
            sort_order: input.sort_order.unwrap_or(0),
            is_active: input.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
            created_by: actor.map(String::from),
            updated_by: actor.map(String::from),
        };
        category.validate()?;
        Ok(category)
    }

    pub fn apply(&mut self, patch: UpdateCategoryInput, actor: Option<&str>, now: DateTime<Utc>) -> Result<()> {
        if let Some(name) = patch.name {
            self.name = clean(name);
        }
        if let Some(slug) = patch.slug {
            self.slug = clean(slug).to_lowercase();
        }
        if let Some(description) = patch.description {
            self.description = clean_opt(Some(description));
        }
        if let Some(image) = patch.image {
            self.image = Some(image);
        }
        if let Some(order) = patch.sort_order {
            self.sort_order = order;
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        self.validate()?;
        self.updated_at = now;
        self.updated_by = actor.map(String::from).or(self.updated_by.take());
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let mut v = Validation::new();
        v.text("name", &self.name, 2, 100);
        v.slug("slug", &self.slug);
        v.text_opt("description", self.description.as_deref(), 1000);
        if let Some(image) = &self.image {
            image.validate("image", &mut v);
        }
        v.into_result()
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResponse {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image: Option<ImageAsset>,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<GinsengCategory> for CategoryResponse {
    fn from(c: GinsengCategory) -> Self {
        Self {
            id: c.id,
            name: c.name,
            slug: c.slug,
            description: c.description,
            image: c.image,
            sort_order: c.sort_order,
            is_active: c.is_active,
            created_at: c.created_at.to_rfc3339(),
            updated_at: c.updated_at.to_rfc3339(),
        }
    }
}

// ---------------------------------------------------------------------------
// Origin
// ---------------------------------------------------------------------------

/// Growing region a product comes from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GinsengOrigin {
    #[serde(rename = "_id")]
    pub id: String,

    pub name: String,

    pub slug: String,

    pub country: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageAsset>,

    #[serde(default)]
    pub is_active: bool,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl PublicVisibility for GinsengOrigin {
    fn public_filter(_now: DateTime<Utc>) -> Document {
        doc! { "isActive": true }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateOriginInput {
    pub name: String,
    pub slug: Option<String>,
    pub country: String,
    pub region: Option<String>,
    pub description: Option<String>,
    pub image: Option<ImageAsset>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateOriginInput {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub description: Option<String>,
    pub image: Option<ImageAsset>,
    pub is_active: Option<bool>,
}

impl GinsengOrigin {
    pub fn create(input: CreateOriginInput, actor: Option<&str>, now: DateTime<Utc>) -> Result<Self> {
        let name = clean(input.name);
        let origin = Self {
            id: TsidGenerator::generate(),
            slug: slug_or_derived(input.slug, &name),
            name,
            country: clean(input.country),
            region: clean_opt(input.region),
            description: clean_opt(input.description),
            image: input.image,
            is_active: input.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
            created_by: actor.map(String::from),
            updated_by: actor.map(String::from),
        };
        origin.validate()?;
        Ok(origin)
    }

    pub fn apply(&mut self, patch: UpdateOriginInput, actor: Option<&str>, now: DateTime<Utc>) -> Result<()> {
        if let Some(name) = patch.name {
            self.name = clean(name);
        }
        if let Some(slug) = patch.slug {
            self.slug = clean(slug).to_lowercase();
        }
        if let Some(country) = patch.country {
            self.country = clean(country);
        }
        if let Some(region) = patch.region {
            self.region = clean_opt(Some(region));
        }
        if let Some(description) = patch.description {
            self.description = clean_opt(Some(description));
        }
        if let Some(image) = patch.image {
            self.image = Some(image);
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        self.validate()?;
        self.updated_at = now;
        self.updated_by = actor.map(String::from).or(self.updated_by.take());
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let mut v = Validation::new();
        v.text("name", &self.name, 2, 100);
        v.slug("slug", &self.slug);
        v.text("country", &self.country, 2, 100);
        v.text_opt("region", self.region.as_deref(), 100);
        v.text_opt("description", self.description.as_deref(), 2000);
        if let Some(image) = &self.image {
            image.validate("image", &mut v);
        }
        v.into_result()
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OriginResponse {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub country: String,
    pub region: Option<String>,
    pub description: Option<String>,
    pub image: Option<ImageAsset>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<GinsengOrigin> for OriginResponse {
    fn from(o: GinsengOrigin) -> Self {
        Self {
            id: o.id,
            name: o.name,
            slug: o.slug,
            country: o.country,
            region: o.region,
            description: o.description,
            image: o.image,
            is_active: o.is_active,
            created_at: o.created_at.to_rfc3339(),
            updated_at: o.updated_at.to_rfc3339(),
        }
    }
}

// ---------------------------------------------------------------------------
// Product
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GinsengGrade {
    Premium,
    GradeA,
    GradeB,
    #[default]
    Standard,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    #[default]
    Available,
    OutOfStock,
    Discontinued,
}

pub const SKU_PREFIX: &str = "GS";

/// Stock at or below this level counts as low in statistics
pub const LOW_STOCK_THRESHOLD: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GinsengProduct {
    #[serde(rename = "_id")]
    pub id: String,

    pub name: String,

    pub slug: String,

    /// Unique stock-keeping unit
    pub sku: String,

    pub category_id: String,

    pub origin_id: String,

    pub grade: GinsengGrade,

    pub age_years: u32,

    pub weight_grams: f64,

    pub price: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale_price: Option<f64>,

    #[serde(default)]
    pub stock: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub benefits: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_instructions: Option<String>,

    #[serde(default)]
    pub images: Vec<ImageAsset>,

    pub status: ProductStatus,

    #[serde(default)]
    pub is_featured: bool,

    #[serde(default)]
    pub is_active: bool,

    #[serde(default)]
    pub seo: SeoMeta,

    #[serde(default)]
    pub view_count: u64,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl PublicVisibility for GinsengProduct {
    fn public_filter(_now: DateTime<Utc>) -> Document {
        doc! { "isActive": true, "status": { "$ne": "discontinued" } }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateProductInput {
    pub name: String,
    pub slug: Option<String>,
    pub sku: Option<String>,
    pub category_id: String,
    pub origin_id: String,
    pub grade: Option<GinsengGrade>,
    pub age_years: u32,
    pub weight_grams: f64,
    pub price: f64,
    pub sale_price: Option<f64>,
    pub stock: Option<u32>,
    pub short_description: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
    pub usage_instructions: Option<String>,
    #[serde(default)]
    pub images: Vec<ImageAsset>,
    pub status: Option<ProductStatus>,
    pub is_featured: Option<bool>,
    pub is_active: Option<bool>,
    pub seo: Option<SeoMeta>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub sku: Option<String>,
    pub category_id: Option<String>,
    pub origin_id: Option<String>,
    pub grade: Option<GinsengGrade>,
    pub age_years: Option<u32>,
    pub weight_grams: Option<f64>,
    pub price: Option<f64>,
    /// `null` removes the sale price
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<f64>)]
    pub sale_price: Option<Option<f64>>,
    pub stock: Option<u32>,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub benefits: Option<Vec<String>>,
    pub usage_instructions: Option<String>,
    pub images: Option<Vec<ImageAsset>>,
    pub status: Option<ProductStatus>,
    pub is_featured: Option<bool>,
    pub is_active: Option<bool>,
    pub seo: Option<SeoMeta>,
}

impl GinsengProduct {
    pub fn create(input: CreateProductInput, actor: Option<&str>, now: DateTime<Utc>) -> Result<Self> {
        let name = clean(input.name);
        let sku = clean_opt(input.sku)
            .map(|s| s.to_uppercase())
            .unwrap_or_else(|| generate_sku(SKU_PREFIX, &name));
        let product = Self {
            id: TsidGenerator::generate(),
            slug: slug_or_derived(input.slug, &name),
            sku,
            name,
            category_id: clean(input.category_id).to_uppercase(),
            origin_id: clean(input.origin_id).to_uppercase(),
            grade: input.grade.unwrap_or_default(),
            age_years: input.age_years,
            weight_grams: input.weight_grams,
            price: input.price,
            sale_price: input.sale_price,
            stock: input.stock.unwrap_or(0),
            short_description: clean_opt(input.short_description),
            description: clean_opt(input.description),
            benefits: clean_list(input.benefits),
            usage_instructions: clean_opt(input.usage_instructions),
            images: input.images,
            status: input.status.unwrap_or_default(),
            is_featured: input.is_featured.unwrap_or(false),
            is_active: input.is_active.unwrap_or(true),
            seo: input.seo.map(SeoMeta::cleaned).unwrap_or_default(),
            view_count: 0,
            created_at: now,
            updated_at: now,
            created_by: actor.map(String::from),
            updated_by: actor.map(String::from),
        };
        product.validate()?;
        Ok(product)
    }

    pub fn apply(&mut self, patch: UpdateProductInput, actor: Option<&str>, now: DateTime<Utc>) -> Result<()> {
        if let Some(name) = patch.name {
            self.name = clean(name);
        }
        if let Some(slug) = patch.slug {
            self.slug = clean(slug).to_lowercase();
        }
        if let Some(sku) = patch.sku {
            self.sku = clean(sku).to_uppercase();
        }
        if let Some(category_id) = patch.category_id {
            self.category_id = clean(category_id).to_uppercase();
        }
        if let Some(origin_id) = patch.origin_id {
            self.origin_id = clean(origin_id).to_uppercase();
        }
        if let Some(grade) = patch.grade {
            self.grade = grade;
        }
        if let Some(age) = patch.age_years {
            self.age_years = age;
        }
        if let Some(weight) = patch.weight_grams {
            self.weight_grams = weight;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(sale_price) = patch.sale_price {
            self.sale_price = sale_price;
        }
        if let Some(stock) = patch.stock {
            self.stock = stock;
        }
        if let Some(short) = patch.short_description {
            self.short_description = clean_opt(Some(short));
        }
        if let Some(description) = patch.description {
            self.description = clean_opt(Some(description));
        }
        if let Some(benefits) = patch.benefits {
            self.benefits = clean_list(benefits);
        }
        if let Some(usage) = patch.usage_instructions {
            self.usage_instructions = clean_opt(Some(usage));
        }
        if let Some(images) = patch.images {
            self.images = images;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(featured) = patch.is_featured {
            self.is_featured = featured;
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        if let Some(seo) = patch.seo {
            self.seo = seo.cleaned();
        }
        self.validate()?;
        self.updated_at = now;
        self.updated_by = actor.map(String::from).or(self.updated_by.take());
        Ok(())
    }

    /// Price a customer pays: the sale price when one is set.
    pub fn effective_price(&self) -> f64 {
        self.sale_price.unwrap_or(self.price)
    }

    fn validate(&self) -> Result<()> {
        let mut v = Validation::new();
        v.text("name", &self.name, 3, 200);
        v.slug("slug", &self.slug);
        v.text("sku", &self.sku, 3, 50);
        if !TsidGenerator::is_valid(&self.category_id) {
            v.record("categoryId", "must be a valid id");
        }
        if !TsidGenerator::is_valid(&self.origin_id) {
            v.record("originId", "must be a valid id");
        }
        v.range("ageYears", self.age_years as f64, 1.0, 100.0);
        v.positive("weightGrams", self.weight_grams);
        v.at_least("price", self.price, 0.0);
        if let Some(sale) = self.sale_price {
            v.at_least("salePrice", sale, 0.0);
            if sale > self.price {
                v.record("salePrice", "must not exceed the regular price");
            }
        }
        v.text_opt("shortDescription", self.short_description.as_deref(), 500);
        v.text_opt("description", self.description.as_deref(), 20_000);
        v.max_items("benefits", self.benefits.len(), 30);
        v.each_text("benefits", &self.benefits, 300);
        v.text_opt("usageInstructions", self.usage_instructions.as_deref(), 5000);
        v.max_items("images", self.images.len(), 30);
        for (i, image) in self.images.iter().enumerate() {
            image.validate(&format!("images[{}]", i), &mut v);
        }
        self.seo.validate(&mut v);
        v.into_result()
    }
}

/// Id, name and slug of a referenced catalog entry
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRef {
    pub id: String,
    pub name: String,
    pub slug: String,
}

impl From<&GinsengCategory> for CatalogRef {
    fn from(c: &GinsengCategory) -> Self {
        Self { id: c.id.clone(), name: c.name.clone(), slug: c.slug.clone() }
    }
}

impl From<&GinsengOrigin> for CatalogRef {
    fn from(o: &GinsengOrigin) -> Self {
        Self { id: o.id.clone(), name: o.name.clone(), slug: o.slug.clone() }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub sku: String,
    pub category_id: String,
    pub origin_id: String,
    /// Filled on detail views
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<CatalogRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<CatalogRef>,
    pub grade: GinsengGrade,
    pub age_years: u32,
    pub weight_grams: f64,
    pub price: f64,
    pub sale_price: Option<f64>,
    pub stock: u32,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub benefits: Vec<String>,
    pub usage_instructions: Option<String>,
    pub images: Vec<ImageAsset>,
    pub status: ProductStatus,
    pub is_featured: bool,
    pub is_active: bool,
    pub seo: SeoMeta,
    pub view_count: u64,
    pub price_display: String,
    pub sale_price_display: Option<String>,
    pub discount_percent: Option<u32>,
    pub in_stock: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl ProductResponse {
    pub fn with_refs(mut self, category: Option<&GinsengCategory>, origin: Option<&GinsengOrigin>) -> Self {
        self.category = category.map(CatalogRef::from);
        self.origin = origin.map(CatalogRef::from);
        self
    }
}

impl From<GinsengProduct> for ProductResponse {
    fn from(p: GinsengProduct) -> Self {
        Self {
            price_display: format_vnd(p.price),
            sale_price_display: p.sale_price.map(format_vnd),
            discount_percent: discount_percent(p.price, p.sale_price),
            in_stock: p.stock > 0 && p.status == ProductStatus::Available,
            id: p.id,
            name: p.name,
            slug: p.slug,
            sku: p.sku,
            category_id: p.category_id,
            origin_id: p.origin_id,
            category: None,
            origin: None,
            grade: p.grade,
            age_years: p.age_years,
            weight_grams: p.weight_grams,
            price: p.price,
            sale_price: p.sale_price,
            stock: p.stock,
            short_description: p.short_description,
            description: p.description,
            benefits: p.benefits,
            usage_instructions: p.usage_instructions,
            images: p.images,
            status: p.status,
            is_featured: p.is_featured,
            is_active: p.is_active,
            seo: p.seo,
            view_count: p.view_count,
            created_at: p.created_at.to_rfc3339(),
            updated_at: p.updated_at.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product_input(name: &str) -> CreateProductInput {
        CreateProductInput {
            name: name.to_string(),
            slug: None,
            sku: None,
            category_id: TsidGenerator::generate(),
            origin_id: TsidGenerator::generate(),
            grade: Some(GinsengGrade::Premium),
            age_years: 6,
            weight_grams: 100.0,
            price: 1_000_000.0,
            sale_price: None,
            stock: Some(5),
            short_description: None,
            description: None,
            benefits: vec![],
            usage_instructions: None,
            images: vec![],
            status: None,
            is_featured: None,
            is_active: None,
            seo: None,
        }
    }

    #[test]
    fn test_category_slug() {
        let category = GinsengCategory::create(
            CreateCategoryInput {
                name: "Hồng sâm Hàn Quốc".to_string(),
                slug: None,
                description: None,
                image: None,
                sort_order: None,
                is_active: None,
            },
            None,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(category.slug, "hong-sam-han-quoc");
    }

    #[test]
    fn test_origin_requires_country() {
        let result = GinsengOrigin::create(
            CreateOriginInput {
                name: "Ngọc Linh".to_string(),
                slug: None,
                country: " ".to_string(),
                region: None,
                description: None,
                image: None,
                is_active: None,
            },
            None,
            Utc::now(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_product_sku_and_slug() {
        let product = GinsengProduct::create(product_input("Sâm Ngọc Linh 6 năm"), None, Utc::now()).unwrap();
        assert_eq!(product.slug, "sam-ngoc-linh-6-nam");
        assert!(product.sku.starts_with("GS-SNL-"));

        let mut explicit = product_input("Sâm Ngọc Linh");
        explicit.sku = Some(" gs-001 ".to_string());
        let product = GinsengProduct::create(explicit, None, Utc::now()).unwrap();
        assert_eq!(product.sku, "GS-001");
    }

    #[test]
    fn test_sale_price_rules() {
        let mut input = product_input("Sâm Ngọc Linh");
        input.sale_price = Some(1_200_000.0);
        assert!(GinsengProduct::create(input, None, Utc::now()).is_err());

        let mut input = product_input("Sâm Ngọc Linh");
        input.sale_price = Some(800_000.0);
        let mut product = GinsengProduct::create(input, None, Utc::now()).unwrap();
        assert_eq!(product.effective_price(), 800_000.0);
        let response = ProductResponse::from(product.clone());
        assert_eq!(response.discount_percent, Some(20));

        product
            .apply(UpdateProductInput { sale_price: Some(None), ..Default::default() }, None, Utc::now())
            .unwrap();
        assert_eq!(product.sale_price, None);
    }

    #[test]
    fn test_age_bounds() {
        let mut input = product_input("Sâm Ngọc Linh");
        input.age_years = 0;
        assert!(GinsengProduct::create(input, None, Utc::now()).is_err());
    }

    #[test]
    fn test_public_filter_excludes_discontinued() {
        let filter = GinsengProduct::public_filter(Utc::now());
        assert_eq!(filter.get_document("status").unwrap(), &doc! { "$ne": "discontinued" });
    }
}
