//! Ginseng Catalog Repositories

use std::collections::BTreeMap;

use bson::{doc, Document};
use mongodb::Database;
use serde::Serialize;
use utoipa::ToSchema;

use crate::ginseng::entity::{GinsengCategory, GinsengOrigin, GinsengProduct, LOW_STOCK_THRESHOLD};
use crate::shared::api_common::{Page, PageRequest};
use crate::shared::error::Result;
use crate::shared::repository::{agg, MongoStore};

/// Display order for categories and origins
pub fn catalog_order() -> Document {
    doc! { "sortOrder": 1, "name": 1 }
}

pub struct CategoryRepository {
    store: MongoStore<GinsengCategory>,
}

impl CategoryRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            store: MongoStore::new(db, "ginseng_categories", "Ginseng category"),
        }
    }

    pub async fn insert(&self, category: &GinsengCategory) -> Result<()> {
        self.store.insert(category).await
    }

    pub async fn get(&self, id: &str) -> Result<GinsengCategory> {
        self.store.get(id).await
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<GinsengCategory>> {
        self.store.find_by_id(id).await
    }

    pub async fn find_one(&self, filter: Document) -> Result<Option<GinsengCategory>> {
        self.store.find_one(filter).await
    }

    pub async fn exists(&self, id: &str) -> Result<bool> {
        self.store.exists(doc! { "_id": id }).await
    }

    /// Case-insensitive name match, optionally ignoring one id.
    pub async fn exists_by_name(&self, name: &str, except: Option<&str>) -> Result<bool> {
        self.store.exists(unique_name_filter(name, except)).await
    }

    pub async fn exists_by_slug(&self, slug: &str) -> Result<bool> {
        self.store.exists(doc! { "slug": slug }).await
    }

    pub async fn search(&self, filter: Document, page: PageRequest) -> Result<Page<GinsengCategory>> {
        self.store.paginate(filter, catalog_order(), page).await
    }

    pub async fn find_many(&self, filter: Document) -> Result<Vec<GinsengCategory>> {
        self.store.find_many(filter, catalog_order(), None).await
    }

    pub async fn update(&self, category: &GinsengCategory) -> Result<()> {
        self.store.replace(&category.id, category).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        self.store.delete(id).await
    }

    pub async fn count(&self, filter: Document) -> Result<u64> {
        self.store.count(filter).await
    }
}

pub struct OriginRepository {
    store: MongoStore<GinsengOrigin>,
}

impl OriginRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            store: MongoStore::new(db, "ginseng_origins", "Ginseng origin"),
        }
    }

    pub async fn insert(&self, origin: &GinsengOrigin) -> Result<()> {
        self.store.insert(origin).await
    }

    pub async fn get(&self, id: &str) -> Result<GinsengOrigin> {
        self.store.get(id).await
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<GinsengOrigin>> {
        self.store.find_by_id(id).await
    }

    pub async fn find_one(&self, filter: Document) -> Result<Option<GinsengOrigin>> {
        self.store.find_one(filter).await
    }

    pub async fn exists(&self, id: &str) -> Result<bool> {
        self.store.exists(doc! { "_id": id }).await
    }

    pub async fn exists_by_name(&self, name: &str, except: Option<&str>) -> Result<bool> {
        self.store.exists(unique_name_filter(name, except)).await
    }

    pub async fn exists_by_slug(&self, slug: &str) -> Result<bool> {
        self.store.exists(doc! { "slug": slug }).await
    }

    pub async fn search(&self, filter: Document, page: PageRequest) -> Result<Page<GinsengOrigin>> {
        self.store.paginate(filter, doc! { "name": 1 }, page).await
    }

    pub async fn find_many(&self, filter: Document) -> Result<Vec<GinsengOrigin>> {
        self.store.find_many(filter, doc! { "name": 1 }, None).await
    }

    pub async fn update(&self, origin: &GinsengOrigin) -> Result<()> {
        self.store.replace(&origin.id, origin).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        self.store.delete(id).await
    }

    pub async fn count(&self, filter: Document) -> Result<u64> {
        self.store.count(filter).await
    }
}

fn unique_name_filter(name: &str, except: Option<&str>) -> Document {
    let pattern = format!("^{}$", regex::escape(name.trim()));
    let mut filter = doc! { "name": { "$regex": pattern, "$options": "i" } };
    if let Some(id) = except {
        filter.insert("_id", doc! { "$ne": id });
    }
    filter
}

/// Catalog figures for the admin dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductStats {
    pub total: u64,
    pub active: u64,
    pub featured: u64,
    pub total_stock: u64,
    /// Sum of price times stock
    pub stock_value: f64,
    pub low_stock: u64,
    pub out_of_stock: u64,
    pub total_views: u64,
    pub average_price: f64,
    pub by_status: BTreeMap<String, u64>,
    pub by_grade: BTreeMap<String, u64>,
}

impl ProductStats {
    pub fn pipeline() -> Vec<Document> {
        let low_stock = doc! {
            "$and": [
                { "$lte": ["$stock", LOW_STOCK_THRESHOLD as i64] },
                { "$eq": ["$status", "available"] },
            ]
        };
        vec![doc! {
            "$facet": {
                "totals": [
                    { "$group": {
                        "_id": null,
                        "count": { "$sum": 1 },
                        "active": { "$sum": { "$cond": ["$isActive", 1, 0] } },
                        "featured": { "$sum": { "$cond": ["$isFeatured", 1, 0] } },
                        "stock": { "$sum": "$stock" },
                        "stockValue": { "$sum": { "$multiply": ["$price", "$stock"] } },
                        "lowStock": { "$sum": { "$cond": [low_stock, 1, 0] } },
                        "outOfStock": { "$sum": { "$cond": [{ "$eq": ["$stock", 0] }, 1, 0] } },
                        "views": { "$sum": "$viewCount" },
                        "avgPrice": { "$avg": "$price" },
                    } }
                ],
                "byStatus": [ { "$group": { "_id": "$status", "count": { "$sum": 1 } } } ],
                "byGrade": [ { "$group": { "_id": "$grade", "count": { "$sum": 1 } } } ],
            }
        }]
    }

    pub fn from_facet(facet: &Document) -> Self {
        let totals = agg::first(facet, "totals");
        Self {
            total: agg::count(&totals, "count"),
            active: agg::count(&totals, "active"),
            featured: agg::count(&totals, "featured"),
            total_stock: agg::count(&totals, "stock"),
            stock_value: agg::number(&totals, "stockValue"),
            low_stock: agg::count(&totals, "lowStock"),
            out_of_stock: agg::count(&totals, "outOfStock"),
            total_views: agg::count(&totals, "views"),
            average_price: agg::number(&totals, "avgPrice").round(),
            by_status: agg::buckets(agg::rows(facet, "byStatus")).into_iter().collect(),
            by_grade: agg::buckets(agg::rows(facet, "byGrade")).into_iter().collect(),
        }
    }
}

pub struct ProductRepository {
    store: MongoStore<GinsengProduct>,
}

impl ProductRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            store: MongoStore::new(db, "ginseng_products", "Ginseng product"),
        }
    }

    pub async fn insert(&self, product: &GinsengProduct) -> Result<()> {
        self.store.insert(product).await
    }

    pub async fn get(&self, id: &str) -> Result<GinsengProduct> {
        self.store.get(id).await
    }

    pub async fn find_one(&self, filter: Document) -> Result<Option<GinsengProduct>> {
        self.store.find_one(filter).await
    }

    pub async fn exists_by_slug(&self, slug: &str) -> Result<bool> {
        self.store.exists(doc! { "slug": slug }).await
    }

    pub async fn exists_by_sku(&self, sku: &str) -> Result<bool> {
        self.store.exists(doc! { "sku": sku }).await
    }

    pub async fn count_in_category(&self, category_id: &str) -> Result<u64> {
        self.store.count(doc! { "categoryId": category_id }).await
    }

    pub async fn count_from_origin(&self, origin_id: &str) -> Result<u64> {
        self.store.count(doc! { "originId": origin_id }).await
    }

    pub async fn search(&self, filter: Document, sort: Document, page: PageRequest) -> Result<Page<GinsengProduct>> {
        self.store.paginate(filter, sort, page).await
    }

    pub async fn find_many(&self, filter: Document, sort: Document, limit: i64) -> Result<Vec<GinsengProduct>> {
        self.store.find_many(filter, sort, Some(limit)).await
    }

    pub async fn update(&self, product: &GinsengProduct) -> Result<()> {
        self.store.replace(&product.id, product).await
    }

    pub async fn increment_views(&self, id: &str) -> Result<bool> {
        self.store.increment(id, "viewCount", 1).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        self.store.delete(id).await
    }

    pub async fn count(&self, filter: Document) -> Result<u64> {
        self.store.count(filter).await
    }

    pub async fn stats(&self) -> Result<ProductStats> {
        let facet = self.store.aggregate_one(ProductStats::pipeline()).await?;
        Ok(ProductStats::from_facet(&facet))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_name_filter_is_anchored() {
        let filter = unique_name_filter(" Sâm (Hàn) ", Some("ABC"));
        let name = filter.get_document("name").unwrap();
        assert_eq!(name.get_str("$regex").unwrap(), r"^Sâm \(Hàn\)$");
        assert_eq!(name.get_str("$options").unwrap(), "i");
        assert_eq!(filter.get_document("_id").unwrap(), &doc! { "$ne": "ABC" });
    }

    #[test]
    fn test_stats_from_facet() {
        let facet = doc! {
            "totals": [ {
                "count": 4, "active": 3, "featured": 1, "stock": 25_i64,
                "stockValue": 12_500_000.0, "lowStock": 2, "outOfStock": 1,
                "views": 40_i64, "avgPrice": 1_333_333.4,
            } ],
            "byStatus": [ { "_id": "available", "count": 3 }, { "_id": "out_of_stock", "count": 1 } ],
            "byGrade": [ { "_id": "premium", "count": 4 } ],
        };
        let stats = ProductStats::from_facet(&facet);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.total_stock, 25);
        assert_eq!(stats.stock_value, 12_500_000.0);
        assert_eq!(stats.low_stock, 2);
        assert_eq!(stats.average_price, 1_333_333.0);
        assert_eq!(stats.by_status.get("out_of_stock"), Some(&1));
        assert_eq!(stats.by_grade.get("premium"), Some(&4));
    }

    #[test]
    fn test_empty_stats() {
        assert_eq!(ProductStats::from_facet(&Document::new()), ProductStats::default());
    }
}
