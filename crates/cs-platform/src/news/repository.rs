//! News Repositories

use std::collections::BTreeMap;

use bson::{doc, Document};
use mongodb::Database;
use serde::Serialize;
use utoipa::ToSchema;

use crate::news::entity::{NewsArticle, NewsCategory};
use crate::shared::api_common::{Page, PageRequest};
use crate::shared::error::Result;
use crate::shared::repository::{agg, MongoStore};

pub struct NewsCategoryRepository {
    store: MongoStore<NewsCategory>,
}

impl NewsCategoryRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            store: MongoStore::new(db, "news_categories", "News category"),
        }
    }

    pub async fn insert(&self, category: &NewsCategory) -> Result<()> {
        self.store.insert(category).await
    }

    pub async fn get(&self, id: &str) -> Result<NewsCategory> {
        self.store.get(id).await
    }

    pub async fn exists(&self, id: &str) -> Result<bool> {
        self.store.exists(doc! { "_id": id }).await
    }

    pub async fn exists_by_slug(&self, slug: &str) -> Result<bool> {
        self.store.exists(doc! { "slug": slug }).await
    }

    pub async fn exists_by_name(&self, name: &str, except: Option<&str>) -> Result<bool> {
        let pattern = format!("^{}$", regex::escape(name.trim()));
        let mut filter = doc! { "name": { "$regex": pattern, "$options": "i" } };
        if let Some(id) = except {
            filter.insert("_id", doc! { "$ne": id });
        }
        self.store.exists(filter).await
    }

    pub async fn search(&self, filter: Document, page: PageRequest) -> Result<Page<NewsCategory>> {
        self.store.paginate(filter, doc! { "sortOrder": 1, "name": 1 }, page).await
    }

    pub async fn find_many(&self, filter: Document) -> Result<Vec<NewsCategory>> {
        self.store.find_many(filter, doc! { "sortOrder": 1, "name": 1 }, None).await
    }

    pub async fn update(&self, category: &NewsCategory) -> Result<()> {
        self.store.replace(&category.id, category).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        self.store.delete(id).await
    }
}

/// Editorial figures for the admin dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewsStats {
    pub total: u64,
    pub published: u64,
    pub featured: u64,
    pub total_views: u64,
    pub average_reading_time: f64,
    pub by_status: BTreeMap<String, u64>,
    /// Article count per category id
    pub by_category: BTreeMap<String, u64>,
}

impl NewsStats {
    pub fn pipeline() -> Vec<Document> {
        vec![doc! {
            "$facet": {
                "totals": [
                    { "$group": {
                        "_id": null,
                        "count": { "$sum": 1 },
                        "featured": { "$sum": { "$cond": ["$isFeatured", 1, 0] } },
                        "views": { "$sum": "$viewCount" },
                        "avgReadingTime": { "$avg": "$readingTime" },
                    } }
                ],
                "byStatus": [ { "$group": { "_id": "$status", "count": { "$sum": 1 } } } ],
                "byCategory": [ { "$group": { "_id": "$categoryId", "count": { "$sum": 1 } } } ],
            }
        }]
    }

    pub fn from_facet(facet: &Document) -> Self {
        let totals = agg::first(facet, "totals");
        let by_status: BTreeMap<String, u64> = agg::buckets(agg::rows(facet, "byStatus")).into_iter().collect();
        Self {
            total: agg::count(&totals, "count"),
            published: by_status.get("published").copied().unwrap_or(0),
            featured: agg::count(&totals, "featured"),
            total_views: agg::count(&totals, "views"),
            average_reading_time: (agg::number(&totals, "avgReadingTime") * 10.0).round() / 10.0,
            by_status,
            by_category: agg::buckets(agg::rows(facet, "byCategory")).into_iter().collect(),
        }
    }
}

pub struct NewsArticleRepository {
    store: MongoStore<NewsArticle>,
}

impl NewsArticleRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            store: MongoStore::new(db, "news_articles", "News article"),
        }
    }

    pub async fn insert(&self, article: &NewsArticle) -> Result<()> {
        self.store.insert(article).await
    }

    pub async fn get(&self, id: &str) -> Result<NewsArticle> {
        self.store.get(id).await
    }

    pub async fn find_one(&self, filter: Document) -> Result<Option<NewsArticle>> {
        self.store.find_one(filter).await
    }

    pub async fn exists_by_slug(&self, slug: &str) -> Result<bool> {
        self.store.exists(doc! { "slug": slug }).await
    }

    pub async fn count_in_category(&self, category_id: &str) -> Result<u64> {
        self.store.count(doc! { "categoryId": category_id }).await
    }

    pub async fn search(&self, filter: Document, sort: Document, page: PageRequest) -> Result<Page<NewsArticle>> {
        self.store.paginate(filter, sort, page).await
    }

    pub async fn find_many(&self, filter: Document, sort: Document, limit: i64) -> Result<Vec<NewsArticle>> {
        self.store.find_many(filter, sort, Some(limit)).await
    }

    pub async fn update(&self, article: &NewsArticle) -> Result<()> {
        self.store.replace(&article.id, article).await
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

    pub async fn stats(&self) -> Result<NewsStats> {
        let facet = self.store.aggregate_one(NewsStats::pipeline()).await?;
        Ok(NewsStats::from_facet(&facet))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_from_facet() {
        let facet = doc! {
            "totals": [ { "count": 5, "featured": 2, "views": 1200_i64, "avgReadingTime": 3.46 } ],
            "byStatus": [ { "_id": "published", "count": 3 }, { "_id": "draft", "count": 2 } ],
            "byCategory": [ { "_id": "0HZXEQ5Y8JY5Z", "count": 5 } ],
        };
        let stats = NewsStats::from_facet(&facet);
        assert_eq!(stats.total, 5);
        assert_eq!(stats.published, 3);
        assert_eq!(stats.total_views, 1200);
        assert_eq!(stats.average_reading_time, 3.5);
        assert_eq!(stats.by_category.len(), 1);
    }

    #[test]
    fn test_empty_stats() {
        assert_eq!(NewsStats::from_facet(&Document::new()), NewsStats::default());
    }
}
