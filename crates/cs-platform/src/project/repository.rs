//! Project Repository

use std::collections::BTreeMap;

use bson::{doc, Document};
use mongodb::Database;
use serde::Serialize;
use utoipa::ToSchema;

use crate::project::entity::Project;
use crate::shared::api_common::{Page, PageRequest};
use crate::shared::error::Result;
use crate::shared::repository::{agg, MongoStore};

/// Portfolio-wide figures for the admin dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStats {
    pub total: u64,
    pub active: u64,
    pub featured: u64,
    pub total_units: u64,
    pub sold_units: u64,
    pub average_sales_rate: f64,
    pub total_views: u64,
    pub by_status: BTreeMap<String, u64>,
    pub by_type: BTreeMap<String, u64>,
}

impl ProjectStats {
    pub fn pipeline() -> Vec<Document> {
        vec![doc! {
            "$facet": {
                "totals": [
                    { "$group": {
                        "_id": null,
                        "count": { "$sum": 1 },
                        "active": { "$sum": { "$cond": ["$isActive", 1, 0] } },
                        "featured": { "$sum": { "$cond": ["$isFeatured", 1, 0] } },
                        "totalUnits": { "$sum": "$totalUnits" },
                        "soldUnits": { "$sum": "$soldUnits" },
                        "avgSalesRate": { "$avg": "$salesRate" },
                        "views": { "$sum": "$viewCount" },
                    } }
                ],
                "byStatus": [ { "$group": { "_id": "$status", "count": { "$sum": 1 } } } ],
                "byType": [ { "$group": { "_id": "$projectType", "count": { "$sum": 1 } } } ],
            }
        }]
    }

    pub fn from_facet(facet: &Document) -> Self {
        let totals = agg::first(facet, "totals");
        Self {
            total: agg::count(&totals, "count"),
            active: agg::count(&totals, "active"),
            featured: agg::count(&totals, "featured"),
            total_units: agg::count(&totals, "totalUnits"),
            sold_units: agg::count(&totals, "soldUnits"),
            average_sales_rate: (agg::number(&totals, "avgSalesRate") * 100.0).round() / 100.0,
            total_views: agg::count(&totals, "views"),
            by_status: agg::buckets(agg::rows(facet, "byStatus")).into_iter().collect(),
            by_type: agg::buckets(agg::rows(facet, "byType")).into_iter().collect(),
        }
    }
}

pub struct ProjectRepository {
    store: MongoStore<Project>,
}

impl ProjectRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            store: MongoStore::new(db, "projects", "Project"),
        }
    }

    pub async fn insert(&self, project: &Project) -> Result<()> {
        self.store.insert(project).await
    }

    pub async fn get(&self, id: &str) -> Result<Project> {
        self.store.get(id).await
    }

    pub async fn find_one(&self, filter: Document) -> Result<Option<Project>> {
        self.store.find_one(filter).await
    }

    pub async fn exists_by_slug(&self, slug: &str) -> Result<bool> {
        self.store.exists(doc! { "slug": slug }).await
    }

    pub async fn exists(&self, id: &str) -> Result<bool> {
        self.store.exists(doc! { "_id": id }).await
    }

    pub async fn search(&self, filter: Document, sort: Document, page: PageRequest) -> Result<Page<Project>> {
        self.store.paginate(filter, sort, page).await
    }

    pub async fn find_many(&self, filter: Document, sort: Document, limit: i64) -> Result<Vec<Project>> {
        self.store.find_many(filter, sort, Some(limit)).await
    }

    pub async fn update(&self, project: &Project) -> Result<()> {
        self.store.replace(&project.id, project).await
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

    pub async fn stats(&self) -> Result<ProjectStats> {
        let facet = self.store.aggregate_one(ProjectStats::pipeline()).await?;
        Ok(ProjectStats::from_facet(&facet))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stats_are_zeroed() {
        let stats = ProjectStats::from_facet(&Document::new());
        assert_eq!(stats, ProjectStats::default());
    }

    #[test]
    fn test_stats_from_facet() {
        let facet = doc! {
            "totals": [ { "count": 3, "active": 2, "featured": 1, "totalUnits": 150_i64, "soldUnits": 40_i64, "avgSalesRate": 26.6666, "views": 90_i64 } ],
            "byStatus": [ { "_id": "selling", "count": 2 }, { "_id": "planning", "count": 1 } ],
            "byType": [ { "_id": "apartment", "count": 3 } ],
        };
        let stats = ProjectStats::from_facet(&facet);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.sold_units, 40);
        assert_eq!(stats.average_sales_rate, 26.67);
        assert_eq!(stats.by_status.get("selling"), Some(&2));
        assert_eq!(stats.by_type.len(), 1);
    }
}
