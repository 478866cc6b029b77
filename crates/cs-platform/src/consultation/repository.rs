//! Consultation Request Repository

use std::collections::BTreeMap;

use bson::{doc, Document};
use chrono::{DateTime, Utc};
use mongodb::Database;
use serde::Serialize;
use utoipa::ToSchema;

use crate::consultation::entity::{overdue_filter, ConsultationRequest};
use crate::shared::api_common::{Page, PageRequest};
use crate::shared::error::Result;
use crate::shared::repository::{agg, newest_first, MongoStore};

/// Lead pipeline figures
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationStats {
    pub total: u64,
    pub new: u64,
    pub converted: u64,
    /// converted / total × 100
    pub conversion_rate: f64,
    pub overdue: u64,
    pub by_status: BTreeMap<String, u64>,
    pub by_priority: BTreeMap<String, u64>,
    pub by_type: BTreeMap<String, u64>,
    pub by_source: BTreeMap<String, u64>,
}

impl ConsultationStats {
    pub fn pipeline(now: DateTime<Utc>) -> Vec<Document> {
        vec![doc! {
            "$facet": {
                "totals": [ { "$count": "count" } ],
                "overdue": [ { "$match": overdue_filter(now) }, { "$count": "count" } ],
                "byStatus": [ { "$group": { "_id": "$status", "count": { "$sum": 1 } } } ],
                "byPriority": [ { "$group": { "_id": "$priority", "count": { "$sum": 1 } } } ],
                "byType": [ { "$group": { "_id": "$consultationType", "count": { "$sum": 1 } } } ],
                "bySource": [ { "$group": { "_id": "$source", "count": { "$sum": 1 } } } ],
            }
        }]
    }

    pub fn from_facet(facet: &Document) -> Self {
        let total = agg::count(&agg::first(facet, "totals"), "count");
        let by_status: BTreeMap<String, u64> = agg::buckets(agg::rows(facet, "byStatus")).into_iter().collect();
        let converted = by_status.get("converted").copied().unwrap_or(0);
        Self {
            total,
            new: by_status.get("new").copied().unwrap_or(0),
            converted,
            conversion_rate: (agg::percent(converted as f64, total as f64) * 100.0).round() / 100.0,
            overdue: agg::count(&agg::first(facet, "overdue"), "count"),
            by_status,
            by_priority: agg::buckets(agg::rows(facet, "byPriority")).into_iter().collect(),
            by_type: agg::buckets(agg::rows(facet, "byType")).into_iter().collect(),
            by_source: agg::buckets(agg::rows(facet, "bySource")).into_iter().collect(),
        }
    }
}

pub struct ConsultationRepository {
    store: MongoStore<ConsultationRequest>,
}

impl ConsultationRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            store: MongoStore::new(db, "consultation_requests", "Consultation request"),
        }
    }

    pub async fn insert(&self, request: &ConsultationRequest) -> Result<()> {
        self.store.insert(request).await
    }

    pub async fn get(&self, id: &str) -> Result<ConsultationRequest> {
        self.store.get(id).await
    }

    pub async fn search(&self, filter: Document, page: PageRequest) -> Result<Page<ConsultationRequest>> {
        self.store.paginate(filter, newest_first(), page).await
    }

    /// Overdue requests, most overdue first.
    pub async fn overdue(&self, now: DateTime<Utc>, page: PageRequest) -> Result<Page<ConsultationRequest>> {
        self.store
            .paginate(overdue_filter(now), doc! { "followUpDate": 1 }, page)
            .await
    }

    pub async fn update(&self, request: &ConsultationRequest) -> Result<()> {
        self.store.replace(&request.id, request).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        self.store.delete(id).await
    }

    pub async fn count(&self, filter: Document) -> Result<u64> {
        self.store.count(filter).await
    }

    pub async fn stats(&self, now: DateTime<Utc>) -> Result<ConsultationStats> {
        let facet = self.store.aggregate_one(ConsultationStats::pipeline(now)).await?;
        Ok(ConsultationStats::from_facet(&facet))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_rate() {
        let facet = doc! {
            "totals": [ { "count": 3 } ],
            "overdue": [ { "count": 1 } ],
            "byStatus": [ { "_id": "converted", "count": 1 }, { "_id": "new", "count": 2 } ],
            "bySource": [ { "_id": "zalo", "count": 3 } ],
        };
        let stats = ConsultationStats::from_facet(&facet);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.conversion_rate, 33.33);
        assert_eq!(stats.overdue, 1);
        assert_eq!(stats.new, 2);
        assert!(stats.by_priority.is_empty());
    }

    #[test]
    fn test_empty_stats_zeroed() {
        let stats = ConsultationStats::from_facet(&Document::new());
        assert_eq!(stats, ConsultationStats::default());
        assert_eq!(stats.conversion_rate, 0.0);
    }
}
