//! Contact Message Repository

use std::collections::BTreeMap;

use bson::{doc, Document};
use chrono::{DateTime, Utc};
use mongodb::Database;
use serde::Serialize;
use utoipa::ToSchema;

use crate::contact::entity::ContactMessage;
use crate::shared::api_common::{Page, PageRequest};
use crate::shared::error::Result;
use crate::shared::query::to_bson_datetime;
use crate::shared::repository::{agg, newest_first, MongoStore};

/// Inbox figures for the admin dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactStats {
    pub total: u64,
    pub unread: u64,
    pub replied: u64,
    /// Open messages whose follow-up date has passed
    pub overdue: u64,
    /// Replied share of all messages, in percent
    pub response_rate: f64,
    pub by_status: BTreeMap<String, u64>,
    pub by_priority: BTreeMap<String, u64>,
    pub by_inquiry_type: BTreeMap<String, u64>,
}

impl ContactStats {
    pub fn pipeline(now: DateTime<Utc>) -> Vec<Document> {
        let overdue = doc! {
            "$and": [
                { "$ne": [{ "$ifNull": ["$followUpDate", null] }, null] },
                { "$lt": ["$followUpDate", to_bson_datetime(now)] },
                { "$not": [{ "$in": ["$status", ["replied", "closed"]] }] },
            ]
        };
        vec![doc! {
            "$facet": {
                "totals": [
                    { "$group": {
                        "_id": null,
                        "count": { "$sum": 1 },
                        "overdue": { "$sum": { "$cond": [overdue, 1, 0] } },
                    } }
                ],
                "byStatus": [ { "$group": { "_id": "$status", "count": { "$sum": 1 } } } ],
                "byPriority": [ { "$group": { "_id": "$priority", "count": { "$sum": 1 } } } ],
                "byInquiryType": [ { "$group": { "_id": "$inquiryType", "count": { "$sum": 1 } } } ],
            }
        }]
    }

    pub fn from_facet(facet: &Document) -> Self {
        let totals = agg::first(facet, "totals");
        let by_status: BTreeMap<String, u64> = agg::buckets(agg::rows(facet, "byStatus")).into_iter().collect();
        let total = agg::count(&totals, "count");
        let replied = by_status.get("replied").copied().unwrap_or(0);
        Self {
            total,
            unread: by_status.get("new").copied().unwrap_or(0),
            replied,
            overdue: agg::count(&totals, "overdue"),
            response_rate: (agg::percent(replied as f64, total as f64) * 100.0).round() / 100.0,
            by_status,
            by_priority: agg::buckets(agg::rows(facet, "byPriority")).into_iter().collect(),
            by_inquiry_type: agg::buckets(agg::rows(facet, "byInquiryType")).into_iter().collect(),
        }
    }
}

pub struct ContactRepository {
    store: MongoStore<ContactMessage>,
}

impl ContactRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            store: MongoStore::new(db, "contact_messages", "Contact message"),
        }
    }

    pub async fn insert(&self, message: &ContactMessage) -> Result<()> {
        self.store.insert(message).await
    }

    pub async fn get(&self, id: &str) -> Result<ContactMessage> {
        self.store.get(id).await
    }

    pub async fn search(&self, filter: Document, page: PageRequest) -> Result<Page<ContactMessage>> {
        self.store.paginate(filter, newest_first(), page).await
    }

    pub async fn update(&self, message: &ContactMessage) -> Result<()> {
        self.store.replace(&message.id, message).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        self.store.delete(id).await
    }

    pub async fn count(&self, filter: Document) -> Result<u64> {
        self.store.count(filter).await
    }

    pub async fn stats(&self, now: DateTime<Utc>) -> Result<ContactStats> {
        let facet = self.store.aggregate_one(ContactStats::pipeline(now)).await?;
        Ok(ContactStats::from_facet(&facet))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_from_facet() {
        let facet = doc! {
            "totals": [ { "count": 8, "overdue": 2 } ],
            "byStatus": [ { "_id": "new", "count": 3 }, { "_id": "replied", "count": 3 }, { "_id": "closed", "count": 2 } ],
            "byPriority": [ { "_id": "normal", "count": 8 } ],
            "byInquiryType": [ { "_id": "project", "count": 5 }, { "_id": "general", "count": 3 } ],
        };
        let stats = ContactStats::from_facet(&facet);
        assert_eq!(stats.total, 8);
        assert_eq!(stats.unread, 3);
        assert_eq!(stats.overdue, 2);
        assert_eq!(stats.response_rate, 37.5);
        assert_eq!(stats.by_inquiry_type.get("project"), Some(&5));
    }

    #[test]
    fn test_empty_stats() {
        assert_eq!(ContactStats::from_facet(&Document::new()), ContactStats::default());
    }
}
