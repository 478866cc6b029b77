//! Newsletter Subscriber Repository

use std::collections::BTreeMap;

use bson::{doc, Document};
use mongodb::Database;
use serde::Serialize;
use utoipa::ToSchema;

use crate::newsletter::entity::NewsletterSubscriber;
use crate::shared::api_common::{Page, PageRequest};
use crate::shared::error::Result;
use crate::shared::repository::{agg, newest_first, MongoStore};

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterStats {
    pub total: u64,
    pub active: u64,
    pub unsubscribed: u64,
    pub bounced: u64,
    pub by_status: BTreeMap<String, u64>,
    /// Active subscribers per interest
    pub by_interest: BTreeMap<String, u64>,
}

impl NewsletterStats {
    pub fn pipeline() -> Vec<Document> {
        vec![doc! {
            "$facet": {
                "totals": [ { "$count": "count" } ],
                "byStatus": [ { "$group": { "_id": "$status", "count": { "$sum": 1 } } } ],
                "byInterest": [
                    { "$match": { "status": "active" } },
                    { "$unwind": "$interests" },
                    { "$group": { "_id": "$interests", "count": { "$sum": 1 } } },
                ],
            }
        }]
    }

    pub fn from_facet(facet: &Document) -> Self {
        let by_status: BTreeMap<String, u64> = agg::buckets(agg::rows(facet, "byStatus")).into_iter().collect();
        let status = |key: &str| by_status.get(key).copied().unwrap_or(0);
        Self {
            total: agg::count(&agg::first(facet, "totals"), "count"),
            active: status("active"),
            unsubscribed: status("unsubscribed"),
            bounced: status("bounced"),
            by_interest: agg::buckets(agg::rows(facet, "byInterest")).into_iter().collect(),
            by_status,
        }
    }
}

pub struct NewsletterRepository {
    store: MongoStore<NewsletterSubscriber>,
}

impl NewsletterRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            store: MongoStore::new(db, "newsletter_subscribers", "Newsletter subscriber"),
        }
    }

    pub async fn insert(&self, subscriber: &NewsletterSubscriber) -> Result<()> {
        self.store.insert(subscriber).await
    }

    pub async fn get(&self, id: &str) -> Result<NewsletterSubscriber> {
        self.store.get(id).await
    }

    /// Expects an already normalized (lowercase) address.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<NewsletterSubscriber>> {
        self.store.find_one(doc! { "email": email }).await
    }

    pub async fn search(&self, filter: Document, page: PageRequest) -> Result<Page<NewsletterSubscriber>> {
        self.store.paginate(filter, newest_first(), page).await
    }

    pub async fn update(&self, subscriber: &NewsletterSubscriber) -> Result<()> {
        self.store.replace(&subscriber.id, subscriber).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        self.store.delete(id).await
    }

    pub async fn count(&self, filter: Document) -> Result<u64> {
        self.store.count(filter).await
    }

    pub async fn stats(&self) -> Result<NewsletterStats> {
        let facet = self.store.aggregate_one(NewsletterStats::pipeline()).await?;
        Ok(NewsletterStats::from_facet(&facet))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_from_facet() {
        let facet = doc! {
            "totals": [ { "count": 5 } ],
            "byStatus": [
                { "_id": "active", "count": 3 },
                { "_id": "unsubscribed", "count": 2_i64 },
            ],
            "byInterest": [ { "_id": "ginseng", "count": 2 } ],
        };
        let stats = NewsletterStats::from_facet(&facet);
        assert_eq!(stats.total, 5);
        assert_eq!(stats.active, 3);
        assert_eq!(stats.unsubscribed, 2);
        assert_eq!(stats.bounced, 0);
        assert_eq!(stats.by_interest.get("ginseng"), Some(&2));
    }

    #[test]
    fn test_interest_facet_counts_active_only() {
        let pipeline = NewsletterStats::pipeline();
        let facet = pipeline[0].get_document("$facet").unwrap();
        let stages = facet.get_array("byInterest").unwrap();
        let first = stages[0].as_document().unwrap();
        assert_eq!(first.get_document("$match").unwrap(), &doc! { "status": "active" });
    }
}
