//! Banner Repository

use std::collections::BTreeMap;

use bson::{doc, Document};
use chrono::{DateTime, Utc};
use mongodb::Database;
use serde::Serialize;
use utoipa::ToSchema;

use crate::banner::entity::{click_through_rate, Banner};
use crate::shared::api_common::{Page, PageRequest};
use crate::shared::error::Result;
use crate::shared::query::{with_public_visibility, PublicVisibility};
use crate::shared::repository::{agg, MongoStore};

/// Slot order: lowest `sortOrder` first.
pub fn slot_order() -> Document {
    doc! { "sortOrder": 1, "createdAt": -1 }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BannerStats {
    pub total: u64,
    pub active: u64,
    /// Active and inside the display window right now
    pub live: u64,
    pub total_impressions: u64,
    pub total_clicks: u64,
    /// Overall click-through rate in percent
    pub ctr: f64,
    pub by_position: BTreeMap<String, u64>,
}

impl BannerStats {
    pub fn pipeline(now: DateTime<Utc>) -> Vec<Document> {
        vec![doc! {
            "$facet": {
                "totals": [
                    { "$group": {
                        "_id": null,
                        "count": { "$sum": 1 },
                        "active": { "$sum": { "$cond": ["$isActive", 1, 0] } },
                        "impressions": { "$sum": "$impressionCount" },
                        "clicks": { "$sum": "$clickCount" },
                    } }
                ],
                "live": [ { "$match": Banner::public_filter(now) }, { "$count": "count" } ],
                "byPosition": [ { "$group": { "_id": "$position", "count": { "$sum": 1 } } } ],
            }
        }]
    }

    pub fn from_facet(facet: &Document) -> Self {
        let totals = agg::first(facet, "totals");
        let impressions = agg::count(&totals, "impressions");
        let clicks = agg::count(&totals, "clicks");
        Self {
            total: agg::count(&totals, "count"),
            active: agg::count(&totals, "active"),
            live: agg::count(&agg::first(facet, "live"), "count"),
            total_impressions: impressions,
            total_clicks: clicks,
            ctr: click_through_rate(clicks, impressions),
            by_position: agg::buckets(agg::rows(facet, "byPosition")).into_iter().collect(),
        }
    }
}

pub struct BannerRepository {
    store: MongoStore<Banner>,
}

impl BannerRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            store: MongoStore::new(db, "banners", "Banner"),
        }
    }

    pub async fn insert(&self, banner: &Banner) -> Result<()> {
        self.store.insert(banner).await
    }

    pub async fn get(&self, id: &str) -> Result<Banner> {
        self.store.get(id).await
    }

    pub async fn search(&self, filter: Document, page: PageRequest) -> Result<Page<Banner>> {
        self.store.paginate(filter, slot_order(), page).await
    }

    pub async fn find_many(&self, filter: Document) -> Result<Vec<Banner>> {
        self.store.find_many(filter, slot_order(), None).await
    }

    /// Bump a counter on a banner that is currently visible. Returns false
    /// when the banner does not exist or is not on display.
    pub async fn increment_visible(&self, id: &str, field: &str, now: DateTime<Utc>) -> Result<bool> {
        let filter = with_public_visibility::<Banner>(doc! { "_id": id }, now);
        self.store.increment_matching(filter, field, 1).await
    }

    pub async fn update(&self, banner: &Banner) -> Result<()> {
        self.store.replace(&banner.id, banner).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        self.store.delete(id).await
    }

    pub async fn count(&self, filter: Document) -> Result<u64> {
        self.store.count(filter).await
    }

    pub async fn stats(&self, now: DateTime<Utc>) -> Result<BannerStats> {
        let facet = self.store.aggregate_one(BannerStats::pipeline(now)).await?;
        Ok(BannerStats::from_facet(&facet))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_ctr() {
        let facet = doc! {
            "totals": [ { "_id": null, "count": 3, "active": 2, "impressions": 400_i64, "clicks": 10 } ],
            "live": [ { "count": 1 } ],
            "byPosition": [ { "_id": "home_hero", "count": 2 }, { "_id": "popup", "count": 1 } ],
        };
        let stats = BannerStats::from_facet(&facet);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.live, 1);
        assert_eq!(stats.ctr, 2.5);
        assert_eq!(stats.by_position.len(), 2);
    }

    #[test]
    fn test_empty_stats() {
        assert_eq!(BannerStats::from_facet(&Document::new()), BannerStats::default());
    }
}
