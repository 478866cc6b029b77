//! Analytics Event Repository

use std::collections::BTreeMap;

use bson::{doc, Document};
use chrono::{DateTime, Utc};
use mongodb::Database;
use serde::Serialize;
use utoipa::ToSchema;

use crate::analytics::entity::AnalyticsEvent;
use crate::shared::error::Result;
use crate::shared::query::to_bson_datetime;
use crate::shared::repository::{agg, MongoStore};

const TOP_PAGES: i64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageViews {
    pub page: String,
    pub views: u64,
}

/// One UTC calendar day of traffic
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailyTraffic {
    /// `YYYY-MM-DD`
    pub date: String,
    pub events: u64,
    pub sessions: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub from: String,
    pub to: String,
    pub total_events: u64,
    pub unique_sessions: u64,
    pub page_views: u64,
    pub by_event_type: BTreeMap<String, u64>,
    pub by_device: BTreeMap<String, u64>,
    pub top_pages: Vec<PageViews>,
    pub daily: Vec<DailyTraffic>,
}

impl AnalyticsSummary {
    pub fn pipeline(from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<Document> {
        vec![
            doc! { "$match": { "createdAt": { "$gte": to_bson_datetime(from), "$lte": to_bson_datetime(to) } } },
            doc! {
                "$facet": {
                    "totals": [ { "$count": "count" } ],
                    "sessions": [
                        { "$group": { "_id": "$sessionId" } },
                        { "$count": "count" },
                    ],
                    "byEventType": [ { "$group": { "_id": "$eventType", "count": { "$sum": 1 } } } ],
                    "byDevice": [ { "$group": { "_id": "$device", "count": { "$sum": 1 } } } ],
                    "topPages": [
                        { "$match": { "eventType": "page_view" } },
                        { "$group": { "_id": "$page", "count": { "$sum": 1 } } },
                        { "$sort": { "count": -1, "_id": 1 } },
                        { "$limit": TOP_PAGES },
                    ],
                    "daily": [
                        { "$group": {
                            "_id": { "$dateToString": { "format": "%Y-%m-%d", "date": "$createdAt" } },
                            "count": { "$sum": 1 },
                            "sessions": { "$addToSet": "$sessionId" },
                        } },
                        { "$project": { "count": 1, "sessions": { "$size": "$sessions" } } },
                        { "$sort": { "_id": 1 } },
                    ],
                }
            },
        ]
    }

    pub fn from_facet(facet: &Document, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        let by_event_type: BTreeMap<String, u64> =
            agg::buckets(agg::rows(facet, "byEventType")).into_iter().collect();
        let daily = agg::rows(facet, "daily")
            .iter()
            .filter_map(|row| row.as_document())
            .map(|row| DailyTraffic {
                date: row.get_str("_id").unwrap_or_default().to_string(),
                events: agg::count(row, "count"),
                sessions: agg::count(row, "sessions"),
            })
            .collect();
        Self {
            from: from.to_rfc3339(),
            to: to.to_rfc3339(),
            total_events: agg::count(&agg::first(facet, "totals"), "count"),
            unique_sessions: agg::count(&agg::first(facet, "sessions"), "count"),
            page_views: by_event_type.get("page_view").copied().unwrap_or(0),
            by_event_type,
            by_device: agg::buckets(agg::rows(facet, "byDevice")).into_iter().collect(),
            top_pages: agg::buckets(agg::rows(facet, "topPages"))
                .into_iter()
                .map(|(page, views)| PageViews { page, views })
                .collect(),
            daily,
        }
    }
}

pub struct AnalyticsRepository {
    store: MongoStore<AnalyticsEvent>,
}

impl AnalyticsRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            store: MongoStore::new(db, "analytics_data", "Analytics event"),
        }
    }

    pub async fn insert(&self, event: &AnalyticsEvent) -> Result<()> {
        self.store.insert(event).await
    }

    pub async fn count(&self, filter: Document) -> Result<u64> {
        self.store.count(filter).await
    }

    pub async fn summary(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<AnalyticsSummary> {
        let facet = self.store.aggregate_one(AnalyticsSummary::pipeline(from, to)).await?;
        Ok(AnalyticsSummary::from_facet(&facet, from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_summary_from_facet() {
        let from = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2026, 3, 31, 0, 0, 0).unwrap();
        let facet = doc! {
            "totals": [ { "count": 12 } ],
            "sessions": [ { "count": 4 } ],
            "byEventType": [ { "_id": "page_view", "count": 9 }, { "_id": "click", "count": 3 } ],
            "byDevice": [ { "_id": "mobile", "count": 7 }, { "_id": "desktop", "count": 5 } ],
            "topPages": [ { "_id": "/", "count": 5 }, { "_id": "/du-an", "count": 4 } ],
            "daily": [
                { "_id": "2026-03-02", "count": 5, "sessions": 2 },
                { "_id": "2026-03-03", "count": 7, "sessions": 3 },
            ],
        };
        let summary = AnalyticsSummary::from_facet(&facet, from, to);
        assert_eq!(summary.total_events, 12);
        assert_eq!(summary.unique_sessions, 4);
        assert_eq!(summary.page_views, 9);
        assert_eq!(summary.by_device.get("mobile"), Some(&7));
        assert_eq!(summary.top_pages[0], PageViews { page: "/".to_string(), views: 5 });
        assert_eq!(summary.daily[1].date, "2026-03-03");
        assert_eq!(summary.daily[1].sessions, 3);
    }

    #[test]
    fn test_empty_summary_is_zeroed() {
        let now = Utc::now();
        let summary = AnalyticsSummary::from_facet(&Document::new(), now, now);
        assert_eq!(summary.total_events, 0);
        assert!(summary.top_pages.is_empty());
        assert!(summary.daily.is_empty());
    }

    #[test]
    fn test_pipeline_bounds_by_range() {
        let from = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        let pipeline = AnalyticsSummary::pipeline(from, to);
        let range = pipeline[0].get_document("$match").unwrap().get_document("createdAt").unwrap();
        assert_eq!(range.get_datetime("$gte").unwrap(), &to_bson_datetime(from));
    }
}
