//! Careers Repositories

use std::collections::BTreeMap;

use bson::{doc, Document};
use mongodb::Database;
use serde::Serialize;
use utoipa::ToSchema;

use crate::careers::entity::{JobApplication, JobPosting};
use crate::shared::api_common::{Page, PageRequest};
use crate::shared::error::Result;
use crate::shared::repository::{agg, newest_first, MongoStore};

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobStats {
    pub total: u64,
    pub open: u64,
    pub total_positions: u64,
    pub total_views: u64,
    pub by_status: BTreeMap<String, u64>,
    pub by_department: BTreeMap<String, u64>,
}

impl JobStats {
    pub fn pipeline() -> Vec<Document> {
        vec![doc! {
            "$facet": {
                "totals": [
                    { "$group": {
                        "_id": null,
                        "count": { "$sum": 1 },
                        "positions": { "$sum": "$positions" },
                        "views": { "$sum": "$viewCount" },
                    } }
                ],
                "byStatus": [ { "$group": { "_id": "$status", "count": { "$sum": 1 } } } ],
                "byDepartment": [ { "$group": { "_id": "$department", "count": { "$sum": 1 } } } ],
            }
        }]
    }

    pub fn from_facet(facet: &Document) -> Self {
        let totals = agg::first(facet, "totals");
        let by_status: BTreeMap<String, u64> = agg::buckets(agg::rows(facet, "byStatus")).into_iter().collect();
        Self {
            total: agg::count(&totals, "count"),
            open: by_status.get("open").copied().unwrap_or(0),
            total_positions: agg::count(&totals, "positions"),
            total_views: agg::count(&totals, "views"),
            by_status,
            by_department: agg::buckets(agg::rows(facet, "byDepartment")).into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationStats {
    pub total: u64,
    /// Still waiting for a first review
    pub pending: u64,
    pub hired: u64,
    /// hired / total × 100
    pub hire_rate: f64,
    pub by_status: BTreeMap<String, u64>,
    /// Top postings by number of applications
    pub by_job: BTreeMap<String, u64>,
}

impl ApplicationStats {
    pub fn pipeline() -> Vec<Document> {
        vec![doc! {
            "$facet": {
                "totals": [ { "$count": "count" } ],
                "byStatus": [ { "$group": { "_id": "$status", "count": { "$sum": 1 } } } ],
                "byJob": [
                    { "$group": { "_id": "$jobTitle", "count": { "$sum": 1 } } },
                    { "$sort": { "count": -1 } },
                    { "$limit": 10 },
                ],
            }
        }]
    }

    pub fn from_facet(facet: &Document) -> Self {
        let total = agg::count(&agg::first(facet, "totals"), "count");
        let by_status: BTreeMap<String, u64> = agg::buckets(agg::rows(facet, "byStatus")).into_iter().collect();
        let hired = by_status.get("hired").copied().unwrap_or(0);
        Self {
            total,
            pending: by_status.get("submitted").copied().unwrap_or(0),
            hired,
            hire_rate: (agg::percent(hired as f64, total as f64) * 100.0).round() / 100.0,
            by_status,
            by_job: agg::buckets(agg::rows(facet, "byJob")).into_iter().collect(),
        }
    }
}

pub struct JobPostingRepository {
    store: MongoStore<JobPosting>,
}

impl JobPostingRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            store: MongoStore::new(db, "job_postings", "Job posting"),
        }
    }

    pub async fn insert(&self, job: &JobPosting) -> Result<()> {
        self.store.insert(job).await
    }

    pub async fn get(&self, id: &str) -> Result<JobPosting> {
        self.store.get(id).await
    }

    pub async fn find_one(&self, filter: Document) -> Result<Option<JobPosting>> {
        self.store.find_one(filter).await
    }

    pub async fn exists_by_slug(&self, slug: &str) -> Result<bool> {
        self.store.exists(doc! { "slug": slug }).await
    }

    pub async fn search(&self, filter: Document, sort: Document, page: PageRequest) -> Result<Page<JobPosting>> {
        self.store.paginate(filter, sort, page).await
    }

    pub async fn update(&self, job: &JobPosting) -> Result<()> {
        self.store.replace(&job.id, job).await
    }

    pub async fn increment_views(&self, id: &str) -> Result<bool> {
        self.store.increment(id, "viewCount", 1).await
    }

    pub async fn increment_applications(&self, id: &str) -> Result<bool> {
        self.store.increment(id, "applicationCount", 1).await
    }

    /// Decrement that never takes the counter below zero.
    pub async fn decrement_applications(&self, id: &str) -> Result<bool> {
        self.store
            .increment_matching(positive_application_count(id), "applicationCount", -1)
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        self.store.delete(id).await
    }

    pub async fn count(&self, filter: Document) -> Result<u64> {
        self.store.count(filter).await
    }

    pub async fn stats(&self) -> Result<JobStats> {
        let facet = self.store.aggregate_one(JobStats::pipeline()).await?;
        Ok(JobStats::from_facet(&facet))
    }
}

fn positive_application_count(job_id: &str) -> Document {
    doc! { "_id": job_id, "applicationCount": { "$gt": 0 } }
}

pub struct JobApplicationRepository {
    store: MongoStore<JobApplication>,
}

impl JobApplicationRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            store: MongoStore::new(db, "job_applications", "Job application"),
        }
    }

    pub async fn insert(&self, application: &JobApplication) -> Result<()> {
        self.store.insert(application).await
    }

    pub async fn get(&self, id: &str) -> Result<JobApplication> {
        self.store.get(id).await
    }

    pub async fn search(&self, filter: Document, page: PageRequest) -> Result<Page<JobApplication>> {
        self.store.paginate(filter, newest_first(), page).await
    }

    pub async fn count_for_job(&self, job_id: &str) -> Result<u64> {
        self.store.count(doc! { "jobId": job_id }).await
    }

    pub async fn update(&self, application: &JobApplication) -> Result<()> {
        self.store.replace(&application.id, application).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        self.store.delete(id).await
    }

    pub async fn count(&self, filter: Document) -> Result<u64> {
        self.store.count(filter).await
    }

    pub async fn stats(&self) -> Result<ApplicationStats> {
        let facet = self.store.aggregate_one(ApplicationStats::pipeline()).await?;
        Ok(ApplicationStats::from_facet(&facet))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decrement_guard_targets_positive_counter() {
        let filter = positive_application_count("0HZXEQ5Y8JY5Z");
        assert_eq!(filter.get_str("_id").unwrap(), "0HZXEQ5Y8JY5Z");
        let guard = filter.get_document("applicationCount").unwrap();
        assert_eq!(guard.get_i32("$gt").unwrap(), 0);
    }

    #[test]
    fn test_job_stats() {
        let facet = doc! {
            "totals": [ { "_id": null, "count": 4, "positions": 9, "views": 120_i64 } ],
            "byStatus": [ { "_id": "open", "count": 2 }, { "_id": "draft", "count": 2 } ],
            "byDepartment": [ { "_id": "Sales", "count": 3 } ],
        };
        let stats = JobStats::from_facet(&facet);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.open, 2);
        assert_eq!(stats.total_positions, 9);
        assert_eq!(stats.total_views, 120);
        assert_eq!(stats.by_department.get("Sales"), Some(&3));
    }

    #[test]
    fn test_application_stats() {
        let facet = doc! {
            "totals": [ { "count": 8 } ],
            "byStatus": [
                { "_id": "submitted", "count": 5 },
                { "_id": "hired", "count": 1 },
                { "_id": "rejected", "count": 2 },
            ],
        };
        let stats = ApplicationStats::from_facet(&facet);
        assert_eq!(stats.pending, 5);
        assert_eq!(stats.hire_rate, 12.5);
        assert!(stats.by_job.is_empty());
    }

    #[test]
    fn test_empty_collections_zeroed() {
        assert_eq!(JobStats::from_facet(&Document::new()), JobStats::default());
        assert_eq!(ApplicationStats::from_facet(&Document::new()), ApplicationStats::default());
    }
}
