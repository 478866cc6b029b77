//! MongoDB Index Initialization
//!
//! Creates indexes for all collections on application startup. Unique
//! indexes back the duplicate checks (E11000 maps to `Duplicate`); TTL
//! indexes expire activity and analytics rows.

use std::time::Duration;

use mongodb::{bson::doc, bson::Document, options::IndexOptions, Database, IndexModel};
use tracing::info;

use crate::shared::error::Result;

/// Activity logs: 1 year
pub const ACTIVITY_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Analytics events: 2 years
pub const ANALYTICS_TTL: Duration = Duration::from_secs(730 * 24 * 60 * 60);

fn plain(keys: Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

fn unique(keys: Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

fn ttl(field: &str, after: Duration) -> IndexModel {
    IndexModel::builder()
        .keys(doc! { field: 1 })
        .options(IndexOptions::builder().expire_after(after).build())
        .build()
}

/// Every index, grouped by collection.
pub fn index_plan() -> Vec<(&'static str, Vec<IndexModel>)> {
    vec![
        ("users", vec![unique(doc! { "email": 1 }), plain(doc! { "role": 1, "status": 1 }), plain(doc! { "roleRefs": 1 })]),
        ("roles", vec![unique(doc! { "name": 1 }), plain(doc! { "permissions": 1 })]),
        ("permissions", vec![unique(doc! { "name": 1 }), plain(doc! { "resource": 1 })]),
        (
            "projects",
            vec![
                unique(doc! { "slug": 1 }),
                plain(doc! { "isActive": 1, "isFeatured": 1, "createdAt": -1 }),
                plain(doc! { "projectType": 1, "status": 1 }),
                plain(doc! { "location.city": 1 }),
            ],
        ),
        ("floor_plans", vec![plain(doc! { "projectId": 1, "sortOrder": 1 })]),
        ("ginseng_categories", vec![unique(doc! { "slug": 1 }), unique(doc! { "name": 1 })]),
        ("ginseng_origins", vec![unique(doc! { "slug": 1 }), unique(doc! { "name": 1 })]),
        (
            "ginseng_products",
            vec![
                unique(doc! { "slug": 1 }),
                unique(doc! { "sku": 1 }),
                plain(doc! { "categoryId": 1 }),
                plain(doc! { "originId": 1 }),
                plain(doc! { "isActive": 1, "status": 1, "isFeatured": 1 }),
            ],
        ),
        ("news_categories", vec![unique(doc! { "slug": 1 }), unique(doc! { "name": 1 })]),
        (
            "news_articles",
            vec![
                unique(doc! { "slug": 1 }),
                plain(doc! { "status": 1, "publishedAt": -1 }),
                plain(doc! { "categoryId": 1 }),
                plain(doc! { "tags": 1 }),
            ],
        ),
        (
            "contact_messages",
            vec![plain(doc! { "status": 1, "createdAt": -1 }), plain(doc! { "followUpDate": 1 }), plain(doc! { "assignedTo": 1 })],
        ),
        (
            "consultation_requests",
            vec![plain(doc! { "status": 1, "createdAt": -1 }), plain(doc! { "followUpDate": 1 }), plain(doc! { "assignedTo": 1 })],
        ),
        ("newsletter_subscribers", vec![unique(doc! { "email": 1 }), plain(doc! { "status": 1 })]),
        (
            "job_postings",
            vec![unique(doc! { "slug": 1 }), plain(doc! { "isActive": 1, "status": 1, "deadline": 1 })],
        ),
        ("job_applications", vec![plain(doc! { "jobId": 1, "createdAt": -1 }), plain(doc! { "status": 1 })]),
        ("banners", vec![plain(doc! { "position": 1, "isActive": 1, "sortOrder": 1 })]),
        ("settings", vec![unique(doc! { "key": 1 }), plain(doc! { "group": 1, "isPublic": 1 })]),
        (
            "file_uploads",
            vec![unique(doc! { "publicId": 1 }), plain(doc! { "fileType": 1, "createdAt": -1 }), plain(doc! { "uploadedBy": 1 })],
        ),
        (
            "activity_logs",
            vec![
                ttl("createdAt", ACTIVITY_TTL),
                plain(doc! { "userId": 1, "createdAt": -1 }),
                plain(doc! { "resourceType": 1, "resourceId": 1 }),
            ],
        ),
        (
            "analytics_data",
            vec![ttl("createdAt", ANALYTICS_TTL), plain(doc! { "eventType": 1, "createdAt": -1 }), plain(doc! { "sessionId": 1 })],
        ),
    ]
}

/// Initialize all MongoDB indexes
pub async fn initialize_indexes(db: &Database) -> Result<()> {
    info!("Initializing MongoDB indexes...");
    for (collection, models) in index_plan() {
        let count = models.len();
        db.collection::<Document>(collection).create_indexes(models).await?;
        info!(collection, count, "Ensured indexes");
    }
    info!("MongoDB indexes initialized successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_windows() {
        let plan = index_plan();
        let ttl_of = |name: &str| {
            plan.iter()
                .find(|(c, _)| *c == name)
                .and_then(|(_, models)| models.iter().find_map(|m| m.options.as_ref()?.expire_after))
        };
        assert_eq!(ttl_of("activity_logs"), Some(Duration::from_secs(31_536_000)));
        assert_eq!(ttl_of("analytics_data"), Some(Duration::from_secs(63_072_000)));
        assert_eq!(ttl_of("users"), None);
    }

    #[test]
    fn test_unique_lookups_are_indexed() {
        let plan = index_plan();
        let is_unique = |name: &str, field: &str| {
            plan.iter().any(|(c, models)| {
                *c == name
                    && models.iter().any(|m| {
                        m.keys.contains_key(field) && m.options.as_ref().and_then(|o| o.unique) == Some(true)
                    })
            })
        };
        assert!(is_unique("users", "email"));
        assert!(is_unique("settings", "key"));
        assert!(is_unique("ginseng_products", "sku"));
        assert!(is_unique("newsletter_subscribers", "email"));
        assert!(!is_unique("banners", "position"));
    }
}
