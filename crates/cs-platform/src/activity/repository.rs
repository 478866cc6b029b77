//! Activity Log Repository

use bson::Document;
use mongodb::Database;

use crate::activity::entity::ActivityLog;
use crate::shared::api_common::{Page, PageRequest};
use crate::shared::error::Result;
use crate::shared::repository::{newest_first, MongoStore};

pub struct ActivityRepository {
    store: MongoStore<ActivityLog>,
}

impl ActivityRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            store: MongoStore::new(db, "activity_logs", "ActivityLog"),
        }
    }

    pub async fn insert(&self, log: &ActivityLog) -> Result<()> {
        self.store.insert(log).await
    }

    pub async fn get(&self, id: &str) -> Result<ActivityLog> {
        self.store.get(id).await
    }

    pub async fn search(&self, filter: Document, page: PageRequest) -> Result<Page<ActivityLog>> {
        self.store.paginate(filter, newest_first(), page).await
    }

    pub async fn recent(&self, limit: i64) -> Result<Vec<ActivityLog>> {
        self.store.find_many(Document::new(), newest_first(), Some(limit)).await
    }
}
