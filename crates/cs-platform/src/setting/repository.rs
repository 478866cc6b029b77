//! Site Setting Repository

use bson::{doc, Document};
use mongodb::Database;

use crate::setting::entity::Setting;
use crate::shared::error::Result;
use crate::shared::repository::MongoStore;

pub struct SettingRepository {
    store: MongoStore<Setting>,
}

impl SettingRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            store: MongoStore::new(db, "settings", "Setting"),
        }
    }

    pub async fn insert(&self, setting: &Setting) -> Result<()> {
        self.store.insert(setting).await
    }

    pub async fn find_by_key(&self, key: &str) -> Result<Option<Setting>> {
        self.store.find_one(doc! { "key": key }).await
    }

    /// All settings matching `filter`, grouped then alphabetical.
    pub async fn find_many(&self, filter: Document) -> Result<Vec<Setting>> {
        self.store
            .find_many(filter, doc! { "group": 1, "key": 1 }, None)
            .await
    }

    pub async fn update(&self, setting: &Setting) -> Result<()> {
        self.store.replace(&setting.id, setting).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        self.store.delete(id).await
    }

    pub async fn count(&self, filter: Document) -> Result<u64> {
        self.store.count(filter).await
    }
}
