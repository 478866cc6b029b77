//! File Upload Repository

use bson::{doc, Document};
use mongodb::Database;

use crate::shared::api_common::{Page, PageRequest};
use crate::shared::error::Result;
use crate::shared::repository::{newest_first, MongoStore};
use crate::upload::entity::FileUpload;

pub struct FileUploadRepository {
    store: MongoStore<FileUpload>,
}

impl FileUploadRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            store: MongoStore::new(db, "file_uploads", "FileUpload"),
        }
    }

    pub async fn insert(&self, file: &FileUpload) -> Result<()> {
        self.store.insert(file).await
    }

    pub async fn get(&self, id: &str) -> Result<FileUpload> {
        self.store.get(id).await
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> Result<Option<FileUpload>> {
        self.store.find_one(doc! { "publicId": public_id }).await
    }

    pub async fn search(&self, filter: Document, page: PageRequest) -> Result<Page<FileUpload>> {
        self.store.paginate(filter, newest_first(), page).await
    }

    pub async fn update(&self, file: &FileUpload) -> Result<()> {
        self.store.replace(&file.id, file).await
    }

    pub async fn increment_downloads(&self, id: &str) -> Result<bool> {
        self.store.increment(id, "downloadCount", 1).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        self.store.delete(id).await
    }

    pub async fn count(&self) -> Result<u64> {
        self.store.count(doc! {}).await
    }
}
