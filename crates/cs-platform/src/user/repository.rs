//! User Repository

use bson::{doc, Document};
use chrono::{DateTime, Utc};
use mongodb::Database;

use crate::shared::api_common::{Page, PageRequest};
use crate::shared::repository::{newest_first, MongoStore};
use crate::shared::error::Result;
use crate::user::entity::{User, UserRole, UserStatus};

pub struct UserRepository {
    store: MongoStore<User>,
}

impl UserRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            store: MongoStore::new(db, "users", "User"),
        }
    }

    pub async fn insert(&self, user: &User) -> Result<()> {
        self.store.insert(user).await
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        self.store.find_by_id(id).await
    }

    pub async fn get(&self, id: &str) -> Result<User> {
        self.store.get(id).await
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.store.find_one(doc! { "email": email.trim().to_lowercase() }).await
    }

    pub async fn exists_by_email(&self, email: &str) -> Result<bool> {
        self.store.exists(doc! { "email": email.trim().to_lowercase() }).await
    }

    pub async fn find_active_by_id(&self, id: &str) -> Result<Option<User>> {
        self.store
            .find_one(doc! { "_id": id, "status": "active" })
            .await
    }

    pub async fn search(&self, filter: Document, page: PageRequest) -> Result<Page<User>> {
        self.store.paginate(filter, newest_first(), page).await
    }

    pub async fn count_with_role(&self, role: UserRole) -> Result<u64> {
        self.store.count(doc! { "role": role.as_str() }).await
    }

    /// Users referencing a Role document.
    pub async fn count_with_role_ref(&self, role_id: &str) -> Result<u64> {
        self.store.count(doc! { "roleRefs": role_id }).await
    }

    pub async fn count_with_permission(&self, permission: &str) -> Result<u64> {
        self.store.count(doc! { "permissions": permission }).await
    }

    pub async fn count(&self, filter: Document) -> Result<u64> {
        self.store.count(filter).await
    }

    pub async fn update(&self, user: &User) -> Result<()> {
        self.store.replace(&user.id, user).await
    }

    pub async fn set_status(&self, id: &str, status: UserStatus, now: DateTime<Utc>) -> Result<bool> {
        let status = bson::to_bson(&status)?;
        self.store
            .update_fields(id, doc! { "status": status, "updatedAt": bson::DateTime::from_chrono(now) })
            .await
    }

    pub async fn record_login(&self, id: &str, now: DateTime<Utc>) -> Result<()> {
        self.store
            .update_fields(id, doc! { "lastLoginAt": bson::DateTime::from_chrono(now) })
            .await?;
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        self.store.delete(id).await
    }
}
