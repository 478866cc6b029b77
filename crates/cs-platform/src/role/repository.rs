//! Role and Permission Repositories

use bson::doc;
use mongodb::Database;

use crate::role::entity::{Permission, Role};
use crate::shared::error::Result;
use crate::shared::repository::MongoStore;

pub struct RoleRepository {
    store: MongoStore<Role>,
}

impl RoleRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            store: MongoStore::new(db, "roles", "Role"),
        }
    }

    pub async fn insert(&self, role: &Role) -> Result<()> {
        self.store.insert(role).await
    }

    pub async fn get(&self, id: &str) -> Result<Role> {
        self.store.get(id).await
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Role>> {
        self.store.find_one(doc! { "name": name }).await
    }

    pub async fn find_all(&self) -> Result<Vec<Role>> {
        self.store.find_many(doc! {}, doc! { "name": 1 }, None).await
    }

    pub async fn find_active_by_ids(&self, ids: &[String]) -> Result<Vec<Role>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.store
            .find_many(doc! { "_id": { "$in": ids }, "isActive": true }, doc! { "name": 1 }, None)
            .await
    }

    pub async fn count_with_permission(&self, permission: &str) -> Result<u64> {
        self.store.count(doc! { "permissions": permission }).await
    }

    pub async fn update(&self, role: &Role) -> Result<()> {
        self.store.replace(&role.id, role).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        self.store.delete(id).await
    }
}

pub struct PermissionRepository {
    store: MongoStore<Permission>,
}

impl PermissionRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            store: MongoStore::new(db, "permissions", "Permission"),
        }
    }

    pub async fn insert(&self, permission: &Permission) -> Result<()> {
        self.store.insert(permission).await
    }

    pub async fn get(&self, id: &str) -> Result<Permission> {
        self.store.get(id).await
    }

    pub async fn find_all(&self, resource: Option<&str>) -> Result<Vec<Permission>> {
        let filter = match resource {
            Some(resource) => doc! { "resource": resource },
            None => doc! {},
        };
        self.store
            .find_many(filter, doc! { "resource": 1, "action": 1 }, None)
            .await
    }

    /// Names from `names` that exist and are active.
    pub async fn existing_names(&self, names: &[String]) -> Result<Vec<String>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let found = self
            .store
            .find_many(doc! { "name": { "$in": names }, "isActive": true }, doc! { "name": 1 }, None)
            .await?;
        Ok(found.into_iter().map(|p| p.name).collect())
    }

    pub async fn exists_by_name(&self, name: &str) -> Result<bool> {
        self.store.exists(doc! { "name": name }).await
    }

    pub async fn update(&self, permission: &Permission) -> Result<()> {
        self.store.replace(&permission.id, permission).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        self.store.delete(id).await
    }
}
