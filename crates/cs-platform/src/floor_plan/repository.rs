//! Floor Plan Repository

use bson::{doc, Document};
use mongodb::Database;

use crate::floor_plan::entity::FloorPlan;
use crate::shared::api_common::{Page, PageRequest};
use crate::shared::error::Result;
use crate::shared::repository::MongoStore;

/// Layout order within a project
pub fn plan_order() -> Document {
    doc! { "sortOrder": 1, "area": 1 }
}

pub struct FloorPlanRepository {
    store: MongoStore<FloorPlan>,
}

impl FloorPlanRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            store: MongoStore::new(db, "floor_plans", "FloorPlan"),
        }
    }

    pub async fn insert(&self, plan: &FloorPlan) -> Result<()> {
        self.store.insert(plan).await
    }

    pub async fn get(&self, id: &str) -> Result<FloorPlan> {
        self.store.get(id).await
    }

    pub async fn search(&self, filter: Document, page: PageRequest) -> Result<Page<FloorPlan>> {
        self.store.paginate(filter, plan_order(), page).await
    }

    pub async fn find_many(&self, filter: Document) -> Result<Vec<FloorPlan>> {
        self.store.find_many(filter, plan_order(), None).await
    }

    pub async fn update(&self, plan: &FloorPlan) -> Result<()> {
        self.store.replace(&plan.id, plan).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        self.store.delete(id).await
    }

    pub async fn delete_for_project(&self, project_id: &str) -> Result<u64> {
        self.store.delete_many(doc! { "projectId": project_id }).await
    }
}
