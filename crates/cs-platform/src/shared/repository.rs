//! Typed collection wrapper shared by every entity repository.

use bson::{doc, Document};
use futures::TryStreamExt;
use mongodb::{options::FindOptions, Collection, Database};
use serde::{de::DeserializeOwned, Serialize};

use crate::shared::api_common::{Page, PageRequest};
use crate::shared::error::{PlatformError, Result};

/// Default listing order: newest first.
pub fn newest_first() -> Document {
    doc! { "createdAt": -1 }
}

/// Append `_id` as the final sort key so that equal sort values still come
/// back in one fixed order across repeated reads.
pub fn total_order(mut sort: Document) -> Document {
    if !sort.contains_key("_id") {
        sort.insert("_id", -1);
    }
    sort
}

pub struct MongoStore<T: Send + Sync> {
    collection: Collection<T>,
    entity: &'static str,
}

impl<T> MongoStore<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    pub fn new(db: &Database, collection: &str, entity: &'static str) -> Self {
        Self {
            collection: db.collection(collection),
            entity,
        }
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    /// Untyped view of the same collection, for partial updates and pipelines.
    pub fn documents(&self) -> Collection<Document> {
        self.collection.clone_with_type()
    }

    pub async fn insert(&self, item: &T) -> Result<()> {
        self.collection
            .insert_one(item)
            .await
            .map_err(|e| PlatformError::from_write(self.entity, e))?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<T>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    /// Like [`find_by_id`](Self::find_by_id) but absent rows are a NotFound error.
    pub async fn get(&self, id: &str) -> Result<T> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| PlatformError::not_found(self.entity, id))
    }

    pub async fn find_one(&self, filter: Document) -> Result<Option<T>> {
        Ok(self.collection.find_one(filter).await?)
    }

    pub async fn find_many(&self, filter: Document, sort: Document, limit: Option<i64>) -> Result<Vec<T>> {
        let options = FindOptions::builder()
            .sort(total_order(sort))
            .limit(limit)
            .build();

        let cursor = self.collection.find(filter).with_options(options).await?;
        Ok(cursor.try_collect().await?)
    }

    /// One page of `filter`, plus the total count. Pages past the end are empty.
    pub async fn paginate(&self, filter: Document, sort: Document, request: PageRequest) -> Result<Page<T>> {
        let total = self.collection.count_documents(filter.clone()).await?;
        if request.is_past(total) {
            return Ok(Page::new(Vec::new(), total, request));
        }

        let options = FindOptions::builder()
            .sort(total_order(sort))
            .skip(request.skip())
            .limit(request.limit as i64)
            .build();

        let cursor = self.collection.find(filter).with_options(options).await?;
        let items: Vec<T> = cursor.try_collect().await?;

        Ok(Page::new(items, total, request))
    }

    pub async fn count(&self, filter: Document) -> Result<u64> {
        Ok(self.collection.count_documents(filter).await?)
    }

    pub async fn exists(&self, filter: Document) -> Result<bool> {
        Ok(self.count(filter).await? > 0)
    }

    pub async fn replace(&self, id: &str, item: &T) -> Result<()> {
        let result = self
            .collection
            .replace_one(doc! { "_id": id }, item)
            .await
            .map_err(|e| PlatformError::from_write(self.entity, e))?;
        if result.matched_count == 0 {
            return Err(PlatformError::not_found(self.entity, id));
        }
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }

    pub async fn delete_many(&self, filter: Document) -> Result<u64> {
        let result = self.collection.delete_many(filter).await?;
        Ok(result.deleted_count)
    }

    /// Atomic `$inc` of a counter field.
    pub async fn increment(&self, id: &str, field: &str, by: i64) -> Result<bool> {
        let result = self
            .collection
            .update_one(doc! { "_id": id }, doc! { "$inc": { field: by } })
            .await?;
        Ok(result.matched_count > 0)
    }

    /// `$inc` on the single document matching `filter`; false when none does.
    pub async fn increment_matching(&self, filter: Document, field: &str, by: i64) -> Result<bool> {
        let result = self
            .collection
            .update_one(filter, doc! { "$inc": { field: by } })
            .await?;
        Ok(result.matched_count > 0)
    }

    pub async fn update_fields(&self, id: &str, set: Document) -> Result<bool> {
        let result = self
            .collection
            .update_one(doc! { "_id": id }, doc! { "$set": set })
            .await?;
        Ok(result.matched_count > 0)
    }

    pub async fn aggregate(&self, pipeline: Vec<Document>) -> Result<Vec<Document>> {
        let cursor = self.collection.aggregate(pipeline).await?;
        Ok(cursor.try_collect().await?)
    }

    /// First document of a pipeline that yields at most one (e.g. `$facet`).
    pub async fn aggregate_one(&self, pipeline: Vec<Document>) -> Result<Document> {
        Ok(self.aggregate(pipeline).await?.into_iter().next().unwrap_or_default())
    }
}

/// Reading helpers for aggregation output, where numeric widths vary.
pub mod agg {
    use bson::{Bson, Document};

    pub fn number(doc: &Document, key: &str) -> f64 {
        match doc.get(key) {
            Some(Bson::Int32(v)) => *v as f64,
            Some(Bson::Int64(v)) => *v as f64,
            Some(Bson::Double(v)) => *v,
            _ => 0.0,
        }
    }

    pub fn count(doc: &Document, key: &str) -> u64 {
        number(doc, key).max(0.0) as u64
    }

    /// `{_id: <key>, count: n}` rows as (key, n) pairs.
    pub fn buckets(rows: &[Bson]) -> Vec<(String, u64)> {
        rows.iter()
            .filter_map(|row| row.as_document())
            .map(|row| {
                let key = match row.get("_id") {
                    Some(Bson::String(s)) => s.clone(),
                    Some(Bson::Boolean(b)) => b.to_string(),
                    Some(Bson::Null) | None => "unknown".to_string(),
                    Some(other) => other.to_string(),
                };
                (key, count(row, "count"))
            })
            .collect()
    }

    /// First document of a `$facet` branch.
    pub fn first(doc: &Document, facet: &str) -> Document {
        doc.get_array(facet)
            .ok()
            .and_then(|rows| rows.first())
            .and_then(|row| row.as_document())
            .cloned()
            .unwrap_or_default()
    }

    pub fn rows<'a>(doc: &'a Document, facet: &str) -> &'a [Bson] {
        doc.get_array(facet).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// 0 when the denominator is 0, otherwise `part / whole * 100`.
    pub fn percent(part: f64, whole: f64) -> f64 {
        if whole <= 0.0 {
            0.0
        } else {
            part / whole * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::Bson;

    #[test]
    fn test_total_order_appends_id() {
        assert_eq!(total_order(newest_first()), doc! { "createdAt": -1, "_id": -1 });
        assert_eq!(total_order(doc! { "_id": 1 }), doc! { "_id": 1 });
    }

    #[test]
    fn test_agg_helpers() {
        let facet = doc! {
            "totals": [ { "count": 4_i64, "views": 10.5 } ],
            "byStatus": [ { "_id": "new", "count": 3 }, { "_id": Bson::Null, "count": 1 } ],
        };
        let totals = agg::first(&facet, "totals");
        assert_eq!(agg::count(&totals, "count"), 4);
        assert_eq!(agg::number(&totals, "views"), 10.5);
        assert_eq!(
            agg::buckets(agg::rows(&facet, "byStatus")),
            vec![("new".to_string(), 3), ("unknown".to_string(), 1)]
        );
        assert!(agg::first(&facet, "missing").is_empty());
        assert_eq!(agg::percent(1.0, 0.0), 0.0);
        assert_eq!(agg::percent(1.0, 4.0), 25.0);
    }
}
