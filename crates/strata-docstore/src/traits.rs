//! The document store interface consumed by the catalog and the migration

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::eval::Document;
use crate::filter::Filter;
use crate::pipeline::{AggregateReply, Pipeline};
use crate::update::{Projection, Update, UpdateOptions, UpdateResult};

/// Operations on one collection of documents keyed by integer `_id`
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Name of the collection this handle operates on
    fn collection(&self) -> &str;

    /// First matching document in `_id` order
    async fn find_one(&self, filter: &Filter, projection: &Projection)
    -> Result<Option<Document>>;

    /// Matching documents in `_id` order, at most `limit` when given
    async fn find(
        &self,
        filter: &Filter,
        projection: &Projection,
        limit: Option<usize>,
    ) -> Result<Vec<Document>>;

    /// Apply field-level operators to the first (or every, with `multi`)
    /// matching document, inserting one when `upsert` is set and none matches.
    async fn update(
        &self,
        filter: &Filter,
        update: &Update,
        options: UpdateOptions,
    ) -> Result<UpdateResult>;

    /// Remove matching documents; returns the number removed
    async fn remove(&self, filter: &Filter, just_one: bool) -> Result<u64>;

    async fn aggregate(&self, pipeline: &Pipeline) -> Result<AggregateReply>;

    async fn count(&self, filter: &Filter) -> Result<u64>;

    /// Cheap round trip proving the store is reachable
    async fn ping(&self) -> Result<()>;
}

/// Convenience reads shared by every store
pub async fn find_by_id(
    store: &dyn DocumentStore,
    id: i64,
    projection: &Projection,
) -> Result<Option<Document>> {
    store.find_one(&Filter::id(id), projection).await
}

/// Extract `_id` values from a result set
pub fn ids_of(documents: &[Document]) -> Vec<i64> {
    documents
        .iter()
        .filter_map(|d| d.get(crate::filter::ID_FIELD).and_then(Value::as_i64))
        .collect()
}
