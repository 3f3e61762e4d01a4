//! In-memory document store
//!
//! Used by tests and by dry runs of the migration. Documents live in an
//! ordered map so scans come back in `_id` order like the embedded store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::{Mutex, MutexGuard, RwLock};

use crate::error::Result;
use crate::eval::Document;
use crate::filter::Filter;
use crate::pipeline::{AggregateReply, Pipeline};
use crate::table::{self, DocumentTable};
use crate::traits::DocumentStore;
use crate::update::{Projection, Update, UpdateOptions, UpdateResult};

pub struct MemoryDocumentStore {
    collection: String,
    docs: RwLock<BTreeMap<i64, Document>>,
    writes: Mutex<()>,
}

impl MemoryDocumentStore {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            docs: RwLock::new(BTreeMap::new()),
            writes: Mutex::new(()),
        }
    }

    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }

    /// Copy of every stored document, for inspection in tests and reports
    pub fn snapshot(&self) -> Vec<Document> {
        self.docs.read().values().cloned().collect()
    }
}

impl DocumentTable for MemoryDocumentStore {
    fn get(&self, id: i64) -> Result<Option<Document>> {
        Ok(self.docs.read().get(&id).cloned())
    }

    fn put(&self, id: i64, doc: &Document) -> Result<()> {
        self.docs.write().insert(id, doc.clone());
        Ok(())
    }

    fn delete(&self, id: i64) -> Result<bool> {
        Ok(self.docs.write().remove(&id).is_some())
    }

    fn scan(&self) -> Result<Vec<Document>> {
        Ok(self.snapshot())
    }

    fn write_lock(&self) -> MutexGuard<'_, ()> {
        self.writes.lock()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn find_one(
        &self,
        filter: &Filter,
        projection: &Projection,
    ) -> Result<Option<Document>> {
        table::find_one(self, filter, projection)
    }

    async fn find(
        &self,
        filter: &Filter,
        projection: &Projection,
        limit: Option<usize>,
    ) -> Result<Vec<Document>> {
        table::find(self, filter, projection, limit)
    }

    async fn update(
        &self,
        filter: &Filter,
        update: &Update,
        options: UpdateOptions,
    ) -> Result<UpdateResult> {
        table::update(self, filter, update, options)
    }

    async fn remove(&self, filter: &Filter, just_one: bool) -> Result<u64> {
        table::remove(self, filter, just_one)
    }

    async fn aggregate(&self, pipeline: &Pipeline) -> Result<AggregateReply> {
        table::aggregate(self, pipeline)
    }

    async fn count(&self, filter: &Filter) -> Result<u64> {
        table::count(self, filter)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
