// Embedded document store backed by RocksDB
// One column family per collection, JSON-encoded documents

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, MutexGuard};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options};
use tracing::info;

use crate::error::{DocStoreError, Result};
use crate::eval::Document;
use crate::filter::Filter;
use crate::pipeline::{AggregateReply, Pipeline};
use crate::table::{self, DocumentTable};
use crate::traits::DocumentStore;
use crate::update::{Projection, Update, UpdateOptions, UpdateResult};

/// Order-preserving key for a signed id: flipping the sign bit makes the
/// big-endian bytes sort like the integers.
fn id_key(id: i64) -> [u8; 8] {
    ((id as u64) ^ (1 << 63)).to_be_bytes()
}

pub struct RocksDocumentStore {
    db: Arc<DB>,
    collection: String,
    writes: Mutex<()>,
}

impl RocksDocumentStore {
    /// Open (or create) the database at `path` with a column family for `collection`
    pub fn open<P: AsRef<Path>>(path: P, collection: &str) -> Result<Self> {
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // keep column families created by earlier runs
        let mut names = DB::list_cf(&db_opts, path.as_ref()).unwrap_or_default();
        if !names.iter().any(|n| n == collection) {
            names.push(collection.to_string());
        }

        let cfs: Vec<ColumnFamilyDescriptor> = names
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DB::open_cf_descriptors(&db_opts, path.as_ref(), cfs)?;
        info!(
            path = %path.as_ref().display(),
            collection,
            "RocksDB document store opened"
        );

        Ok(Self {
            db: Arc::new(db),
            collection: collection.to_string(),
            writes: Mutex::new(()),
        })
    }

    fn cf(&self) -> Result<&ColumnFamily> {
        self.db.cf_handle(&self.collection).ok_or_else(|| {
            DocStoreError::Backend(format!("Column family '{}' not found", self.collection))
        })
    }
}

impl DocumentTable for RocksDocumentStore {
    fn get(&self, id: i64) -> Result<Option<Document>> {
        let cf = self.cf()?;
        match self.db.get_cf(cf, id_key(id))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put(&self, id: i64, doc: &Document) -> Result<()> {
        let cf = self.cf()?;
        let bytes = serde_json::to_vec(doc)?;
        self.db.put_cf(cf, id_key(id), bytes)?;
        Ok(())
    }

    fn delete(&self, id: i64) -> Result<bool> {
        let cf = self.cf()?;
        let key = id_key(id);
        if self.db.get_pinned_cf(cf, key)?.is_none() {
            return Ok(false);
        }
        self.db.delete_cf(cf, key)?;
        Ok(true)
    }

    fn scan(&self) -> Result<Vec<Document>> {
        let cf = self.cf()?;
        let mut docs = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            docs.push(serde_json::from_slice(&value)?);
        }
        Ok(docs)
    }

    fn write_lock(&self) -> MutexGuard<'_, ()> {
        self.writes.lock()
    }
}

#[async_trait]
impl DocumentStore for RocksDocumentStore {
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
        self.cf().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_id_keys_sort_numerically() {
        let mut keys = [id_key(10), id_key(-3), id_key(0), id_key(256)];
        keys.sort();
        assert_eq!(keys, [id_key(-3), id_key(0), id_key(10), id_key(256)]);
    }

    #[tokio::test]
    async fn test_round_trip_and_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = RocksDocumentStore::open(dir.path(), "catalog_product_entity").unwrap();
            for id in [300, 7, 42] {
                store
                    .update(
                        &Filter::id(id),
                        &Update::new().set("attr_0.color", "red"),
                        UpdateOptions::upsert(),
                    )
                    .await
                    .unwrap();
            }
            store
                .update(
                    &Filter::id(42),
                    &Update::new().set("attr_1.color", "blue"),
                    UpdateOptions::upsert(),
                )
                .await
                .unwrap();
        }

        let store = RocksDocumentStore::open(dir.path(), "catalog_product_entity").unwrap();
        let docs = store
            .find(&Filter::All, &Projection::All, None)
            .await
            .unwrap();
        assert_eq!(crate::traits::ids_of(&docs), vec![7, 42, 300]);
        assert_eq!(docs[1]["attr_1"], json!({"color": "blue"}));

        assert_eq!(store.remove(&Filter::id(7), true).await.unwrap(), 1);
        assert_eq!(store.remove(&Filter::id(7), true).await.unwrap(), 0);
        assert_eq!(store.count(&Filter::All).await.unwrap(), 2);
        store.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let dir = TempDir::new().unwrap();
        {
            let a = RocksDocumentStore::open(dir.path(), "a").unwrap();
            a.update(
                &Filter::id(1),
                &Update::new().set("x", 1),
                UpdateOptions::upsert(),
            )
            .await
            .unwrap();
        }
        let b = RocksDocumentStore::open(dir.path(), "b").unwrap();
        assert_eq!(b.count(&Filter::All).await.unwrap(), 0);
    }
}
