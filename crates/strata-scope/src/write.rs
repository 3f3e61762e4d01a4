//! The field-set write contract
//!
//! A `ScopedWrite` collects the exact paths a save touches and turns them into
//! one upsert. The document is never replaced as a whole, so values of other
//! stores survive. An upsert that creates the document also creates the
//! default scope, which must exist once anything has been written.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use strata_common::{EntityId, StoreId};
use strata_docstore::{DocStoreError, DocumentStore, Filter, Update, UpdateOptions, UpdateResult};

use crate::key::{FieldPath, ScopeKey};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopedWrite {
    set: BTreeMap<FieldPath, Value>,
    add_to_set: BTreeMap<FieldPath, Value>,
    touches_default: bool,
}

impl ScopedWrite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one attribute value in one store scope
    pub fn set(&mut self, store_id: StoreId, code: &str, value: Value) -> &mut Self {
        let scope = ScopeKey(store_id);
        self.touches_default |= scope.is_default();
        self.set.insert(scope.attribute(code), value);
        self
    }

    /// Set several attribute values in one store scope
    pub fn set_scope(&mut self, store_id: StoreId, values: &Map<String, Value>) -> &mut Self {
        for (code, value) in values {
            self.set(store_id, code, value.clone());
        }
        self
    }

    /// Replace the gallery array of an attribute
    pub fn set_gallery(&mut self, code: &str, records: Vec<Value>) -> &mut Self {
        self.set.insert(FieldPath::gallery(code), Value::Array(records));
        self
    }

    /// Append a gallery record unless an identical one is already stored
    pub fn add_gallery_record(&mut self, code: &str, record: Value) -> &mut Self {
        self.add_to_set.insert(FieldPath::gallery(code), record);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.add_to_set.is_empty()
    }

    pub fn len(&self) -> usize {
        self.set.len() + self.add_to_set.len()
    }

    pub fn paths(&self) -> impl Iterator<Item = &FieldPath> {
        self.set.keys().chain(self.add_to_set.keys())
    }

    pub fn into_update(self) -> Update {
        let mut update = Update::new();
        for (path, value) in self.set {
            update = update.set(path.into_string(), value);
        }
        for (path, value) in self.add_to_set {
            update = update.add_to_set(path.into_string(), value);
        }
        if !self.touches_default {
            update = update.set_on_insert(ScopeKey::DEFAULT.field(), Value::Object(Map::new()));
        }
        update
    }
}

/// Issue the single upsert for `write` against document `id`.
///
/// An empty write is not sent and yields `None`.
pub async fn upsert_fields(
    docs: &dyn DocumentStore,
    id: EntityId,
    write: ScopedWrite,
) -> Result<Option<UpdateResult>, DocStoreError> {
    if write.is_empty() {
        return Ok(None);
    }
    let result = docs
        .update(&Filter::id(id), &write.into_update(), UpdateOptions::upsert())
        .await?;
    Ok(Some(result))
}
