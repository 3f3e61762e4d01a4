//! Typed view over an entity document

use serde_json::{Map, Value};
use strata_common::{DEFAULT_STORE_ID, EntityId, StoreId};
use strata_docstore::{Document, ID_FIELD};

use crate::gallery::GalleryRecord;
use crate::key::{GALLERIES_FIELD, ScopeKey};

/// Presence rule shared by writes, reads, filters, facets and the migration:
/// a value counts only when it is neither null nor the empty string.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScopedDocument {
    doc: Document,
}

impl ScopedDocument {
    pub fn new(doc: Document) -> Self {
        Self { doc }
    }

    pub fn id(&self) -> Option<EntityId> {
        self.doc.get(ID_FIELD).and_then(Value::as_i64)
    }

    pub fn scope(&self, store_id: StoreId) -> Option<&Map<String, Value>> {
        self.doc
            .get(&ScopeKey(store_id).field())
            .and_then(Value::as_object)
    }

    /// Stores that have a scope object in this document, ascending
    pub fn store_ids(&self) -> Vec<StoreId> {
        let mut ids: Vec<StoreId> = self
            .doc
            .keys()
            .filter_map(|k| k.parse::<ScopeKey>().ok())
            .map(|k| k.store_id())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Value stored at exactly this scope, if present
    pub fn value(&self, store_id: StoreId, code: &str) -> Option<&Value> {
        self.scope(store_id)
            .and_then(|scope| scope.get(code))
            .filter(|v| is_present(v))
    }

    /// Store value when present, otherwise the default-store value
    pub fn resolve(&self, store_id: StoreId, code: &str) -> Option<&Value> {
        self.value(store_id, code)
            .or_else(|| self.value(DEFAULT_STORE_ID, code))
    }

    /// Attribute values visible from `store_id`.
    ///
    /// Default-store values are the base; present store values override them
    /// attribute by attribute.
    pub fn merged(&self, store_id: StoreId) -> Map<String, Value> {
        let mut out = Map::new();
        let mut scopes = vec![DEFAULT_STORE_ID];
        if store_id != DEFAULT_STORE_ID {
            scopes.push(store_id);
        }
        for store in scopes {
            if let Some(scope) = self.scope(store) {
                for (code, value) in scope {
                    if is_present(value) {
                        out.insert(code.clone(), value.clone());
                    }
                }
            }
        }
        out
    }

    /// Gallery records stored for an attribute; malformed entries are skipped
    pub fn gallery(&self, code: &str) -> Vec<GalleryRecord> {
        self.doc
            .get(GALLERIES_FIELD)
            .and_then(|g| g.get(code))
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(GalleryRecord::from_value).collect())
            .unwrap_or_default()
    }

    pub fn as_document(&self) -> &Document {
        &self.doc
    }

    pub fn into_document(self) -> Document {
        self.doc
    }
}

impl From<Document> for ScopedDocument {
    fn from(doc: Document) -> Self {
        Self::new(doc)
    }
}
