//! Catalog entity as seen by the persistence engine

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use strata_common::{AttributeSetId, DEFAULT_STORE_ID, EntityId, StoreId};
use strata_persistence::EntityRow;

/// Codes of the attributes changed since the entity was loaded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet(BTreeSet<String>);

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, code: impl Into<String>) {
        self.0.insert(code.into());
    }

    pub fn contains(&self, code: &str) -> bool {
        self.0.contains(code)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntity {
    pub id: EntityId,
    pub attribute_set_id: AttributeSetId,
    pub type_id: String,
    /// Store the entity is edited or read in
    pub store_id: StoreId,
    /// Not yet saved; first values go to the default store
    pub is_new: bool,
    data: Map<String, Value>,
    changes: ChangeSet,
}

impl CatalogEntity {
    pub fn new(id: EntityId, attribute_set_id: AttributeSetId, type_id: impl Into<String>) -> Self {
        Self {
            id,
            attribute_set_id,
            type_id: type_id.into(),
            store_id: DEFAULT_STORE_ID,
            is_new: true,
            data: Map::new(),
            changes: ChangeSet::new(),
        }
    }

    /// An already persisted entity, viewed from `store_id`
    pub fn existing(
        id: EntityId,
        attribute_set_id: AttributeSetId,
        type_id: impl Into<String>,
        store_id: StoreId,
    ) -> Self {
        Self {
            store_id,
            is_new: false,
            ..Self::new(id, attribute_set_id, type_id)
        }
    }

    pub fn from_row(row: EntityRow, store_id: StoreId) -> Self {
        let mut entity = Self::existing(row.entity_id, row.attribute_set_id, row.type_id, store_id);
        entity.data = row.fields;
        entity
    }

    pub fn in_store(mut self, store_id: StoreId) -> Self {
        self.store_id = store_id;
        self
    }

    /// Set an attribute value and record the change
    pub fn set(&mut self, code: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let code = code.into();
        self.changes.insert(code.clone());
        self.data.insert(code, value.into());
        self
    }

    pub fn get(&self, code: &str) -> Option<&Value> {
        self.data.get(code)
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    /// Merge loaded values without marking them changed
    pub fn merge_loaded(&mut self, values: Map<String, Value>) {
        for (code, value) in values {
            self.data.insert(code, value);
        }
    }

    /// Forget recorded changes after a successful save
    pub fn mark_saved(&mut self) {
        self.changes = ChangeSet::new();
        self.is_new = false;
    }

    /// The primary-table row of this entity
    pub fn to_row(&self, entity_columns: impl Fn(&str) -> bool) -> EntityRow {
        let mut row = EntityRow::new(self.id, self.attribute_set_id, self.type_id.clone());
        for (code, value) in &self.data {
            if entity_columns(code) && !row.fields.contains_key(code) {
                row.fields.insert(code.clone(), value.clone());
            }
        }
        row
    }
}
