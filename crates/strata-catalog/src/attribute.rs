//! Attribute catalog
//!
//! Attribute definitions, stores and the indexed-attribute set, loaded once
//! from the relational store and shared read-only by every component.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use strata_common::{
    AttributeId, AttributeMetadata, AttributeScope, AttributeSetId, BackendType, DEFAULT_STORE_ID,
    IndexedAttributeSet, StoreId, StoreInfo, StrataError,
};
use strata_persistence::RelationalStore;
use tracing::info;

/// Where an attribute's values live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeClass {
    /// Relational rows and the document
    Indexed,
    /// The document only
    DocumentOnly,
}

#[derive(Debug, Clone, Default)]
pub struct AttributeCatalog {
    by_code: HashMap<String, AttributeMetadata>,
    by_id: HashMap<AttributeId, String>,
    indexed: IndexedAttributeSet,
    set_members: HashMap<AttributeSetId, BTreeSet<AttributeId>>,
    stores: BTreeMap<StoreId, StoreInfo>,
}

impl AttributeCatalog {
    pub fn new(
        attributes: Vec<AttributeMetadata>,
        entity_columns: Vec<String>,
        set_members: HashMap<AttributeSetId, BTreeSet<AttributeId>>,
        stores: Vec<StoreInfo>,
    ) -> Self {
        let by_id = attributes
            .iter()
            .map(|a| (a.attribute_id, a.code.clone()))
            .collect();
        let by_code = attributes.into_iter().map(|a| (a.code.clone(), a)).collect();
        Self {
            by_code,
            by_id,
            indexed: IndexedAttributeSet::from_entity_columns(entity_columns),
            set_members,
            stores: stores.into_iter().map(|s| (s.store_id, s)).collect(),
        }
    }

    /// Read attribute metadata, set membership, stores and the entity table
    /// description
    pub async fn load(store: &dyn RelationalStore) -> anyhow::Result<Self> {
        let attributes = store.attributes().await?;
        let entity_columns = store.entity_columns().await?;
        let set_members = store.attribute_set_members().await?;
        let stores = store.stores().await?;

        let catalog = Self::new(attributes, entity_columns, set_members, stores);
        info!(
            attributes = catalog.by_code.len(),
            indexed = catalog.indexed.len(),
            stores = catalog.stores.len(),
            "Attribute catalog loaded"
        );
        Ok(catalog)
    }

    pub fn classify(&self, code: &str) -> AttributeClass {
        if self.indexed.contains(code) {
            AttributeClass::Indexed
        } else {
            AttributeClass::DocumentOnly
        }
    }

    pub fn is_indexed(&self, code: &str) -> bool {
        self.classify(code) == AttributeClass::Indexed
    }

    pub fn indexed(&self) -> &IndexedAttributeSet {
        &self.indexed
    }

    pub fn get(&self, code: &str) -> Option<&AttributeMetadata> {
        self.by_code.get(code)
    }

    pub fn require(&self, code: &str) -> Result<&AttributeMetadata, StrataError> {
        self.get(code)
            .ok_or_else(|| StrataError::UnknownAttribute(code.to_string()))
    }

    /// Attribute usable in relational conditions.
    ///
    /// Entity columns without an attribute definition are described as
    /// static global attributes.
    pub fn relational(&self, code: &str) -> Result<AttributeMetadata, StrataError> {
        if let Some(attribute) = self.get(code) {
            return Ok(attribute.clone());
        }
        if self.indexed.is_entity_column(code) {
            return Ok(AttributeMetadata::new(
                0,
                code,
                BackendType::Static,
                AttributeScope::Global,
            ));
        }
        Err(StrataError::UnknownAttribute(code.to_string()))
    }

    pub fn by_id(&self, attribute_id: AttributeId) -> Option<&AttributeMetadata> {
        self.by_id.get(&attribute_id).and_then(|code| self.by_code.get(code))
    }

    pub fn attributes(&self) -> impl Iterator<Item = &AttributeMetadata> {
        self.by_code.values()
    }

    /// Whether `attribute_id` belongs to the set. Unknown sets accept every
    /// attribute.
    pub fn in_attribute_set(&self, attribute_set_id: AttributeSetId, attribute_id: AttributeId) -> bool {
        self.set_members
            .get(&attribute_set_id)
            .is_none_or(|members| members.contains(&attribute_id))
    }

    pub fn stores(&self) -> impl Iterator<Item = &StoreInfo> {
        self.stores.values()
    }

    /// Store ids ascending, the default store first
    pub fn store_ids(&self) -> Vec<StoreId> {
        let mut ids: Vec<StoreId> = self.stores.keys().copied().collect();
        if !ids.contains(&DEFAULT_STORE_ID) {
            ids.insert(0, DEFAULT_STORE_ID);
        }
        ids
    }

    /// Stores of the website `store_id` belongs to
    pub fn website_store_ids(&self, store_id: StoreId) -> Vec<StoreId> {
        match self.stores.get(&store_id) {
            Some(store) => self
                .stores
                .values()
                .filter(|s| s.website_id == store.website_id)
                .map(|s| s.store_id)
                .collect(),
            None => vec![store_id],
        }
    }

    /// True when the installation has a single customer-facing store
    pub fn is_single_store_mode(&self) -> bool {
        self.stores
            .keys()
            .filter(|id| **id != DEFAULT_STORE_ID)
            .count()
            <= 1
    }
}
