//! Attribute persistence engine
//!
//! Wraps the relational store and decides per attribute which backend a
//! read or write goes to. Indexed attributes are written relationally first;
//! every attribute with a present value is then written to the entity's
//! document with one field-set upsert.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use strata_common::{
    ADMIN_STORE_ID, AttributeMetadata, DEFAULT_STORE_ID, EntityId, NumberFormat, StoreId,
    StrataError, coerce_value,
};
use strata_docstore::{
    DocStoreError, DocumentStore, Filter, Projection, Update, UpdateOptions, find_by_id,
};
use strata_persistence::{AttributeValueWrite, RelationalStore};
use strata_scope::{FieldPath, ScopeKey, ScopedDocument, ScopedWrite, is_present, upsert_fields};
use tracing::{debug, info, warn};

use crate::attribute::{AttributeCatalog, AttributeClass};
use crate::entity::{CatalogEntity, ChangeSet};
use crate::event::{CatalogEvent, CatalogEventPublisher};

/// Image role attributes listed by `assigned_images`
pub const IMAGE_ATTRIBUTES: &[&str] = &["small_image", "thumbnail", "image"];

/// Entity columns maintained through the entity row itself
const ROW_COLUMNS: &[&str] = &[
    "entity_id",
    "entity_type_id",
    "attribute_set_id",
    "type_id",
    "created_at",
    "updated_at",
];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogOptions {
    /// Separators of numbers submitted as text
    pub locale: NumberFormat,
}

/// What a save wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOutcome {
    pub relational_rows: usize,
    pub document_fields: usize,
}

/// One image role value of an entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignedImage {
    pub file: String,
    pub store_id: StoreId,
    pub attribute_code: String,
}

/// Map a document store failure to the catalog error taxonomy.
///
/// Unreachable or timed out stores are connectivity errors and fatal to the
/// request.
pub(crate) fn doc_error(e: DocStoreError) -> anyhow::Error {
    match e {
        DocStoreError::Connection { .. } | DocStoreError::Timeout { .. } | DocStoreError::Backend(_) => {
            StrataError::Connectivity(e.to_string()).into()
        }
        other => other.into(),
    }
}

pub(crate) fn relational_error(e: anyhow::Error) -> anyhow::Error {
    match e.downcast::<StrataError>() {
        Ok(typed) => typed.into(),
        Err(e) => StrataError::Relational(format!("{:#}", e)).into(),
    }
}

/// Projection of the default scope and, when different, one store scope
pub fn scope_projection(store_id: StoreId) -> Projection {
    let mut fields = vec![ScopeKey::DEFAULT.field()];
    if store_id != DEFAULT_STORE_ID {
        fields.push(ScopeKey(store_id).field());
    }
    Projection::fields(fields)
}

pub struct CatalogEngine {
    relational: Arc<dyn RelationalStore>,
    docs: Arc<dyn DocumentStore>,
    attributes: Arc<AttributeCatalog>,
    options: CatalogOptions,
    events: CatalogEventPublisher,
}

impl CatalogEngine {
    pub fn new(
        relational: Arc<dyn RelationalStore>,
        docs: Arc<dyn DocumentStore>,
        attributes: Arc<AttributeCatalog>,
        options: CatalogOptions,
    ) -> Self {
        Self {
            relational,
            docs,
            attributes,
            options,
            events: CatalogEventPublisher::default(),
        }
    }

    /// Build the engine, loading the attribute catalog from the relational
    /// store
    pub async fn load(
        relational: Arc<dyn RelationalStore>,
        docs: Arc<dyn DocumentStore>,
        options: CatalogOptions,
    ) -> anyhow::Result<Self> {
        let attributes = AttributeCatalog::load(relational.as_ref()).await?;
        Ok(Self::new(relational, docs, Arc::new(attributes), options))
    }

    pub fn attributes(&self) -> &AttributeCatalog {
        &self.attributes
    }

    pub fn relational(&self) -> &dyn RelationalStore {
        self.relational.as_ref()
    }

    pub fn docs(&self) -> &dyn DocumentStore {
        self.docs.as_ref()
    }

    pub fn events(&self) -> &CatalogEventPublisher {
        &self.events
    }

    pub fn options(&self) -> &CatalogOptions {
        &self.options
    }

    pub fn classify(&self, code: &str) -> AttributeClass {
        self.attributes.classify(code)
    }

    pub(crate) fn coerce(
        &self,
        attribute: &AttributeMetadata,
        value: Value,
    ) -> Result<Value, StrataError> {
        coerce_value(&attribute.code, attribute.backend_type, value, &self.options.locale)
    }

    /// Present values coerced, absent ones cleared to null
    fn prepare(&self, attribute: &AttributeMetadata, value: Option<&Value>) -> Result<Value, StrataError> {
        match value {
            Some(v) if is_present(v) => self.coerce(attribute, v.clone()),
            _ => Ok(Value::Null),
        }
    }

    /// Attribute `code` when it belongs to the entity's attribute set
    fn member_attribute(&self, entity: &CatalogEntity, code: &str) -> Option<&AttributeMetadata> {
        let attribute = self.attributes.get(code)?;
        if self.attributes.in_attribute_set(entity.attribute_set_id, attribute.attribute_id) {
            return Some(attribute);
        }
        debug!(
            entity_id = entity.id,
            attribute_set_id = entity.attribute_set_id,
            attribute = code,
            "Dropping value outside the attribute set"
        );
        None
    }

    /// Save the entity's attributes.
    ///
    /// Indexed attributes in `changes` are written relationally together with
    /// the entity row; a relational failure aborts before the document is
    /// touched. Every attribute with a present value then lands in the
    /// default scope (new entity or global attribute) or in the entity's
    /// store scope, through one upsert. Values of attributes outside the
    /// entity's attribute set are dropped.
    pub async fn save_entity(
        &self,
        entity: &CatalogEntity,
        changes: &ChangeSet,
    ) -> anyhow::Result<SaveOutcome> {
        let target_scope = |attribute: &AttributeMetadata| {
            if entity.is_new || attribute.is_global() {
                DEFAULT_STORE_ID
            } else {
                entity.store_id
            }
        };

        let mut relational_writes = Vec::new();
        for code in changes.iter() {
            if ROW_COLUMNS.contains(&code) || !self.attributes.is_indexed(code) {
                continue;
            }
            let Some(attribute) = self.member_attribute(entity, code) else {
                continue;
            };
            let value = self.prepare(attribute, entity.get(code))?;
            relational_writes.push(AttributeValueWrite::new(
                entity.id,
                attribute.clone(),
                target_scope(attribute),
                value,
            ));
        }

        let mut document_write = ScopedWrite::new();
        for (code, value) in entity.data() {
            if !is_present(value) {
                continue;
            }
            let Some(attribute) = self.member_attribute(entity, code) else {
                continue;
            };
            let value = self.coerce(attribute, value.clone())?;
            document_write.set(target_scope(attribute), code, value);
        }

        let row = entity.to_row(|column| self.attributes.indexed().is_entity_column(column));
        self.relational
            .save_entity(&row, &relational_writes)
            .await
            .map_err(relational_error)?;

        let document_fields = document_write.len();
        let written: Vec<String> = document_write
            .paths()
            .map(|path| path.as_str().to_string())
            .collect();
        upsert_fields(self.docs.as_ref(), entity.id, document_write)
            .await
            .map_err(doc_error)?;

        debug!(
            entity_id = entity.id,
            store_id = entity.store_id,
            relational_rows = relational_writes.len(),
            document_fields,
            "Entity saved"
        );
        self.events
            .publish(CatalogEvent::entity_saved(entity.id, entity.store_id, written))
            .await;

        Ok(SaveOutcome {
            relational_rows: relational_writes.len(),
            document_fields,
        })
    }

    /// Save with the entity's own change set, then mark it saved
    pub async fn save(&self, entity: &mut CatalogEntity) -> anyhow::Result<SaveOutcome> {
        let changes = entity.changes().clone();
        let outcome = self.save_entity(entity, &changes).await?;
        entity.mark_saved();
        Ok(outcome)
    }

    /// Merge document values into `entity`: default-scope values, overridden
    /// by present values of the entity's store. Returns false when the entity
    /// has no document.
    pub async fn load_entity(&self, entity: &mut CatalogEntity) -> anyhow::Result<bool> {
        let document = find_by_id(self.docs.as_ref(), entity.id, &scope_projection(entity.store_id))
            .await
            .map_err(doc_error)?;
        match document {
            Some(doc) => {
                entity.merge_loaded(ScopedDocument::new(doc).merged(entity.store_id));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Load the entity row and its attribute values as seen from `store_id`
    pub async fn load(
        &self,
        entity_id: EntityId,
        store_id: StoreId,
    ) -> anyhow::Result<Option<CatalogEntity>> {
        let Some(row) = self
            .relational
            .find_entity(entity_id)
            .await
            .map_err(relational_error)?
        else {
            return Ok(None);
        };
        let mut entity = CatalogEntity::from_row(row, store_id);
        self.load_entity(&mut entity).await?;
        Ok(Some(entity))
    }

    /// Delete the entity row, then its document
    pub async fn delete_entity(&self, entity_id: EntityId) -> anyhow::Result<bool> {
        let existed = self
            .relational
            .delete_entity(entity_id)
            .await
            .map_err(relational_error)?;
        let removed = self
            .docs
            .remove(&Filter::id(entity_id), false)
            .await
            .map_err(doc_error)?;
        debug!(entity_id, existed, removed, "Entity deleted");
        self.events
            .publish(CatalogEvent::entity_deleted(entity_id))
            .await;
        Ok(existed || removed > 0)
    }

    /// Set attribute values on many entities in one store.
    ///
    /// Indexed values are written in one relational transaction first. Each
    /// attribute then gets one multi-document update. These are independent:
    /// a failure stops the loop and is reported as
    /// [`StrataError::MassUpdateIncomplete`] naming what was applied.
    pub async fn mass_update(
        &self,
        entity_ids: &[EntityId],
        values: &Map<String, Value>,
        store_id: StoreId,
    ) -> anyhow::Result<()> {
        if entity_ids.is_empty() || values.is_empty() {
            return Ok(());
        }

        let mut prepared = Vec::with_capacity(values.len());
        for (code, value) in values {
            let attribute = self.attributes.require(code)?;
            let value = self.prepare(attribute, Some(value))?;
            let scope = if attribute.is_global() {
                DEFAULT_STORE_ID
            } else {
                store_id
            };
            prepared.push((attribute, scope, value));
        }

        let relational_writes: Vec<AttributeValueWrite> = prepared
            .iter()
            .filter(|(attribute, _, _)| self.attributes.is_indexed(&attribute.code))
            .flat_map(|(attribute, scope, value)| {
                entity_ids.iter().map(|id| {
                    AttributeValueWrite::new(*id, (*attribute).clone(), *scope, value.clone())
                })
            })
            .collect();
        self.relational
            .write_values(&relational_writes)
            .await
            .map_err(relational_error)?;

        let filter = Filter::ids(entity_ids.iter().copied());
        let mut applied: Vec<String> = Vec::new();
        for (i, (attribute, scope, value)) in prepared.iter().enumerate() {
            let path = FieldPath::attribute(*scope, &attribute.code);
            let update = Update::new().set(path.into_string(), value.clone());
            if let Err(e) = self.docs.update(&filter, &update, UpdateOptions::multi()).await {
                let pending = prepared[i + 1..]
                    .iter()
                    .map(|(a, _, _)| a.code.clone())
                    .collect();
                warn!(
                    attribute = %attribute.code,
                    applied = ?applied,
                    error = %e,
                    "Mass update stopped"
                );
                return Err(StrataError::MassUpdateIncomplete {
                    applied,
                    failed: attribute.code.clone(),
                    pending,
                    reason: e.to_string(),
                }
                .into());
            }
            applied.push(attribute.code.clone());
        }

        info!(
            entities = entity_ids.len(),
            attributes = applied.len(),
            store_id,
            "Mass update applied"
        );
        self.events
            .publish(CatalogEvent::mass_updated(entity_ids.to_vec(), store_id, applied))
            .await;
        Ok(())
    }

    /// Save one attribute of an existing entity.
    ///
    /// Website-scoped attributes edited outside the admin store are written
    /// to every store of that website. Otherwise the value goes to the
    /// default scope (new entity, global attribute or admin store) or to the
    /// entity's store.
    pub async fn save_single_attribute(
        &self,
        entity: &CatalogEntity,
        code: &str,
    ) -> anyhow::Result<()> {
        let attribute = self.attributes.require(code)?;
        let value = self.prepare(attribute, entity.get(code))?;

        let scopes: Vec<StoreId> = if attribute.is_website() && entity.store_id != ADMIN_STORE_ID {
            self.attributes.website_store_ids(entity.store_id)
        } else if entity.is_new || attribute.is_global() || entity.store_id == ADMIN_STORE_ID {
            vec![DEFAULT_STORE_ID]
        } else {
            vec![entity.store_id]
        };

        if self.attributes.is_indexed(code) {
            let writes: Vec<AttributeValueWrite> = scopes
                .iter()
                .map(|scope| AttributeValueWrite::new(entity.id, attribute.clone(), *scope, value.clone()))
                .collect();
            self.relational
                .write_values(&writes)
                .await
                .map_err(relational_error)?;
        }

        if is_present(&value) {
            let mut write = ScopedWrite::new();
            for scope in &scopes {
                write.set(*scope, code, value.clone());
            }
            upsert_fields(self.docs.as_ref(), entity.id, write)
                .await
                .map_err(doc_error)?;
        } else {
            // Clear the overrides; a missing document stays missing
            let mut update = Update::new();
            for scope in &scopes {
                update = update.set(FieldPath::attribute(*scope, code).into_string(), Value::Null);
            }
            self.docs
                .update(&Filter::id(entity.id), &update, UpdateOptions::default())
                .await
                .map_err(doc_error)?;
        }

        debug!(entity_id = entity.id, attribute = code, scopes = ?scopes, "Attribute saved");
        Ok(())
    }

    /// Value of one attribute in `store_id` (default store when `None`),
    /// falling back to the default-store value
    pub async fn attribute_value(
        &self,
        entity_id: EntityId,
        code: &str,
        store_id: Option<StoreId>,
    ) -> anyhow::Result<Option<Value>> {
        let store_id = store_id.unwrap_or(DEFAULT_STORE_ID);
        let projection = Projection::fields([
            FieldPath::attribute(store_id, code).into_string(),
            FieldPath::attribute(DEFAULT_STORE_ID, code).into_string(),
        ]);
        let document = find_by_id(self.docs.as_ref(), entity_id, &projection)
            .await
            .map_err(doc_error)?;
        Ok(document.and_then(|doc| ScopedDocument::new(doc).resolve(store_id, code).cloned()))
    }

    /// Image role values of an entity in the given stores. In single store
    /// mode the default store is included.
    pub async fn assigned_images(
        &self,
        entity_id: EntityId,
        store_ids: &[StoreId],
    ) -> anyhow::Result<Vec<AssignedImage>> {
        let mut stores: Vec<StoreId> = store_ids.to_vec();
        if self.attributes.is_single_store_mode() && !stores.contains(&DEFAULT_STORE_ID) {
            stores.insert(0, DEFAULT_STORE_ID);
        }
        stores.dedup();

        let projection = Projection::fields(stores.iter().flat_map(|store| {
            IMAGE_ATTRIBUTES
                .iter()
                .map(|code| FieldPath::attribute(*store, code).into_string())
        }));
        let Some(document) = find_by_id(self.docs.as_ref(), entity_id, &projection)
            .await
            .map_err(doc_error)?
        else {
            return Ok(Vec::new());
        };

        let document = ScopedDocument::new(document);
        let mut images = Vec::new();
        for store_id in stores {
            for code in IMAGE_ATTRIBUTES {
                if let Some(Value::String(file)) = document.value(store_id, code) {
                    images.push(AssignedImage {
                        file: file.clone(),
                        store_id,
                        attribute_code: code.to_string(),
                    });
                }
            }
        }
        Ok(images)
    }

    /// Set one scoped attribute field on many documents; returns the number
    /// of documents modified
    pub async fn set_scoped_field(
        &self,
        entity_ids: &[EntityId],
        store_id: StoreId,
        code: &str,
        value: Value,
    ) -> anyhow::Result<u64> {
        if entity_ids.is_empty() {
            return Ok(0);
        }
        let value = match self.attributes.get(code) {
            Some(attribute) => self.coerce(attribute, value)?,
            None => value,
        };
        let update = Update::new().set(FieldPath::attribute(store_id, code).into_string(), value);
        let result = self
            .docs
            .update(
                &Filter::ids(entity_ids.iter().copied()),
                &update,
                UpdateOptions::multi(),
            )
            .await
            .map_err(doc_error)?;
        Ok(result.modified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strata_common::{AttributeScope, BackendType, StoreInfo};
    use strata_docstore::MemoryDocumentStore;
    use strata_persistence::{EntityRow, MemoryRelationalStore};

    async fn engine() -> (CatalogEngine, Arc<MemoryRelationalStore>, Arc<MemoryDocumentStore>) {
        let relational = Arc::new(MemoryRelationalStore::new());
        relational.add_attribute(AttributeMetadata::new(92, "color", BackendType::Int, AttributeScope::Store));
        relational.add_attribute(AttributeMetadata::new(75, "price", BackendType::Decimal, AttributeScope::Website));
        relational.add_attribute(AttributeMetadata::new(71, "name", BackendType::Varchar, AttributeScope::Store));
        relational.add_attribute(AttributeMetadata::new(85, "image", BackendType::Varchar, AttributeScope::Store));
        relational.add_store(StoreInfo::new(1, 1, "en"));
        relational.add_store(StoreInfo::new(2, 1, "fr"));
        relational.add_store(StoreInfo::new(3, 2, "de"));
        let docs = Arc::new(MemoryDocumentStore::new("catalog_product_entity"));
        let engine = CatalogEngine::load(relational.clone(), docs.clone(), CatalogOptions::default())
            .await
            .unwrap();
        (engine, relational, docs)
    }

    #[tokio::test]
    async fn test_new_entity_values_go_to_default_scope() {
        let (engine, relational, docs) = engine().await;
        let mut e = CatalogEntity::new(42, 4, "simple").in_store(1);
        e.set("color", "12").set("price", "9.5").set("name", "");
        let outcome = engine.save(&mut e).await.unwrap();

        // price and name are indexed; the empty name clears its row
        assert_eq!(outcome.relational_rows, 2);
        assert_eq!(outcome.document_fields, 2);
        assert_eq!(relational.value(42, 75, 0), Some(json!(9.5)));

        let doc = docs.snapshot().remove(0);
        assert_eq!(doc.get("attr_0"), Some(&json!({"color": 12, "price": 9.5})));
    }

    #[tokio::test]
    async fn test_values_outside_attribute_set_dropped() {
        let relational = Arc::new(MemoryRelationalStore::new());
        relational.add_attribute(AttributeMetadata::new(92, "color", BackendType::Int, AttributeScope::Store));
        relational.add_attribute(AttributeMetadata::new(75, "price", BackendType::Decimal, AttributeScope::Website));
        relational.add_attribute(AttributeMetadata::new(71, "name", BackendType::Varchar, AttributeScope::Store));
        relational.add_to_attribute_set(4, [92, 71]);
        let docs = Arc::new(MemoryDocumentStore::new("catalog_product_entity"));
        let engine = CatalogEngine::load(relational.clone(), docs.clone(), CatalogOptions::default())
            .await
            .unwrap();

        let mut e = CatalogEntity::new(42, 4, "simple");
        e.set("color", 3).set("price", 9.5).set("name", "Shirt");
        let outcome = engine.save(&mut e).await.unwrap();

        assert_eq!(outcome.relational_rows, 1);
        assert_eq!(relational.value(42, 75, 0), None);
        assert_eq!(relational.value(42, 71, 0), Some(json!("Shirt")));
        let doc = docs.snapshot().remove(0);
        assert_eq!(doc.get("attr_0"), Some(&json!({"color": 3, "name": "Shirt"})));

        // sets without members accept every attribute
        let mut e = CatalogEntity::new(43, 9, "simple");
        e.set("price", 9.5);
        assert_eq!(engine.save(&mut e).await.unwrap().relational_rows, 1);
    }

    #[tokio::test]
    async fn test_relational_failure_leaves_document_untouched() {
        let (engine, relational, docs) = engine().await;
        relational.fail_writes_with("deadlock");
        let mut e = CatalogEntity::new(42, 4, "simple");
        e.set("price", 10);
        let err = engine.save(&mut e).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StrataError>(),
            Some(StrataError::Relational(_))
        ));
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_number_rejected_before_any_write() {
        let (engine, relational, docs) = engine().await;
        let mut e = CatalogEntity::new(42, 4, "simple");
        e.set("price", "cheap");
        assert!(engine.save(&mut e).await.is_err());
        assert!(relational.entity(42).is_none());
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn test_website_attribute_fans_out() {
        let (engine, relational, docs) = engine().await;
        relational.insert_entity(EntityRow::new(42, 4, "simple"));
        let mut e = CatalogEntity::existing(42, 4, "simple", 2);
        e.set("price", 15);
        engine.save_single_attribute(&e, "price").await.unwrap();

        let doc = docs.snapshot().remove(0);
        assert_eq!(doc.get("attr_1"), Some(&json!({"price": 15.0})));
        assert_eq!(doc.get("attr_2"), Some(&json!({"price": 15.0})));
        assert!(doc.get("attr_3").is_none());
        assert_eq!(relational.value(42, 75, 1), Some(json!(15.0)));
    }

    #[tokio::test]
    async fn test_store_attribute_single_save() {
        let (engine, _, docs) = engine().await;
        let mut e = CatalogEntity::existing(42, 4, "simple", 2);
        e.set("color", 3);
        engine.save_single_attribute(&e, "color").await.unwrap();
        let doc = docs.snapshot().remove(0);
        assert_eq!(doc.get("attr_2"), Some(&json!({"color": 3})));
        assert_eq!(doc.get("attr_0"), Some(&json!({})));
    }

    #[tokio::test]
    async fn test_attribute_value_falls_back() {
        let (engine, _, _) = engine().await;
        let mut e = CatalogEntity::new(42, 4, "simple");
        e.set("name", "Shirt");
        engine.save(&mut e).await.unwrap();

        assert_eq!(
            engine.attribute_value(42, "name", Some(3)).await.unwrap(),
            Some(json!("Shirt"))
        );
        assert_eq!(engine.attribute_value(42, "color", None).await.unwrap(), None);
        assert_eq!(engine.attribute_value(7, "name", None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_assigned_images() {
        let (engine, _, _) = engine().await;
        let mut e = CatalogEntity::new(42, 4, "simple");
        e.set("image", "/a/b.jpg");
        engine.save(&mut e).await.unwrap();
        let mut e = CatalogEntity::existing(42, 4, "simple", 1);
        e.set("image", "/c/d.jpg");
        engine.save(&mut e).await.unwrap();

        let images = engine.assigned_images(42, &[0, 1]).await.unwrap();
        assert_eq!(
            images,
            vec![
                AssignedImage {
                    file: "/a/b.jpg".into(),
                    store_id: 0,
                    attribute_code: "image".into()
                },
                AssignedImage {
                    file: "/c/d.jpg".into(),
                    store_id: 1,
                    attribute_code: "image".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_set_scoped_field() {
        let (engine, _, docs) = engine().await;
        for id in [1, 2] {
            let mut e = CatalogEntity::new(id, 4, "simple");
            e.set("name", "x");
            engine.save(&mut e).await.unwrap();
        }
        let modified = engine
            .set_scoped_field(&[1, 2, 3], 1, "url_key", json!("shirt"))
            .await
            .unwrap();
        assert_eq!(modified, 2);
        assert_eq!(docs.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_removes_document() {
        let (engine, relational, docs) = engine().await;
        let mut e = CatalogEntity::new(42, 4, "simple");
        e.set("name", "x");
        engine.save(&mut e).await.unwrap();
        assert!(relational.entity(42).is_some());

        assert!(engine.delete_entity(42).await.unwrap());
        assert!(docs.is_empty());
        assert!(relational.entity(42).is_none());
    }
}
