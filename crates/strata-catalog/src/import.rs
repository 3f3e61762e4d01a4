//! Bulk attribute value import

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use strata_common::{EntityId, StoreId};
use strata_persistence::AttributeValueWrite;
use strata_scope::{ScopedWrite, is_present, upsert_fields};
use tracing::info;

use crate::engine::{CatalogEngine, doc_error, relational_error};

/// One imported value
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImportRow {
    pub entity_id: EntityId,
    pub attribute: String,
    #[serde(default)]
    pub store_id: StoreId,
    pub value: Value,
}

impl ImportRow {
    pub fn new(entity_id: EntityId, attribute: impl Into<String>, store_id: StoreId, value: Value) -> Self {
        Self {
            entity_id,
            attribute: attribute.into(),
            store_id,
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub relational_rows: usize,
    pub documents: usize,
}

impl CatalogEngine {
    /// Import attribute values.
    ///
    /// Every row is validated before anything is written. Indexed rows are
    /// inserted or updated relationally in one transaction, then each entity
    /// receives one field-set upsert with its present values.
    pub async fn import_attribute_values(&self, rows: &[ImportRow]) -> anyhow::Result<ImportSummary> {
        let mut relational_writes = Vec::new();
        let mut documents: BTreeMap<EntityId, ScopedWrite> = BTreeMap::new();

        for row in rows {
            let attribute = self.attributes().require(&row.attribute)?;
            let value = if is_present(&row.value) {
                self.coerce(attribute, row.value.clone())?
            } else {
                Value::Null
            };
            if self.attributes().is_indexed(&attribute.code) {
                relational_writes.push(AttributeValueWrite::new(
                    row.entity_id,
                    attribute.clone(),
                    row.store_id,
                    value.clone(),
                ));
            }
            if is_present(&value) {
                documents
                    .entry(row.entity_id)
                    .or_default()
                    .set(row.store_id, &attribute.code, value);
            }
        }

        self.relational()
            .write_values(&relational_writes)
            .await
            .map_err(relational_error)?;

        let mut written = 0;
        for (entity_id, write) in documents {
            if upsert_fields(self.docs(), entity_id, write)
                .await
                .map_err(doc_error)?
                .is_some()
            {
                written += 1;
            }
        }

        info!(
            rows = rows.len(),
            relational_rows = relational_writes.len(),
            documents = written,
            "Attribute values imported"
        );
        Ok(ImportSummary {
            relational_rows: relational_writes.len(),
            documents: written,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;
    use strata_common::{AttributeMetadata, AttributeScope, BackendType, NumberFormat, StrataError};
    use strata_docstore::MemoryDocumentStore;
    use strata_persistence::MemoryRelationalStore;

    use crate::engine::CatalogOptions;

    async fn engine() -> (CatalogEngine, Arc<MemoryRelationalStore>, Arc<MemoryDocumentStore>) {
        let relational = Arc::new(MemoryRelationalStore::new());
        relational.add_attribute(AttributeMetadata::new(75, "price", BackendType::Decimal, AttributeScope::Website));
        relational.add_attribute(AttributeMetadata::new(92, "color", BackendType::Varchar, AttributeScope::Store));
        let docs = Arc::new(MemoryDocumentStore::new("catalog_product_entity"));
        let options = CatalogOptions {
            locale: NumberFormat::new(',', '.'),
        };
        let engine = CatalogEngine::load(relational.clone(), docs.clone(), options)
            .await
            .unwrap();
        (engine, relational, docs)
    }

    #[tokio::test]
    async fn test_import_groups_documents_per_entity() {
        let (engine, relational, docs) = engine().await;
        let summary = engine
            .import_attribute_values(&[
                ImportRow::new(1, "price", 0, json!("1.234,50")),
                ImportRow::new(1, "color", 0, json!("red")),
                ImportRow::new(1, "color", 2, json!("rot")),
                ImportRow::new(2, "color", 0, json!("")),
            ])
            .await
            .unwrap();

        assert_eq!(
            summary,
            ImportSummary {
                relational_rows: 1,
                documents: 1
            }
        );
        assert_eq!(relational.value(1, 75, 0), Some(json!(1234.5)));
        let doc = docs.snapshot().remove(0);
        assert_eq!(doc.get("attr_0"), Some(&json!({"price": 1234.5, "color": "red"})));
        assert_eq!(doc.get("attr_2"), Some(&json!({"color": "rot"})));
    }

    #[tokio::test]
    async fn test_unknown_attribute_rejects_whole_import() {
        let (engine, _, docs) = engine().await;
        let err = engine
            .import_attribute_values(&[
                ImportRow::new(1, "color", 0, json!("red")),
                ImportRow::new(1, "flavour", 0, json!("mint")),
            ])
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StrataError>(),
            Some(StrataError::UnknownAttribute(_))
        ));
        assert!(docs.is_empty());
    }
}
