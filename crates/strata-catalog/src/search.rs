//! Attribute values feed for full-text indexing

use std::collections::BTreeMap;

use serde_json::Value;
use strata_common::{AttributeId, EntityId, StoreId};
use strata_docstore::Filter;
use strata_scope::ScopedDocument;

use crate::engine::{CatalogEngine, doc_error, scope_projection};

pub type SearchableValues = BTreeMap<EntityId, BTreeMap<AttributeId, Value>>;

impl CatalogEngine {
    /// Values of every known attribute per entity as seen from `store_id`,
    /// keyed by attribute id. All entities when `entity_ids` is `None`.
    pub async fn searchable_attributes(
        &self,
        store_id: StoreId,
        entity_ids: Option<&[EntityId]>,
    ) -> anyhow::Result<SearchableValues> {
        let filter = match entity_ids {
            Some(ids) if ids.is_empty() => return Ok(SearchableValues::new()),
            Some(ids) => Filter::ids(ids.iter().copied()),
            None => Filter::All,
        };
        let documents = self
            .docs()
            .find(&filter, &scope_projection(store_id), None)
            .await
            .map_err(doc_error)?;

        let mut out = SearchableValues::new();
        for document in documents {
            let document = ScopedDocument::new(document);
            let Some(entity_id) = document.id() else {
                continue;
            };
            let values: BTreeMap<AttributeId, Value> = document
                .merged(store_id)
                .into_iter()
                .filter_map(|(code, value)| {
                    let attribute = self.attributes().get(&code)?;
                    Some((attribute.attribute_id, value))
                })
                .collect();
            if !values.is_empty() {
                out.insert(entity_id, values);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;
    use strata_common::{AttributeMetadata, AttributeScope, BackendType};
    use strata_docstore::MemoryDocumentStore;
    use strata_persistence::MemoryRelationalStore;

    use crate::engine::CatalogOptions;
    use crate::entity::CatalogEntity;

    #[tokio::test]
    async fn test_store_values_override_by_attribute_id() {
        let relational = Arc::new(MemoryRelationalStore::new());
        relational.add_attribute(AttributeMetadata::new(71, "name", BackendType::Varchar, AttributeScope::Store));
        relational.add_attribute(AttributeMetadata::new(72, "description", BackendType::Text, AttributeScope::Store));
        let engine = CatalogEngine::load(
            relational,
            Arc::new(MemoryDocumentStore::new("catalog_product_entity")),
            CatalogOptions::default(),
        )
        .await
        .unwrap();

        let mut e = CatalogEntity::new(42, 4, "simple");
        e.set("name", "Shirt").set("description", "Cotton");
        engine.save(&mut e).await.unwrap();
        let mut e = CatalogEntity::existing(42, 4, "simple", 1);
        e.set("name", "Hemd");
        engine.save_single_attribute(&e, "name").await.unwrap();

        let values = engine.searchable_attributes(1, None).await.unwrap();
        assert_eq!(
            values[&42],
            BTreeMap::from([(71, json!("Hemd")), (72, json!("Cotton"))])
        );
        assert!(engine.searchable_attributes(1, Some(&[7])).await.unwrap().is_empty());
        assert!(engine.searchable_attributes(1, Some(&[])).await.unwrap().is_empty());
    }
}
