//! Entity collection queries
//!
//! A query is a conjunction of filter groups; the conditions of one group are
//! alternatives. Conditions on indexed attributes run in the relational store
//! and narrow the candidate ids. Conditions on document-only attributes are
//! translated to exists-cascades and evaluated by the document store, limited
//! to the relational candidates. The relational store then orders and pages
//! the surviving ids.

use std::collections::HashMap;

use serde_json::Value;
use strata_common::{Condition, EntityId, StoreId};
use strata_docstore::{Filter, ids_of};
use strata_persistence::{RelationalCondition, RelationalQuery};
use strata_scope::ScopedDocument;
use tracing::debug;

use crate::engine::{CatalogEngine, doc_error, relational_error, scope_projection};
use crate::entity::CatalogEntity;
use crate::event::CatalogEvent;
use crate::translate::translate;

/// One attribute test of a filter group
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeFilter {
    pub code: String,
    pub condition: Condition,
}

impl AttributeFilter {
    pub fn new(code: impl Into<String>, condition: Condition) -> Self {
        Self {
            code: code.into(),
            condition,
        }
    }
}

/// Query over the entities of one store
pub struct EntityQuery<'a> {
    engine: &'a CatalogEngine,
    store_id: StoreId,
    groups: Vec<Vec<AttributeFilter>>,
    page_size: Option<u64>,
    page: u64,
}

/// Filters split by the backend evaluating them
#[derive(Default)]
struct Plan {
    relational: Vec<Vec<RelationalCondition>>,
    document: Vec<Filter>,
}

impl<'a> EntityQuery<'a> {
    pub fn new(engine: &'a CatalogEngine, store_id: StoreId) -> Self {
        Self {
            engine,
            store_id,
            groups: Vec::new(),
            page_size: None,
            page: 1,
        }
    }

    pub fn store_id(&self) -> StoreId {
        self.store_id
    }

    /// Add a condition conjoined with the previous ones
    pub fn add_attribute_filter(mut self, code: impl Into<String>, condition: Condition) -> Self {
        self.groups.push(vec![AttributeFilter::new(code, condition)]);
        self
    }

    /// Add a condition given in its request form, e.g. `{"like": "%shirt%"}`
    pub fn add_filter_json(self, code: &str, condition: &Value) -> anyhow::Result<Self> {
        let condition = Condition::from_json(code, condition)?;
        Ok(self.add_attribute_filter(code, condition))
    }

    /// Add a group of alternatives, conjoined with the previous conditions
    pub fn add_any(mut self, filters: Vec<AttributeFilter>) -> Self {
        if !filters.is_empty() {
            self.groups.push(filters);
        }
        self
    }

    /// Limit results to page `page` (1-based) of `size` entities
    pub fn page(mut self, size: u64, page: u64) -> Self {
        self.page_size = Some(size);
        self.page = page.max(1);
        self
    }

    fn plan(&self) -> anyhow::Result<Plan> {
        let attributes = self.engine.attributes();
        let locale = &self.engine.options().locale;
        let mut plan = Plan::default();
        for group in &self.groups {
            let mut relational = Vec::new();
            let mut document = Vec::new();
            for filter in group {
                let attribute = attributes.relational(&filter.code)?;
                if attributes.is_indexed(&filter.code) {
                    relational.push(RelationalCondition::new(attribute, filter.condition.clone()));
                } else {
                    document.push(translate(&attribute, &filter.condition, self.store_id, locale)?);
                }
            }
            if !relational.is_empty() {
                plan.relational.push(relational);
            }
            if !document.is_empty() {
                plan.document.push(Filter::or(document));
            }
        }
        Ok(plan)
    }

    /// Ids matching the filters, paged when a page size is set
    async fn select_ids(&self, paged: bool) -> anyhow::Result<Vec<EntityId>> {
        let plan = self.plan()?;
        let relational = self.engine.relational();

        let mut candidates: Option<Vec<EntityId>> = None;
        if !plan.relational.is_empty() {
            let query = plan
                .relational
                .into_iter()
                .fold(RelationalQuery::new(self.store_id), |q, group| q.group(group));
            let ids = relational
                .select_entity_ids(&query)
                .await
                .map_err(relational_error)?;
            debug!(store_id = self.store_id, candidates = ids.len(), "Relational prefilter");
            candidates = Some(ids);
        }

        if !plan.document.is_empty() {
            let mut filters = plan.document;
            if let Some(ids) = candidates.take() {
                filters.push(Filter::ids(ids));
            }
            let filter = Filter::and(filters);
            let limit = match (paged, self.page_size) {
                (true, Some(size)) => {
                    Some(usize::try_from(size.saturating_mul(self.page)).unwrap_or(usize::MAX))
                }
                _ => None,
            };
            let documents = self
                .engine
                .docs()
                .find(&filter, &scope_projection(self.store_id), limit)
                .await
                .map_err(doc_error)?;
            debug!(
                store_id = self.store_id,
                filter = %filter,
                matched = documents.len(),
                "Document filter applied"
            );
            candidates = Some(ids_of(&documents));
        }

        if candidates.as_ref().is_some_and(Vec::is_empty) {
            return Ok(Vec::new());
        }

        let mut query = RelationalQuery::new(self.store_id);
        if let Some(ids) = candidates {
            query = query.restrict(ids);
        }
        if paged && let Some(size) = self.page_size {
            query = query.page(Some(size), size.saturating_mul(self.page - 1));
        }
        relational
            .select_entity_ids(&query)
            .await
            .map_err(relational_error)
    }

    /// Every matching id, ignoring paging
    pub async fn all_ids(&self) -> anyhow::Result<Vec<EntityId>> {
        self.select_ids(false).await
    }

    pub async fn size(&self) -> anyhow::Result<usize> {
        Ok(self.all_ids().await?.len())
    }

    /// Load the requested page, attribute values merged for the query's
    /// store
    pub async fn load(&self) -> anyhow::Result<Vec<CatalogEntity>> {
        let ids = self.select_ids(true).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let documents = self
            .engine
            .docs()
            .find(&Filter::ids(ids.iter().copied()), &scope_projection(self.store_id), None)
            .await
            .map_err(doc_error)?;
        let mut by_id: HashMap<EntityId, ScopedDocument> = documents
            .into_iter()
            .map(ScopedDocument::new)
            .filter_map(|doc| doc.id().map(|id| (id, doc)))
            .collect();

        let relational = self.engine.relational();
        let mut entities = Vec::with_capacity(ids.len());
        for id in &ids {
            let Some(row) = relational.find_entity(*id).await.map_err(relational_error)? else {
                continue;
            };
            let mut entity = CatalogEntity::from_row(row, self.store_id);
            if let Some(doc) = by_id.remove(id) {
                entity.merge_loaded(doc.merged(self.store_id));
            }
            entities.push(entity);
        }

        if !entities.is_empty() {
            let loaded = entities.iter().map(|e| e.id).collect();
            self.engine
                .events()
                .publish(CatalogEvent::collection_loaded(loaded, self.store_id))
                .await;
        }
        Ok(entities)
    }
}

impl CatalogEngine {
    /// Start a query over the entities of `store_id`
    pub fn query(&self, store_id: StoreId) -> EntityQuery<'_> {
        EntityQuery::new(self, store_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;
    use strata_common::{AttributeMetadata, AttributeScope, BackendType, StrataError};
    use strata_docstore::MemoryDocumentStore;
    use strata_persistence::MemoryRelationalStore;

    use crate::engine::CatalogOptions;

    async fn seeded() -> CatalogEngine {
        let relational = Arc::new(MemoryRelationalStore::new());
        relational.add_attribute(AttributeMetadata::new(92, "color", BackendType::Varchar, AttributeScope::Store));
        relational.add_attribute(AttributeMetadata::new(96, "status", BackendType::Int, AttributeScope::Website));
        relational.add_attribute(AttributeMetadata::new(97, "qty", BackendType::Int, AttributeScope::Store));
        let docs = Arc::new(MemoryDocumentStore::new("catalog_product_entity"));
        let engine = CatalogEngine::load(relational, docs, CatalogOptions::default())
            .await
            .unwrap();

        for (id, color, status, sku) in [
            (1, "red", 1, "A"),
            (2, "blue", 1, "B"),
            (3, "red", 2, "C"),
            (4, "red", 1, "D"),
        ] {
            let mut e = CatalogEntity::new(id, 4, "simple");
            e.set("color", color).set("status", status).set("sku", sku);
            engine.save(&mut e).await.unwrap();
        }
        // store 1 renames entity 4's color
        let mut e = CatalogEntity::existing(4, 4, "simple", 1);
        e.set("color", "green");
        engine.save_single_attribute(&e, "color").await.unwrap();
        engine
    }

    #[tokio::test]
    async fn test_document_filter_uses_fallback() {
        let engine = seeded().await;
        let ids = engine
            .query(1)
            .add_attribute_filter("color", Condition::Eq(json!("red")))
            .all_ids()
            .await
            .unwrap();
        assert_eq!(ids, vec![1, 3]);

        let ids = engine
            .query(0)
            .add_attribute_filter("color", Condition::Eq(json!("red")))
            .all_ids()
            .await
            .unwrap();
        assert_eq!(ids, vec![1, 3, 4]);
    }

    #[tokio::test]
    async fn test_relational_and_document_conditions_intersect() {
        let engine = seeded().await;
        let query = engine
            .query(0)
            .add_attribute_filter("status", Condition::Eq(json!(1)))
            .add_filter_json("color", &json!({"like": "RE%"}))
            .unwrap();
        assert_eq!(query.all_ids().await.unwrap(), vec![1, 4]);
        assert_eq!(query.size().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_paged_load_merges_store_values() {
        let engine = seeded().await;
        let mut rx = engine.events().subscribe();
        let entities = engine
            .query(1)
            .add_attribute_filter("status", Condition::Eq(json!(1)))
            .page(2, 2)
            .load()
            .await
            .unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].id, 4);
        assert_eq!(entities[0].get("color"), Some(&json!("green")));
        assert_eq!(entities[0].get("sku"), Some(&json!("D")));
        assert_eq!(rx.recv().await.unwrap().entity_ids, vec![4]);
    }

    #[tokio::test]
    async fn test_alternatives() {
        let engine = seeded().await;
        let ids = engine
            .query(0)
            .add_any(vec![
                AttributeFilter::new("color", Condition::Eq(json!("blue"))),
                AttributeFilter::new("color", Condition::Like("gre%".into())),
            ])
            .all_ids()
            .await
            .unwrap();
        assert_eq!(ids, vec![2]);
    }

    #[tokio::test]
    async fn test_text_literals_match_numeric_document_values() {
        let engine = seeded().await;
        let mut e = CatalogEntity::new(5, 4, "simple");
        e.set("qty", "12");
        engine.save(&mut e).await.unwrap();

        for condition in [json!({"eq": "12"}), json!({"gteq": "5"}), json!("12")] {
            let ids = engine
                .query(1)
                .add_filter_json("qty", &condition)
                .unwrap()
                .all_ids()
                .await
                .unwrap();
            assert_eq!(ids, vec![5], "{}", condition);
        }

        let ids = engine
            .query(1)
            .add_filter_json("qty", &json!({"lt": "12"}))
            .unwrap()
            .all_ids()
            .await
            .unwrap();
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_condition_fails_query() {
        let engine = seeded().await;
        let err = engine
            .query(0)
            .add_attribute_filter("color", Condition::In(vec![json!("red")]))
            .all_ids()
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StrataError>(),
            Some(StrataError::UnsupportedCondition { .. })
        ));
    }

    #[tokio::test]
    async fn test_no_match_loads_nothing() {
        let engine = seeded().await;
        let entities = engine
            .query(0)
            .add_attribute_filter("color", Condition::Eq(json!("purple")))
            .load()
            .await
            .unwrap();
        assert!(entities.is_empty());
    }
}
