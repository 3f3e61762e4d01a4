//! Facet aggregation
//!
//! Counts entities per attribute option over a candidate id set, using the
//! same store fallback as reads: the store value wins when present, the
//! default-store value counts otherwise.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use strata_common::{EntityId, StoreId};
use strata_docstore::{Filter, GroupSpec, Pipeline};
use strata_scope::{Cascade, is_present};
use tracing::debug;

use crate::engine::{CatalogEngine, doc_error, relational_error};

const SCOPED_KEY: &str = "scoped";
const GLOBAL_KEY: &str = "global";
const TOTAL_FIELD: &str = "total";

/// Option value of a facet; integer options sort before text options
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FacetKey {
    Int(i64),
    Text(String),
}

impl FacetKey {
    pub fn from_value(value: &Value) -> Option<Self> {
        if !is_present(value) {
            return None;
        }
        match value {
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(FacetKey::Int(i)),
                None => Some(FacetKey::Text(n.to_string())),
            },
            Value::String(s) => match s.parse::<i64>() {
                Ok(i) if i.to_string() == *s => Some(FacetKey::Int(i)),
                _ => Some(FacetKey::Text(s.clone())),
            },
            Value::Bool(b) => Some(FacetKey::Int(i64::from(*b))),
            other => Some(FacetKey::Text(other.to_string())),
        }
    }
}

impl fmt::Display for FacetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacetKey::Int(i) => write!(f, "{}", i),
            FacetKey::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for FacetKey {
    fn from(s: &str) -> Self {
        FacetKey::from_value(&Value::from(s)).unwrap_or_else(|| FacetKey::Text(String::new()))
    }
}

impl From<i64> for FacetKey {
    fn from(i: i64) -> Self {
        FacetKey::Int(i)
    }
}

pub type FacetCounts = BTreeMap<FacetKey, u64>;

impl CatalogEngine {
    /// Number of candidate entities per option of `code`, seen from
    /// `store_id`.
    ///
    /// Indexed attributes are counted by the relational store. A store that
    /// answers "not ok" yields an empty result; errors propagate.
    pub async fn count_by_option(
        &self,
        code: &str,
        store_id: StoreId,
        candidate_ids: &[EntityId],
    ) -> anyhow::Result<FacetCounts> {
        let mut counts = FacetCounts::new();
        if candidate_ids.is_empty() {
            return Ok(counts);
        }

        if self.attributes().is_indexed(code) {
            let attribute = self.attributes().relational(code)?;
            let rows = self
                .relational()
                .count_by_value(&attribute, store_id, candidate_ids)
                .await
                .map_err(relational_error)?;
            for (value, total) in rows {
                if let Some(key) = FacetKey::from_value(&value) {
                    *counts.entry(key).or_default() += total;
                }
            }
            return Ok(counts);
        }

        let cascade = Cascade::new(store_id, code);
        let pipeline = Pipeline::new()
            .matching(Filter::and(vec![
                Filter::ids(candidate_ids.iter().copied()),
                cascade.presence(),
            ]))
            .group(
                GroupSpec::new(TOTAL_FIELD)
                    .key(SCOPED_KEY, cascade.scoped_path().as_str())
                    .key(GLOBAL_KEY, cascade.global_path().as_str()),
            );
        let reply = self.docs().aggregate(&pipeline).await.map_err(doc_error)?;
        if !reply.ok {
            debug!(attribute = code, store_id, "Facet aggregation returned no result");
            return Ok(counts);
        }

        for row in &reply.documents {
            let key = row.get("_id");
            let scoped = key.and_then(|k| k.get(SCOPED_KEY)).and_then(FacetKey::from_value);
            let global = key.and_then(|k| k.get(GLOBAL_KEY)).and_then(FacetKey::from_value);
            let Some(option) = scoped.or(global) else {
                continue;
            };
            let total = row.get(TOTAL_FIELD).and_then(Value::as_u64).unwrap_or(0);
            *counts.entry(option).or_default() += total;
        }
        debug!(attribute = code, store_id, options = counts.len(), "Facet counted");
        Ok(counts)
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

    #[test]
    fn test_keys_sort_numbers_first() {
        let mut keys = vec![
            FacetKey::from("b"),
            FacetKey::from(10),
            FacetKey::from("2"),
            FacetKey::from("a"),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                FacetKey::Int(2),
                FacetKey::Int(10),
                FacetKey::Text("a".into()),
                FacetKey::Text("b".into())
            ]
        );
        assert_eq!(FacetKey::from_value(&json!("")), None);
        assert_eq!(FacetKey::from("007"), FacetKey::Text("007".into()));
    }

    #[tokio::test]
    async fn test_scoped_value_preferred() {
        let relational = Arc::new(MemoryRelationalStore::new());
        relational.add_attribute(AttributeMetadata::new(92, "color", BackendType::Int, AttributeScope::Store));
        let docs = Arc::new(MemoryDocumentStore::new("catalog_product_entity"));
        let engine = CatalogEngine::load(relational, docs, CatalogOptions::default())
            .await
            .unwrap();

        for (id, color) in [(1, 5), (2, 5), (3, 6)] {
            let mut e = CatalogEntity::new(id, 4, "simple");
            e.set("color", color);
            engine.save(&mut e).await.unwrap();
        }
        let mut e = CatalogEntity::existing(2, 4, "simple", 1);
        e.set("color", 6);
        engine.save_single_attribute(&e, "color").await.unwrap();

        let counts = engine.count_by_option("color", 1, &[1, 2, 3, 4]).await.unwrap();
        assert_eq!(counts, FacetCounts::from([(FacetKey::Int(5), 1), (FacetKey::Int(6), 2)]));

        let counts = engine.count_by_option("color", 0, &[1, 2, 3]).await.unwrap();
        assert_eq!(counts, FacetCounts::from([(FacetKey::Int(5), 2), (FacetKey::Int(6), 1)]));

        assert!(engine.count_by_option("color", 1, &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_indexed_attribute_counted_relationally() {
        let relational = Arc::new(MemoryRelationalStore::new());
        relational.add_attribute(AttributeMetadata::new(96, "status", BackendType::Int, AttributeScope::Website));
        let docs = Arc::new(MemoryDocumentStore::new("catalog_product_entity"));
        let engine = CatalogEngine::load(relational, docs, CatalogOptions::default())
            .await
            .unwrap();
        for (id, status) in [(1, 1), (2, 2), (3, 1)] {
            let mut e = CatalogEntity::new(id, 4, "simple");
            e.set("status", status);
            engine.save(&mut e).await.unwrap();
        }
        let counts = engine.count_by_option("status", 0, &[1, 2, 3]).await.unwrap();
        assert_eq!(counts, FacetCounts::from([(FacetKey::Int(1), 2), (FacetKey::Int(2), 1)]));
    }
}
