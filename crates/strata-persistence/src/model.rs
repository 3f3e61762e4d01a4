//! Domain model types for the relational side
//!
//! These types are used as arguments and return values of the persistence
//! traits, decoupled from specific storage backends.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strata_common::{
    AttributeId, AttributeMetadata, AttributeSetId, BackendType, Condition, EntityId, StoreId,
};

/// Primary table of the catalog entity
pub const ENTITY_TABLE: &str = "catalog_product_entity";
pub const GALLERY_TABLE: &str = "catalog_product_entity_media_gallery";
pub const GALLERY_VALUE_TABLE: &str = "catalog_product_entity_media_gallery_value";

/// Columns of the primary table when the schema cannot be described
pub const DEFAULT_ENTITY_COLUMNS: &[&str] = &[
    "entity_id",
    "entity_type_id",
    "attribute_set_id",
    "type_id",
    "sku",
    "has_options",
    "required_options",
    "created_at",
    "updated_at",
];

/// Relational backend in use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationalBackend {
    /// External database (MySQL/PostgreSQL)
    Sql,
    Memory,
}

/// Name of the EAV value table for a backend type
pub fn value_table(backend: BackendType) -> Option<String> {
    backend.value_table(ENTITY_TABLE)
}

/// Tables exported by the dump stage and counted in migration statistics
pub fn attribute_tables() -> Vec<String> {
    let mut tables: Vec<String> = BackendType::EAV.iter().filter_map(|b| value_table(*b)).collect();
    tables.push(GALLERY_TABLE.to_string());
    tables.push(GALLERY_VALUE_TABLE.to_string());
    tables
}

/// One row of the entity's primary table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRow {
    pub entity_id: EntityId,
    pub attribute_set_id: AttributeSetId,
    pub type_id: String,
    /// Every static column of the row, keyed by column name
    pub fields: Map<String, Value>,
}

impl EntityRow {
    pub fn new(entity_id: EntityId, attribute_set_id: AttributeSetId, type_id: impl Into<String>) -> Self {
        let type_id = type_id.into();
        let mut fields = Map::new();
        fields.insert("entity_id".to_string(), Value::from(entity_id));
        fields.insert("attribute_set_id".to_string(), Value::from(attribute_set_id));
        fields.insert("type_id".to_string(), Value::String(type_id.clone()));
        Self {
            entity_id,
            attribute_set_id,
            type_id,
            fields,
        }
    }

    pub fn with_field(mut self, column: impl Into<String>, value: Value) -> Self {
        self.fields.insert(column.into(), value);
        self
    }
}

/// One EAV value row: the value of an attribute for an entity in a store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EavValue {
    pub entity_id: EntityId,
    pub attribute_id: AttributeId,
    pub store_id: StoreId,
    pub value: Value,
}

/// Write of one indexed attribute value.
///
/// Static attributes update the entity's primary table; the others upsert
/// their EAV row. A null value deletes the EAV row.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeValueWrite {
    pub entity_id: EntityId,
    pub attribute: AttributeMetadata,
    pub store_id: StoreId,
    pub value: Value,
}

impl AttributeValueWrite {
    pub fn new(entity_id: EntityId, attribute: AttributeMetadata, store_id: StoreId, value: Value) -> Self {
        Self {
            entity_id,
            attribute,
            store_id,
            value,
        }
    }
}

/// One row of the media gallery table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryRow {
    pub value_id: i64,
    pub attribute_id: AttributeId,
    pub entity_id: EntityId,
    pub file: String,
}

/// Per-store presentation values of a gallery row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryValueRow {
    pub value_id: i64,
    pub store_id: StoreId,
    pub label: Option<String>,
    pub position: Option<i64>,
    pub disabled: bool,
}

/// An attribute test evaluated by the relational store
#[derive(Debug, Clone, PartialEq)]
pub struct RelationalCondition {
    pub attribute: AttributeMetadata,
    pub condition: Condition,
}

impl RelationalCondition {
    pub fn new(attribute: AttributeMetadata, condition: Condition) -> Self {
        Self {
            attribute,
            condition,
        }
    }
}

/// Entity id query against the relational store.
///
/// Conditions inside a group are alternatives; groups are conjoined. The
/// effective value of an attribute is the store row when one exists,
/// otherwise the default-store row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationalQuery {
    pub store_id: StoreId,
    pub groups: Vec<Vec<RelationalCondition>>,
    /// Intersect with these ids when set
    pub restrict_ids: Option<Vec<EntityId>>,
    pub limit: Option<u64>,
    pub offset: u64,
}

impl RelationalQuery {
    pub fn new(store_id: StoreId) -> Self {
        Self {
            store_id,
            ..Default::default()
        }
    }

    pub fn group(mut self, conditions: Vec<RelationalCondition>) -> Self {
        if !conditions.is_empty() {
            self.groups.push(conditions);
        }
        self
    }

    pub fn restrict(mut self, ids: Vec<EntityId>) -> Self {
        self.restrict_ids = Some(ids);
        self
    }

    pub fn page(mut self, limit: Option<u64>, offset: u64) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }

    pub fn has_conditions(&self) -> bool {
        !self.groups.is_empty()
    }
}

/// Row count of one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableStatistic {
    pub table: String,
    pub rows: u64,
}

/// Full content of one table, as exported by the dump stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDump {
    pub table: String,
    pub rows: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_tables() {
        let tables = attribute_tables();
        assert_eq!(tables.len(), 7);
        assert_eq!(tables[0], "catalog_product_entity_int");
        assert_eq!(tables[6], GALLERY_VALUE_TABLE);
    }

    #[test]
    fn test_query_ignores_empty_groups() {
        let q = RelationalQuery::new(1).group(vec![]);
        assert!(!q.has_conditions());
    }
}
