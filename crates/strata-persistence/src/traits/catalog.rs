//! Catalog persistence trait
//!
//! Reads and writes of indexed attribute rows used by the live engine.

use async_trait::async_trait;
use serde_json::Value;
use strata_common::{AttributeMetadata, EntityId, StoreId};

use crate::model::{AttributeValueWrite, EntityRow, RelationalQuery};

#[async_trait]
pub trait CatalogPersistence: Send + Sync {
    /// Insert or update the entity row and write its indexed values in one
    /// transaction
    async fn save_entity(&self, row: &EntityRow, values: &[AttributeValueWrite])
    -> anyhow::Result<()>;

    /// Write indexed values in one transaction; nothing is written on failure
    async fn write_values(&self, values: &[AttributeValueWrite]) -> anyhow::Result<()>;

    /// Delete the entity row and its value rows
    async fn delete_entity(&self, entity_id: EntityId) -> anyhow::Result<bool>;

    /// Load the entity row
    async fn find_entity(&self, entity_id: EntityId) -> anyhow::Result<Option<EntityRow>>;

    /// Ids matching `query`, ascending
    async fn select_entity_ids(&self, query: &RelationalQuery) -> anyhow::Result<Vec<EntityId>>;

    /// Occurrences of each effective value of `attribute` among `entity_ids`
    async fn count_by_value(
        &self,
        attribute: &AttributeMetadata,
        store_id: StoreId,
        entity_ids: &[EntityId],
    ) -> anyhow::Result<Vec<(Value, u64)>>;
}
