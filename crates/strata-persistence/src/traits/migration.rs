//! Migration source trait
//!
//! Bulk reads, statistics and destructive cleanup used by the migration
//! pipeline.

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::stream::BoxStream;
use strata_common::{AttributeId, BackendType, EntityId, StoreId};

use crate::model::{EavValue, EntityRow, GalleryRow, GalleryValueRow, TableDump, TableStatistic};

#[async_trait]
pub trait MigrationSource: Send + Sync {
    /// Up to `limit` entity rows with id greater than `after`, ascending
    async fn entities_after(&self, after: EntityId, limit: u64) -> anyhow::Result<Vec<EntityRow>>;

    /// Values stored for `store_id` exactly, for the given entities and
    /// attributes, grouped by backend table
    async fn attribute_values(
        &self,
        store_id: StoreId,
        entity_ids: &[EntityId],
        attributes: &BTreeMap<BackendType, Vec<AttributeId>>,
    ) -> anyhow::Result<Vec<EavValue>>;

    /// Forward cursor over every gallery row, ascending by value id
    async fn gallery_rows<'a>(
        &'a self,
    ) -> anyhow::Result<BoxStream<'a, anyhow::Result<GalleryRow>>>;

    /// Per-store values of one gallery row
    async fn gallery_values(&self, value_id: i64) -> anyhow::Result<Vec<GalleryValueRow>>;

    /// Row counts of the entity table, the EAV value tables and both gallery
    /// tables
    async fn table_statistics(&self) -> anyhow::Result<Vec<TableStatistic>>;

    /// Ids of the attributes with the given codes
    async fn attribute_ids_by_code(&self, codes: &[String]) -> anyhow::Result<Vec<AttributeId>>;

    /// Delete EAV value rows of every attribute not in `keep`; returns rows
    /// deleted
    async fn delete_values_except(&self, keep: &[AttributeId]) -> anyhow::Result<u64>;

    /// Empty both gallery tables; returns rows deleted
    async fn truncate_galleries(&self) -> anyhow::Result<u64>;

    /// Export the EAV value tables and both gallery tables
    async fn dump_tables(&self) -> anyhow::Result<Vec<TableDump>>;
}
