//! Attribute metadata trait
//!
//! Attribute definitions, attribute-set membership, stores and the
//! description of the entity's primary table.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use strata_common::{AttributeId, AttributeMetadata, AttributeSetId, StoreInfo};

#[async_trait]
pub trait AttributeMetadataSource: Send + Sync {
    /// Columns physically present on the entity's primary table
    async fn entity_columns(&self) -> anyhow::Result<Vec<String>>;

    /// Every attribute of the catalog entity type
    async fn attributes(&self) -> anyhow::Result<Vec<AttributeMetadata>>;

    /// Attribute ids belonging to each attribute set
    async fn attribute_set_members(
        &self,
    ) -> anyhow::Result<HashMap<AttributeSetId, BTreeSet<AttributeId>>>;

    /// All stores, ascending by id, the default store included
    async fn stores(&self) -> anyhow::Result<Vec<StoreInfo>>;
}
