// In-memory relational store
// Holds entity rows, EAV values and gallery rows in ordered maps. Used by
// tests and by the migration dry runs of the CLI.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::RwLock;
use serde_json::{Value, json};
use strata_common::{
    AttributeId, AttributeMetadata, AttributeSetId, BackendType, DEFAULT_STORE_ID, EntityId,
    StoreId, StoreInfo,
};

use crate::model::*;
use crate::traits::*;

type ValueKey = (EntityId, AttributeId, StoreId);

#[derive(Default)]
struct MemoryState {
    entity_columns: Vec<String>,
    attributes: BTreeMap<AttributeId, AttributeMetadata>,
    set_members: HashMap<AttributeSetId, BTreeSet<AttributeId>>,
    stores: BTreeMap<StoreId, StoreInfo>,
    entities: BTreeMap<EntityId, EntityRow>,
    values: BTreeMap<ValueKey, Value>,
    galleries: BTreeMap<i64, GalleryRow>,
    gallery_values: BTreeMap<(i64, StoreId), GalleryValueRow>,
    fail_writes: Option<String>,
}

impl MemoryState {
    fn attribute(&self, attribute_id: AttributeId) -> anyhow::Result<&AttributeMetadata> {
        self.attributes
            .get(&attribute_id)
            .ok_or_else(|| anyhow::anyhow!("Attribute {} not found", attribute_id))
    }

    fn check_writable(&self) -> anyhow::Result<()> {
        match &self.fail_writes {
            Some(reason) => Err(anyhow::anyhow!("{}", reason)),
            None => Ok(()),
        }
    }

    fn effective(
        &self,
        entity: &EntityRow,
        attribute: &AttributeMetadata,
        store_id: StoreId,
    ) -> Option<Value> {
        if attribute.backend_type == BackendType::Static {
            return entity.fields.get(&attribute.code).cloned();
        }
        self.values
            .get(&(entity.entity_id, attribute.attribute_id, store_id))
            .or_else(|| {
                self.values
                    .get(&(entity.entity_id, attribute.attribute_id, DEFAULT_STORE_ID))
            })
            .cloned()
    }

    fn apply(&mut self, write: &AttributeValueWrite) -> anyhow::Result<()> {
        let attribute = &write.attribute;
        if attribute.backend_type == BackendType::Static {
            let entity = self
                .entities
                .get_mut(&write.entity_id)
                .ok_or_else(|| anyhow::anyhow!("Entity {} not found", write.entity_id))?;
            entity.fields.insert(attribute.code.clone(), write.value.clone());
            return Ok(());
        }
        let key = (write.entity_id, attribute.attribute_id, write.store_id);
        match &write.value {
            Value::Null => {
                self.values.remove(&key);
            }
            Value::String(s) if s.is_empty() => {
                self.values.remove(&key);
            }
            value => {
                self.values.insert(key, value.clone());
            }
        }
        Ok(())
    }
}

/// In-memory relational store
pub struct MemoryRelationalStore {
    state: RwLock<MemoryState>,
}

impl Default for MemoryRelationalStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRelationalStore {
    /// Create an empty store with the default store and the known entity
    /// columns
    pub fn new() -> Self {
        let mut state = MemoryState {
            entity_columns: DEFAULT_ENTITY_COLUMNS.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        };
        state
            .stores
            .insert(DEFAULT_STORE_ID, StoreInfo::new(DEFAULT_STORE_ID, 0, "admin"));
        Self {
            state: RwLock::new(state),
        }
    }

    pub fn set_entity_columns<I, S>(&self, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.write().entity_columns = columns.into_iter().map(Into::into).collect();
    }

    pub fn add_attribute(&self, attribute: AttributeMetadata) {
        self.state
            .write()
            .attributes
            .insert(attribute.attribute_id, attribute);
    }

    pub fn add_to_attribute_set<I>(&self, attribute_set_id: AttributeSetId, attribute_ids: I)
    where
        I: IntoIterator<Item = AttributeId>,
    {
        self.state
            .write()
            .set_members
            .entry(attribute_set_id)
            .or_default()
            .extend(attribute_ids);
    }

    pub fn add_store(&self, store: StoreInfo) {
        self.state.write().stores.insert(store.store_id, store);
    }

    pub fn insert_entity(&self, row: EntityRow) {
        self.state.write().entities.insert(row.entity_id, row);
    }

    /// Store a raw EAV value, bypassing write validation
    pub fn insert_value(
        &self,
        entity_id: EntityId,
        attribute_id: AttributeId,
        store_id: StoreId,
        value: Value,
    ) {
        self.state
            .write()
            .values
            .insert((entity_id, attribute_id, store_id), value);
    }

    pub fn insert_gallery(&self, row: GalleryRow, values: Vec<GalleryValueRow>) {
        let mut state = self.state.write();
        for value in values {
            state
                .gallery_values
                .insert((value.value_id, value.store_id), value);
        }
        state.galleries.insert(row.value_id, row);
    }

    pub fn value(
        &self,
        entity_id: EntityId,
        attribute_id: AttributeId,
        store_id: StoreId,
    ) -> Option<Value> {
        self.state
            .read()
            .values
            .get(&(entity_id, attribute_id, store_id))
            .cloned()
    }

    pub fn entity(&self, entity_id: EntityId) -> Option<EntityRow> {
        self.state.read().entities.get(&entity_id).cloned()
    }

    pub fn value_count(&self) -> usize {
        self.state.read().values.len()
    }

    pub fn gallery_count(&self) -> usize {
        self.state.read().galleries.len()
    }

    /// Make every following write fail with `reason`
    pub fn fail_writes_with(&self, reason: impl Into<String>) {
        self.state.write().fail_writes = Some(reason.into());
    }

    pub fn clear_failure(&self) {
        self.state.write().fail_writes = None;
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ============================================================================
// RelationalStore implementation
// ============================================================================

#[async_trait]
impl RelationalStore for MemoryRelationalStore {
    fn backend(&self) -> RelationalBackend {
        RelationalBackend::Memory
    }

    async fn health_check(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

// ============================================================================
// AttributeMetadataSource implementation
// ============================================================================

#[async_trait]
impl AttributeMetadataSource for MemoryRelationalStore {
    async fn entity_columns(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.state.read().entity_columns.clone())
    }

    async fn attributes(&self) -> anyhow::Result<Vec<AttributeMetadata>> {
        Ok(self.state.read().attributes.values().cloned().collect())
    }

    async fn attribute_set_members(
        &self,
    ) -> anyhow::Result<HashMap<AttributeSetId, BTreeSet<AttributeId>>> {
        Ok(self.state.read().set_members.clone())
    }

    async fn stores(&self) -> anyhow::Result<Vec<StoreInfo>> {
        Ok(self.state.read().stores.values().cloned().collect())
    }
}

// ============================================================================
// CatalogPersistence implementation
// ============================================================================

#[async_trait]
impl CatalogPersistence for MemoryRelationalStore {
    async fn save_entity(
        &self,
        row: &EntityRow,
        values: &[AttributeValueWrite],
    ) -> anyhow::Result<()> {
        let mut state = self.state.write();
        state.check_writable()?;

        // Apply to a copy so a failing write leaves nothing behind
        let mut entities = state.entities.clone();
        let merged = match entities.remove(&row.entity_id) {
            Some(mut existing) => {
                existing.attribute_set_id = row.attribute_set_id;
                existing.type_id = row.type_id.clone();
                for (column, value) in &row.fields {
                    existing.fields.insert(column.clone(), value.clone());
                }
                existing
            }
            None => row.clone(),
        };
        entities.insert(row.entity_id, merged);

        let previous_entities = std::mem::replace(&mut state.entities, entities);
        let previous_values = state.values.clone();
        for write in values {
            if let Err(e) = state.apply(write) {
                state.entities = previous_entities;
                state.values = previous_values;
                return Err(e);
            }
        }
        Ok(())
    }

    async fn write_values(&self, values: &[AttributeValueWrite]) -> anyhow::Result<()> {
        let mut state = self.state.write();
        state.check_writable()?;

        let previous_entities = state.entities.clone();
        let previous_values = state.values.clone();
        for write in values {
            if let Err(e) = state.apply(write) {
                state.entities = previous_entities;
                state.values = previous_values;
                return Err(e);
            }
        }
        Ok(())
    }

    async fn delete_entity(&self, entity_id: EntityId) -> anyhow::Result<bool> {
        let mut state = self.state.write();
        state.check_writable()?;

        state.values.retain(|(id, _, _), _| *id != entity_id);
        let value_ids: Vec<i64> = state
            .galleries
            .values()
            .filter(|g| g.entity_id == entity_id)
            .map(|g| g.value_id)
            .collect();
        for value_id in &value_ids {
            state.galleries.remove(value_id);
        }
        state
            .gallery_values
            .retain(|(value_id, _), _| !value_ids.contains(value_id));
        Ok(state.entities.remove(&entity_id).is_some())
    }

    async fn find_entity(&self, entity_id: EntityId) -> anyhow::Result<Option<EntityRow>> {
        Ok(self.state.read().entities.get(&entity_id).cloned())
    }

    async fn select_entity_ids(&self, query: &RelationalQuery) -> anyhow::Result<Vec<EntityId>> {
        let state = self.state.read();
        let restrict: Option<BTreeSet<EntityId>> = query
            .restrict_ids
            .as_ref()
            .map(|ids| ids.iter().copied().collect());

        let mut ids = Vec::new();
        for entity in state.entities.values() {
            if let Some(restrict) = &restrict {
                if !restrict.contains(&entity.entity_id) {
                    continue;
                }
            }
            let mut matched = true;
            for group in &query.groups {
                let mut any = false;
                for part in group {
                    let value = state.effective(entity, &part.attribute, query.store_id);
                    if part.condition.evaluate(value.as_ref())? {
                        any = true;
                        break;
                    }
                }
                if !any {
                    matched = false;
                    break;
                }
            }
            if matched {
                ids.push(entity.entity_id);
            }
        }

        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let limit = query
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);
        Ok(ids.into_iter().skip(offset).take(limit).collect())
    }

    async fn count_by_value(
        &self,
        attribute: &AttributeMetadata,
        store_id: StoreId,
        entity_ids: &[EntityId],
    ) -> anyhow::Result<Vec<(Value, u64)>> {
        let state = self.state.read();
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for id in entity_ids {
            let Some(entity) = state.entities.get(id) else {
                continue;
            };
            let Some(value) = state.effective(entity, attribute, store_id) else {
                continue;
            };
            let text = match value {
                Value::Null => continue,
                other => value_text(&other),
            };
            if text.is_empty() {
                continue;
            }
            *counts.entry(text).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(text, n)| (Value::String(text), n))
            .collect())
    }
}

// ============================================================================
// MigrationSource implementation
// ============================================================================

#[async_trait]
impl MigrationSource for MemoryRelationalStore {
    async fn entities_after(&self, after: EntityId, limit: u64) -> anyhow::Result<Vec<EntityRow>> {
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(self
            .state
            .read()
            .entities
            .range((after.saturating_add(1))..)
            .take(limit)
            .map(|(_, row)| row.clone())
            .collect())
    }

    async fn attribute_values(
        &self,
        store_id: StoreId,
        entity_ids: &[EntityId],
        attributes: &BTreeMap<BackendType, Vec<AttributeId>>,
    ) -> anyhow::Result<Vec<EavValue>> {
        let state = self.state.read();
        let mut values = Vec::new();
        for (backend_type, ids) in attributes {
            if *backend_type == BackendType::Static {
                continue;
            }
            for entity_id in entity_ids {
                for attribute_id in ids {
                    if state.attribute(*attribute_id)?.backend_type != *backend_type {
                        continue;
                    }
                    if let Some(value) = state.values.get(&(*entity_id, *attribute_id, store_id)) {
                        values.push(EavValue {
                            entity_id: *entity_id,
                            attribute_id: *attribute_id,
                            store_id,
                            value: value.clone(),
                        });
                    }
                }
            }
        }
        Ok(values)
    }

    async fn gallery_rows<'a>(
        &'a self,
    ) -> anyhow::Result<BoxStream<'a, anyhow::Result<GalleryRow>>> {
        let rows: Vec<GalleryRow> = self.state.read().galleries.values().cloned().collect();
        Ok(stream::iter(rows.into_iter().map(Ok)).boxed())
    }

    async fn gallery_values(&self, value_id: i64) -> anyhow::Result<Vec<GalleryValueRow>> {
        Ok(self
            .state
            .read()
            .gallery_values
            .range((value_id, StoreId::MIN)..=(value_id, StoreId::MAX))
            .map(|(_, v)| v.clone())
            .collect())
    }

    async fn table_statistics(&self) -> anyhow::Result<Vec<TableStatistic>> {
        let state = self.state.read();
        let mut statistics = vec![TableStatistic {
            table: ENTITY_TABLE.to_string(),
            rows: state.entities.len() as u64,
        }];
        for backend_type in BackendType::EAV {
            let Some(table) = value_table(backend_type) else {
                continue;
            };
            let rows = state
                .values
                .keys()
                .filter(|(_, attribute_id, _)| {
                    state
                        .attributes
                        .get(attribute_id)
                        .is_some_and(|a| a.backend_type == backend_type)
                })
                .count();
            statistics.push(TableStatistic {
                table,
                rows: rows as u64,
            });
        }
        statistics.push(TableStatistic {
            table: GALLERY_TABLE.to_string(),
            rows: state.galleries.len() as u64,
        });
        statistics.push(TableStatistic {
            table: GALLERY_VALUE_TABLE.to_string(),
            rows: state.gallery_values.len() as u64,
        });
        Ok(statistics)
    }

    async fn attribute_ids_by_code(&self, codes: &[String]) -> anyhow::Result<Vec<AttributeId>> {
        let state = self.state.read();
        Ok(state
            .attributes
            .values()
            .filter(|a| codes.contains(&a.code))
            .map(|a| a.attribute_id)
            .collect())
    }

    async fn delete_values_except(&self, keep: &[AttributeId]) -> anyhow::Result<u64> {
        if keep.is_empty() {
            return Err(anyhow::anyhow!(
                "Refusing to delete the values of every attribute"
            ));
        }
        let mut state = self.state.write();
        state.check_writable()?;
        let before = state.values.len();
        state
            .values
            .retain(|(_, attribute_id, _), _| keep.contains(attribute_id));
        Ok((before - state.values.len()) as u64)
    }

    async fn truncate_galleries(&self) -> anyhow::Result<u64> {
        let mut state = self.state.write();
        state.check_writable()?;
        let deleted = state.galleries.len() + state.gallery_values.len();
        state.galleries.clear();
        state.gallery_values.clear();
        Ok(deleted as u64)
    }

    async fn dump_tables(&self) -> anyhow::Result<Vec<TableDump>> {
        let state = self.state.read();
        let mut dumps = Vec::new();
        for backend_type in BackendType::EAV {
            let Some(table) = value_table(backend_type) else {
                continue;
            };
            let rows = state
                .values
                .iter()
                .filter(|((_, attribute_id, _), _)| {
                    state
                        .attributes
                        .get(attribute_id)
                        .is_some_and(|a| a.backend_type == backend_type)
                })
                .map(|((entity_id, attribute_id, store_id), value)| {
                    json!({
                        "attribute_id": attribute_id,
                        "store_id": store_id,
                        "entity_id": entity_id,
                        "value": value,
                    })
                })
                .collect();
            dumps.push(TableDump { table, rows });
        }
        dumps.push(TableDump {
            table: GALLERY_TABLE.to_string(),
            rows: state
                .galleries
                .values()
                .map(|g| {
                    json!({
                        "value_id": g.value_id,
                        "attribute_id": g.attribute_id,
                        "entity_id": g.entity_id,
                        "value": g.file,
                    })
                })
                .collect(),
        });
        dumps.push(TableDump {
            table: GALLERY_VALUE_TABLE.to_string(),
            rows: state
                .gallery_values
                .values()
                .map(|v| {
                    json!({
                        "value_id": v.value_id,
                        "store_id": v.store_id,
                        "label": v.label,
                        "position": v.position,
                        "disabled": i64::from(v.disabled),
                    })
                })
                .collect(),
        });
        Ok(dumps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RelationalCondition;
    use strata_common::{AttributeScope, Condition};

    fn color() -> AttributeMetadata {
        AttributeMetadata::new(92, "color", BackendType::Int, AttributeScope::Store)
    }

    fn store_with_products() -> MemoryRelationalStore {
        let store = MemoryRelationalStore::new();
        store.add_attribute(color());
        for id in [42, 43, 44] {
            store.insert_entity(EntityRow::new(id, 4, "simple"));
        }
        store.insert_value(42, 92, 0, json!(5));
        store.insert_value(43, 92, 0, json!(5));
        store.insert_value(43, 92, 1, json!(7));
        store
    }

    #[tokio::test]
    async fn test_select_uses_store_value_with_default_fallback() {
        let store = store_with_products();
        let query = RelationalQuery::new(1)
            .group(vec![RelationalCondition::new(color(), Condition::Eq(json!(5)))]);
        assert_eq!(store.select_entity_ids(&query).await.unwrap(), vec![42]);

        let query = RelationalQuery::new(0)
            .group(vec![RelationalCondition::new(color(), Condition::Eq(json!(5)))])
            .restrict(vec![43, 44]);
        assert_eq!(store.select_entity_ids(&query).await.unwrap(), vec![43]);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_nothing_behind() {
        let store = store_with_products();
        let sku = AttributeMetadata::new(74, "sku", BackendType::Static, AttributeScope::Global);
        let writes = vec![
            AttributeValueWrite::new(42, color(), 0, json!(9)),
            // entity 99 does not exist
            AttributeValueWrite::new(99, sku, 0, json!("X")),
        ];
        assert!(store.write_values(&writes).await.is_err());
        assert_eq!(store.value(42, 92, 0), Some(json!(5)));

        store.fail_writes_with("connection reset");
        let err = store.write_values(&writes[..1]).await.unwrap_err();
        assert_eq!(err.to_string(), "connection reset");
    }

    #[tokio::test]
    async fn test_count_by_value() {
        let store = store_with_products();
        let counts = store.count_by_value(&color(), 1, &[42, 43, 44]).await.unwrap();
        assert_eq!(counts, vec![(json!("5"), 1), (json!("7"), 1)]);
    }

    #[tokio::test]
    async fn test_entities_after_uses_id_cursor() {
        let store = store_with_products();
        let rows = store.entities_after(42, 10).await.unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.entity_id).collect();
        assert_eq!(ids, vec![43, 44]);
        assert!(store.entities_after(44, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_values_except() {
        let store = store_with_products();
        store.add_attribute(AttributeMetadata::new(
            93,
            "price",
            BackendType::Decimal,
            AttributeScope::Website,
        ));
        store.insert_value(42, 93, 0, json!(9.5));
        assert_eq!(store.delete_values_except(&[93]).await.unwrap(), 3);
        assert_eq!(store.value_count(), 1);
        assert!(store.delete_values_except(&[]).await.is_err());
    }
}
