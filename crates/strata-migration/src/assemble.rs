//! Document assembly for the attribute phase
//!
//! The default scope of a migrated document holds the entity's static columns
//! and its default-store values; every other scope holds only the values
//! stored for that store.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde_json::{Map, Value};
use strata_common::{
    AttributeId, AttributeMetadata, AttributeSetId, BackendType, DEFAULT_STORE_ID, EntityId,
    IndexedAttributeSet, NumberFormat, StoreId, StoreInfo, StrataError, coerce_value,
};
use strata_persistence::{EavValue, EntityRow, RelationalStore};
use strata_scope::{ScopeKey, ScopedWrite, is_present};
use tracing::{debug, info};

/// Attribute metadata, set membership and stores read once per run
#[derive(Debug, Clone, Default)]
pub struct MigrationContext {
    attributes: HashMap<AttributeId, AttributeMetadata>,
    set_members: HashMap<AttributeSetId, BTreeSet<AttributeId>>,
    store_ids: Vec<StoreId>,
    indexed: IndexedAttributeSet,
}

impl MigrationContext {
    pub fn new(
        attributes: Vec<AttributeMetadata>,
        entity_columns: Vec<String>,
        set_members: HashMap<AttributeSetId, BTreeSet<AttributeId>>,
        stores: Vec<StoreInfo>,
    ) -> Self {
        let mut store_ids: Vec<StoreId> = stores.iter().map(|s| s.store_id).collect();
        if !store_ids.contains(&DEFAULT_STORE_ID) {
            store_ids.push(DEFAULT_STORE_ID);
        }
        store_ids.sort_unstable();
        store_ids.dedup();
        Self {
            attributes: attributes.into_iter().map(|a| (a.attribute_id, a)).collect(),
            set_members,
            store_ids,
            indexed: IndexedAttributeSet::from_entity_columns(entity_columns),
        }
    }

    pub async fn load(store: &dyn RelationalStore) -> anyhow::Result<Self> {
        let context = Self::new(
            store.attributes().await?,
            store.entity_columns().await?,
            store.attribute_set_members().await?,
            store.stores().await?,
        );
        info!(
            attributes = context.attributes.len(),
            stores = context.store_ids.len(),
            "Migration context loaded"
        );
        Ok(context)
    }

    /// Store ids ascending; the default store comes first
    pub fn store_ids(&self) -> &[StoreId] {
        &self.store_ids
    }

    pub fn attribute(&self, attribute_id: AttributeId) -> Option<&AttributeMetadata> {
        self.attributes.get(&attribute_id)
    }

    pub fn indexed(&self) -> &IndexedAttributeSet {
        &self.indexed
    }

    /// Ids of the attributes with EAV values, by backend type
    pub fn value_attributes(&self) -> BTreeMap<BackendType, Vec<AttributeId>> {
        let mut out: BTreeMap<BackendType, Vec<AttributeId>> = BTreeMap::new();
        for attribute in self.attributes.values() {
            if attribute.backend_type != BackendType::Static {
                out.entry(attribute.backend_type)
                    .or_default()
                    .push(attribute.attribute_id);
            }
        }
        for ids in out.values_mut() {
            ids.sort_unstable();
        }
        out
    }

    fn in_set(&self, attribute_set_id: AttributeSetId, attribute_id: AttributeId) -> bool {
        self.set_members
            .get(&attribute_set_id)
            .is_none_or(|members| members.contains(&attribute_id))
    }
}

/// Scoped values of one entity, before coercion
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDocument {
    pub entity_id: EntityId,
    attribute_set_id: AttributeSetId,
    scopes: BTreeMap<StoreId, Map<String, Value>>,
    /// Typed values needing coercion, by (store, code)
    typed: BTreeMap<(StoreId, String), BackendType>,
}

impl EntityDocument {
    /// Seed the default scope with the entity's static columns
    pub fn from_row(row: &EntityRow) -> Self {
        let statics: Map<String, Value> = row
            .fields
            .iter()
            .filter(|(_, value)| is_present(value))
            .map(|(column, value)| (column.clone(), value.clone()))
            .collect();
        Self {
            entity_id: row.entity_id,
            attribute_set_id: row.attribute_set_id,
            scopes: BTreeMap::from([(DEFAULT_STORE_ID, statics)]),
            typed: BTreeMap::new(),
        }
    }

    /// Add one stored value. Values of attributes outside the entity's
    /// attribute set and empty values are dropped.
    pub fn add_value(&mut self, context: &MigrationContext, value: &EavValue) {
        let Some(attribute) = context.attribute(value.attribute_id) else {
            return;
        };
        if !context.in_set(self.attribute_set_id, attribute.attribute_id) {
            debug!(
                entity_id = self.entity_id,
                attribute = %attribute.code,
                attribute_set_id = self.attribute_set_id,
                "Dropping value outside the attribute set"
            );
            return;
        }
        if !is_present(&value.value) {
            return;
        }
        self.scopes
            .entry(value.store_id)
            .or_default()
            .insert(attribute.code.clone(), value.value.clone());
        self.typed
            .insert((value.store_id, attribute.code.clone()), attribute.backend_type);
    }

    /// The document as written, for logs
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        for (store_id, values) in &self.scopes {
            out.insert(ScopeKey(*store_id).field(), Value::Object(values.clone()));
        }
        Value::Object(out)
    }

    /// Coerce numeric values and build the field-set write
    pub fn prepare(&self, format: &NumberFormat) -> Result<ScopedWrite, StrataError> {
        let mut write = ScopedWrite::new();
        for (store_id, values) in &self.scopes {
            for (code, value) in values {
                let value = match self.typed.get(&(*store_id, code.clone())) {
                    Some(backend) => coerce_value(code, *backend, value.clone(), format)
                        .map_err(|e| StrataError::InvalidDocument {
                            entity_id: self.entity_id,
                            reason: e.to_string(),
                        })?,
                    None => value.clone(),
                };
                write.set(*store_id, code, value);
            }
        }
        Ok(write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strata_common::AttributeScope;

    fn context() -> MigrationContext {
        MigrationContext::new(
            vec![
                AttributeMetadata::new(92, "color", BackendType::Int, AttributeScope::Store),
                AttributeMetadata::new(75, "price", BackendType::Decimal, AttributeScope::Website),
                AttributeMetadata::new(71, "name", BackendType::Varchar, AttributeScope::Store),
            ],
            vec!["entity_id".into(), "sku".into()],
            HashMap::from([(4, BTreeSet::from([92, 75]))]),
            vec![StoreInfo::new(2, 1, "fr"), StoreInfo::new(1, 1, "en")],
        )
    }

    fn value(attribute_id: AttributeId, store_id: StoreId, value: Value) -> EavValue {
        EavValue {
            entity_id: 42,
            attribute_id,
            store_id,
            value,
        }
    }

    #[test]
    fn test_context_orders_stores() {
        let ctx = context();
        assert_eq!(ctx.store_ids(), &[0, 1, 2]);
        let by_backend = ctx.value_attributes();
        assert_eq!(by_backend[&BackendType::Int], vec![92]);
        assert!(!by_backend.contains_key(&BackendType::Static));
    }

    #[test]
    fn test_assembles_scopes() {
        let ctx = context();
        let row = EntityRow::new(42, 4, "simple").with_field("sku", json!("A-1"));
        let mut doc = EntityDocument::from_row(&row);
        doc.add_value(&ctx, &value(92, 0, json!("5")));
        doc.add_value(&ctx, &value(75, 0, json!("12.5000")));
        doc.add_value(&ctx, &value(92, 1, json!("7")));
        // name is not in attribute set 4
        doc.add_value(&ctx, &value(71, 0, json!("Shirt")));
        doc.add_value(&ctx, &value(75, 2, json!("")));

        assert_eq!(
            doc.to_json(),
            json!({
                "attr_0": {
                    "entity_id": 42, "attribute_set_id": 4, "type_id": "simple",
                    "sku": "A-1", "color": "5", "price": "12.5000"
                },
                "attr_1": {"color": "7"}
            })
        );

        let update = doc.prepare(&NumberFormat::default()).unwrap().into_update();
        assert_eq!(update.set["attr_0.color"], json!(5));
        assert_eq!(update.set["attr_0.price"], json!(12.5));
        assert_eq!(update.set["attr_0.sku"], json!("A-1"));
        assert_eq!(update.set["attr_1.color"], json!(7));
    }

    #[test]
    fn test_bad_number_invalidates_document() {
        let ctx = context();
        let mut doc = EntityDocument::from_row(&EntityRow::new(42, 4, "simple"));
        doc.add_value(&ctx, &value(92, 0, json!("n/a")));
        assert!(matches!(
            doc.prepare(&NumberFormat::default()),
            Err(StrataError::InvalidDocument { entity_id: 42, .. })
        ));
    }
}
