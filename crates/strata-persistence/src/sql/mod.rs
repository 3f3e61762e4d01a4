//! SQL-based relational backend (MySQL/PostgreSQL via SeaORM)
//!
//! Metadata and gallery tables are read through SeaORM entities. The five EAV
//! value tables share one shape and are addressed with parameterised raw
//! statements.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use sea_orm::prelude::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    FromQueryResult, QueryFilter, QueryOrder, QuerySelect, Set, Statement, TransactionTrait,
    Value as DbValue,
};
use serde_json::Value;
use strata_common::{
    AttributeId, AttributeMetadata, AttributeScope, AttributeSetId, BackendType, Condition,
    DEFAULT_STORE_ID, EntityId, StoreId, StoreInfo,
};
use tracing::{debug, info, warn};

use crate::entity::{
    catalog_eav_attribute, catalog_product_entity, core_store, eav_attribute,
    eav_entity_attribute, eav_entity_type, media_gallery, media_gallery_value,
};
use crate::model::*;
use crate::traits::*;

/// Entity type code of catalog items in `eav_entity_type`
pub const PRODUCT_ENTITY_TYPE: &str = "catalog_product";

/// External database relational store
pub struct SqlRelationalStore {
    db: DatabaseConnection,
    entity_type_id: i32,
}

impl SqlRelationalStore {
    pub fn new(db: DatabaseConnection, entity_type_id: i32) -> Self {
        Self { db, entity_type_id }
    }

    /// Create the store, resolving the catalog entity type id
    pub async fn open(db: DatabaseConnection) -> anyhow::Result<Self> {
        let entity_type = eav_entity_type::Entity::find()
            .filter(eav_entity_type::Column::EntityTypeCode.eq(PRODUCT_ENTITY_TYPE))
            .one(&db)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Entity type '{}' not found", PRODUCT_ENTITY_TYPE))?;
        debug!(
            entity_type_id = entity_type.entity_type_id,
            "Resolved catalog entity type"
        );
        Ok(Self::new(db, entity_type.entity_type_id))
    }

    /// Get a reference to the underlying database connection
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    fn sql(&self) -> SqlBuilder {
        SqlBuilder::new(self.db.get_database_backend())
    }
}

// ============================================================================
// Statement building
// ============================================================================

/// Raw statement with placeholders matching the connection's backend
struct SqlBuilder {
    backend: DbBackend,
    sql: String,
    values: Vec<DbValue>,
}

impl SqlBuilder {
    fn new(backend: DbBackend) -> Self {
        Self {
            backend,
            sql: String::new(),
            values: Vec::new(),
        }
    }

    fn push(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    fn bind(&mut self, value: impl Into<DbValue>) -> &mut Self {
        self.values.push(value.into());
        match self.backend {
            DbBackend::Postgres => {
                self.sql.push_str(&format!("${}", self.values.len()));
            }
            _ => self.sql.push('?'),
        }
        self
    }

    fn bind_list<I, V>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<DbValue>,
    {
        self.push("(");
        for (i, value) in values.into_iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.bind(value);
        }
        self.push(")")
    }

    fn as_text(&self, expr: &str) -> String {
        match self.backend {
            DbBackend::MySql => format!("CAST({} AS CHAR)", expr),
            _ => format!("CAST({} AS TEXT)", expr),
        }
    }

    fn as_bigint(&self, expr: &str) -> String {
        match self.backend {
            DbBackend::MySql => format!("CAST({} AS SIGNED)", expr),
            _ => format!("CAST({} AS BIGINT)", expr),
        }
    }

    fn build(self) -> Statement {
        Statement::from_sql_and_values(self.backend, self.sql, self.values)
    }
}

fn db_value(value: &Value) -> DbValue {
    match value {
        Value::Null => DbValue::String(None),
        Value::Bool(b) => DbValue::from(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => DbValue::from(i),
            None => DbValue::Double(n.as_f64()),
        },
        Value::String(s) => DbValue::from(s.clone()),
        other => DbValue::from(other.to_string()),
    }
}

/// Only plain lowercase identifiers are spliced into statements
fn checked_column(column: &str) -> anyhow::Result<&str> {
    let valid = !column.is_empty()
        && column
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !column.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(column)
    } else {
        Err(anyhow::anyhow!("Invalid column name '{}'", column))
    }
}

fn eav_table(attribute: &AttributeMetadata) -> anyhow::Result<String> {
    value_table(attribute.backend_type).ok_or_else(|| {
        anyhow::anyhow!("Attribute '{}' has no value table", attribute.code)
    })
}

/// Push the value of `attribute` seen from `store_id`: the store row when
/// one exists, otherwise the default-store row
fn push_effective(
    b: &mut SqlBuilder,
    attribute: &AttributeMetadata,
    store_id: StoreId,
) -> anyhow::Result<()> {
    if attribute.backend_type == BackendType::Static {
        let column = checked_column(&attribute.code)?;
        b.push("e.").push(column);
        return Ok(());
    }
    let table = eav_table(attribute)?;
    let default_row = |b: &mut SqlBuilder| {
        b.push("(SELECT d.value FROM ")
            .push(&table)
            .push(" d WHERE d.entity_id = e.entity_id AND d.attribute_id = ")
            .bind(i64::from(attribute.attribute_id))
            .push(" AND d.store_id = ")
            .bind(i64::from(DEFAULT_STORE_ID))
            .push(")");
    };
    if store_id == DEFAULT_STORE_ID {
        default_row(b);
        return Ok(());
    }
    b.push("COALESCE((SELECT s.value FROM ")
        .push(&table)
        .push(" s WHERE s.entity_id = e.entity_id AND s.attribute_id = ")
        .bind(i64::from(attribute.attribute_id))
        .push(" AND s.store_id = ")
        .bind(i64::from(store_id))
        .push("), ");
    default_row(b);
    b.push(")");
    Ok(())
}

fn push_comparison(
    b: &mut SqlBuilder,
    attribute: &AttributeMetadata,
    store_id: StoreId,
    op: &str,
    literal: &Value,
) -> anyhow::Result<()> {
    push_effective(b, attribute, store_id)?;
    b.push(" ").push(op).push(" ").bind(db_value(literal));
    Ok(())
}

fn push_text(
    b: &mut SqlBuilder,
    attribute: &AttributeMetadata,
    store_id: StoreId,
) -> anyhow::Result<()> {
    let mut inner = SqlBuilder::new(b.backend);
    inner.values = std::mem::take(&mut b.values);
    push_effective(&mut inner, attribute, store_id)?;
    let expr = inner.as_text(&inner.sql);
    b.values = inner.values;
    b.push(&expr);
    Ok(())
}

fn push_condition(
    b: &mut SqlBuilder,
    attribute: &AttributeMetadata,
    store_id: StoreId,
    condition: &Condition,
) -> anyhow::Result<()> {
    match condition {
        Condition::Eq(v) => push_comparison(b, attribute, store_id, "=", v)?,
        Condition::Gt(v) => push_comparison(b, attribute, store_id, ">", v)?,
        Condition::Gteq(v) => push_comparison(b, attribute, store_id, ">=", v)?,
        Condition::Lt(v) => push_comparison(b, attribute, store_id, "<", v)?,
        Condition::Lteq(v) => push_comparison(b, attribute, store_id, "<=", v)?,
        Condition::Neq(v) => {
            b.push("(");
            push_effective(b, attribute, store_id)?;
            b.push(" IS NULL OR ");
            push_comparison(b, attribute, store_id, "<>", v)?;
            b.push(")");
        }
        Condition::Like(pattern) => {
            b.push("LOWER(");
            push_text(b, attribute, store_id)?;
            b.push(") LIKE LOWER(").bind(pattern.clone()).push(")");
        }
        Condition::Range { from, to } => {
            let mut parts = Vec::new();
            if let Some(from) = from {
                parts.push((">=", from));
            }
            if let Some(to) = to {
                parts.push(("<=", to));
            }
            if parts.is_empty() {
                b.push("1 = 1");
            } else {
                b.push("(");
                for (i, (op, literal)) in parts.into_iter().enumerate() {
                    if i > 0 {
                        b.push(" AND ");
                    }
                    push_comparison(b, attribute, store_id, op, literal)?;
                }
                b.push(")");
            }
        }
        Condition::In(list) => {
            if list.is_empty() {
                b.push("1 = 0");
            } else {
                push_effective(b, attribute, store_id)?;
                b.push(" IN ").bind_list(list.iter().map(db_value));
            }
        }
        Condition::Nin(list) => {
            if list.is_empty() {
                b.push("1 = 1");
            } else {
                b.push("(");
                push_effective(b, attribute, store_id)?;
                b.push(" IS NULL OR ");
                push_effective(b, attribute, store_id)?;
                b.push(" NOT IN ").bind_list(list.iter().map(db_value)).push(")");
            }
        }
        Condition::Null => {
            push_effective(b, attribute, store_id)?;
            b.push(" IS NULL");
        }
        Condition::NotNull => {
            push_effective(b, attribute, store_id)?;
            b.push(" IS NOT NULL");
        }
        Condition::Regexp(pattern) => {
            push_text(b, attribute, store_id)?;
            let backend = b.backend;
            match backend {
                DbBackend::MySql => b.push(" REGEXP "),
                _ => b.push(" ~ "),
            };
            b.bind(pattern.clone());
        }
        Condition::FindInSet(v) => {
            let needle = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let backend = b.backend;
            match backend {
                DbBackend::MySql => {
                    b.push("FIND_IN_SET(").bind(needle).push(", ");
                    push_effective(b, attribute, store_id)?;
                    b.push(") > 0");
                }
                _ => {
                    b.bind(needle).push(" = ANY(string_to_array(");
                    push_text(b, attribute, store_id)?;
                    b.push(", ','))");
                }
            }
        }
        Condition::Any(parts) => push_junction(b, attribute, store_id, parts, " OR ", "1 = 0")?,
        Condition::All(parts) => push_junction(b, attribute, store_id, parts, " AND ", "1 = 1")?,
    }
    Ok(())
}

fn push_junction(
    b: &mut SqlBuilder,
    attribute: &AttributeMetadata,
    store_id: StoreId,
    parts: &[Condition],
    joiner: &str,
    empty: &str,
) -> anyhow::Result<()> {
    if parts.is_empty() {
        b.push(empty);
        return Ok(());
    }
    b.push("(");
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            b.push(joiner);
        }
        push_condition(b, attribute, store_id, part)?;
    }
    b.push(")");
    Ok(())
}

fn entity_row_from_json(row: Value) -> anyhow::Result<EntityRow> {
    let fields = match row {
        Value::Object(map) => map,
        other => return Err(anyhow::anyhow!("Unexpected entity row {}", other)),
    };
    let int_field = |name: &str| -> anyhow::Result<i64> {
        match fields.get(name) {
            Some(Value::Number(n)) => n
                .as_i64()
                .ok_or_else(|| anyhow::anyhow!("Column '{}' is not an integer", name)),
            Some(Value::String(s)) => Ok(s.parse()?),
            _ => Err(anyhow::anyhow!("Column '{}' missing from entity row", name)),
        }
    };
    let entity_id = int_field("entity_id")?;
    let attribute_set_id = AttributeSetId::try_from(int_field("attribute_set_id")?)?;
    let type_id = fields
        .get("type_id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Ok(EntityRow {
        entity_id,
        attribute_set_id,
        type_id,
        fields,
    })
}

fn gallery_row(model: media_gallery::Model) -> GalleryRow {
    GalleryRow {
        value_id: model.value_id,
        attribute_id: model.attribute_id as AttributeId,
        entity_id: model.entity_id,
        file: model.value.unwrap_or_default(),
    }
}

async fn write_value<C: ConnectionTrait>(
    conn: &C,
    write: &AttributeValueWrite,
) -> anyhow::Result<()> {
    let backend = conn.get_database_backend();
    let mut b = SqlBuilder::new(backend);
    let attribute = &write.attribute;

    if attribute.backend_type == BackendType::Static {
        let column = checked_column(&attribute.code)?;
        if column == "entity_id" {
            return Err(anyhow::anyhow!("entity_id cannot be written"));
        }
        b.push("UPDATE ")
            .push(ENTITY_TABLE)
            .push(" SET ")
            .push(column)
            .push(" = ")
            .bind(db_value(&write.value))
            .push(" WHERE entity_id = ")
            .bind(write.entity_id);
        conn.execute(b.build()).await?;
        return Ok(());
    }

    let table = eav_table(attribute)?;
    let empty = match &write.value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    };
    if empty {
        b.push("DELETE FROM ")
            .push(&table)
            .push(" WHERE entity_id = ")
            .bind(write.entity_id)
            .push(" AND attribute_id = ")
            .bind(i64::from(attribute.attribute_id))
            .push(" AND store_id = ")
            .bind(i64::from(write.store_id));
        conn.execute(b.build()).await?;
        return Ok(());
    }

    b.push("INSERT INTO ")
        .push(&table)
        .push(" (attribute_id, store_id, entity_id, value) VALUES (")
        .bind(i64::from(attribute.attribute_id))
        .push(", ")
        .bind(i64::from(write.store_id))
        .push(", ")
        .bind(write.entity_id)
        .push(", ")
        .bind(db_value(&write.value))
        .push(")");
    match backend {
        DbBackend::MySql => b.push(" ON DUPLICATE KEY UPDATE value = VALUES(value)"),
        _ => b.push(" ON CONFLICT (entity_id, attribute_id, store_id) DO UPDATE SET value = EXCLUDED.value"),
    };
    conn.execute(b.build()).await?;
    Ok(())
}

async fn write_values_on<C: ConnectionTrait>(
    conn: &C,
    values: &[AttributeValueWrite],
) -> anyhow::Result<()> {
    for write in values {
        write_value(conn, write).await?;
    }
    Ok(())
}

// ============================================================================
// RelationalStore implementation
// ============================================================================

#[async_trait]
impl RelationalStore for SqlRelationalStore {
    fn backend(&self) -> RelationalBackend {
        RelationalBackend::Sql
    }

    async fn health_check(&self) -> anyhow::Result<()> {
        // Execute a simple query to verify connectivity
        catalog_product_entity::Entity::find()
            .select_only()
            .column_as(Expr::cust("1"), "health")
            .into_tuple::<i32>()
            .one(&self.db)
            .await?;
        Ok(())
    }
}

// ============================================================================
// AttributeMetadataSource implementation
// ============================================================================

#[async_trait]
impl AttributeMetadataSource for SqlRelationalStore {
    async fn entity_columns(&self) -> anyhow::Result<Vec<String>> {
        let mut b = self.sql();
        let backend = b.backend;
        b.push("SELECT column_name AS name FROM information_schema.columns WHERE table_schema = ");
        match backend {
            DbBackend::MySql => b.push("DATABASE()"),
            _ => b.push("current_schema()"),
        };
        b.push(" AND table_name = ")
            .bind(ENTITY_TABLE)
            .push(" ORDER BY ordinal_position");

        let rows = self.db.query_all(b.build()).await?;
        let columns = rows
            .iter()
            .map(|row| row.try_get::<String>("", "name"))
            .collect::<Result<Vec<_>, _>>()?;
        if columns.is_empty() {
            warn!(
                table = ENTITY_TABLE,
                "Table description unavailable, using the known column list"
            );
            return Ok(DEFAULT_ENTITY_COLUMNS.iter().map(|c| c.to_string()).collect());
        }
        Ok(columns)
    }

    async fn attributes(&self) -> anyhow::Result<Vec<AttributeMetadata>> {
        let rows = eav_attribute::Entity::find()
            .filter(eav_attribute::Column::EntityTypeId.eq(self.entity_type_id))
            .find_also_related(catalog_eav_attribute::Entity)
            .order_by_asc(eav_attribute::Column::AttributeId)
            .all(&self.db)
            .await?;

        let mut attributes = Vec::with_capacity(rows.len());
        for (attribute, catalog) in rows {
            let backend_type = match attribute.backend_type.parse::<BackendType>() {
                Ok(backend_type) => backend_type,
                Err(reason) => {
                    warn!(attribute = %attribute.attribute_code, %reason, "Skipping attribute");
                    continue;
                }
            };
            let scope = catalog
                .map(|c| AttributeScope::from_flag(c.is_global))
                .unwrap_or(AttributeScope::Global);
            attributes.push(AttributeMetadata::new(
                attribute.attribute_id as AttributeId,
                attribute.attribute_code,
                backend_type,
                scope,
            ));
        }
        Ok(attributes)
    }

    async fn attribute_set_members(
        &self,
    ) -> anyhow::Result<HashMap<AttributeSetId, BTreeSet<AttributeId>>> {
        let rows = eav_entity_attribute::Entity::find()
            .filter(eav_entity_attribute::Column::EntityTypeId.eq(self.entity_type_id))
            .all(&self.db)
            .await?;
        let mut members: HashMap<AttributeSetId, BTreeSet<AttributeId>> = HashMap::new();
        for row in rows {
            members
                .entry(row.attribute_set_id as AttributeSetId)
                .or_default()
                .insert(row.attribute_id as AttributeId);
        }
        Ok(members)
    }

    async fn stores(&self) -> anyhow::Result<Vec<StoreInfo>> {
        let stores = core_store::Entity::find()
            .order_by_asc(core_store::Column::StoreId)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|s| StoreInfo::new(s.store_id as StoreId, s.website_id as u32, s.code))
            .collect();
        Ok(stores)
    }
}

// ============================================================================
// CatalogPersistence implementation
// ============================================================================

#[async_trait]
impl CatalogPersistence for SqlRelationalStore {
    async fn save_entity(
        &self,
        row: &EntityRow,
        values: &[AttributeValueWrite],
    ) -> anyhow::Result<()> {
        let now = chrono::Utc::now().naive_utc();
        let tx = self.db.begin().await?;

        let existing = catalog_product_entity::Entity::find_by_id(row.entity_id)
            .one(&tx)
            .await?;
        match existing {
            Some(entity) => {
                let mut model: catalog_product_entity::ActiveModel = entity.into();
                model.attribute_set_id = Set(row.attribute_set_id as i32);
                model.type_id = Set(row.type_id.clone());
                model.updated_at = Set(Some(now));
                model.update(&tx).await?;
            }
            None => {
                let model = catalog_product_entity::ActiveModel {
                    entity_id: Set(row.entity_id),
                    entity_type_id: Set(self.entity_type_id),
                    attribute_set_id: Set(row.attribute_set_id as i32),
                    type_id: Set(row.type_id.clone()),
                    sku: Set(row.fields.get("sku").and_then(Value::as_str).map(str::to_string)),
                    has_options: Set(0),
                    required_options: Set(0),
                    created_at: Set(Some(now)),
                    updated_at: Set(Some(now)),
                };
                catalog_product_entity::Entity::insert(model).exec(&tx).await?;
            }
        }

        write_values_on(&tx, values).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn write_values(&self, values: &[AttributeValueWrite]) -> anyhow::Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        let tx = self.db.begin().await?;
        write_values_on(&tx, values).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_entity(&self, entity_id: EntityId) -> anyhow::Result<bool> {
        let tx = self.db.begin().await?;
        let backend = tx.get_database_backend();

        for backend_type in BackendType::EAV {
            if let Some(table) = value_table(backend_type) {
                let mut b = SqlBuilder::new(backend);
                b.push("DELETE FROM ")
                    .push(&table)
                    .push(" WHERE entity_id = ")
                    .bind(entity_id);
                tx.execute(b.build()).await?;
            }
        }

        let mut b = SqlBuilder::new(backend);
        b.push("DELETE FROM ")
            .push(GALLERY_VALUE_TABLE)
            .push(" WHERE value_id IN (SELECT value_id FROM ")
            .push(GALLERY_TABLE)
            .push(" WHERE entity_id = ")
            .bind(entity_id)
            .push(")");
        tx.execute(b.build()).await?;

        media_gallery::Entity::delete_many()
            .filter(media_gallery::Column::EntityId.eq(entity_id))
            .exec(&tx)
            .await?;

        let result = catalog_product_entity::Entity::delete_by_id(entity_id)
            .exec(&tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected > 0)
    }

    async fn find_entity(&self, entity_id: EntityId) -> anyhow::Result<Option<EntityRow>> {
        let mut b = self.sql();
        b.push("SELECT * FROM ")
            .push(ENTITY_TABLE)
            .push(" WHERE entity_id = ")
            .bind(entity_id);
        let row = Value::find_by_statement(b.build()).one(&self.db).await?;
        row.map(entity_row_from_json).transpose()
    }

    async fn select_entity_ids(&self, query: &RelationalQuery) -> anyhow::Result<Vec<EntityId>> {
        if query.restrict_ids.as_ref().is_some_and(|ids| ids.is_empty()) {
            return Ok(Vec::new());
        }

        let mut b = self.sql();
        let id_column = b.as_bigint("e.entity_id");
        b.push("SELECT ")
            .push(&id_column)
            .push(" AS entity_id FROM ")
            .push(ENTITY_TABLE)
            .push(" e WHERE 1 = 1");

        for group in &query.groups {
            b.push(" AND (");
            for (i, part) in group.iter().enumerate() {
                if i > 0 {
                    b.push(" OR ");
                }
                push_condition(&mut b, &part.attribute, query.store_id, &part.condition)?;
            }
            b.push(")");
        }
        if let Some(ids) = &query.restrict_ids {
            b.push(" AND e.entity_id IN ").bind_list(ids.iter().copied());
        }
        b.push(" ORDER BY e.entity_id");
        match (query.limit, query.offset) {
            (Some(limit), offset) => {
                b.sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset));
            }
            (None, 0) => {}
            (None, offset) => match self.db.get_database_backend() {
                DbBackend::MySql => {
                    b.sql.push_str(&format!(" LIMIT {} OFFSET {}", u64::MAX, offset));
                }
                _ => {
                    b.sql.push_str(&format!(" OFFSET {}", offset));
                }
            },
        }

        let stmt = b.build();
        debug!(sql = %stmt.sql, "Selecting entity ids");
        let rows = self.db.query_all(stmt).await?;
        let ids = rows
            .iter()
            .map(|row| row.try_get::<i64>("", "entity_id"))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    async fn count_by_value(
        &self,
        attribute: &AttributeMetadata,
        store_id: StoreId,
        entity_ids: &[EntityId],
    ) -> anyhow::Result<Vec<(Value, u64)>> {
        if entity_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut b = self.sql();
        b.push("SELECT t.v AS value, COUNT(*) AS total FROM (SELECT ");
        push_text(&mut b, attribute, store_id)?;
        b.push(" AS v FROM ")
            .push(ENTITY_TABLE)
            .push(" e WHERE e.entity_id IN ")
            .bind_list(entity_ids.iter().copied())
            .push(") t WHERE t.v IS NOT NULL AND t.v <> '' GROUP BY t.v ORDER BY t.v");

        let rows = self.db.query_all(b.build()).await?;
        let mut counts = Vec::with_capacity(rows.len());
        for row in rows {
            let value: String = row.try_get("", "value")?;
            let total: i64 = row.try_get("", "total")?;
            counts.push((Value::String(value), total.max(0) as u64));
        }
        Ok(counts)
    }
}

// ============================================================================
// MigrationSource implementation
// ============================================================================

#[async_trait]
impl MigrationSource for SqlRelationalStore {
    async fn entities_after(&self, after: EntityId, limit: u64) -> anyhow::Result<Vec<EntityRow>> {
        let mut b = self.sql();
        b.push("SELECT * FROM ")
            .push(ENTITY_TABLE)
            .push(" WHERE entity_id > ")
            .bind(after);
        b.sql.push_str(&format!(" ORDER BY entity_id LIMIT {}", limit));

        Value::find_by_statement(b.build())
            .all(&self.db)
            .await?
            .into_iter()
            .map(entity_row_from_json)
            .collect()
    }

    async fn attribute_values(
        &self,
        store_id: StoreId,
        entity_ids: &[EntityId],
        attributes: &BTreeMap<BackendType, Vec<AttributeId>>,
    ) -> anyhow::Result<Vec<EavValue>> {
        if entity_ids.is_empty() {
            return Ok(Vec::new());
        }

        // One statement, one SELECT per backend table
        let mut b = self.sql();
        let entity_column = b.as_bigint("entity_id");
        let attribute_column = b.as_bigint("attribute_id");
        let value_column = b.as_text("value");
        let mut parts = 0;
        for (backend_type, ids) in attributes {
            let Some(table) = value_table(*backend_type) else {
                continue;
            };
            if ids.is_empty() {
                continue;
            }
            if parts > 0 {
                b.push(" UNION ALL ");
            }
            b.sql.push_str(&format!(
                "SELECT {} AS entity_id, {} AS attribute_id, {} AS value FROM {} WHERE store_id = ",
                entity_column, attribute_column, value_column, table
            ));
            b.bind(i64::from(store_id))
                .push(" AND entity_id IN ")
                .bind_list(entity_ids.iter().copied())
                .push(" AND attribute_id IN ")
                .bind_list(ids.iter().map(|id| i64::from(*id)));
            parts += 1;
        }
        if parts == 0 {
            return Ok(Vec::new());
        }

        let rows = self.db.query_all(b.build()).await?;
        let mut values = Vec::with_capacity(rows.len());
        for row in rows {
            let entity_id: i64 = row.try_get("", "entity_id")?;
            let attribute_id: i64 = row.try_get("", "attribute_id")?;
            let value: Option<String> = row.try_get("", "value")?;
            values.push(EavValue {
                entity_id,
                attribute_id: AttributeId::try_from(attribute_id)?,
                store_id,
                value: value.map(Value::String).unwrap_or(Value::Null),
            });
        }
        Ok(values)
    }

    async fn gallery_rows<'a>(
        &'a self,
    ) -> anyhow::Result<BoxStream<'a, anyhow::Result<GalleryRow>>> {
        let stream = media_gallery::Entity::find()
            .order_by_asc(media_gallery::Column::ValueId)
            .stream(&self.db)
            .await?;
        Ok(stream
            .map(|row| row.map(gallery_row).map_err(anyhow::Error::from))
            .boxed())
    }

    async fn gallery_values(&self, value_id: i64) -> anyhow::Result<Vec<GalleryValueRow>> {
        let rows = media_gallery_value::Entity::find()
            .filter(media_gallery_value::Column::ValueId.eq(value_id))
            .order_by_asc(media_gallery_value::Column::StoreId)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|v| GalleryValueRow {
                value_id: v.value_id,
                store_id: v.store_id as StoreId,
                label: v.label,
                position: v.position.map(i64::from),
                disabled: v.disabled != 0,
            })
            .collect();
        Ok(rows)
    }

    async fn table_statistics(&self) -> anyhow::Result<Vec<TableStatistic>> {
        let mut tables = vec![ENTITY_TABLE.to_string()];
        tables.extend(attribute_tables());

        let mut statistics = Vec::with_capacity(tables.len());
        for table in tables {
            let mut b = self.sql();
            b.push("SELECT COUNT(*) AS total FROM ").push(&table);
            let total = match self.db.query_one(b.build()).await? {
                Some(row) => row.try_get::<i64>("", "total")?,
                None => 0,
            };
            statistics.push(TableStatistic {
                table,
                rows: total.max(0) as u64,
            });
        }
        Ok(statistics)
    }

    async fn attribute_ids_by_code(&self, codes: &[String]) -> anyhow::Result<Vec<AttributeId>> {
        if codes.is_empty() {
            return Ok(Vec::new());
        }
        let ids = eav_attribute::Entity::find()
            .filter(eav_attribute::Column::EntityTypeId.eq(self.entity_type_id))
            .filter(eav_attribute::Column::AttributeCode.is_in(codes.iter().cloned()))
            .order_by_asc(eav_attribute::Column::AttributeId)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|a| a.attribute_id as AttributeId)
            .collect();
        Ok(ids)
    }

    async fn delete_values_except(&self, keep: &[AttributeId]) -> anyhow::Result<u64> {
        if keep.is_empty() {
            return Err(anyhow::anyhow!(
                "Refusing to delete the values of every attribute"
            ));
        }
        let tx = self.db.begin().await?;
        let backend = tx.get_database_backend();

        let mut deleted = 0;
        for backend_type in BackendType::EAV {
            let Some(table) = value_table(backend_type) else {
                continue;
            };
            let mut b = SqlBuilder::new(backend);
            b.push("DELETE FROM ")
                .push(&table)
                .push(" WHERE attribute_id NOT IN ")
                .bind_list(keep.iter().map(|id| i64::from(*id)));
            let result = tx.execute(b.build()).await?;
            info!(table = %table, rows = result.rows_affected(), "Deleted migrated values");
            deleted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(deleted)
    }

    async fn truncate_galleries(&self) -> anyhow::Result<u64> {
        let tx = self.db.begin().await?;
        let values = media_gallery_value::Entity::delete_many().exec(&tx).await?;
        let rows = media_gallery::Entity::delete_many().exec(&tx).await?;
        tx.commit().await?;
        Ok(values.rows_affected + rows.rows_affected)
    }

    async fn dump_tables(&self) -> anyhow::Result<Vec<TableDump>> {
        let mut dumps = Vec::new();
        for table in attribute_tables() {
            let mut b = self.sql();
            b.push("SELECT * FROM ").push(&table);
            let rows = Value::find_by_statement(b.build()).all(&self.db).await?;
            debug!(table = %table, rows = rows.len(), "Dumped table");
            dumps.push(TableDump { table, rows });
        }
        Ok(dumps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn color() -> AttributeMetadata {
        AttributeMetadata::new(92, "color", BackendType::Int, AttributeScope::Store)
    }

    #[test]
    fn test_mysql_placeholders() {
        let mut b = SqlBuilder::new(DbBackend::MySql);
        b.push("SELECT 1 WHERE a = ").bind(1i64).push(" AND b IN ").bind_list([2i64, 3]);
        assert_eq!(b.sql, "SELECT 1 WHERE a = ? AND b IN (?, ?)");
        assert_eq!(b.values.len(), 3);
    }

    #[test]
    fn test_postgres_placeholders() {
        let mut b = SqlBuilder::new(DbBackend::Postgres);
        b.push("a = ").bind(1i64).push(" AND b = ").bind("x");
        assert_eq!(b.sql, "a = $1 AND b = $2");
    }

    #[test]
    fn test_effective_value_prefers_store_row() {
        let mut b = SqlBuilder::new(DbBackend::MySql);
        push_condition(&mut b, &color(), 1, &Condition::Eq(json!(5))).unwrap();
        assert!(b.sql.starts_with("COALESCE((SELECT s.value FROM catalog_product_entity_int s"));
        assert!(b.sql.ends_with(" = ?"));
        // attribute, store, attribute, default store, literal
        assert_eq!(b.values.len(), 5);
    }

    #[test]
    fn test_default_store_reads_one_row() {
        let mut b = SqlBuilder::new(DbBackend::MySql);
        push_condition(&mut b, &color(), 0, &Condition::NotNull).unwrap();
        assert!(!b.sql.contains("COALESCE"));
        assert!(b.sql.ends_with("IS NOT NULL"));
    }

    #[test]
    fn test_like_casts_to_text() {
        let mut b = SqlBuilder::new(DbBackend::Postgres);
        push_condition(&mut b, &color(), 0, &Condition::Like("%re%".into())).unwrap();
        assert!(b.sql.starts_with("LOWER(CAST((SELECT d.value"));
        assert!(b.sql.ends_with("LIKE LOWER($3)"));
    }

    #[test]
    fn test_static_column_checked() {
        let sku = AttributeMetadata::new(74, "sku", BackendType::Static, AttributeScope::Global);
        let mut b = SqlBuilder::new(DbBackend::MySql);
        push_condition(&mut b, &sku, 1, &Condition::Eq(json!("A-1"))).unwrap();
        assert_eq!(b.sql, "e.sku = ?");

        let bad = AttributeMetadata::new(1, "sku; DROP", BackendType::Static, AttributeScope::Global);
        assert!(push_condition(&mut b, &bad, 1, &Condition::Null).is_err());
    }

    #[test]
    fn test_entity_row_from_json() {
        let row = entity_row_from_json(json!({
            "entity_id": 42,
            "attribute_set_id": 4,
            "type_id": "simple",
            "sku": "A-1"
        }))
        .unwrap();
        assert_eq!(row.entity_id, 42);
        assert_eq!(row.attribute_set_id, 4);
        assert_eq!(row.fields.get("sku"), Some(&json!("A-1")));
    }
}
