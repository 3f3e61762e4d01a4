//! Domain model types shared by the relational and document sides

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Stable integer id of a business entity (catalog item)
pub type EntityId = i64;
pub type StoreId = u32;
pub type WebsiteId = u32;
pub type AttributeId = u32;
pub type AttributeSetId = u32;

/// The default store view; fallback source for every other store scope
pub const DEFAULT_STORE_ID: StoreId = 0;

/// The administrative scope. It shares its id with the default store.
pub const ADMIN_STORE_ID: StoreId = 0;

/// Backend type of an attribute, deciding which EAV value table holds it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// Column of the entity's primary table
    Static,
    Int,
    Varchar,
    Text,
    Decimal,
    Datetime,
}

impl BackendType {
    /// Backend types stored in a dedicated EAV value table
    pub const EAV: [BackendType; 5] = [
        BackendType::Int,
        BackendType::Varchar,
        BackendType::Text,
        BackendType::Decimal,
        BackendType::Datetime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendType::Static => "static",
            BackendType::Int => "int",
            BackendType::Varchar => "varchar",
            BackendType::Text => "text",
            BackendType::Decimal => "decimal",
            BackendType::Datetime => "datetime",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, BackendType::Int | BackendType::Decimal)
    }

    /// Suffix of the value table, e.g. `catalog_product_entity_int`
    pub fn value_table(&self, entity_table: &str) -> Option<String> {
        match self {
            BackendType::Static => None,
            other => Some(format!("{}_{}", entity_table, other.as_str())),
        }
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "static" => Ok(BackendType::Static),
            "int" => Ok(BackendType::Int),
            "varchar" => Ok(BackendType::Varchar),
            "text" => Ok(BackendType::Text),
            // float/numeric backends are handled like decimals
            "decimal" | "numeric" | "float" => Ok(BackendType::Decimal),
            "datetime" => Ok(BackendType::Datetime),
            other => Err(format!("unknown backend type '{}'", other)),
        }
    }
}

/// Value scope of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeScope {
    /// One value per store, falling back to the default store
    Store,
    /// One value per website, replicated to each of its stores
    Website,
    /// One value for all stores
    Global,
}

impl AttributeScope {
    /// Decode the relational `is_global` flag (0 = store, 1 = global, 2 = website)
    pub fn from_flag(flag: i16) -> Self {
        match flag {
            1 => AttributeScope::Global,
            2 => AttributeScope::Website,
            _ => AttributeScope::Store,
        }
    }

    pub fn flag(&self) -> i16 {
        match self {
            AttributeScope::Store => 0,
            AttributeScope::Global => 1,
            AttributeScope::Website => 2,
        }
    }
}

/// Attribute definition as configured in the relational store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeMetadata {
    pub attribute_id: AttributeId,
    pub code: String,
    pub backend_type: BackendType,
    pub scope: AttributeScope,
}

impl AttributeMetadata {
    pub fn new(
        attribute_id: AttributeId,
        code: impl Into<String>,
        backend_type: BackendType,
        scope: AttributeScope,
    ) -> Self {
        Self {
            attribute_id,
            code: code.into(),
            backend_type,
            scope,
        }
    }

    pub fn is_global(&self) -> bool {
        self.scope == AttributeScope::Global
    }

    pub fn is_website(&self) -> bool {
        self.scope == AttributeScope::Website
    }
}

/// A store view and the website it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreInfo {
    pub store_id: StoreId,
    pub website_id: WebsiteId,
    pub code: String,
}

impl StoreInfo {
    pub fn new(store_id: StoreId, website_id: WebsiteId, code: impl Into<String>) -> Self {
        Self {
            store_id,
            website_id,
            code: code.into(),
        }
    }
}
