//! Strata Persistence - relational store entities and persistence layer
//!
//! This crate provides:
//! - SeaORM entity definitions for the catalog tables
//! - Persistence trait abstractions used by the catalog engine and the migration
//! - An external database backend and an in-memory backend

pub mod entity;
pub mod memory;
pub mod model;
pub mod sql;
pub mod traits;

// Re-export sea-orm for convenience
pub use sea_orm;

// Re-export entity prelude
pub use entity::prelude::*;

// Re-export persistence traits
pub use traits::{AttributeMetadataSource, CatalogPersistence, MigrationSource, RelationalStore};

// Re-export backends
pub use memory::MemoryRelationalStore;
pub use sql::{PRODUCT_ENTITY_TYPE, SqlRelationalStore};

// Re-export model types
pub use model::{
    AttributeValueWrite, DEFAULT_ENTITY_COLUMNS, ENTITY_TABLE, EavValue, EntityRow,
    GALLERY_TABLE, GALLERY_VALUE_TABLE, GalleryRow, GalleryValueRow, RelationalBackend,
    RelationalCondition, RelationalQuery, TableDump, TableStatistic, attribute_tables,
    value_table,
};
