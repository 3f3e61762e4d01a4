//! Strata Common - shared types for the hybrid attribute store
//!
//! This crate provides:
//! - Identifier aliases and attribute metadata shared by every layer
//! - The attribute `Condition` model used by both query paths
//! - The indexed-attribute set (attributes kept in relational tables)
//! - Locale-aware numeric coercion for numeric backend types
//! - `StrataError`, the typed error taxonomy

pub mod coerce;
pub mod condition;
pub mod error;
pub mod indexed;
pub mod model;

pub use coerce::{NumberFormat, coerce_value};
pub use condition::Condition;
pub use error::StrataError;
pub use indexed::{IndexedAttributeSet, SPECIAL_INDEXED_ATTRIBUTES};
pub use model::{
    ADMIN_STORE_ID, AttributeId, AttributeMetadata, AttributeScope, AttributeSetId, BackendType,
    DEFAULT_STORE_ID, EntityId, StoreId, StoreInfo, WebsiteId,
};
