//! Strata Scope - the scoped attribute document model
//!
//! This crate provides:
//! - The scope key codec (`attr_<storeId>.<code>`, `galleries.<code>`)
//! - `ScopedDocument`, a typed read view with store-to-default fallback
//! - `ScopedWrite`, the field-set upsert used by every write path
//! - The exists-cascade filter builder
//! - Gallery record encoding and content hashing

pub mod cascade;
pub mod document;
pub mod gallery;
pub mod key;
pub mod write;

pub use cascade::{Cascade, absent, present};
pub use document::{ScopedDocument, is_present};
pub use gallery::{GalleryRecord, GalleryScopeValues, ResolvedImage, content_hash};
pub use key::{FieldPath, GALLERIES_FIELD, SCOPE_PREFIX, ScopeKey, field_path, scope_key};
pub use write::{ScopedWrite, upsert_fields};
