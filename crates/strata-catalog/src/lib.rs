//! Strata Catalog - scoped attribute persistence for catalog entities
//!
//! This crate provides:
//! - The attribute catalog and the indexed/document-only classification
//! - `CatalogEngine`, writing indexed values relationally and every value
//!   to the entity's scoped document
//! - Condition translation and entity collection queries
//! - Facet counts, media galleries, the search feed and bulk import
//! - Catalog event notifications

pub mod attribute;
pub mod collection;
pub mod engine;
pub mod entity;
pub mod event;
pub mod facet;
pub mod gallery;
pub mod import;
pub mod search;
pub mod translate;

pub use attribute::{AttributeCatalog, AttributeClass};
pub use collection::{AttributeFilter, EntityQuery};
pub use engine::{
    AssignedImage, CatalogEngine, CatalogOptions, IMAGE_ATTRIBUTES, SaveOutcome, scope_projection,
};
pub use entity::{CatalogEntity, ChangeSet};
pub use event::{
    CatalogEvent, CatalogEventListener, CatalogEventPublisher, CatalogEventType,
    LoggingCatalogEventListener,
};
pub use facet::{FacetCounts, FacetKey};
pub use gallery::GalleryImageInput;
pub use import::{ImportRow, ImportSummary};
pub use search::SearchableValues;
pub use translate::translate;
