//! Strata Docstore - schemaless document store adapter
//!
//! This crate provides:
//! - The structural filter, update, projection and pipeline model
//! - The `DocumentStore` trait consumed by the catalog and the migration
//! - An in-memory backend and an embedded RocksDB backend
//! - `DocumentAdapter`, which owns connection retry and operation timeouts

pub mod adapter;
pub mod config;
pub mod error;
pub mod eval;
pub mod filter;
pub mod memory;
pub mod pipeline;
pub mod rocks;
mod table;
pub mod traits;
pub mod update;

pub use adapter::{DocumentAdapter, connect_with_retry};
pub use config::{BackendKind, DocumentStoreConfig};
pub use error::DocStoreError;
pub use eval::Document;
pub use filter::{FieldOp, Filter, ID_FIELD, Pattern};
pub use memory::MemoryDocumentStore;
pub use pipeline::{AggregateReply, GroupSpec, Pipeline, Stage};
pub use rocks::RocksDocumentStore;
pub use traits::{DocumentStore, find_by_id, ids_of};
pub use update::{Projection, Update, UpdateOptions, UpdateResult};
