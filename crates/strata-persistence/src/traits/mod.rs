//! Persistence traits for the relational store
//!
//! The catalog engine and the migration pipeline depend on the relational
//! store only through these traits. Backends: external database
//! (MySQL/PostgreSQL via SeaORM) and an in-memory store.

pub mod catalog;
pub mod metadata;
pub mod migration;

pub use catalog::CatalogPersistence;
pub use metadata::AttributeMetadataSource;
pub use migration::MigrationSource;

use async_trait::async_trait;

use crate::model::RelationalBackend;

/// Unified relational store trait
#[async_trait]
pub trait RelationalStore:
    AttributeMetadataSource + CatalogPersistence + MigrationSource + Send + Sync
{
    fn backend(&self) -> RelationalBackend;

    /// Health check for the storage backend
    async fn health_check(&self) -> anyhow::Result<()>;
}
