//! Strata Migration - moves attribute values out of the relational store
//!
//! This crate provides:
//! - Optional export of the value and gallery tables before migrating
//! - The attribute phase: one scoped document per entity, written chunk by chunk
//! - The gallery phase: one record per gallery row, de-duplicated on re-runs
//! - Guarded cleanup of the migrated relational rows
//! - Post-migration hooks and a run report

pub mod assemble;
pub mod dump;
pub mod gallery;
pub mod hooks;
pub mod metrics;
pub mod options;
pub mod pipeline;
pub mod report;

pub use assemble::{EntityDocument, MigrationContext};
pub use dump::{dump_path, dump_tables};
pub use gallery::gallery_record;
pub use hooks::{LoggingMigrationHook, MigrationHook};
pub use options::{DEFAULT_CHUNK_SIZE, DEFAULT_DUMP_DIR, MigrationOptions, MigrationStage};
pub use pipeline::MigrationPipeline;
pub use report::{MigrationReport, format_elapsed};
