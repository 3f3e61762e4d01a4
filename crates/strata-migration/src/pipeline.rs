//! Migration pipeline
//!
//! Runs the selected stages strictly in sequence:
//! `Dump -> Attributes -> Galleries -> Clean -> Done`.
//! Relational failures abort the run. A single entity or gallery row that
//! cannot be written is logged, counted and skipped.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use strata_common::{AttributeId, EntityId, StrataError};
use strata_docstore::DocumentStore;
use strata_persistence::{EavValue, RelationalStore};
use strata_scope::{ScopedWrite, upsert_fields};
use tracing::{error, info, warn};

use crate::assemble::{EntityDocument, MigrationContext};
use crate::dump::dump_tables;
use crate::gallery::gallery_record;
use crate::hooks::{MigrationHook, run_hooks};
use crate::metrics::{Outcome, record_document, record_gallery};
use crate::options::{MigrationOptions, MigrationStage};
use crate::report::{MigrationReport, format_elapsed};

pub struct MigrationPipeline {
    relational: Arc<dyn RelationalStore>,
    docs: Arc<dyn DocumentStore>,
    options: MigrationOptions,
    hooks: Vec<Arc<dyn MigrationHook>>,
}

impl MigrationPipeline {
    pub fn new(
        relational: Arc<dyn RelationalStore>,
        docs: Arc<dyn DocumentStore>,
        options: MigrationOptions,
    ) -> Self {
        Self {
            relational,
            docs,
            options,
            hooks: Vec::new(),
        }
    }

    pub fn with_hook(mut self, hook: Arc<dyn MigrationHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn options(&self) -> &MigrationOptions {
        &self.options
    }

    /// Run every selected stage
    pub async fn run(&self) -> anyhow::Result<MigrationReport> {
        self.options.validate()?;
        let started = Instant::now();
        let mut report = MigrationReport {
            statistics: self.relational.table_statistics().await?,
            ..Default::default()
        };
        let context = MigrationContext::load(self.relational.as_ref()).await?;

        for stage in self.options.stages() {
            info!(stage = %stage, "Migration stage started");
            match stage {
                MigrationStage::Dump => {
                    report.dump_file =
                        Some(dump_tables(self.relational.as_ref(), &self.options.dump_dir).await?);
                }
                MigrationStage::Attributes => {
                    self.migrate_attributes(&context, &mut report, started).await?;
                }
                MigrationStage::Galleries => {
                    self.migrate_galleries(&context, &mut report, started).await?;
                }
                MigrationStage::Clean => {
                    report.cleaned_rows = self.clean(&context).await?;
                }
                MigrationStage::Done => {
                    report.elapsed = started.elapsed();
                    run_hooks(&self.hooks, &report, self.options.reindex_after).await;
                }
            }
        }

        info!(
            migrated = report.migrated,
            failed = report.failed,
            elapsed = %format_elapsed(report.elapsed),
            "Migration finished"
        );
        Ok(report)
    }

    /// Copy every entity's attribute values into its document, chunk by
    /// chunk along the entity id
    pub async fn migrate_attributes(
        &self,
        context: &MigrationContext,
        report: &mut MigrationReport,
        started: Instant,
    ) -> anyhow::Result<()> {
        let attributes = context.value_attributes();
        let mut cursor: EntityId = self.options.start_after;
        report.last_entity_id = cursor;

        loop {
            let rows = self
                .relational
                .entities_after(cursor, self.options.chunk_size)
                .await?;
            let Some(last) = rows.last() else {
                info!("All entities processed");
                break;
            };
            cursor = last.entity_id;

            let ids: Vec<EntityId> = rows.iter().map(|r| r.entity_id).collect();
            let mut documents: BTreeMap<EntityId, EntityDocument> = rows
                .iter()
                .map(|row| (row.entity_id, EntityDocument::from_row(row)))
                .collect();

            for store_id in context.store_ids() {
                let values: Vec<EavValue> = self
                    .relational
                    .attribute_values(*store_id, &ids, &attributes)
                    .await?;
                for value in &values {
                    if let Some(document) = documents.get_mut(&value.entity_id) {
                        document.add_value(context, value);
                    }
                }
            }

            for document in documents.values() {
                if self.save_document(document).await {
                    report.migrated += 1;
                } else {
                    report.failed += 1;
                }
            }
            report.last_entity_id = cursor;

            info!(
                last_entity_id = cursor,
                "{} / {} entities ({} ignored) | Elapsed time: {}",
                report.migrated,
                report.entity_total(),
                report.failed,
                format_elapsed(started.elapsed())
            );
        }
        Ok(())
    }

    async fn save_document(&self, document: &EntityDocument) -> bool {
        let result = match document.prepare(&self.options.locale) {
            Ok(write) => upsert_fields(self.docs.as_ref(), document.entity_id, write)
                .await
                .map_err(anyhow::Error::from),
            Err(e) => Err(e.into()),
        };
        match result {
            Ok(_) => {
                record_document(Outcome::Migrated);
                true
            }
            Err(e) => {
                warn!(
                    entity_id = document.entity_id,
                    error = %e,
                    payload = %document.to_json(),
                    "Entity ignored"
                );
                record_document(Outcome::Failed);
                false
            }
        }
    }

    /// Append one record per gallery row to its entity's document
    pub async fn migrate_galleries(
        &self,
        context: &MigrationContext,
        report: &mut MigrationReport,
        started: Instant,
    ) -> anyhow::Result<()> {
        let mut rows = self.relational.gallery_rows().await?;
        while let Some(row) = rows.next().await {
            let row = row?;
            let Some(attribute) = context.attribute(row.attribute_id) else {
                warn!(
                    value_id = row.value_id,
                    attribute_id = row.attribute_id,
                    "Gallery row of unknown attribute ignored"
                );
                report.galleries_failed += 1;
                record_gallery(Outcome::Failed);
                continue;
            };
            let values = self.relational.gallery_values(row.value_id).await?;
            let record = gallery_record(&row, &values);

            let mut write = ScopedWrite::new();
            write.add_gallery_record(&attribute.code, record.to_value());
            match upsert_fields(self.docs.as_ref(), row.entity_id, write).await {
                Ok(_) => {
                    report.galleries_migrated += 1;
                    record_gallery(Outcome::Migrated);
                }
                Err(e) => {
                    warn!(
                        entity_id = row.entity_id,
                        value_id = row.value_id,
                        error = %e,
                        "Gallery row ignored"
                    );
                    report.galleries_failed += 1;
                    record_gallery(Outcome::Failed);
                }
            }

            if report.galleries_migrated > 0
                && report.galleries_migrated % self.options.chunk_size == 0
            {
                info!(
                    "{} galleries ({} ignored) | Elapsed time: {}",
                    report.galleries_migrated,
                    report.galleries_failed,
                    format_elapsed(started.elapsed())
                );
            }
        }
        info!(
            migrated = report.galleries_migrated,
            failed = report.galleries_failed,
            "All galleries processed"
        );
        Ok(())
    }

    /// Refuse to clean when fewer attributes would stay relational than the
    /// indexed set requires. Returns the ids to keep.
    pub async fn preflight_check(&self, context: &MigrationContext) -> anyhow::Result<Vec<AttributeId>> {
        let codes: Vec<String> = context.indexed().codes().map(str::to_string).collect();
        let keep = self.relational.attribute_ids_by_code(&codes).await?;
        let expected = context.indexed().expected_relational_count();
        if keep.is_empty() || keep.len() < expected {
            error!(found = keep.len(), expected, "Cleanup pre-flight check failed");
            return Err(StrataError::CleanupSafety {
                found: keep.len(),
                expected,
            }
            .into());
        }
        Ok(keep)
    }

    /// Delete migrated values and empty the gallery tables
    pub async fn clean(&self, context: &MigrationContext) -> anyhow::Result<u64> {
        let keep = self.preflight_check(context).await?;
        info!(kept_attributes = keep.len(), "Cleaning attribute tables");
        let values = self.relational.delete_values_except(&keep).await?;
        info!("Cleaning gallery tables");
        let galleries = self.relational.truncate_galleries().await?;
        info!(values, galleries, "Relational tables cleaned");
        Ok(values + galleries)
    }
}
