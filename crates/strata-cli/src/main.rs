//! `strata-migrate`: dump, migrate and clean the catalog attribute tables

mod config;
mod logging;

use std::sync::Arc;

use clap::{CommandFactory, Parser};
use strata_common::StrataError;
use strata_docstore::DocumentAdapter;
use strata_migration::{LoggingMigrationHook, MigrationPipeline};
use strata_persistence::{RelationalStore, SqlRelationalStore};
use tracing::{error, info};

use crate::config::{Cli, Configuration};
use crate::logging::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let configuration = Configuration::load(&cli)?;
    let _guard = init_logging(&configuration.logging())
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    let options = configuration.migration_options(&cli)?;
    if let Err(e) = options.validate() {
        if matches!(e, StrataError::NothingToDo) {
            Cli::command().print_help()?;
        }
        return Err(e.into());
    }
    strata_migration::metrics::init_metrics();

    // Connections are established before any document is written
    let db = configuration.database_connection().await?;
    let relational = Arc::new(SqlRelationalStore::open(db).await?);
    relational.health_check().await?;
    let docs = Arc::new(DocumentAdapter::connect(&configuration.docstore()?).await?);

    info!(stages = ?options.stages(), "Starting migration");
    let pipeline = MigrationPipeline::new(relational, docs, options)
        .with_hook(Arc::new(LoggingMigrationHook));
    match pipeline.run().await {
        Ok(report) => {
            println!("{}", report);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Migration aborted");
            Err(e)
        }
    }
}
