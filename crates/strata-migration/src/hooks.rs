// Post-migration hooks
// Index rebuilds and cache purges belong to the host application; they are
// registered here and called in registration order once the run is done.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::report::MigrationReport;

#[async_trait]
pub trait MigrationHook: Send + Sync {
    fn name(&self) -> &str;

    /// Called after the last stage; `reindex` reflects the reindex-after flag
    async fn after_migration(&self, report: &MigrationReport, reindex: bool) -> anyhow::Result<()>;
}

/// Logs the final counts
pub struct LoggingMigrationHook;

#[async_trait]
impl MigrationHook for LoggingMigrationHook {
    fn name(&self) -> &str {
        "logging"
    }

    async fn after_migration(&self, report: &MigrationReport, reindex: bool) -> anyhow::Result<()> {
        info!(
            migrated = report.migrated,
            failed = report.failed,
            galleries = report.galleries_migrated,
            reindex,
            "[MigrationHook] migration finished"
        );
        if reindex {
            info!("[MigrationHook] reindex requested, run the host indexers");
        }
        Ok(())
    }
}

/// Run every hook; a failing hook is logged and does not stop the others
pub(crate) async fn run_hooks(hooks: &[std::sync::Arc<dyn MigrationHook>], report: &MigrationReport, reindex: bool) {
    for hook in hooks {
        if let Err(e) = hook.after_migration(report, reindex).await {
            warn!(hook = hook.name(), error = %e, "Post-migration hook failed");
        }
    }
}
