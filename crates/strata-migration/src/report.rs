//! Migration run report

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use strata_persistence::{ENTITY_TABLE, TableStatistic};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    /// Row counts collected before the run
    pub statistics: Vec<TableStatistic>,
    pub dump_file: Option<PathBuf>,
    /// Entity documents written
    pub migrated: u64,
    /// Entities ignored after a validation or write failure
    pub failed: u64,
    /// Highest entity id processed; restart with it as `start_after`
    pub last_entity_id: i64,
    pub galleries_migrated: u64,
    pub galleries_failed: u64,
    /// Relational rows deleted by the clean stage
    pub cleaned_rows: u64,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl MigrationReport {
    /// Number of entities counted before the run
    pub fn entity_total(&self) -> u64 {
        self.statistics
            .iter()
            .find(|s| s.table == ENTITY_TABLE)
            .map(|s| s.rows)
            .unwrap_or(0)
    }
}

/// `HH:MM:SS`
pub fn format_elapsed(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.statistics.is_empty() {
            writeln!(f, "Statistics before migration:")?;
            for statistic in &self.statistics {
                writeln!(f, "  {:<48} {:>12}", statistic.table, statistic.rows)?;
            }
        }
        if let Some(path) = &self.dump_file {
            writeln!(f, "Tables dumped to {}", path.display())?;
        }
        writeln!(
            f,
            "Entities: {} / {} migrated ({} ignored)",
            self.migrated,
            self.entity_total(),
            self.failed
        )?;
        writeln!(
            f,
            "Galleries: {} migrated ({} ignored)",
            self.galleries_migrated, self.galleries_failed
        )?;
        if self.cleaned_rows > 0 {
            writeln!(f, "Relational rows cleaned: {}", self.cleaned_rows)?;
        }
        write!(f, "Total time: {}", format_elapsed(self.elapsed))
    }
}
