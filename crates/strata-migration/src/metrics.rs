// Migration metrics
// Counters for migrated and ignored documents and gallery records

use metrics::{counter, describe_counter};

pub const DOCUMENTS_TOTAL: &str = "strata_migration_documents_total";
pub const GALLERIES_TOTAL: &str = "strata_migration_galleries_total";

/// Outcome label of a migrated record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Migrated,
    Failed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Migrated => "migrated",
            Outcome::Failed => "failed",
        }
    }
}

/// Initialize metric descriptions
/// Should be called once at application startup
pub fn init_metrics() {
    describe_counter!(
        DOCUMENTS_TOTAL,
        "Total number of entity documents processed by the migration"
    );
    describe_counter!(
        GALLERIES_TOTAL,
        "Total number of gallery rows processed by the migration"
    );
}

pub fn record_document(outcome: Outcome) {
    counter!(DOCUMENTS_TOTAL, "outcome" => outcome.as_str()).increment(1);
}

pub fn record_gallery(outcome: Outcome) {
    counter!(GALLERIES_TOTAL, "outcome" => outcome.as_str()).increment(1);
}
