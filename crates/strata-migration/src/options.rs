//! Migration options and stages

use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;
use strata_common::{EntityId, NumberFormat, StrataError};

pub const DEFAULT_CHUNK_SIZE: u64 = 100;
pub const DEFAULT_DUMP_DIR: &str = "var/export";

/// Which stages to run and how
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MigrationOptions {
    /// Export the attribute tables before migrating
    pub dump: bool,
    /// Run the attribute and gallery phases
    pub process: bool,
    /// Delete migrated relational rows afterwards
    pub clean: bool,
    /// Ask post-migration hooks to rebuild indexes
    pub reindex_after: bool,
    /// Entities per chunk of the attribute phase
    pub chunk_size: u64,
    /// Resume after this entity id
    pub start_after: EntityId,
    pub dump_dir: PathBuf,
    /// Separators of decimal values stored as text
    pub locale: NumberFormat,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            dump: false,
            process: false,
            clean: false,
            reindex_after: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            start_after: 0,
            dump_dir: PathBuf::from(DEFAULT_DUMP_DIR),
            locale: NumberFormat::default(),
        }
    }
}

impl MigrationOptions {
    /// Options running the migration stage only
    pub fn process() -> Self {
        Self {
            process: true,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), StrataError> {
        if !self.dump && !self.process && !self.clean {
            return Err(StrataError::NothingToDo);
        }
        if self.chunk_size == 0 {
            return Err(StrataError::Configuration(
                "migration.chunk_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Stages in execution order
    pub fn stages(&self) -> Vec<MigrationStage> {
        let mut stages = Vec::new();
        if self.dump {
            stages.push(MigrationStage::Dump);
        }
        if self.process {
            stages.push(MigrationStage::Attributes);
            stages.push(MigrationStage::Galleries);
        }
        if self.clean {
            stages.push(MigrationStage::Clean);
        }
        stages.push(MigrationStage::Done);
        stages
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MigrationStage {
    Dump,
    Attributes,
    Galleries,
    Clean,
    Done,
}

impl fmt::Display for MigrationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationStage::Dump => write!(f, "DUMP"),
            MigrationStage::Attributes => write!(f, "MIGRATE_ATTRIBUTES"),
            MigrationStage::Galleries => write!(f, "MIGRATE_GALLERIES"),
            MigrationStage::Clean => write!(f, "CLEAN"),
            MigrationStage::Done => write!(f, "DONE"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        let options = MigrationOptions {
            dump: true,
            process: true,
            clean: true,
            ..Default::default()
        };
        assert_eq!(
            options.stages(),
            vec![
                MigrationStage::Dump,
                MigrationStage::Attributes,
                MigrationStage::Galleries,
                MigrationStage::Clean,
                MigrationStage::Done
            ]
        );
        assert_eq!(
            MigrationOptions::process().stages(),
            vec![
                MigrationStage::Attributes,
                MigrationStage::Galleries,
                MigrationStage::Done
            ]
        );
    }

    #[test]
    fn test_validate() {
        assert!(matches!(
            MigrationOptions::default().validate(),
            Err(StrataError::NothingToDo)
        ));
        let options = MigrationOptions {
            chunk_size: 0,
            ..MigrationOptions::process()
        };
        assert!(matches!(
            options.validate(),
            Err(StrataError::Configuration(_))
        ));
    }
}
