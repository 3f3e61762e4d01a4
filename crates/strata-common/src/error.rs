//! Error types for Strata
//!
//! `StrataError` is raised by the catalog engine, the query translator and the
//! migration pipeline. Trait seams return `anyhow::Result`, so callers recover
//! the typed variant with `downcast_ref::<StrataError>()`.

use crate::model::EntityId;

/// Application-specific error types
#[derive(thiserror::Error, Debug)]
pub enum StrataError {
    /// Missing or malformed settings; fatal at startup and never retried
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The document store could not be reached after the retry budget
    #[error("connectivity error: {0}")]
    Connectivity(String),

    #[error("unsupported filter condition '{condition}' on attribute '{attribute}'")]
    UnsupportedCondition {
        attribute: String,
        condition: String,
    },

    #[error("attribute '{0}' does not exist")]
    UnknownAttribute(String),

    #[error("invalid value {value} for attribute '{attribute}': {reason}")]
    InvalidValue {
        attribute: String,
        value: String,
        reason: String,
    },

    #[error("invalid document for entity {entity_id}: {reason}")]
    InvalidDocument { entity_id: EntityId, reason: String },

    #[error("relational store error: {0}")]
    Relational(String),

    /// Mass update stopped part way through its document writes.
    ///
    /// `applied` attributes are already visible in the document store,
    /// `pending` ones were never written.
    #[error(
        "mass update incomplete: failed on '{failed}' ({reason}); applied {applied:?}, pending {pending:?}"
    )]
    MassUpdateIncomplete {
        applied: Vec<String>,
        failed: String,
        pending: Vec<String>,
        reason: String,
    },

    #[error(
        "refusing to clean attribute tables: {found} attributes would stay relational, expected at least {expected}"
    )]
    CleanupSafety { found: usize, expected: usize },

    #[error("nothing to do: select at least one of dump, process or clean")]
    NothingToDo,
}

impl StrataError {
    pub fn unsupported(attribute: impl Into<String>, condition: impl Into<String>) -> Self {
        Self::UnsupportedCondition {
            attribute: attribute.into(),
            condition: condition.into(),
        }
    }

    /// Whether the error should stop the whole process rather than one request
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::Connectivity(_) | Self::CleanupSafety { .. }
        )
    }
}
