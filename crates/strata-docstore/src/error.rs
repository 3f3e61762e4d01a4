//! Document store errors

/// Errors raised by document store backends and the adapter
#[derive(thiserror::Error, Debug)]
pub enum DocStoreError {
    #[error("document store configuration error: {0}")]
    Configuration(String),

    #[error("could not connect to document store after {attempts} attempts: {reason}")]
    Connection { attempts: u32, reason: String },

    #[error("document store operation '{operation}' timed out after {millis}ms")]
    Timeout { operation: &'static str, millis: u64 },

    #[error("document store backend error: {0}")]
    Backend(String),

    /// A dotted path crosses a non-object value
    #[error("cannot traverse '{path}': '{segment}' is not an object")]
    InvalidPath { path: String, segment: String },

    #[error("invalid regular expression '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("update has no operators")]
    EmptyUpdate,

    #[error("document has no integer _id")]
    MissingId,

    #[error("document codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl DocStoreError {
    /// Errors worth retrying at connection time
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Backend(_) | Self::Timeout { .. })
    }
}

impl From<rocksdb::Error> for DocStoreError {
    fn from(e: rocksdb::Error) -> Self {
        Self::Backend(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DocStoreError>;
