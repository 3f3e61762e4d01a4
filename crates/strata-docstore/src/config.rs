//! Document store settings (`docstore.*`)

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{DocStoreError, Result};

pub const DEFAULT_COLLECTION: &str = "catalog_product_entity";
pub const DEFAULT_CONNECT_RETRIES: u32 = 5;
pub const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    RocksDb,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DocumentStoreConfig {
    pub backend: BackendKind,
    /// Database directory; required for the rocksdb backend
    pub path: Option<PathBuf>,
    pub collection: String,
    /// Extra connection attempts after the first one fails
    pub connect_retries: u32,
    pub operation_timeout_ms: u64,
}

impl Default for DocumentStoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            path: None,
            collection: DEFAULT_COLLECTION.to_string(),
            connect_retries: DEFAULT_CONNECT_RETRIES,
            operation_timeout_ms: DEFAULT_OPERATION_TIMEOUT_MS,
        }
    }
}

impl DocumentStoreConfig {
    pub fn memory() -> Self {
        Self {
            backend: BackendKind::Memory,
            ..Self::default()
        }
    }

    pub fn rocksdb(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendKind::RocksDb,
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Reject settings that can never connect
    pub fn validate(&self) -> Result<()> {
        if self.collection.trim().is_empty() {
            return Err(DocStoreError::Configuration(
                "docstore.collection must not be empty".to_string(),
            ));
        }
        if self.backend == BackendKind::RocksDb && self.path.is_none() {
            return Err(DocStoreError::Configuration(
                "docstore.path is required for the rocksdb backend".to_string(),
            ));
        }
        if self.operation_timeout_ms == 0 {
            return Err(DocStoreError::Configuration(
                "docstore.operation_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = DocumentStoreConfig::default();
        assert_eq!(c.collection, "catalog_product_entity");
        assert_eq!(c.connect_retries, 5);
        assert_eq!(c.operation_timeout_ms, 30_000);
    }

    #[test]
    fn test_validation() {
        assert!(DocumentStoreConfig::memory().validate().is_ok());
        assert!(matches!(
            DocumentStoreConfig::default().validate(),
            Err(DocStoreError::Configuration(_))
        ));
        let mut c = DocumentStoreConfig::rocksdb("/tmp/strata");
        c.collection = " ".to_string();
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let c: DocumentStoreConfig =
            serde_json::from_str(r#"{"backend": "memory", "connect_retries": 2}"#).unwrap();
        assert_eq!(c.backend, BackendKind::Memory);
        assert_eq!(c.connect_retries, 2);
        assert_eq!(c.collection, DEFAULT_COLLECTION);
    }
}
