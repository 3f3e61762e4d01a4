//! Connection lifecycle for the document store.
//!
//! The adapter is built once at startup and shared by every component. It
//! retries connection establishment a fixed number of times without backoff,
//! then wraps each operation in a bounded timeout.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::{BackendKind, DocumentStoreConfig};
use crate::error::{DocStoreError, Result};
use crate::eval::Document;
use crate::filter::Filter;
use crate::memory::MemoryDocumentStore;
use crate::pipeline::{AggregateReply, Pipeline};
use crate::rocks::RocksDocumentStore;
use crate::traits::DocumentStore;
use crate::update::{Projection, Update, UpdateOptions, UpdateResult};

/// Run `connect` up to `attempts` times, returning the first success.
///
/// Configuration errors are not retried.
pub async fn connect_with_retry<T, F, Fut>(attempts: u32, mut connect: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = attempts.max(1);
    let mut last_error = String::new();
    for attempt in 1..=attempts {
        match connect(attempt).await {
            Ok(value) => return Ok(value),
            Err(e @ DocStoreError::Configuration(_)) => return Err(e),
            Err(e) => {
                warn!(attempt, attempts, error = %e, "Document store connection failed");
                last_error = e.to_string();
            }
        }
    }
    Err(DocStoreError::Connection {
        attempts,
        reason: last_error,
    })
}

fn open_backend(config: &DocumentStoreConfig) -> Result<Arc<dyn DocumentStore>> {
    match config.backend {
        BackendKind::Memory => Ok(Arc::new(MemoryDocumentStore::new(&config.collection))),
        BackendKind::RocksDb => {
            let path = config.path.as_ref().ok_or_else(|| {
                DocStoreError::Configuration("docstore.path is required".to_string())
            })?;
            Ok(Arc::new(RocksDocumentStore::open(path, &config.collection)?))
        }
    }
}

pub struct DocumentAdapter {
    inner: Arc<dyn DocumentStore>,
    timeout: Duration,
}

impl DocumentAdapter {
    /// Validate `config` and connect, retrying `connect_retries` times
    pub async fn connect(config: &DocumentStoreConfig) -> Result<Self> {
        config.validate()?;
        let attempts = config.connect_retries.saturating_add(1);
        let timeout = Duration::from_millis(config.operation_timeout_ms);

        let inner = connect_with_retry(attempts, |attempt| async move {
            debug!(attempt, backend = ?config.backend, "Connecting to document store");
            let store = open_backend(config)?;
            store.ping().await?;
            Ok(store)
        })
        .await?;

        info!(
            backend = ?config.backend,
            collection = %config.collection,
            "Document store connected"
        );
        Ok(Self { inner, timeout })
    }

    /// Wrap an already constructed store
    pub fn with_store(inner: Arc<dyn DocumentStore>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn timed<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(DocStoreError::Timeout {
                operation,
                millis: self.timeout.as_millis() as u64,
            }),
        }
    }
}

#[async_trait]
impl DocumentStore for DocumentAdapter {
    fn collection(&self) -> &str {
        self.inner.collection()
    }

    async fn find_one(
        &self,
        filter: &Filter,
        projection: &Projection,
    ) -> Result<Option<Document>> {
        self.timed("find_one", self.inner.find_one(filter, projection))
            .await
    }

    async fn find(
        &self,
        filter: &Filter,
        projection: &Projection,
        limit: Option<usize>,
    ) -> Result<Vec<Document>> {
        debug!(filter = %filter, ?limit, "find");
        self.timed("find", self.inner.find(filter, projection, limit))
            .await
    }

    async fn update(
        &self,
        filter: &Filter,
        update: &Update,
        options: UpdateOptions,
    ) -> Result<UpdateResult> {
        self.timed("update", self.inner.update(filter, update, options))
            .await
    }

    async fn remove(&self, filter: &Filter, just_one: bool) -> Result<u64> {
        self.timed("remove", self.inner.remove(filter, just_one))
            .await
    }

    async fn aggregate(&self, pipeline: &Pipeline) -> Result<AggregateReply> {
        debug!(pipeline = %pipeline.to_json(), "aggregate");
        self.timed("aggregate", self.inner.aggregate(pipeline))
            .await
    }

    async fn count(&self, filter: &Filter) -> Result<u64> {
        self.timed("count", self.inner.count(filter)).await
    }

    async fn ping(&self) -> Result<()> {
        self.timed("ping", self.inner.ping()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retry_until_success() {
        let calls = AtomicU32::new(0);
        let value = connect_with_retry(3, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    Err(DocStoreError::Backend("refused".to_string()))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(value, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_budget_exhausted() {
        let err = connect_with_retry(2, |_| async {
            Err::<(), _>(DocStoreError::Backend("refused".to_string()))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, DocStoreError::Connection { attempts: 2, .. }));
    }

    #[tokio::test]
    async fn test_configuration_error_not_retried() {
        let calls = AtomicU32::new(0);
        let err = connect_with_retry(5, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(DocStoreError::Configuration("bad".to_string())) }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, DocStoreError::Configuration(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_connect_memory_and_rocks() {
        let adapter = DocumentAdapter::connect(&DocumentStoreConfig::memory())
            .await
            .unwrap();
        assert_eq!(adapter.collection(), "catalog_product_entity");
        adapter.ping().await.unwrap();

        let dir = tempfile::TempDir::new().unwrap();
        let adapter = DocumentAdapter::connect(&DocumentStoreConfig::rocksdb(dir.path()))
            .await
            .unwrap();
        adapter
            .update(
                &Filter::id(1),
                &Update::new().set("attr_0.name", "x"),
                UpdateOptions::upsert(),
            )
            .await
            .unwrap();
        assert_eq!(adapter.count(&Filter::All).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_missing_path_is_configuration_error() {
        let err = DocumentAdapter::connect(&DocumentStoreConfig::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, DocStoreError::Configuration(_)));
    }

    struct Stalled;

    #[async_trait]
    impl DocumentStore for Stalled {
        fn collection(&self) -> &str {
            "stalled"
        }
        async fn find_one(&self, _: &Filter, _: &Projection) -> Result<Option<Document>> {
            std::future::pending().await
        }
        async fn find(
            &self,
            _: &Filter,
            _: &Projection,
            _: Option<usize>,
        ) -> Result<Vec<Document>> {
            std::future::pending().await
        }
        async fn update(&self, _: &Filter, _: &Update, _: UpdateOptions) -> Result<UpdateResult> {
            std::future::pending().await
        }
        async fn remove(&self, _: &Filter, _: bool) -> Result<u64> {
            std::future::pending().await
        }
        async fn aggregate(&self, _: &Pipeline) -> Result<AggregateReply> {
            std::future::pending().await
        }
        async fn count(&self, _: &Filter) -> Result<u64> {
            std::future::pending().await
        }
        async fn ping(&self) -> Result<()> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_operations_time_out() {
        let adapter = DocumentAdapter::with_store(Arc::new(Stalled), Duration::from_millis(20));
        let err = adapter.count(&Filter::All).await.unwrap_err();
        assert!(matches!(err, DocStoreError::Timeout { operation: "count", .. }));
    }
}
