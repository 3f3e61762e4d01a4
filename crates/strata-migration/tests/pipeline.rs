//! Migration runs against the in-memory backends

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};
use strata_common::{
    AttributeMetadata, AttributeScope, BackendType, SPECIAL_INDEXED_ATTRIBUTES, StoreInfo,
    StrataError,
};
use strata_docstore::{Document, DocumentStore, Filter, MemoryDocumentStore, Projection};
use strata_migration::{MigrationHook, MigrationOptions, MigrationPipeline, MigrationReport};
use strata_persistence::{EntityRow, GalleryRow, GalleryValueRow, MemoryRelationalStore};

const COLLECTION: &str = "catalog_product_entity";

fn relational() -> Arc<MemoryRelationalStore> {
    let store = Arc::new(MemoryRelationalStore::new());
    store.add_attribute(AttributeMetadata::new(92, "color", BackendType::Int, AttributeScope::Store));
    store.add_attribute(AttributeMetadata::new(71, "name", BackendType::Varchar, AttributeScope::Store));
    store.add_attribute(AttributeMetadata::new(75, "price", BackendType::Decimal, AttributeScope::Website));
    store.add_attribute(AttributeMetadata::new(77, "media_gallery", BackendType::Varchar, AttributeScope::Store));
    store.add_store(StoreInfo::new(1, 1, "en"));
    store.add_store(StoreInfo::new(2, 1, "fr"));

    store.insert_entity(EntityRow::new(42, 4, "simple").with_field("sku", json!("A-1")));
    store.insert_value(42, 92, 0, json!("5"));
    store.insert_value(42, 92, 1, json!("7"));
    store.insert_value(42, 71, 0, json!("Shirt"));
    store.insert_value(42, 75, 0, json!("12.5000"));
    store.insert_value(42, 71, 2, json!(""));

    store.insert_entity(EntityRow::new(43, 4, "simple").with_field("sku", json!("A-2")));
    store.insert_value(43, 71, 0, json!("Hat"));
    store
}

fn gallery(store: &MemoryRelationalStore) {
    store.insert_gallery(
        GalleryRow {
            value_id: 1429,
            attribute_id: 77,
            entity_id: 1505,
            file: "/p/i/picture_star_1647.jpg".to_string(),
        },
        vec![GalleryValueRow {
            value_id: 1429,
            store_id: 0,
            label: Some("Front".to_string()),
            position: Some(1),
            disabled: false,
        }],
    );
}

async fn document(docs: &MemoryDocumentStore, id: i64) -> Option<Document> {
    docs.find_one(&Filter::id(id), &Projection::All).await.unwrap()
}

fn pipeline(
    relational: Arc<MemoryRelationalStore>,
    docs: Arc<MemoryDocumentStore>,
    options: MigrationOptions,
) -> MigrationPipeline {
    MigrationPipeline::new(relational, docs, options)
}

#[tokio::test]
async fn test_migrates_scoped_documents() {
    let relational = relational();
    let docs = Arc::new(MemoryDocumentStore::new(COLLECTION));
    let report = pipeline(relational, docs.clone(), MigrationOptions::process())
        .run()
        .await
        .unwrap();

    assert_eq!(report.migrated, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(report.last_entity_id, 43);
    assert_eq!(report.entity_total(), 2);

    let doc = document(&docs, 42).await.unwrap();
    assert_eq!(doc["attr_0"]["sku"], json!("A-1"));
    assert_eq!(doc["attr_0"]["color"], json!(5));
    assert_eq!(doc["attr_0"]["price"], json!(12.5));
    assert_eq!(doc["attr_0"]["name"], json!("Shirt"));
    assert_eq!(doc["attr_1"], json!({"color": 7}));
    // empty values are not migrated
    assert!(doc.get("attr_2").is_none());
}

#[tokio::test]
async fn test_rerun_produces_identical_documents() {
    let relational = relational();
    gallery(&relational);
    let docs = Arc::new(MemoryDocumentStore::new(COLLECTION));

    pipeline(relational.clone(), docs.clone(), MigrationOptions::process())
        .run()
        .await
        .unwrap();
    let first = docs.snapshot();

    let report = pipeline(relational, docs.clone(), MigrationOptions::process())
        .run()
        .await
        .unwrap();
    assert_eq!(report.migrated, 2);
    assert_eq!(docs.snapshot(), first);
}

#[tokio::test]
async fn test_gallery_record_not_duplicated() {
    let relational = relational();
    gallery(&relational);
    let docs = Arc::new(MemoryDocumentStore::new(COLLECTION));

    for _ in 0..2 {
        let report = pipeline(relational.clone(), docs.clone(), MigrationOptions::process())
            .run()
            .await
            .unwrap();
        assert_eq!(report.galleries_migrated, 1);
    }

    let doc = document(&docs, 1505).await.unwrap();
    assert_eq!(
        doc["galleries"]["media_gallery"],
        json!([{
            "value_id": "56352739f59643540a3a6e16985f62c7",
            "file": "/p/i/picture_star_1647.jpg",
            "attr_0": {"label": "Front", "position": 1, "disabled": false}
        }])
    );
    assert_eq!(doc["attr_0"], json!({}));
}

#[tokio::test]
async fn test_gallery_of_unknown_attribute_is_counted_as_failed() {
    let relational = relational();
    relational.insert_gallery(
        GalleryRow {
            value_id: 7,
            attribute_id: 999,
            entity_id: 42,
            file: "/a/b/c.jpg".to_string(),
        },
        Vec::new(),
    );
    let docs = Arc::new(MemoryDocumentStore::new(COLLECTION));
    let report = pipeline(relational, docs, MigrationOptions::process())
        .run()
        .await
        .unwrap();
    assert_eq!(report.galleries_migrated, 0);
    assert_eq!(report.galleries_failed, 1);
}

#[tokio::test]
async fn test_invalid_entity_skipped() {
    let relational = relational();
    relational.insert_value(43, 92, 0, json!("n/a"));
    let docs = Arc::new(MemoryDocumentStore::new(COLLECTION));

    let report = pipeline(relational, docs.clone(), MigrationOptions::process())
        .run()
        .await
        .unwrap();

    assert_eq!(report.migrated, 1);
    assert_eq!(report.failed, 1);
    assert!(document(&docs, 42).await.is_some());
    assert!(document(&docs, 43).await.is_none());
}

#[tokio::test]
async fn test_resume_after_entity() {
    let relational = relational();
    let docs = Arc::new(MemoryDocumentStore::new(COLLECTION));
    let options = MigrationOptions {
        start_after: 42,
        chunk_size: 1,
        ..MigrationOptions::process()
    };

    let report = pipeline(relational, docs.clone(), options).run().await.unwrap();
    assert_eq!(report.migrated, 1);
    assert!(document(&docs, 42).await.is_none());
    assert_eq!(document(&docs, 43).await.unwrap()["attr_0"]["name"], json!("Hat"));
}

#[tokio::test]
async fn test_nothing_to_do() {
    let options = MigrationOptions {
        process: false,
        ..Default::default()
    };
    let err = pipeline(relational(), Arc::new(MemoryDocumentStore::new(COLLECTION)), options)
        .run()
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<StrataError>(),
        Some(StrataError::NothingToDo)
    ));
}

#[tokio::test]
async fn test_clean_refuses_incomplete_indexed_set() {
    let relational = relational();
    gallery(&relational);
    let values = relational.value_count();
    let options = MigrationOptions {
        process: false,
        clean: true,
        ..Default::default()
    };

    let err = pipeline(relational.clone(), Arc::new(MemoryDocumentStore::new(COLLECTION)), options)
        .run()
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<StrataError>(),
        Some(StrataError::CleanupSafety { found: 2, expected: 12 })
    ));
    assert_eq!(relational.value_count(), values);
    assert_eq!(relational.gallery_count(), 1);
}

#[tokio::test]
async fn test_clean_keeps_indexed_values() {
    let relational = relational();
    gallery(&relational);
    for (offset, code) in SPECIAL_INDEXED_ATTRIBUTES.iter().enumerate() {
        if *code != "price" && *code != "name" {
            relational.add_attribute(AttributeMetadata::new(
                200 + offset as u32,
                *code,
                BackendType::Varchar,
                AttributeScope::Store,
            ));
        }
    }
    let options = MigrationOptions {
        clean: true,
        ..MigrationOptions::process()
    };

    let report = pipeline(relational.clone(), Arc::new(MemoryDocumentStore::new(COLLECTION)), options)
        .run()
        .await
        .unwrap();

    // color values of entity 42 go, name and price stay
    assert_eq!(relational.value(42, 92, 0), None);
    assert_eq!(relational.value(42, 71, 0), Some(json!("Shirt")));
    assert_eq!(relational.value(42, 75, 0), Some(json!("12.5000")));
    assert_eq!(relational.gallery_count(), 0);
    assert_eq!(report.cleaned_rows, 2 + 2);
}

#[tokio::test]
async fn test_dump_written_before_migration() {
    let dir = tempfile::tempdir().unwrap();
    let options = MigrationOptions {
        dump: true,
        dump_dir: dir.path().to_path_buf(),
        ..MigrationOptions::process()
    };
    let report = pipeline(relational(), Arc::new(MemoryDocumentStore::new(COLLECTION)), options)
        .run()
        .await
        .unwrap();

    let path = report.dump_file.unwrap();
    let dumped: Value = serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
    assert_eq!(dumped["catalog_product_entity_int"].as_array().unwrap().len(), 2);
}

struct RecordingHook {
    calls: Mutex<Vec<(u64, bool)>>,
    fail: bool,
}

#[async_trait]
impl MigrationHook for RecordingHook {
    fn name(&self) -> &str {
        "recording"
    }

    async fn after_migration(&self, report: &MigrationReport, reindex: bool) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push((report.migrated, reindex));
        if self.fail {
            anyhow::bail!("indexer unavailable");
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_hooks_run_after_migration() {
    let failing = Arc::new(RecordingHook {
        calls: Mutex::new(Vec::new()),
        fail: true,
    });
    let recording = Arc::new(RecordingHook {
        calls: Mutex::new(Vec::new()),
        fail: false,
    });
    let options = MigrationOptions {
        reindex_after: true,
        ..MigrationOptions::process()
    };

    pipeline(relational(), Arc::new(MemoryDocumentStore::new(COLLECTION)), options)
        .with_hook(failing.clone())
        .with_hook(recording.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(*failing.calls.lock().unwrap(), vec![(2, true)]);
    assert_eq!(*recording.calls.lock().unwrap(), vec![(2, true)]);
}
