//! Export of the attribute and gallery tables before migrating

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde_json::{Map, Value};
use strata_persistence::MigrationSource;
use tracing::info;

/// `<dir>/attributes_tables_<dd-mm-YYYY>.json`
pub fn dump_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("attributes_tables_{}.json", date.format("%d-%m-%Y")))
}

/// Write every exported table as one JSON object keyed by table name
pub async fn dump_tables<S>(source: &S, dir: &Path) -> anyhow::Result<PathBuf>
where
    S: MigrationSource + ?Sized,
{
    let path = dump_path(dir, chrono::Local::now().date_naive());
    info!(path = %path.display(), "Dumping attribute values and gallery tables");

    let tables = source.dump_tables().await?;
    let mut out = Map::new();
    let mut rows = 0;
    for table in tables {
        rows += table.rows.len();
        out.insert(table.table, Value::Array(table.rows));
    }

    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(&path, serde_json::to_vec_pretty(&Value::Object(out))?).await?;
    info!(path = %path.display(), rows, "Tables dumped");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strata_common::{AttributeMetadata, AttributeScope, BackendType};
    use strata_persistence::MemoryRelationalStore;

    #[test]
    fn test_dump_path() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(
            dump_path(Path::new("/var/export"), date),
            PathBuf::from("/var/export/attributes_tables_07-03-2024.json")
        );
    }

    #[tokio::test]
    async fn test_dump_writes_every_table() {
        let store = MemoryRelationalStore::new();
        store.add_attribute(AttributeMetadata::new(92, "color", BackendType::Int, AttributeScope::Store));
        store.insert_value(42, 92, 0, json!(5));

        let dir = tempfile::tempdir().unwrap();
        let path = dump_tables(&store, &dir.path().join("export")).await.unwrap();
        let dumped: Value = serde_json::from_slice(&tokio::fs::read(&path).await.unwrap()).unwrap();

        assert_eq!(dumped.as_object().unwrap().len(), 7);
        assert_eq!(
            dumped["catalog_product_entity_int"],
            json!([{"attribute_id": 92, "store_id": 0, "entity_id": 42, "value": 5}])
        );
    }
}
