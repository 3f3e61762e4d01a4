//! Media gallery read and write
//!
//! Images of a gallery attribute live in the entity document as an array of
//! records under `galleries.<code>`, each with per-store presentation values.

use serde::Deserialize;
use strata_common::{DEFAULT_STORE_ID, EntityId, StoreId};
use strata_docstore::{Projection, find_by_id};
use strata_scope::{
    FieldPath, GalleryRecord, GalleryScopeValues, ResolvedImage, ScopedDocument, ScopedWrite,
    content_hash, upsert_fields,
};
use tracing::debug;

use crate::engine::{CatalogEngine, doc_error};

/// An image as submitted by an editor
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GalleryImageInput {
    /// Identifier of an existing record; new images have none
    pub value_id: Option<String>,
    pub file: String,
    pub label: Option<String>,
    pub position: Option<i64>,
    pub disabled: bool,
    pub removed: bool,
}

impl GalleryImageInput {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            ..Default::default()
        }
    }

    fn scope_values(&self) -> GalleryScopeValues {
        GalleryScopeValues {
            label: self.label.clone(),
            position: self.position,
            disabled: self.disabled,
        }
    }
}

impl CatalogEngine {
    async fn gallery_records(&self, entity_id: EntityId, code: &str) -> anyhow::Result<Vec<GalleryRecord>> {
        let projection = Projection::fields([FieldPath::gallery(code).into_string()]);
        let document = find_by_id(self.docs(), entity_id, &projection)
            .await
            .map_err(doc_error)?;
        Ok(document
            .map(|doc| ScopedDocument::new(doc).gallery(code))
            .unwrap_or_default())
    }

    /// Images of a gallery attribute resolved for `store_id`, by position
    pub async fn load_gallery(
        &self,
        entity_id: EntityId,
        code: &str,
        store_id: StoreId,
    ) -> anyhow::Result<Vec<ResolvedImage>> {
        let mut images: Vec<ResolvedImage> = self
            .gallery_records(entity_id, code)
            .await?
            .iter()
            .map(|record| record.resolve(store_id))
            .collect();
        images.sort_by_key(|image| image.position);
        Ok(images)
    }

    /// Replace the gallery of an attribute with the submitted images.
    ///
    /// Removed images are dropped. Submitted values are written to the
    /// `store_id` scope of their record; values of other stores are kept and
    /// a record without default-scope values gets the submitted ones there
    /// too. Records are stored sorted by their position in `store_id`.
    pub async fn save_gallery(
        &self,
        entity_id: EntityId,
        code: &str,
        store_id: StoreId,
        images: &[GalleryImageInput],
    ) -> anyhow::Result<Vec<GalleryRecord>> {
        let existing = self.gallery_records(entity_id, code).await?;

        let mut records: Vec<GalleryRecord> = Vec::new();
        for image in images.iter().filter(|image| !image.removed) {
            if records.iter().any(|r| r.file == image.file) {
                continue;
            }
            let found = existing.iter().find(|record| match &image.value_id {
                Some(value_id) => record.value_id == *value_id,
                None => record.file == image.file,
            });
            let mut record = match found {
                Some(record) => record.clone(),
                None => GalleryRecord::new(content_hash(&image.file), image.file.clone()),
            };
            let values = image.scope_values();
            if store_id != DEFAULT_STORE_ID && !record.scopes.contains_key(&DEFAULT_STORE_ID) {
                record.scopes.insert(DEFAULT_STORE_ID, values.clone());
            }
            record.scopes.insert(store_id, values);
            records.push(record);
        }
        records.sort_by_key(|record| record.resolve(store_id).position);

        let mut write = ScopedWrite::new();
        write.set_gallery(code, records.iter().map(GalleryRecord::to_value).collect());
        upsert_fields(self.docs(), entity_id, write)
            .await
            .map_err(doc_error)?;

        debug!(
            entity_id,
            attribute = code,
            store_id,
            images = records.len(),
            removed = existing.len().saturating_sub(records.len()),
            "Gallery saved"
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use strata_docstore::MemoryDocumentStore;
    use strata_persistence::MemoryRelationalStore;

    use crate::engine::CatalogOptions;

    async fn engine() -> CatalogEngine {
        CatalogEngine::load(
            Arc::new(MemoryRelationalStore::new()),
            Arc::new(MemoryDocumentStore::new("catalog_product_entity")),
            CatalogOptions::default(),
        )
        .await
        .unwrap()
    }

    fn image(file: &str, label: &str, position: i64) -> GalleryImageInput {
        GalleryImageInput {
            label: Some(label.to_string()),
            position: Some(position),
            ..GalleryImageInput::new(file)
        }
    }

    #[tokio::test]
    async fn test_save_then_load_sorted() {
        let engine = engine().await;
        engine
            .save_gallery(
                42,
                "media_gallery",
                0,
                &[image("/b.jpg", "Back", 2), image("/a.jpg", "Front", 1)],
            )
            .await
            .unwrap();

        let images = engine.load_gallery(42, "media_gallery", 3).await.unwrap();
        let files: Vec<_> = images.iter().map(|i| i.file.as_str()).collect();
        assert_eq!(files, vec!["/a.jpg", "/b.jpg"]);
        assert_eq!(images[0].label, "Front");
        assert_eq!(images[0].value_id, content_hash("/a.jpg"));
    }

    #[tokio::test]
    async fn test_store_values_preserve_other_scopes() {
        let engine = engine().await;
        engine
            .save_gallery(42, "media_gallery", 0, &[image("/a.jpg", "Front", 1)])
            .await
            .unwrap();
        let records = engine
            .save_gallery(42, "media_gallery", 1, &[image("/a.jpg", "Vorne", 4)])
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].scopes[&0].label.as_deref(), Some("Front"));

        let store1 = engine.load_gallery(42, "media_gallery", 1).await.unwrap();
        assert_eq!((store1[0].label.as_str(), store1[0].position), ("Vorne", 4));
        let store2 = engine.load_gallery(42, "media_gallery", 2).await.unwrap();
        assert_eq!((store2[0].label.as_str(), store2[0].position), ("Front", 1));
    }

    #[tokio::test]
    async fn test_removed_images_dropped() {
        let engine = engine().await;
        engine
            .save_gallery(
                42,
                "media_gallery",
                0,
                &[image("/a.jpg", "", 1), image("/b.jpg", "", 2)],
            )
            .await
            .unwrap();
        let removed = GalleryImageInput {
            removed: true,
            ..image("/a.jpg", "", 1)
        };
        engine
            .save_gallery(42, "media_gallery", 0, &[removed, image("/b.jpg", "", 2)])
            .await
            .unwrap();
        let images = engine.load_gallery(42, "media_gallery", 0).await.unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].file, "/b.jpg");
    }

    #[tokio::test]
    async fn test_new_store_image_seeds_default_scope() {
        let engine = engine().await;
        let records = engine
            .save_gallery(42, "media_gallery", 2, &[image("/a.jpg", "Side", 3)])
            .await
            .unwrap();
        assert_eq!(records[0].scopes[&0].label.as_deref(), Some("Side"));
        assert_eq!(records[0].scopes[&2].position, Some(3));
    }
}
