//! Gallery record conversion

use strata_persistence::{GalleryRow, GalleryValueRow};
use strata_scope::{GalleryRecord, GalleryScopeValues, content_hash};

/// Record for one gallery row, identified by the hash of the row id so a
/// re-run produces an identical record
pub fn gallery_record(row: &GalleryRow, values: &[GalleryValueRow]) -> GalleryRecord {
    values.iter().fold(
        GalleryRecord::new(content_hash(&row.value_id.to_string()), row.file.clone()),
        |record, value| {
            record.with_scope(
                value.store_id,
                GalleryScopeValues {
                    label: value.label.clone(),
                    position: value.position,
                    disabled: value.disabled,
                },
            )
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_from_rows() {
        let row = GalleryRow {
            value_id: 1429,
            attribute_id: 77,
            entity_id: 1505,
            file: "/p/i/picture_star_1647.jpg".to_string(),
        };
        let values = vec![
            GalleryValueRow {
                value_id: 1429,
                store_id: 0,
                label: None,
                position: Some(1),
                disabled: false,
            },
            GalleryValueRow {
                value_id: 1429,
                store_id: 1,
                label: Some(String::new()),
                position: Some(1),
                disabled: false,
            },
        ];
        assert_eq!(
            gallery_record(&row, &values).to_value(),
            json!({
                "value_id": "56352739f59643540a3a6e16985f62c7",
                "file": "/p/i/picture_star_1647.jpg",
                "attr_0": {"label": null, "position": 1, "disabled": false},
                "attr_1": {"label": "", "position": 1, "disabled": false}
            })
        );
    }
}
