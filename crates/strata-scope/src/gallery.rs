//! Gallery records stored under `galleries.<attributeCode>`
//!
//! ```json
//! {
//!   "value_id": "56352739f59643540a3a6e16985f62c7",
//!   "file": "/p/i/picture_star_1647.jpg",
//!   "attr_0": {"label": "", "position": 1, "disabled": false}
//! }
//! ```
//!
//! `value_id` is a content hash of the relational row id so repeated
//! migrations produce identical records.

use std::collections::BTreeMap;

use md5::{Digest, Md5};
use serde_json::{Map, Value};
use strata_common::{DEFAULT_STORE_ID, StoreId};

use crate::key::ScopeKey;

/// Lowercase hex md5 of `input`
pub fn content_hash(input: &str) -> String {
    const_hex::encode(Md5::digest(input.as_bytes()))
}

/// Presentation values of an image in one store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GalleryScopeValues {
    pub label: Option<String>,
    pub position: Option<i64>,
    pub disabled: bool,
}

impl GalleryScopeValues {
    fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert(
            "label".to_string(),
            self.label.clone().map(Value::String).unwrap_or(Value::Null),
        );
        map.insert(
            "position".to_string(),
            self.position.map(Value::from).unwrap_or(Value::Null),
        );
        map.insert("disabled".to_string(), Value::Bool(self.disabled));
        Value::Object(map)
    }

    fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        let label = map.get("label").and_then(Value::as_str).map(str::to_string);
        let position = map.get("position").and_then(|p| match p {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        });
        let disabled = match map.get("disabled") {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_i64().unwrap_or(0) != 0,
            Some(Value::String(s)) => s != "0" && !s.is_empty(),
            _ => false,
        };
        Some(Self {
            label,
            position,
            disabled,
        })
    }
}

/// Values an image resolves to in a store after fallback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub value_id: String,
    pub file: String,
    pub label: String,
    pub position: i64,
    pub disabled: bool,
    /// Default-store values, shown next to overrides in editors
    pub label_default: String,
    pub position_default: i64,
    pub disabled_default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryRecord {
    pub value_id: String,
    pub file: String,
    pub scopes: BTreeMap<StoreId, GalleryScopeValues>,
}

impl GalleryRecord {
    pub fn new(value_id: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            value_id: value_id.into(),
            file: file.into(),
            scopes: BTreeMap::new(),
        }
    }

    pub fn with_scope(mut self, store_id: StoreId, values: GalleryScopeValues) -> Self {
        self.scopes.insert(store_id, values);
        self
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("value_id".to_string(), Value::String(self.value_id.clone()));
        map.insert("file".to_string(), Value::String(self.file.clone()));
        for (store_id, values) in &self.scopes {
            map.insert(ScopeKey(*store_id).field(), values.to_value());
        }
        Value::Object(map)
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        let file = map.get("file")?.as_str()?.to_string();
        let value_id = match map.get("value_id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => content_hash(&file),
        };
        let scopes = map
            .iter()
            .filter_map(|(key, v)| {
                let scope = key.parse::<ScopeKey>().ok()?;
                Some((scope.store_id(), GalleryScopeValues::from_value(v)?))
            })
            .collect();
        Some(Self {
            value_id,
            file,
            scopes,
        })
    }

    /// Resolve presentation values for `store_id`: each field falls back to
    /// the default store, then to an empty label, position 0 and enabled.
    pub fn resolve(&self, store_id: StoreId) -> ResolvedImage {
        let default = self.scopes.get(&DEFAULT_STORE_ID);
        let scoped = self.scopes.get(&store_id);

        let label_default = default.and_then(|d| d.label.clone()).unwrap_or_default();
        let position_default = default.and_then(|d| d.position).unwrap_or(0);
        let disabled_default = default.map(|d| d.disabled).unwrap_or(false);

        ResolvedImage {
            value_id: self.value_id.clone(),
            file: self.file.clone(),
            label: scoped
                .and_then(|s| s.label.clone())
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| label_default.clone()),
            position: scoped.and_then(|s| s.position).unwrap_or(position_default),
            disabled: scoped.map(|s| s.disabled).unwrap_or(disabled_default),
            label_default,
            position_default,
            disabled_default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_hash() {
        assert_eq!(content_hash("1429"), "56352739f59643540a3a6e16985f62c7");
    }

    #[test]
    fn test_record_value_round_trip() {
        let record = GalleryRecord::new(content_hash("1429"), "/p/i/x.jpg").with_scope(
            0,
            GalleryScopeValues {
                label: None,
                position: Some(1),
                disabled: false,
            },
        );
        let value = record.to_value();
        assert_eq!(
            value,
            json!({
                "value_id": "56352739f59643540a3a6e16985f62c7",
                "file": "/p/i/x.jpg",
                "attr_0": {"label": null, "position": 1, "disabled": false}
            })
        );
        assert_eq!(GalleryRecord::from_value(&value), Some(record));
    }

    #[test]
    fn test_legacy_flags_accepted() {
        let record = GalleryRecord::from_value(&json!({
            "value_id": "abc",
            "file": "/a.jpg",
            "attr_1": {"label": "Front", "position": "3", "disabled": "1"}
        }))
        .unwrap();
        let values = &record.scopes[&1];
        assert_eq!(values.position, Some(3));
        assert!(values.disabled);
    }

    #[test]
    fn test_resolve_falls_back_per_field() {
        let record = GalleryRecord::new("v", "/a.jpg")
            .with_scope(
                0,
                GalleryScopeValues {
                    label: Some("Front".into()),
                    position: Some(2),
                    disabled: false,
                },
            )
            .with_scope(
                1,
                GalleryScopeValues {
                    label: Some(String::new()),
                    position: Some(5),
                    disabled: true,
                },
            );

        let r = record.resolve(1);
        assert_eq!((r.label.as_str(), r.position, r.disabled), ("Front", 5, true));
        let r = record.resolve(2);
        assert_eq!((r.label.as_str(), r.position, r.disabled), ("Front", 2, false));
        let r = GalleryRecord::new("v", "/b.jpg").resolve(2);
        assert_eq!((r.label.as_str(), r.position, r.disabled), ("", 0, false));
    }
}
