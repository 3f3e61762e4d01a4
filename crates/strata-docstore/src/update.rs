//! Update operators and results

use std::collections::BTreeMap;

use serde_json::{Value, json};

use crate::error::{DocStoreError, Result};

/// Field-level update.
///
/// Each group maps a dotted path to a value. Only named paths are touched,
/// so concurrent updates to disjoint paths of one document never clobber
/// each other.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    pub set: BTreeMap<String, Value>,
    /// Applied only when the update inserts a new document
    pub set_on_insert: BTreeMap<String, Value>,
    /// Appends the value to the array at the path unless an equal element exists
    pub add_to_set: BTreeMap<String, Value>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set.insert(path.into(), value.into());
        self
    }

    pub fn set_on_insert(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_on_insert.insert(path.into(), value.into());
        self
    }

    pub fn add_to_set(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add_to_set.insert(path.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.set_on_insert.is_empty() && self.add_to_set.is_empty()
    }

    pub fn ensure_not_empty(&self) -> Result<()> {
        if self.is_empty() {
            return Err(DocStoreError::EmptyUpdate);
        }
        Ok(())
    }

    pub fn to_json(&self) -> Value {
        let mut out = serde_json::Map::new();
        if !self.set.is_empty() {
            out.insert("$set".to_string(), json!(self.set));
        }
        if !self.set_on_insert.is_empty() {
            out.insert("$setOnInsert".to_string(), json!(self.set_on_insert));
        }
        if !self.add_to_set.is_empty() {
            out.insert("$addToSet".to_string(), json!(self.add_to_set));
        }
        Value::Object(out)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Insert a document when the filter matches none
    pub upsert: bool,
    /// Update every matching document instead of the first
    pub multi: bool,
}

impl UpdateOptions {
    pub fn upsert() -> Self {
        Self {
            upsert: true,
            multi: false,
        }
    }

    pub fn multi() -> Self {
        Self {
            upsert: false,
            multi: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateResult {
    pub matched: u64,
    /// Documents whose content actually changed
    pub modified: u64,
    pub upserted_id: Option<i64>,
}

/// Field projection of `find` results
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Projection {
    #[default]
    All,
    /// Only these dotted paths (plus `_id`)
    Fields(Vec<String>),
}

impl Projection {
    pub fn fields<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Projection::Fields(paths.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_update_rejected() {
        assert!(matches!(
            Update::new().ensure_not_empty(),
            Err(DocStoreError::EmptyUpdate)
        ));
        assert!(Update::new().set("attr_0.color", "red").ensure_not_empty().is_ok());
    }

    #[test]
    fn test_update_json() {
        let u = Update::new()
            .set("attr_1.color", "blue")
            .set_on_insert("attr_0", json!({}));
        assert_eq!(
            u.to_json(),
            json!({"$set": {"attr_1.color": "blue"}, "$setOnInsert": {"attr_0": {}}})
        );
    }
}
