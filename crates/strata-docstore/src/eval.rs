//! Filter evaluation, update application, projection and grouping over JSON
//! documents. Backends only store and fetch documents; everything that
//! interprets them lives here so every backend behaves the same.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::{DocStoreError, Result};
use crate::filter::{FieldOp, Filter, ID_FIELD};
use crate::pipeline::{GroupSpec, Pipeline, Stage};
use crate::update::{Projection, Update};

pub type Document = Map<String, Value>;

/// Value at a dotted path, if every segment resolves through objects
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = doc.get(first)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

pub fn document_id(doc: &Document) -> Result<i64> {
    doc.get(ID_FIELD)
        .and_then(Value::as_i64)
        .ok_or(DocStoreError::MissingId)
}

// ============================================================================
// Matching
// ============================================================================

pub fn matches(doc: &Document, filter: &Filter) -> bool {
    match filter {
        Filter::All => true,
        Filter::And(items) => items.iter().all(|f| matches(doc, f)),
        Filter::Or(items) => items.iter().any(|f| matches(doc, f)),
        Filter::Field { path, op } => field_matches(lookup(doc, path), op),
    }
}

fn field_matches(value: Option<&Value>, op: &FieldOp) -> bool {
    match op {
        FieldOp::Exists(expected) => value.is_some() == *expected,
        FieldOp::Eq(lit) => equals_or_contains(value, lit),
        FieldOp::Ne(lit) => !equals_or_contains(value, lit),
        FieldOp::In(list) => list.iter().any(|lit| equals_or_contains(value, lit)),
        FieldOp::Nin(list) => !list.iter().any(|lit| equals_or_contains(value, lit)),
        FieldOp::Gt(lit) => any_element(value, |v| compare(v, lit) == Some(Ordering::Greater)),
        FieldOp::Gte(lit) => any_element(value, |v| {
            matches!(compare(v, lit), Some(Ordering::Greater | Ordering::Equal))
        }),
        FieldOp::Lt(lit) => any_element(value, |v| compare(v, lit) == Some(Ordering::Less)),
        FieldOp::Lte(lit) => any_element(value, |v| {
            matches!(compare(v, lit), Some(Ordering::Less | Ordering::Equal))
        }),
        FieldOp::Regex(pattern) => {
            any_element(value, |v| v.as_str().is_some_and(|s| pattern.is_match(s)))
        }
    }
}

// A null literal also matches a missing field.
fn equals_or_contains(value: Option<&Value>, lit: &Value) -> bool {
    match value {
        None => lit.is_null(),
        Some(v) if values_equal(v, lit) => true,
        Some(Value::Array(items)) => items.iter().any(|item| values_equal(item, lit)),
        Some(_) => false,
    }
}

fn any_element(value: Option<&Value>, test: impl Fn(&Value) -> bool) -> bool {
    match value {
        None => false,
        Some(Value::Array(items)) => items.iter().any(&test),
        Some(v) => test(v),
    }
}

/// Structural equality treating `1` and `1.0` as equal
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

/// Ordering between values of the same kind; mixed kinds never compare
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

// ============================================================================
// Updates
// ============================================================================

/// Apply `update` in place and report whether the document changed.
///
/// `inserting` enables the `set_on_insert` group.
pub fn apply_update(doc: &mut Document, update: &Update, inserting: bool) -> Result<bool> {
    let mut changed = false;
    for (path, value) in &update.set {
        changed |= set_path(doc, path, value.clone())?;
    }
    if inserting {
        for (path, value) in &update.set_on_insert {
            changed |= set_path(doc, path, value.clone())?;
        }
    }
    for (path, value) in &update.add_to_set {
        changed |= add_to_set(doc, path, value.clone())?;
    }
    Ok(changed)
}

/// Parent object of the last path segment, creating missing objects on the way
fn parent_mut<'a>(doc: &'a mut Document, path: &str) -> Result<(&'a mut Document, String)> {
    let segments: Vec<&str> = path.split('.').collect();
    let (last, parents) = match segments.split_last() {
        Some((last, parents)) if !last.is_empty() => (*last, parents),
        _ => {
            return Err(DocStoreError::InvalidPath {
                path: path.to_string(),
                segment: String::new(),
            });
        }
    };
    let mut current = doc;
    for segment in parents {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        current = match entry {
            Value::Object(map) => map,
            _ => {
                return Err(DocStoreError::InvalidPath {
                    path: path.to_string(),
                    segment: segment.to_string(),
                });
            }
        };
    }
    Ok((current, last.to_string()))
}

fn set_path(doc: &mut Document, path: &str, value: Value) -> Result<bool> {
    let (parent, key) = parent_mut(doc, path)?;
    let changed = parent.get(&key) != Some(&value);
    parent.insert(key, value);
    Ok(changed)
}

fn add_to_set(doc: &mut Document, path: &str, value: Value) -> Result<bool> {
    let (parent, key) = parent_mut(doc, path)?;
    match parent.get_mut(&key) {
        None => {
            parent.insert(key, Value::Array(vec![value]));
            Ok(true)
        }
        Some(Value::Array(items)) => {
            if items.iter().any(|item| values_equal(item, &value)) {
                Ok(false)
            } else {
                items.push(value);
                Ok(true)
            }
        }
        Some(_) => Err(DocStoreError::InvalidPath {
            path: path.to_string(),
            segment: key,
        }),
    }
}

/// New document for an upsert, carrying the id pinned by the filter
pub fn seed_document(filter: &Filter) -> Result<Document> {
    let id = filter.id_equality().ok_or(DocStoreError::MissingId)?;
    let mut doc = Map::new();
    doc.insert(ID_FIELD.to_string(), Value::from(id));
    Ok(doc)
}

// ============================================================================
// Projection and aggregation
// ============================================================================

pub fn project(doc: &Document, projection: &Projection) -> Document {
    let Projection::Fields(paths) = projection else {
        return doc.clone();
    };
    let mut out = Map::new();
    if let Some(id) = doc.get(ID_FIELD) {
        out.insert(ID_FIELD.to_string(), id.clone());
    }
    for path in paths {
        if let Some(value) = lookup(doc, path) {
            // paths were just resolved through objects, so this cannot fail
            if let Ok((parent, key)) = parent_mut(&mut out, path) {
                parent.insert(key, value.clone());
            }
        }
    }
    out
}

pub fn run_pipeline(docs: Vec<Document>, pipeline: &Pipeline) -> Vec<Value> {
    let mut rows = docs;
    for stage in &pipeline.stages {
        rows = match stage {
            Stage::Match(filter) => rows.into_iter().filter(|d| matches(d, filter)).collect(),
            Stage::Group(spec) => group(&rows, spec),
        };
    }
    rows.into_iter().map(Value::Object).collect()
}

fn group(rows: &[Document], spec: &GroupSpec) -> Vec<Document> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(Map<String, Value>, u64)> = Vec::new();

    for row in rows {
        let mut key = Map::new();
        for (name, path) in &spec.keys {
            key.insert(name.clone(), lookup(row, path).cloned().unwrap_or(Value::Null));
        }
        let fingerprint = Value::Object(key.clone()).to_string();
        match positions.get(&fingerprint) {
            Some(&index) => groups[index].1 += 1,
            None => {
                positions.insert(fingerprint, groups.len());
                groups.push((key, 1));
            }
        }
    }

    groups
        .into_iter()
        .map(|(key, total)| {
            let mut out = Map::new();
            out.insert(ID_FIELD.to_string(), Value::Object(key));
            out.insert(spec.total_field.clone(), Value::from(total));
            out
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Pattern;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_lookup_dotted() {
        let d = doc(json!({"_id": 1, "attr_0": {"color": "red"}}));
        assert_eq!(lookup(&d, "attr_0.color"), Some(&json!("red")));
        assert_eq!(lookup(&d, "attr_1.color"), None);
        assert_eq!(lookup(&d, "attr_0.color.shade"), None);
    }

    #[test]
    fn test_missing_field_semantics() {
        let d = doc(json!({"_id": 1, "attr_0": {"color": null}}));
        assert!(matches(&d, &Filter::exists("attr_0.color", true)));
        assert!(matches(&d, &Filter::exists("attr_1.color", false)));
        assert!(matches(&d, &Filter::field("attr_1.color", FieldOp::Ne(json!("red")))));
        assert!(matches(
            &d,
            &Filter::field("attr_1.color", FieldOp::Nin(vec![json!("red")]))
        ));
        assert!(matches(
            &d,
            &Filter::field("attr_1.color", FieldOp::In(vec![Value::Null]))
        ));
        assert!(!matches(&d, &Filter::field("attr_1.size", FieldOp::Gt(json!(0)))));
    }

    #[test]
    fn test_comparisons_by_kind() {
        let d = doc(json!({"_id": 1, "qty": 10, "sku": "B-2"}));
        assert!(matches(&d, &Filter::field("qty", FieldOp::Gte(json!(10.0)))));
        assert!(!matches(&d, &Filter::field("qty", FieldOp::Gt(json!("5")))));
        assert!(matches(&d, &Filter::field("sku", FieldOp::Lt(json!("C")))));
        assert!(matches(&d, &Filter::eq("qty", 10.0)));
    }

    #[test]
    fn test_regex_and_arrays() {
        let d = doc(json!({"_id": 1, "tags": ["Red", "blue"]}));
        let p = Pattern::new("^red$", true).unwrap();
        assert!(matches(&d, &Filter::field("tags", FieldOp::Regex(p))));
        assert!(matches(&d, &Filter::eq("tags", "blue")));
    }

    #[test]
    fn test_set_creates_intermediate_objects() {
        let mut d = doc(json!({"_id": 1}));
        let u = Update::new().set("attr_2.color", "green");
        assert!(apply_update(&mut d, &u, false).unwrap());
        assert_eq!(d["attr_2"]["color"], json!("green"));
        // same value again is not a modification
        assert!(!apply_update(&mut d, &u, false).unwrap());
    }

    #[test]
    fn test_set_through_scalar_fails() {
        let mut d = doc(json!({"_id": 1, "attr_0": "oops"}));
        let err = apply_update(&mut d, &Update::new().set("attr_0.color", "x"), false).unwrap_err();
        assert!(matches!(err, DocStoreError::InvalidPath { segment, .. } if segment == "attr_0"));
    }

    #[test]
    fn test_set_on_insert_only_on_insert() {
        let mut d = doc(json!({"_id": 1, "attr_0": {"color": "red"}}));
        let u = Update::new()
            .set("attr_1.color", "blue")
            .set_on_insert("attr_0", json!({}));
        apply_update(&mut d, &u, false).unwrap();
        assert_eq!(d["attr_0"]["color"], json!("red"));

        let mut fresh = doc(json!({"_id": 2}));
        apply_update(&mut fresh, &u, true).unwrap();
        assert_eq!(fresh["attr_0"], json!({}));
    }

    #[test]
    fn test_add_to_set_dedups_by_equality() {
        let mut d = doc(json!({"_id": 1}));
        let record = json!({"value_id": "a", "file": "/x.jpg"});
        let u = Update::new().add_to_set("galleries.media_gallery", record.clone());
        assert!(apply_update(&mut d, &u, false).unwrap());
        assert!(!apply_update(&mut d, &u, false).unwrap());
        assert_eq!(d["galleries"]["media_gallery"], json!([record]));
    }

    #[test]
    fn test_projection() {
        let d = doc(json!({"_id": 7, "attr_0": {"a": 1}, "attr_1": {"a": 2}, "attr_2": {"a": 3}}));
        let p = project(&d, &Projection::fields(["attr_0", "attr_2.a", "attr_9"]));
        assert_eq!(
            Value::Object(p),
            json!({"_id": 7, "attr_0": {"a": 1}, "attr_2": {"a": 3}})
        );
    }

    #[test]
    fn test_group_counts_with_null_keys() {
        let docs = vec![
            doc(json!({"_id": 1, "attr_0": {"color": "red"}})),
            doc(json!({"_id": 2, "attr_0": {"color": "red"}})),
            doc(json!({"_id": 3, "attr_1": {"color": "blue"}})),
        ];
        let pipeline = Pipeline::new().group(
            GroupSpec::new("total")
                .key("scoped", "attr_1.color")
                .key("global", "attr_0.color"),
        );
        let rows = run_pipeline(docs, &pipeline);
        assert_eq!(rows.len(), 2);
        assert!(rows.contains(&json!({"_id": {"scoped": null, "global": "red"}, "total": 2})));
        assert!(rows.contains(&json!({"_id": {"scoped": "blue", "global": null}, "total": 1})));
    }
}
