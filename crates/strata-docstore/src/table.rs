//! Collection operations shared by the embedded backends.
//!
//! A backend only provides keyed get/put/delete and an ordered scan; the
//! query, update and aggregation semantics are implemented here once.

use parking_lot::MutexGuard;

use crate::error::Result;
use crate::eval::{self, Document};
use crate::filter::{FieldOp, Filter, ID_FIELD};
use crate::pipeline::{AggregateReply, Pipeline, Stage};
use crate::update::{Projection, Update, UpdateOptions, UpdateResult};

pub(crate) trait DocumentTable: Send + Sync {
    fn get(&self, id: i64) -> Result<Option<Document>>;

    fn put(&self, id: i64, doc: &Document) -> Result<()>;

    fn delete(&self, id: i64) -> Result<bool>;

    /// Every document, ordered by `_id`
    fn scan(&self) -> Result<Vec<Document>>;

    /// Serializes read-modify-write sequences
    fn write_lock(&self) -> MutexGuard<'_, ()>;
}

/// Ids a filter pins through `_id` equality or membership
fn pinned_ids(filter: &Filter) -> Option<Vec<i64>> {
    match filter {
        Filter::Field { path, op } if path == ID_FIELD => match op {
            FieldOp::Eq(v) => Some(v.as_i64().into_iter().collect()),
            FieldOp::In(values) => {
                let mut ids: Vec<i64> = values.iter().filter_map(|v| v.as_i64()).collect();
                ids.sort_unstable();
                ids.dedup();
                Some(ids)
            }
            _ => None,
        },
        Filter::And(items) => items.iter().find_map(pinned_ids),
        _ => None,
    }
}

fn matching<T: DocumentTable + ?Sized>(table: &T, filter: &Filter) -> Result<Vec<Document>> {
    let candidates = match pinned_ids(filter) {
        Some(ids) => {
            let mut docs = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(doc) = table.get(id)? {
                    docs.push(doc);
                }
            }
            docs
        }
        None => table.scan()?,
    };
    Ok(candidates
        .into_iter()
        .filter(|doc| eval::matches(doc, filter))
        .collect())
}

pub(crate) fn find<T: DocumentTable + ?Sized>(
    table: &T,
    filter: &Filter,
    projection: &Projection,
    limit: Option<usize>,
) -> Result<Vec<Document>> {
    let mut docs = matching(table, filter)?;
    if let Some(limit) = limit {
        docs.truncate(limit);
    }
    Ok(docs
        .iter()
        .map(|doc| eval::project(doc, projection))
        .collect())
}

pub(crate) fn find_one<T: DocumentTable + ?Sized>(
    table: &T,
    filter: &Filter,
    projection: &Projection,
) -> Result<Option<Document>> {
    Ok(find(table, filter, projection, Some(1))?.into_iter().next())
}

pub(crate) fn update<T: DocumentTable + ?Sized>(
    table: &T,
    filter: &Filter,
    update: &Update,
    options: UpdateOptions,
) -> Result<UpdateResult> {
    update.ensure_not_empty()?;
    let _guard = table.write_lock();

    let mut docs = matching(table, filter)?;
    if !options.multi {
        docs.truncate(1);
    }

    if docs.is_empty() {
        if !options.upsert {
            return Ok(UpdateResult::default());
        }
        let mut doc = eval::seed_document(filter)?;
        eval::apply_update(&mut doc, update, true)?;
        let id = eval::document_id(&doc)?;
        table.put(id, &doc)?;
        return Ok(UpdateResult {
            matched: 0,
            modified: 0,
            upserted_id: Some(id),
        });
    }

    let mut result = UpdateResult::default();
    for mut doc in docs {
        result.matched += 1;
        if eval::apply_update(&mut doc, update, false)? {
            table.put(eval::document_id(&doc)?, &doc)?;
            result.modified += 1;
        }
    }
    Ok(result)
}

pub(crate) fn remove<T: DocumentTable + ?Sized>(
    table: &T,
    filter: &Filter,
    just_one: bool,
) -> Result<u64> {
    let _guard = table.write_lock();
    let mut docs = matching(table, filter)?;
    if just_one {
        docs.truncate(1);
    }
    let mut removed = 0;
    for doc in &docs {
        if table.delete(eval::document_id(doc)?)? {
            removed += 1;
        }
    }
    Ok(removed)
}

pub(crate) fn aggregate<T: DocumentTable + ?Sized>(
    table: &T,
    pipeline: &Pipeline,
) -> Result<AggregateReply> {
    // a leading match narrows the scan the same way `find` does
    let (docs, rest) = match pipeline.stages.split_first() {
        Some((Stage::Match(filter), rest)) => (matching(table, filter)?, rest.to_vec()),
        _ => (table.scan()?, pipeline.stages.clone()),
    };
    let remaining = Pipeline { stages: rest };
    Ok(AggregateReply::ok(eval::run_pipeline(docs, &remaining)))
}

pub(crate) fn count<T: DocumentTable + ?Sized>(table: &T, filter: &Filter) -> Result<u64> {
    Ok(matching(table, filter)?.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pinned_ids() {
        assert_eq!(pinned_ids(&Filter::id(4)), Some(vec![4]));
        assert_eq!(pinned_ids(&Filter::ids([3, 1, 3])), Some(vec![1, 3]));
        assert_eq!(
            pinned_ids(&Filter::and(vec![
                Filter::exists("attr_0", true),
                Filter::ids([9])
            ])),
            Some(vec![9])
        );
        assert_eq!(pinned_ids(&Filter::eq("attr_0.color", json!("red"))), None);
        assert_eq!(pinned_ids(&Filter::or(vec![Filter::id(1), Filter::id(2)])), None);
    }
}
