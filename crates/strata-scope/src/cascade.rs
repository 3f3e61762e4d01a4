//! The exists-cascade
//!
//! A test on attribute `code` seen from store `S` must hold for the value the
//! read path would return: the store value when present, otherwise the
//! default-store value. As a filter:
//!
//! ```text
//! (present(attr_S.code) AND test(attr_S.code))
//!   OR (absent(attr_S.code) AND present(attr_0.code) AND test(attr_0.code))
//! ```
//!
//! Dropping the guarded second branch silently loses every entity whose
//! value only lives at the default scope.

use serde_json::Value;
use strata_common::{DEFAULT_STORE_ID, StoreId};
use strata_docstore::{FieldOp, Filter};

use crate::key::FieldPath;

/// Field exists with a non-null, non-empty value
pub fn present(path: &FieldPath) -> Filter {
    Filter::and(vec![
        Filter::exists(path.as_str(), true),
        Filter::field(path.as_str(), FieldOp::Nin(vec![Value::Null, Value::from("")])),
    ])
}

/// Field is missing, null or empty
pub fn absent(path: &FieldPath) -> Filter {
    Filter::Or(vec![
        Filter::exists(path.as_str(), false),
        Filter::field(path.as_str(), FieldOp::In(vec![Value::Null, Value::from("")])),
    ])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cascade {
    scoped: FieldPath,
    global: FieldPath,
    store_id: StoreId,
}

impl Cascade {
    pub fn new(store_id: StoreId, code: &str) -> Self {
        Self {
            scoped: FieldPath::attribute(store_id, code),
            global: FieldPath::attribute(DEFAULT_STORE_ID, code),
            store_id,
        }
    }

    pub fn scoped_path(&self) -> &FieldPath {
        &self.scoped
    }

    pub fn global_path(&self) -> &FieldPath {
        &self.global
    }

    fn collapsed(&self) -> bool {
        self.store_id == DEFAULT_STORE_ID
    }

    /// Cascade around `test`, which builds the condition for a given path
    pub fn with_test<F>(&self, test: F) -> Filter
    where
        F: Fn(&FieldPath) -> Filter,
    {
        if self.collapsed() {
            return Filter::and(vec![present(&self.global), test(&self.global)]);
        }
        Filter::Or(vec![
            Filter::and(vec![present(&self.scoped), test(&self.scoped)]),
            Filter::and(vec![
                absent(&self.scoped),
                present(&self.global),
                test(&self.global),
            ]),
        ])
    }

    /// Entities that carry a value at either scope
    pub fn presence(&self) -> Filter {
        if self.collapsed() {
            return present(&self.global);
        }
        Filter::Or(vec![present(&self.scoped), present(&self.global)])
    }
}
