//! The indexed-attribute set
//!
//! Indexed attributes keep their relational rows so existing indexers and
//! reports continue to work. The set is the fixed list below plus every
//! column physically present on the entity's primary table. It is computed
//! once when the catalog loads and never changes for the process lifetime.

use std::collections::BTreeSet;

/// Attribute codes that always stay relational
pub const SPECIAL_INDEXED_ATTRIBUTES: &[&str] = &[
    "visibility",
    "status",
    "price",
    "tax_class_id",
    "name",
    "url_key",
    "url_path",
    "special_price",
    "special_from_date",
    "special_to_date",
    "msrp",
    "price_type",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexedAttributeSet {
    codes: BTreeSet<String>,
    entity_columns: BTreeSet<String>,
}

impl IndexedAttributeSet {
    pub fn from_entity_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entity_columns: BTreeSet<String> = columns.into_iter().map(Into::into).collect();
        let mut codes: BTreeSet<String> = SPECIAL_INDEXED_ATTRIBUTES
            .iter()
            .map(|code| code.to_string())
            .collect();
        codes.extend(entity_columns.iter().cloned());
        Self {
            codes,
            entity_columns,
        }
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains(code)
    }

    pub fn is_entity_column(&self, code: &str) -> bool {
        self.entity_columns.contains(code)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.codes.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Number of indexed attributes expected to live in the EAV value tables.
    ///
    /// Entity columns never have EAV rows, so they are subtracted. Used as the
    /// lower bound of the pre-cleanup safety check.
    pub fn expected_relational_count(&self) -> usize {
        self.codes.len().saturating_sub(self.entity_columns.len())
    }
}
