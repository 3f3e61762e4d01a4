//! Scope key codec
//!
//! Every store scope of an entity document lives under `attr_<storeId>`, and
//! gallery records under `galleries.<attributeCode>`. Writes, reads, filters
//! and the migration all build paths through this module.

use std::fmt;
use std::str::FromStr;

use strata_common::{DEFAULT_STORE_ID, StoreId};

pub const SCOPE_PREFIX: &str = "attr_";
pub const GALLERIES_FIELD: &str = "galleries";

/// Top-level document key holding one store's attribute values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeKey(pub StoreId);

impl ScopeKey {
    pub const DEFAULT: ScopeKey = ScopeKey(DEFAULT_STORE_ID);

    pub fn store_id(&self) -> StoreId {
        self.0
    }

    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_STORE_ID
    }

    pub fn field(&self) -> String {
        format!("{}{}", SCOPE_PREFIX, self.0)
    }

    pub fn attribute(&self, code: &str) -> FieldPath {
        FieldPath(format!("{}{}.{}", SCOPE_PREFIX, self.0, code))
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", SCOPE_PREFIX, self.0)
    }
}

impl FromStr for ScopeKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix(SCOPE_PREFIX)
            .and_then(|id| id.parse::<StoreId>().ok())
            .map(ScopeKey)
            .ok_or_else(|| format!("'{}' is not a scope key", s))
    }
}

impl From<StoreId> for ScopeKey {
    fn from(store_id: StoreId) -> Self {
        ScopeKey(store_id)
    }
}

/// Dotted path of one value inside an entity document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath(String);

impl FieldPath {
    pub fn attribute(store_id: StoreId, code: &str) -> Self {
        ScopeKey(store_id).attribute(code)
    }

    pub fn gallery(code: &str) -> Self {
        FieldPath(format!("{}.{}", GALLERIES_FIELD, code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FieldPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.0
    }
}

pub fn scope_key(store_id: StoreId) -> String {
    ScopeKey(store_id).field()
}

pub fn field_path(store_id: StoreId, code: &str) -> String {
    FieldPath::attribute(store_id, code).into_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_paths() {
        assert_eq!(scope_key(0), "attr_0");
        assert_eq!(field_path(3, "color"), "attr_3.color");
        assert_eq!(FieldPath::gallery("media_gallery").as_str(), "galleries.media_gallery");
        assert!(ScopeKey::DEFAULT.is_default());
    }

    #[test]
    fn test_parse_rejects_foreign_keys() {
        assert!("galleries".parse::<ScopeKey>().is_err());
        assert!("attr_x".parse::<ScopeKey>().is_err());
        assert!("_id".parse::<ScopeKey>().is_err());
    }

    proptest! {
        #[test]
        fn prop_scope_key_round_trip(store in any::<u32>()) {
            let key = ScopeKey(store);
            prop_assert_eq!(key.field().parse::<ScopeKey>(), Ok(key));
            prop_assert_eq!(key.to_string(), scope_key(store));
        }

        #[test]
        fn prop_field_path_prefix(store in 0u32..1000, code in "[a-z_]{1,20}") {
            let path = field_path(store, &code);
            let (scope, attribute) = path.split_once('.').unwrap();
            prop_assert_eq!(scope.parse::<ScopeKey>(), Ok(ScopeKey(store)));
            prop_assert_eq!(attribute, code.as_str());
        }
    }
}
