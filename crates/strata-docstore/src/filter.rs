//! Structural document filters
//!
//! Filters compose with `And`/`Or` and test dotted field paths with
//! comparison, membership, existence and regex operators. They render to the
//! familiar `{"$and": [...]}` JSON form for logging.

use std::fmt;

use serde_json::{Value, json};

use crate::error::{DocStoreError, Result};

/// Name of the identifier field of every document
pub const ID_FIELD: &str = "_id";

/// Compiled regular expression with its source kept for comparison and display
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    case_insensitive: bool,
    regex: regex::Regex,
}

impl Pattern {
    pub fn new(source: impl Into<String>, case_insensitive: bool) -> Result<Self> {
        let source = source.into();
        let regex = regex::RegexBuilder::new(&source)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| DocStoreError::InvalidPattern {
                pattern: source.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            source,
            case_insensitive,
            regex,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.case_insensitive == other.case_insensitive
    }
}

/// Test applied to the value at one path
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    Eq(Value),
    /// Also matches documents where the field is missing
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    /// Also matches documents where the field is missing
    Nin(Vec<Value>),
    /// `true` matches any stored value, including an explicit null
    Exists(bool),
    Regex(Pattern),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every document
    All,
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Field { path: String, op: FieldOp },
}

impl Filter {
    pub fn field(path: impl Into<String>, op: FieldOp) -> Self {
        Filter::Field {
            path: path.into(),
            op,
        }
    }

    pub fn eq(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(path, FieldOp::Eq(value.into()))
    }

    pub fn exists(path: impl Into<String>, exists: bool) -> Self {
        Self::field(path, FieldOp::Exists(exists))
    }

    pub fn id(id: i64) -> Self {
        Self::eq(ID_FIELD, id)
    }

    pub fn ids<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = i64>,
    {
        Self::field(
            ID_FIELD,
            FieldOp::In(ids.into_iter().map(Value::from).collect()),
        )
    }

    /// Conjunction that drops `All` members and unwraps single members
    pub fn and(filters: Vec<Filter>) -> Self {
        let mut filters: Vec<Filter> = filters
            .into_iter()
            .filter(|f| !matches!(f, Filter::All))
            .collect();
        match filters.len() {
            0 => Filter::All,
            1 => filters.remove(0),
            _ => Filter::And(filters),
        }
    }

    pub fn or(mut filters: Vec<Filter>) -> Self {
        if filters.len() == 1 {
            return filters.remove(0);
        }
        Filter::Or(filters)
    }

    /// The id this filter pins by equality, used to seed upserted documents
    pub fn id_equality(&self) -> Option<i64> {
        match self {
            Filter::Field { path, op: FieldOp::Eq(v) } if path == ID_FIELD => v.as_i64(),
            Filter::And(items) => items.iter().find_map(Filter::id_equality),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Filter::All => json!({}),
            Filter::And(items) => json!({ "$and": items.iter().map(Filter::to_json).collect::<Vec<_>>() }),
            Filter::Or(items) => json!({ "$or": items.iter().map(Filter::to_json).collect::<Vec<_>>() }),
            Filter::Field { path, op } => {
                let test = match op {
                    FieldOp::Eq(v) => json!({ "$eq": v }),
                    FieldOp::Ne(v) => json!({ "$ne": v }),
                    FieldOp::Gt(v) => json!({ "$gt": v }),
                    FieldOp::Gte(v) => json!({ "$gte": v }),
                    FieldOp::Lt(v) => json!({ "$lt": v }),
                    FieldOp::Lte(v) => json!({ "$lte": v }),
                    FieldOp::In(v) => json!({ "$in": v }),
                    FieldOp::Nin(v) => json!({ "$nin": v }),
                    FieldOp::Exists(b) => json!({ "$exists": b }),
                    FieldOp::Regex(p) => {
                        let options = if p.case_insensitive { "i" } else { "" };
                        json!({ "$regex": p.source, "$options": options })
                    }
                };
                let mut object = serde_json::Map::new();
                object.insert(path.clone(), test);
                Value::Object(object)
            }
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}
