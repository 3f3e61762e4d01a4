//! Attribute filter conditions
//!
//! A `Condition` is the declarative test a caller attaches to one attribute
//! (`eq`, `like`, `gteq`, ...). The same model feeds both query paths: the
//! relational path for indexed attributes and the document translator for the
//! rest.

use serde_json::Value;

use crate::error::StrataError;

/// One attribute test
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(Value),
    Neq(Value),
    /// SQL-style pattern: `%` matches any run, `_` any single character
    Like(String),
    Gt(Value),
    Gteq(Value),
    Lt(Value),
    Lteq(Value),
    Range {
        from: Option<Value>,
        to: Option<Value>,
    },
    In(Vec<Value>),
    Nin(Vec<Value>),
    Null,
    NotNull,
    Regexp(String),
    FindInSet(Value),
    /// Disjunction of tests on the same attribute
    Any(Vec<Condition>),
    /// Conjunction of tests on the same attribute
    All(Vec<Condition>),
}

impl Condition {
    /// Operator name as used in condition arrays (`eq`, `like`, `finset`, ...)
    pub fn name(&self) -> &'static str {
        match self {
            Condition::Eq(_) => "eq",
            Condition::Neq(_) => "neq",
            Condition::Like(_) => "like",
            Condition::Gt(_) => "gt",
            Condition::Gteq(_) => "gteq",
            Condition::Lt(_) => "lt",
            Condition::Lteq(_) => "lteq",
            Condition::Range { .. } => "range",
            Condition::In(_) => "in",
            Condition::Nin(_) => "nin",
            Condition::Null => "null",
            Condition::NotNull => "notnull",
            Condition::Regexp(_) => "regexp",
            Condition::FindInSet(_) => "finset",
            Condition::Any(_) => "or",
            Condition::All(_) => "and",
        }
    }

    /// Parse a condition from its JSON form.
    ///
    /// A scalar means equality. An object maps operator names to literals;
    /// several keys in one object are alternatives (`{"eq": 1, "like": "a%"}`
    /// matches either). An array is a list of alternatives.
    pub fn from_json(attribute: &str, value: &Value) -> Result<Self, StrataError> {
        match value {
            Value::Object(map) => {
                let range_keys = map.contains_key("from") || map.contains_key("to");
                if range_keys {
                    return Ok(Condition::Range {
                        from: map.get("from").cloned(),
                        to: map.get("to").cloned(),
                    });
                }
                let mut alternatives = Vec::with_capacity(map.len());
                for (op, literal) in map {
                    alternatives.push(Self::from_operator(attribute, op, literal)?);
                }
                match alternatives.len() {
                    0 => Err(StrataError::InvalidValue {
                        attribute: attribute.to_string(),
                        value: value.to_string(),
                        reason: "empty condition".to_string(),
                    }),
                    1 => Ok(alternatives.remove(0)),
                    _ => Ok(Condition::Any(alternatives)),
                }
            }
            Value::Array(items) => {
                let alternatives = items
                    .iter()
                    .map(|item| Self::from_json(attribute, item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Condition::Any(alternatives))
            }
            scalar => Ok(Condition::Eq(scalar.clone())),
        }
    }

    fn from_operator(attribute: &str, op: &str, literal: &Value) -> Result<Self, StrataError> {
        let condition = match op {
            "eq" => Condition::Eq(literal.clone()),
            "neq" => Condition::Neq(literal.clone()),
            "like" => Condition::Like(value_text(literal)),
            "gt" => Condition::Gt(literal.clone()),
            "gteq" | "moreq" => Condition::Gteq(literal.clone()),
            "lt" => Condition::Lt(literal.clone()),
            "lteq" => Condition::Lteq(literal.clone()),
            "in" => Condition::In(literal_list(literal)),
            "nin" => Condition::Nin(literal_list(literal)),
            "null" => Condition::Null,
            "notnull" => Condition::NotNull,
            "regexp" => Condition::Regexp(value_text(literal)),
            "finset" => Condition::FindInSet(literal.clone()),
            other => return Err(StrataError::unsupported(attribute, other)),
        };
        Ok(condition)
    }

    /// Evaluate against a single stored value.
    ///
    /// Used by backends that have no query language of their own. `None`
    /// stands for an absent value, which only `null` and `neq`/`nin` accept.
    pub fn evaluate(&self, value: Option<&Value>) -> Result<bool, StrataError> {
        let value = value.filter(|v| !v.is_null());
        let matched = match self {
            Condition::Eq(lit) => value.is_some_and(|v| loose_eq(v, lit)),
            Condition::Neq(lit) => value.is_none_or(|v| !loose_eq(v, lit)),
            Condition::Like(pattern) => {
                let re = like_to_regex(pattern, true)?;
                value.is_some_and(|v| re.is_match(&value_text(v)))
            }
            Condition::Gt(lit) => compare(value, lit).is_some_and(|o| o.is_gt()),
            Condition::Gteq(lit) => compare(value, lit).is_some_and(|o| o.is_ge()),
            Condition::Lt(lit) => compare(value, lit).is_some_and(|o| o.is_lt()),
            Condition::Lteq(lit) => compare(value, lit).is_some_and(|o| o.is_le()),
            Condition::Range { from, to } => {
                let lower = from
                    .as_ref()
                    .is_none_or(|f| compare(value, f).is_some_and(|o| o.is_ge()));
                let upper = to
                    .as_ref()
                    .is_none_or(|t| compare(value, t).is_some_and(|o| o.is_le()));
                value.is_some() && lower && upper
            }
            Condition::In(list) => value.is_some_and(|v| list.iter().any(|l| loose_eq(v, l))),
            Condition::Nin(list) => value.is_none_or(|v| !list.iter().any(|l| loose_eq(v, l))),
            Condition::Null => value.is_none(),
            Condition::NotNull => value.is_some(),
            Condition::Regexp(pattern) => {
                let re = regex::Regex::new(pattern).map_err(|e| StrataError::InvalidValue {
                    attribute: String::new(),
                    value: pattern.clone(),
                    reason: e.to_string(),
                })?;
                value.is_some_and(|v| re.is_match(&value_text(v)))
            }
            Condition::FindInSet(lit) => {
                let needle = value_text(lit);
                value.is_some_and(|v| value_text(v).split(',').any(|part| part == needle))
            }
            Condition::Any(items) => {
                for item in items {
                    if item.evaluate(value)? {
                        return Ok(true);
                    }
                }
                false
            }
            Condition::All(items) => {
                for item in items {
                    if !item.evaluate(value)? {
                        return Ok(false);
                    }
                }
                true
            }
        };
        Ok(matched)
    }
}

/// Convert a `like` pattern into a regular expression.
///
/// `anchored` wraps the expression in `^...$` (relational semantics); the
/// document translator uses the unanchored, case-insensitive form.
pub fn like_to_regex(pattern: &str, anchored: bool) -> Result<regex::Regex, StrataError> {
    let source = like_to_regex_source(pattern, anchored);
    regex::RegexBuilder::new(&source)
        .case_insensitive(true)
        .build()
        .map_err(|e| StrataError::InvalidValue {
            attribute: String::new(),
            value: pattern.to_string(),
            reason: e.to_string(),
        })
}

/// Regex source for a `like` pattern, without compiling it
pub fn like_to_regex_source(pattern: &str, anchored: bool) -> String {
    let mut out = String::with_capacity(pattern.len() + 4);
    if anchored {
        out.push('^');
    }
    let mut buf = [0u8; 4];
    for ch in pattern.chars() {
        match ch {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            other => out.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }
    if anchored {
        out.push('$');
    }
    out
}

fn literal_list(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::String(s) => s
            .split(',')
            .map(|part| Value::String(part.trim().to_string()))
            .collect(),
        other => vec![other.clone()],
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

// Relational columns compare "5" and 5 as equal.
fn loose_eq(a: &Value, b: &Value) -> bool {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => value_text(a) == value_text(b),
    }
}

fn compare(value: Option<&Value>, literal: &Value) -> Option<std::cmp::Ordering> {
    let value = value?;
    match (as_number(value), as_number(literal)) {
        (Some(x), Some(y)) => x.partial_cmp(&y),
        _ => Some(value_text(value).cmp(&value_text(literal))),
    }
}
