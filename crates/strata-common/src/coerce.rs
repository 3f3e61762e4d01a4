//! Numeric coercion for numeric backend types
//!
//! Values reach the engine as submitted by forms and imports, so decimals may
//! carry locale separators (`1.234,56`). Before a value is written to the
//! document store it is converted to a canonical JSON number: `int` backends
//! truncate, `decimal` backends keep the fraction. Other backends pass through.

use serde::Deserialize;
use serde_json::{Number, Value};

use crate::error::StrataError;
use crate::model::BackendType;

/// Separators of the locale numbers are written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NumberFormat {
    pub decimal_separator: char,
    pub group_separator: char,
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self {
            decimal_separator: '.',
            group_separator: ',',
        }
    }
}

impl NumberFormat {
    pub fn new(decimal_separator: char, group_separator: char) -> Self {
        Self {
            decimal_separator,
            group_separator,
        }
    }

    /// Parse locale-formatted text into a number.
    ///
    /// Group separators and whitespace are dropped and the decimal separator
    /// is normalized to `.`. Returns `None` when the remainder is not a number.
    pub fn parse_number(&self, text: &str) -> Option<f64> {
        let mut normalized = String::with_capacity(text.len());
        for ch in text.trim().chars() {
            if ch == self.group_separator || ch.is_whitespace() {
                continue;
            }
            if ch == self.decimal_separator {
                normalized.push('.');
            } else {
                normalized.push(ch);
            }
        }
        if normalized.is_empty() {
            return None;
        }
        normalized.parse::<f64>().ok().filter(|n| n.is_finite())
    }
}

/// Prepare a value for a document write.
///
/// Null and empty strings are returned unchanged; callers decide whether they
/// are written at all.
pub fn coerce_value(
    attribute: &str,
    backend: BackendType,
    value: Value,
    format: &NumberFormat,
) -> Result<Value, StrataError> {
    if !backend.is_numeric() {
        return Ok(value);
    }
    let number = match &value {
        Value::Null => return Ok(value),
        Value::String(s) if s.is_empty() => return Ok(value),
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => format.parse_number(s),
        _ => None,
    };
    let Some(number) = number else {
        return Err(StrataError::InvalidValue {
            attribute: attribute.to_string(),
            value: value.to_string(),
            reason: format!("not a {} number", backend),
        });
    };

    let coerced = match backend {
        BackendType::Int => Value::Number(Number::from(number.trunc() as i64)),
        _ => match Number::from_f64(number) {
            Some(n) => Value::Number(n),
            None => {
                return Err(StrataError::InvalidValue {
                    attribute: attribute.to_string(),
                    value: value.to_string(),
                    reason: "not a finite number".to_string(),
                });
            }
        },
    };
    Ok(coerced)
}
