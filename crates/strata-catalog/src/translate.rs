//! Attribute condition to document filter translation
//!
//! Every supported test is wrapped in the exists-cascade so entities whose
//! value only lives in the default store still match from other stores.

use serde_json::Value;
use strata_common::{
    AttributeMetadata, Condition, NumberFormat, StoreId, StrataError, coerce_value,
    like_to_regex_source,
};
use strata_docstore::{FieldOp, Filter, Pattern};
use strata_scope::{Cascade, FieldPath};

/// Document filter for `condition` on `attribute`, seen from `store_id`.
///
/// Supported: `eq`, `neq`, `like`, `gt`, `gteq`, `lt`, `lteq`, and
/// alternatives or conjunctions of those. Anything else is rejected.
/// Literals are coerced to the attribute's backend type, the same way
/// saved values are.
pub fn translate(
    attribute: &AttributeMetadata,
    condition: &Condition,
    store_id: StoreId,
    format: &NumberFormat,
) -> Result<Filter, StrataError> {
    match condition {
        Condition::Any(parts) => Ok(Filter::or(translate_all(attribute, parts, store_id, format)?)),
        Condition::All(parts) => Ok(Filter::and(translate_all(attribute, parts, store_id, format)?)),
        other => {
            let op = field_op(attribute, other, format)?;
            Ok(Cascade::new(store_id, &attribute.code)
                .with_test(|path: &FieldPath| Filter::field(path.as_str(), op.clone())))
        }
    }
}

fn translate_all(
    attribute: &AttributeMetadata,
    parts: &[Condition],
    store_id: StoreId,
    format: &NumberFormat,
) -> Result<Vec<Filter>, StrataError> {
    parts
        .iter()
        .map(|part| translate(attribute, part, store_id, format))
        .collect()
}

fn field_op(
    attribute: &AttributeMetadata,
    condition: &Condition,
    format: &NumberFormat,
) -> Result<FieldOp, StrataError> {
    let literal = |v: &Value| coerce_value(&attribute.code, attribute.backend_type, v.clone(), format);
    let op = match condition {
        Condition::Eq(v) => FieldOp::Eq(literal(v)?),
        Condition::Neq(v) => FieldOp::Ne(literal(v)?),
        Condition::Gt(v) => FieldOp::Gt(literal(v)?),
        Condition::Gteq(v) => FieldOp::Gte(literal(v)?),
        Condition::Lt(v) => FieldOp::Lt(literal(v)?),
        Condition::Lteq(v) => FieldOp::Lte(literal(v)?),
        Condition::Like(pattern) => {
            let source = like_to_regex_source(pattern, false);
            let pattern = Pattern::new(source, true).map_err(|e| StrataError::InvalidValue {
                attribute: attribute.code.clone(),
                value: Value::String(pattern.clone()).to_string(),
                reason: e.to_string(),
            })?;
            FieldOp::Regex(pattern)
        }
        other => return Err(StrataError::unsupported(&attribute.code, other.name())),
    };
    Ok(op)
}
