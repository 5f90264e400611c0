/// Structural fingerprints for filter shapes
///
/// Two filters share a fingerprint when they would translate to the same SQL
/// text: same keys in the same order, same operators, same nesting, same
/// literal types, same list lengths. Literal values are replaced by their
/// type tags. Key order is kept since the translator emits conditions in the
/// order they were written. The `$exists` flag is kept because it picks
/// between two different SQL forms without binding anything.

use crate::filter::{Condition, Filter, Operator};
use crate::translator::nested_depth;
use crate::{Error, Result, Value};
use std::fmt;

/// Cache key derived from a filter's shape
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint `filter`, or `None` if it uses `$all`, `$elemMatch`, or
    /// `$index`, whose SQL shape is not fixed by the filter's structure.
    pub fn compute(filter: &Filter, max_depth: usize) -> Result<Option<Self>> {
        Ok(filter_shape(filter, 0, max_depth)?.map(Fingerprint))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether `filter` may be served from the plan cache
pub fn is_cacheable(filter: &Filter, max_depth: usize) -> Result<bool> {
    Ok(Fingerprint::compute(filter, max_depth)?.is_some())
}

fn filter_shape(filter: &Filter, depth: usize, max_depth: usize) -> Result<Option<String>> {
    if depth > max_depth {
        return Err(Error::InvalidQuery(format!(
            "filter nesting exceeds maximum depth of {}",
            max_depth
        )));
    }

    let shape = match filter {
        Filter::MatchAll => "*".to_string(),
        Filter::Document(entries) => {
            // Written order, not sorted: the translator emits conditions in
            // this order, so sorting would let a cached plan disagree with a
            // fresh translation of the same filter.
            let mut body = Vec::with_capacity(entries.len());
            for entry in entries {
                let Some(shape) = filter_shape(entry, nested_depth(entry, depth), max_depth)? else {
                    return Ok(None);
                };
                body.push(format!("{}:{}", quote(entry.entry_key()), shape));
            }
            format!("{{{}}}", body.join(","))
        }
        Filter::Field(fc) => {
            let Some(condition) = condition_shape(&fc.condition) else {
                return Ok(None);
            };
            format!("F({}:{})", quote(&fc.field), condition)
        }
        Filter::Logical(op, children) => {
            let mut shapes = Vec::with_capacity(children.len());
            for child in children {
                let Some(shape) = filter_shape(child, depth + 1, max_depth)? else {
                    return Ok(None);
                };
                shapes.push(shape);
            }
            format!("{}[{}]", op.key(), shapes.join(","))
        }
    };

    Ok(Some(shape))
}

fn condition_shape(condition: &Condition) -> Option<String> {
    match condition {
        Condition::Value(value) => Some(format!("={}", value_shape(value))),
        Condition::Operators(ops) => {
            let mut body = Vec::with_capacity(ops.len());
            for op in ops {
                body.push(format!("{}:{}", quote(op.name()), operator_shape(op)?));
            }
            Some(format!("{{{}}}", body.join(",")))
        }
    }
}

fn operator_shape(op: &Operator) -> Option<String> {
    let shape = match op {
        Operator::Eq(v)
        | Operator::Ne(v)
        | Operator::Gt(v)
        | Operator::Gte(v)
        | Operator::Lt(v)
        | Operator::Lte(v) => value_shape(v),
        Operator::In(values) | Operator::NotIn(values) => list_shape(values),
        Operator::Like(_)
        | Operator::ILike(_)
        | Operator::Contains(_)
        | Operator::StartsWith(_)
        | Operator::EndsWith(_) => "text".to_string(),
        Operator::Size(_) => "int".to_string(),
        Operator::Exists(flag) => flag.to_string(),
        // Ignored (or rejected) during translation, so the value is irrelevant
        Operator::Unknown { .. } => "?".to_string(),
        Operator::All(_) | Operator::ElemMatch(_) | Operator::IndexAt { .. } => return None,
    };
    Some(shape)
}

fn value_shape(value: &Value) -> String {
    match value {
        Value::Array(items) => list_shape(items),
        Value::Object(entries) => {
            let body: Vec<String> = entries
                .iter()
                .map(|(key, v)| format!("{}:{}", quote(key), value_shape(v)))
                .collect();
            format!("{{{}}}", body.join(","))
        }
        scalar => scalar.type_tag().to_string(),
    }
}

fn list_shape(values: &[Value]) -> String {
    let shapes: Vec<String> = values.iter().map(value_shape).collect();
    format!("[{}]", shapes.join(","))
}

/// JSON-quote a key so user-supplied names cannot forge shape syntax
fn quote(key: &str) -> String {
    serde_json::Value::String(key.to_string()).to_string()
}
