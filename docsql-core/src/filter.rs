/// Filter AST for document queries
///
/// Filters are either built programmatically or parsed from Mongo-style JSON:
///
/// ```
/// use docsql_core::filter::{Filter, Operator};
///
/// let parsed = Filter::parse(r#"{"age": {"$gte": 18, "$lt": 65}}"#).unwrap();
/// let built = Filter::document(vec![Filter::field(
///     "age",
///     vec![Operator::Gte(18.into()), Operator::Lt(65.into())],
/// )]);
/// assert_eq!(parsed, built);
/// ```
///
/// Operator shapes are checked once here, at construction time, so the
/// translator never has to second-guess the type of an operand.

use crate::{Error, Result, Value};
use serde_json::Map;

/// Logical combinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Or,
    Nor,
    Not,
}

impl LogicalOp {
    pub fn key(&self) -> &'static str {
        match self {
            LogicalOp::And => "$and",
            LogicalOp::Or => "$or",
            LogicalOp::Nor => "$nor",
            LogicalOp::Not => "$not",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "$and" => Some(LogicalOp::And),
            "$or" => Some(LogicalOp::Or),
            "$nor" => Some(LogicalOp::Nor),
            "$not" => Some(LogicalOp::Not),
            _ => None,
        }
    }
}

/// Filter node
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every document
    MatchAll,
    /// Condition on a single field
    Field(FieldCondition),
    /// Logical combination of child filters
    Logical(LogicalOp, Vec<Filter>),
    /// Object-shaped filter: keyed entries combined with AND.
    /// An empty document matches everything.
    Document(Vec<Filter>),
}

/// Condition applied to one field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCondition {
    pub field: String,
    pub condition: Condition,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Direct value: implicit equality
    Value(Value),
    /// Operator map, applied in the order given
    Operators(Vec<Operator>),
}

/// Target of `$elemMatch`
#[derive(Debug, Clone, PartialEq)]
pub enum ElemMatch {
    /// Filter evaluated against each element as a document
    Document(Filter),
    /// Operators applied to each element's value
    Value(Vec<Operator>),
}

/// Field operator
#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),

    In(Vec<Value>),
    NotIn(Vec<Value>),

    Like(String),
    ILike(String),
    Contains(String),
    StartsWith(String),
    EndsWith(String),

    All(Vec<Value>),
    Size(i64),
    ElemMatch(Box<ElemMatch>),
    IndexAt {
        index: usize,
        condition: Box<Condition>,
    },

    Exists(bool),

    /// Operator this engine does not know. Ignored during translation
    /// unless strict operators are enabled.
    Unknown { name: String, value: Value },
}

impl Operator {
    /// The `$`-prefixed key this operator is written with
    pub fn name(&self) -> &str {
        match self {
            Operator::Eq(_) => "$eq",
            Operator::Ne(_) => "$ne",
            Operator::Gt(_) => "$gt",
            Operator::Gte(_) => "$gte",
            Operator::Lt(_) => "$lt",
            Operator::Lte(_) => "$lte",
            Operator::In(_) => "$in",
            Operator::NotIn(_) => "$nin",
            Operator::Like(_) => "$like",
            Operator::ILike(_) => "$ilike",
            Operator::Contains(_) => "$contains",
            Operator::StartsWith(_) => "$startsWith",
            Operator::EndsWith(_) => "$endsWith",
            Operator::All(_) => "$all",
            Operator::Size(_) => "$size",
            Operator::ElemMatch(_) => "$elemMatch",
            Operator::IndexAt { .. } => "$index",
            Operator::Exists(_) => "$exists",
            Operator::Unknown { name, .. } => name,
        }
    }

    /// Ordering operators require an orderable field type
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            Operator::Gt(_) | Operator::Gte(_) | Operator::Lt(_) | Operator::Lte(_)
        )
    }

    /// Operators whose SQL shape depends on more than literal types
    pub fn is_dynamic(&self) -> bool {
        matches!(
            self,
            Operator::All(_) | Operator::ElemMatch(_) | Operator::IndexAt { .. }
        )
    }
}

impl Filter {
    pub fn all() -> Self {
        Filter::MatchAll
    }

    /// `field = value`
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Field(FieldCondition {
            field: field.into(),
            condition: Condition::Value(value.into()),
        })
    }

    /// Operator map on a field
    pub fn field(field: impl Into<String>, operators: Vec<Operator>) -> Self {
        Filter::Field(FieldCondition {
            field: field.into(),
            condition: Condition::Operators(operators),
        })
    }

    pub fn and(children: Vec<Filter>) -> Self {
        Filter::Logical(LogicalOp::And, children)
    }

    pub fn or(children: Vec<Filter>) -> Self {
        Filter::Logical(LogicalOp::Or, children)
    }

    pub fn nor(children: Vec<Filter>) -> Self {
        Filter::Logical(LogicalOp::Nor, children)
    }

    pub fn not(child: Filter) -> Self {
        Filter::Logical(LogicalOp::Not, vec![child])
    }

    pub fn document(entries: Vec<Filter>) -> Self {
        Filter::Document(entries)
    }

    /// Key of this filter when it appears as a document entry
    pub fn entry_key(&self) -> &str {
        match self {
            Filter::Field(fc) => &fc.field,
            Filter::Logical(op, _) => op.key(),
            Filter::MatchAll => "",
            Filter::Document(_) => "{}",
        }
    }

    /// Whether this filter trivially matches everything
    pub fn is_match_all(&self) -> bool {
        match self {
            Filter::MatchAll => true,
            Filter::Document(entries) => entries.is_empty(),
            _ => false,
        }
    }

    /// Parse a filter from JSON text
    pub fn parse(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_json(&value)
    }

    /// Build a filter from a parsed JSON value. `null` and `{}` match all.
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        match json {
            serde_json::Value::Null => Ok(Filter::MatchAll),
            serde_json::Value::Object(map) if map.is_empty() => Ok(Filter::MatchAll),
            serde_json::Value::Object(map) => parse_document(map),
            other => Err(Error::InvalidQuery(format!(
                "filter must be an object, got {}",
                json_kind(other)
            ))),
        }
    }
}

fn parse_document(map: &Map<String, serde_json::Value>) -> Result<Filter> {
    let mut entries = Vec::with_capacity(map.len());

    for (key, value) in map {
        if key.starts_with('$') {
            let op = LogicalOp::from_key(key).ok_or_else(|| {
                Error::InvalidQuery(format!("unsupported top-level operator '{}'", key))
            })?;
            entries.push(parse_logical(op, value)?);
        } else {
            let condition =
                parse_condition(value).map_err(|e| e.with_context(&format!("field '{}'", key)))?;
            entries.push(Filter::Field(FieldCondition {
                field: key.clone(),
                condition,
            }));
        }
    }

    Ok(Filter::Document(entries))
}

fn parse_logical(op: LogicalOp, value: &serde_json::Value) -> Result<Filter> {
    let children = match (op, value) {
        (_, serde_json::Value::Array(items)) => items
            .iter()
            .map(parse_child)
            .collect::<Result<Vec<_>>>()?,
        (LogicalOp::Not, serde_json::Value::Object(_)) => vec![parse_child(value)?],
        (_, other) => {
            return Err(Error::InvalidQuery(format!(
                "{} requires an array of filters, got {}",
                op.key(),
                json_kind(other)
            )))
        }
    };

    Ok(Filter::Logical(op, children))
}

fn parse_child(value: &serde_json::Value) -> Result<Filter> {
    match value {
        serde_json::Value::Object(map) if map.is_empty() => Ok(Filter::MatchAll),
        serde_json::Value::Object(map) => parse_document(map),
        other => Err(Error::InvalidQuery(format!(
            "logical operands must be objects, got {}",
            json_kind(other)
        ))),
    }
}

fn parse_condition(value: &serde_json::Value) -> Result<Condition> {
    match value {
        serde_json::Value::Object(map) if is_operator_map(map) => {
            let operators = map
                .iter()
                .map(|(name, operand)| parse_operator(name, operand))
                .collect::<Result<Vec<_>>>()?;
            Ok(Condition::Operators(operators))
        }
        serde_json::Value::Object(map) if map.keys().any(|k| k.starts_with('$')) => {
            Err(Error::InvalidQuery(
                "cannot mix operators and plain keys in one condition".into(),
            ))
        }
        other => Ok(Condition::Value(Value::from_json(other))),
    }
}

fn is_operator_map(map: &Map<String, serde_json::Value>) -> bool {
    !map.is_empty() && map.keys().all(|k| k.starts_with('$'))
}

fn parse_operator(name: &str, operand: &serde_json::Value) -> Result<Operator> {
    let op = match name {
        "$eq" => Operator::Eq(Value::from_json(operand)),
        "$ne" => Operator::Ne(Value::from_json(operand)),
        "$gt" => Operator::Gt(Value::from_json(operand)),
        "$gte" => Operator::Gte(Value::from_json(operand)),
        "$lt" => Operator::Lt(Value::from_json(operand)),
        "$lte" => Operator::Lte(Value::from_json(operand)),
        "$in" => Operator::In(expect_array(name, operand)?),
        "$nin" => Operator::NotIn(expect_array(name, operand)?),
        "$like" => Operator::Like(expect_string(name, operand)?),
        "$ilike" => Operator::ILike(expect_string(name, operand)?),
        "$contains" => Operator::Contains(expect_string(name, operand)?),
        "$startsWith" => Operator::StartsWith(expect_string(name, operand)?),
        "$endsWith" => Operator::EndsWith(expect_string(name, operand)?),
        "$all" => Operator::All(expect_array(name, operand)?),
        "$size" => match operand.as_i64() {
            Some(n) if n >= 0 => Operator::Size(n),
            _ => {
                return Err(Error::InvalidQuery(
                    "$size requires a non-negative integer".into(),
                ))
            }
        },
        "$elemMatch" => Operator::ElemMatch(Box::new(parse_elem_match(operand)?)),
        "$index" => parse_index(operand)?,
        "$exists" => match operand {
            serde_json::Value::Bool(b) => Operator::Exists(*b),
            other => {
                return Err(Error::InvalidQuery(format!(
                    "$exists requires a boolean, got {}",
                    json_kind(other)
                )))
            }
        },
        _ => Operator::Unknown {
            name: name.to_string(),
            value: Value::from_json(operand),
        },
    };

    Ok(op)
}

fn parse_elem_match(operand: &serde_json::Value) -> Result<ElemMatch> {
    let map = match operand {
        serde_json::Value::Object(map) => map,
        other => {
            return Err(Error::InvalidQuery(format!(
                "$elemMatch requires an object, got {}",
                json_kind(other)
            )))
        }
    };

    // {"$gt": 5} applies to the element itself; {"score": {...}} to its fields
    let targets_value =
        is_operator_map(map) && map.keys().all(|k| LogicalOp::from_key(k).is_none());

    if targets_value {
        let operators = map
            .iter()
            .map(|(name, operand)| parse_operator(name, operand))
            .collect::<Result<Vec<_>>>()?;
        Ok(ElemMatch::Value(operators))
    } else if map.is_empty() {
        Ok(ElemMatch::Document(Filter::MatchAll))
    } else {
        Ok(ElemMatch::Document(parse_document(map)?))
    }
}

fn parse_index(operand: &serde_json::Value) -> Result<Operator> {
    let malformed = || Error::InvalidQuery("$index requires {\"index\": <n>, \"condition\": ...}".into());

    let map = operand.as_object().ok_or_else(malformed)?;
    let index = map
        .get("index")
        .and_then(|i| i.as_u64())
        .ok_or_else(malformed)?;
    let condition = map.get("condition").ok_or_else(malformed)?;

    Ok(Operator::IndexAt {
        index: usize::try_from(index).map_err(|_| malformed())?,
        condition: Box::new(parse_condition(condition)?),
    })
}

fn expect_array(name: &str, operand: &serde_json::Value) -> Result<Vec<Value>> {
    match operand {
        serde_json::Value::Array(items) => Ok(items.iter().map(Value::from_json).collect()),
        other => Err(Error::InvalidQuery(format!(
            "{} requires an array, got {}",
            name,
            json_kind(other)
        ))),
    }
}

fn expect_string(name: &str, operand: &serde_json::Value) -> Result<String> {
    match operand {
        serde_json::Value::String(s) => Ok(s.clone()),
        other => Err(Error::InvalidQuery(format!(
            "{} requires a string, got {}",
            name,
            json_kind(other)
        ))),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
