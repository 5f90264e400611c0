/// Cached plan templates and the value paths that re-bind them
///
/// A plan is the SQL text produced for one filter shape plus, for every `?`
/// in that text, a [`ValuePath`] telling where the literal lives in a filter
/// of the same shape. Paths address document entries and operators by key,
/// with an occurrence counter for repeated keys.

use crate::filter::{Condition, Filter, Operator};
use crate::{BindValue, Error, Result, SqlFragment, Value};

/// One step of a traversal into a filter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    /// `nth` entry with `key` in a document
    Entry { key: String, nth: usize },
    /// Child of a logical node
    Child(usize),
    /// `nth` operator named `name` in a field's operator map
    Operator { name: String, nth: usize },
    /// Element of an `$in`/`$nin` list
    Element(usize),
}

/// How a literal is turned into the value bound for its placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindTransform {
    Raw,
    /// `value%`
    Prefix,
    /// `%value`
    Suffix,
    /// `%value%`
    Contains,
    /// LIKE pattern rewritten as a case-insensitive anchored regex
    CaseInsensitiveRegex,
}

impl BindTransform {
    pub fn apply(&self, value: &Value) -> Result<BindValue> {
        match self {
            BindTransform::Raw => BindValue::try_from(value),
            BindTransform::Prefix => Ok(BindValue::Text(format!("{}%", expect_text(value)?))),
            BindTransform::Suffix => Ok(BindValue::Text(format!("%{}", expect_text(value)?))),
            BindTransform::Contains => Ok(BindValue::Text(format!("%{}%", expect_text(value)?))),
            BindTransform::CaseInsensitiveRegex => {
                Ok(BindValue::Text(like_to_regex(expect_text(value)?)))
            }
        }
    }
}

fn expect_text(value: &Value) -> Result<&str> {
    value.as_text().ok_or_else(|| {
        Error::TypeMismatch(format!(
            "string operator requires a text value, got {}",
            value.type_tag()
        ))
    })
}

/// Convert a LIKE pattern to the `(?i)` regex bound for `$ilike`.
///
/// `%` and `_` become `.*` and `.`; everything else is matched literally.
pub fn like_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push_str("(?i)^");

    let mut literal = String::new();
    for c in pattern.chars() {
        match c {
            '%' | '_' => {
                out.push_str(&regex::escape(&literal));
                literal.clear();
                out.push_str(if c == '%' { ".*" } else { "." });
            }
            _ => literal.push(c),
        }
    }
    out.push_str(&regex::escape(&literal));
    out.push('$');
    out
}

/// Recipe for re-extracting one bind value from a filter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValuePath {
    pub steps: Vec<PathStep>,
    pub transform: BindTransform,
}

enum Node<'a> {
    Filter(&'a Filter),
    Operator(&'a Operator),
    Value(&'a Value),
}

impl ValuePath {
    /// Walk `filter` along this path and produce the bound value
    pub fn extract(&self, filter: &Filter) -> Result<BindValue> {
        let mut node = Node::Filter(filter);

        for step in &self.steps {
            node = match (node, step) {
                (Node::Filter(Filter::Document(entries)), PathStep::Entry { key, nth }) => entries
                    .iter()
                    .filter(|e| e.entry_key() == key.as_str())
                    .nth(*nth)
                    .map(Node::Filter)
                    .ok_or_else(|| self.unresolved())?,
                (Node::Filter(Filter::Logical(_, children)), PathStep::Child(i)) => children
                    .get(*i)
                    .map(Node::Filter)
                    .ok_or_else(|| self.unresolved())?,
                (Node::Filter(Filter::Field(fc)), PathStep::Operator { name, nth }) => {
                    match &fc.condition {
                        Condition::Operators(ops) => ops
                            .iter()
                            .filter(|op| op.name() == name.as_str())
                            .nth(*nth)
                            .map(Node::Operator)
                            .ok_or_else(|| self.unresolved())?,
                        Condition::Value(_) => return Err(self.unresolved()),
                    }
                }
                (Node::Operator(Operator::In(items)), PathStep::Element(i))
                | (Node::Operator(Operator::NotIn(items)), PathStep::Element(i)) => items
                    .get(*i)
                    .map(Node::Value)
                    .ok_or_else(|| self.unresolved())?,
                _ => return Err(self.unresolved()),
            };
        }

        match node {
            Node::Value(value) => self.transform.apply(value),
            Node::Filter(Filter::Field(fc)) => match &fc.condition {
                Condition::Value(value) => self.transform.apply(value),
                Condition::Operators(_) => Err(self.unresolved()),
            },
            Node::Operator(op) => match op {
                Operator::Eq(v)
                | Operator::Ne(v)
                | Operator::Gt(v)
                | Operator::Gte(v)
                | Operator::Lt(v)
                | Operator::Lte(v) => self.transform.apply(v),
                Operator::Like(s)
                | Operator::ILike(s)
                | Operator::Contains(s)
                | Operator::StartsWith(s)
                | Operator::EndsWith(s) => self.transform.apply(&Value::Text(s.clone())),
                Operator::Size(n) => self.transform.apply(&Value::Integer(*n)),
                _ => Err(self.unresolved()),
            },
            Node::Filter(_) => Err(self.unresolved()),
        }
    }

    fn unresolved(&self) -> Error {
        Error::InvalidQuery(format!(
            "value path {:?} does not resolve against filter",
            self.steps
        ))
    }
}

/// Cached translation of one filter shape
#[derive(Debug, Clone, PartialEq)]
pub struct CachePlanEntry {
    pub sql_template: String,
    pub value_paths: Vec<ValuePath>,
}

impl CachePlanEntry {
    /// Re-bind the template against a filter with the same shape
    pub fn bind(&self, filter: &Filter) -> Result<SqlFragment> {
        let params = self
            .value_paths
            .iter()
            .map(|path| path.extract(filter))
            .collect::<Result<Vec<_>>>()?;

        Ok(SqlFragment::new(self.sql_template.clone(), params))
    }
}
