/// Translates filter ASTs into parameterized SQLite boolean expressions
///
/// Literals are never written into the SQL text. Every literal becomes a `?`
/// placeholder and is appended to the parameter list in left-to-right
/// traversal order, together with the [`ValuePath`] that locates it, so the
/// same output can later be re-bound from a cached template.

use crate::filter::{Condition, ElemMatch, FieldCondition, Filter, LogicalOp, Operator};
use crate::plan::{BindTransform, PathStep, ValuePath};
use crate::resolver::{FieldRef, FieldResolver};
use crate::schema::{FieldSchema, SchemaCatalog};
use crate::{BindValue, Error, Result, SqlFragment, TranslatorConfig, Value};
use std::collections::HashMap;
use tracing::trace;

/// SQL produced for a filter plus the paths of its bound literals
#[derive(Debug, Clone)]
pub struct Translation {
    pub fragment: SqlFragment,
    pub value_paths: Vec<ValuePath>,
}

/// Where field names are resolved
enum Scope {
    /// Top-level document fields, resolved through the schema
    Root,
    /// Fields of the current `$elemMatch` element
    Element(FieldRef),
}

/// Single-use filter translator
pub struct FilterTranslator<'a> {
    schema: &'a SchemaCatalog,
    max_depth: usize,
    strict_operators: bool,
    params: Vec<BindValue>,
    value_paths: Vec<ValuePath>,
    cursor: Vec<PathStep>,
    aliases: usize,
}

impl<'a> FilterTranslator<'a> {
    pub fn new(schema: &'a SchemaCatalog, config: &TranslatorConfig) -> Self {
        Self {
            schema,
            max_depth: config.max_depth,
            strict_operators: config.strict_operators,
            params: Vec::new(),
            value_paths: Vec::new(),
            cursor: Vec::new(),
            aliases: 0,
        }
    }

    /// Translate `filter` into SQL text and ordered bind values
    pub fn translate(mut self, filter: &Filter) -> Result<Translation> {
        let sql = self.filter(filter, &Scope::Root, 0)?;
        trace!("Translated filter into {} ({} params)", sql, self.params.len());

        Ok(Translation {
            fragment: SqlFragment::new(sql, self.params),
            value_paths: self.value_paths,
        })
    }

    fn filter(&mut self, filter: &Filter, scope: &Scope, depth: usize) -> Result<String> {
        self.check_depth(depth)?;

        match filter {
            Filter::MatchAll => Ok("1=1".to_string()),
            Filter::Document(entries) => {
                let mut seen: HashMap<&str, usize> = HashMap::new();
                let mut parts = Vec::with_capacity(entries.len());

                for entry in entries {
                    let key = entry.entry_key();
                    let nth = seen.entry(key).or_insert(0);
                    self.cursor.push(PathStep::Entry {
                        key: key.to_string(),
                        nth: *nth,
                    });
                    *nth += 1;

                    // A document directly inside a document is a level of its own
                    let part = self.filter(entry, scope, nested_depth(entry, depth));
                    self.cursor.pop();
                    parts.push(part?);
                }

                Ok(conjunction(parts))
            }
            Filter::Field(fc) => self.field_condition(fc, scope, depth),
            Filter::Logical(op, children) => {
                let mut parts = Vec::with_capacity(children.len());

                for (i, child) in children.iter().enumerate() {
                    self.cursor.push(PathStep::Child(i));
                    let part = self.filter(child, scope, depth + 1);
                    self.cursor.pop();
                    parts.push(part?);
                }

                // Empty lists are vacuously true for every logical operator
                if parts.is_empty() {
                    return Ok("1=1".to_string());
                }

                Ok(match op {
                    LogicalOp::And => conjunction(parts),
                    LogicalOp::Or => disjunction(parts),
                    LogicalOp::Nor => format!("NOT ({})", parts.join(" OR ")),
                    LogicalOp::Not => format!("NOT ({})", parts.join(" AND ")),
                })
            }
        }
    }

    fn field_condition(&mut self, fc: &FieldCondition, scope: &Scope, depth: usize) -> Result<String> {
        let schema = self.schema;
        let (reference, field_schema) = match scope {
            Scope::Root => (
                FieldResolver::resolve_ref(&fc.field, schema),
                schema.get(&fc.field),
            ),
            Scope::Element(element) => (element.child(&fc.field), None),
        };

        self.condition(&fc.field, &reference, field_schema, &fc.condition, depth)
    }

    fn condition(
        &mut self,
        field: &str,
        reference: &FieldRef,
        field_schema: Option<&FieldSchema>,
        condition: &Condition,
        depth: usize,
    ) -> Result<String> {
        match condition {
            Condition::Value(value) => {
                self.bind(value, BindTransform::Raw)?;
                Ok(format!("{} = ?", reference.sql()))
            }
            Condition::Operators(ops) => self.operators(field, reference, field_schema, ops, depth),
        }
    }

    /// Operators on one field, ANDed in the order given
    fn operators(
        &mut self,
        field: &str,
        reference: &FieldRef,
        field_schema: Option<&FieldSchema>,
        ops: &[Operator],
        depth: usize,
    ) -> Result<String> {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        let mut parts = Vec::with_capacity(ops.len());

        for op in ops {
            let name = op.name();
            let nth = seen.entry(name).or_insert(0);
            self.cursor.push(PathStep::Operator {
                name: name.to_string(),
                nth: *nth,
            });
            *nth += 1;

            let part = self.operator(field, reference, field_schema, op, depth);
            self.cursor.pop();
            if let Some(sql) = part? {
                parts.push(sql);
            }
        }

        Ok(conjunction(parts))
    }

    /// Translate one operator. `None` means the operator contributes nothing.
    fn operator(
        &mut self,
        field: &str,
        reference: &FieldRef,
        field_schema: Option<&FieldSchema>,
        op: &Operator,
        depth: usize,
    ) -> Result<Option<String>> {
        let expr = reference.sql();

        if op.is_ordering() {
            check_orderable(field, field_schema, op)?;
        }

        let sql = match op {
            Operator::Eq(v) => self.comparison(&expr, "=", v)?,
            Operator::Ne(v) => self.comparison(&expr, "!=", v)?,
            Operator::Gt(v) => self.comparison(&expr, ">", v)?,
            Operator::Gte(v) => self.comparison(&expr, ">=", v)?,
            Operator::Lt(v) => self.comparison(&expr, "<", v)?,
            Operator::Lte(v) => self.comparison(&expr, "<=", v)?,

            // Empty membership: IN () matches nothing, NOT IN () everything
            Operator::In(values) if values.is_empty() => "0=1".to_string(),
            Operator::NotIn(values) if values.is_empty() => "1=1".to_string(),
            Operator::In(values) => format!("{} IN ({})", expr, self.bind_list(values)?),
            Operator::NotIn(values) => format!("{} NOT IN ({})", expr, self.bind_list(values)?),

            Operator::Like(pattern) => self.pattern(&expr, "LIKE", pattern, BindTransform::Raw)?,
            Operator::ILike(pattern) => {
                self.pattern(&expr, "REGEXP", pattern, BindTransform::CaseInsensitiveRegex)?
            }
            Operator::Contains(s) => self.pattern(&expr, "LIKE", s, BindTransform::Contains)?,
            Operator::StartsWith(s) => self.pattern(&expr, "LIKE", s, BindTransform::Prefix)?,
            Operator::EndsWith(s) => self.pattern(&expr, "LIKE", s, BindTransform::Suffix)?,

            Operator::All(values) if values.is_empty() => "1=1".to_string(),
            Operator::All(values) => {
                let mut clauses = Vec::with_capacity(values.len());
                for (i, value) in values.iter().enumerate() {
                    let alias = self.next_alias();
                    self.cursor.push(PathStep::Element(i));
                    let bound = self.bind(value, BindTransform::Raw);
                    self.cursor.pop();
                    bound?;
                    clauses.push(format!(
                        "EXISTS (SELECT 1 FROM json_each({}) AS {} WHERE {}.value = ?)",
                        expr, alias, alias
                    ));
                }
                conjunction(clauses)
            }
            Operator::Size(n) => {
                self.bind(&Value::Integer(*n), BindTransform::Raw)?;
                format!("json_array_length({}) = ?", expr)
            }
            Operator::ElemMatch(target) => self.elem_match(field, reference, target, depth + 1)?,
            Operator::IndexAt { index, condition } => {
                self.check_depth(depth + 1)?;
                let element = reference.element_at(*index);
                self.condition(field, &element, None, condition, depth + 1)?
            }

            Operator::Exists(true) => format!("{} IS NOT NULL", reference.type_probe()),
            Operator::Exists(false) => format!("{} IS NULL", reference.type_probe()),

            Operator::Unknown { name, .. } => {
                if self.strict_operators {
                    return Err(Error::InvalidQuery(format!(
                        "unknown operator '{}' on field '{}'",
                        name, field
                    )));
                }
                trace!("Ignoring unknown operator {} on field {}", name, field);
                return Ok(None);
            }
        };

        Ok(Some(sql))
    }

    fn elem_match(
        &mut self,
        field: &str,
        reference: &FieldRef,
        target: &ElemMatch,
        depth: usize,
    ) -> Result<String> {
        self.check_depth(depth)?;

        let alias = self.next_alias();
        let element = FieldRef::Element {
            alias: alias.clone(),
        };

        let inner = match target {
            ElemMatch::Document(filter) => self.filter(filter, &Scope::Element(element), depth)?,
            ElemMatch::Value(ops) => self.operators(field, &element, None, ops, depth)?,
        };

        Ok(format!(
            "EXISTS (SELECT 1 FROM json_each({}) AS {} WHERE {})",
            reference.sql(),
            alias,
            inner
        ))
    }

    fn comparison(&mut self, expr: &str, symbol: &str, value: &Value) -> Result<String> {
        self.bind(value, BindTransform::Raw)?;
        Ok(format!("{} {} ?", expr, symbol))
    }

    fn pattern(
        &mut self,
        expr: &str,
        keyword: &str,
        pattern: &str,
        transform: BindTransform,
    ) -> Result<String> {
        self.bind(&Value::Text(pattern.to_string()), transform)?;
        Ok(format!("{} {} ?", expr, keyword))
    }

    /// Bind every list element and return the `?, ?, ...` placeholder list
    fn bind_list(&mut self, values: &[Value]) -> Result<String> {
        for (i, value) in values.iter().enumerate() {
            self.cursor.push(PathStep::Element(i));
            let bound = self.bind(value, BindTransform::Raw);
            self.cursor.pop();
            bound?;
        }
        Ok(vec!["?"; values.len()].join(", "))
    }

    fn bind(&mut self, value: &Value, transform: BindTransform) -> Result<()> {
        self.params.push(transform.apply(value)?);
        self.value_paths.push(ValuePath {
            steps: self.cursor.clone(),
            transform,
        });
        Ok(())
    }

    fn next_alias(&mut self) -> String {
        self.aliases += 1;
        format!("je{}", self.aliases)
    }

    fn check_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_depth {
            return Err(Error::InvalidQuery(format!(
                "filter nesting exceeds maximum depth of {}",
                self.max_depth
            )));
        }
        Ok(())
    }
}

/// Depth of a document entry: bare documents nest, field and logical entries do not
pub(crate) fn nested_depth(entry: &Filter, depth: usize) -> usize {
    match entry {
        Filter::Document(_) => depth + 1,
        _ => depth,
    }
}

fn check_orderable(field: &str, field_schema: Option<&FieldSchema>, op: &Operator) -> Result<()> {
    match field_schema {
        Some(fs) if !fs.field_type.is_orderable() => Err(Error::TypeMismatch(format!(
            "{} cannot be applied to field '{}' of type {}",
            op.name(),
            field,
            fs.field_type.name()
        ))),
        _ => Ok(()),
    }
}

fn conjunction(parts: Vec<String>) -> String {
    combine(parts, " AND ")
}

fn disjunction(parts: Vec<String>) -> String {
    combine(parts, " OR ")
}

fn combine(mut parts: Vec<String>, separator: &str) -> String {
    match parts.len() {
        0 => "1=1".to_string(),
        1 => parts.remove(0),
        _ => format!("({})", parts.join(separator)),
    }
}
