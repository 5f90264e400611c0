/// Sort / limit / skip options and their translation to ORDER BY / LIMIT / OFFSET

use crate::resolver::FieldResolver;
use crate::schema::SchemaCatalog;
use crate::{BindValue, Error, Result, SqlFragment};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

/// Query options. The first sort key is the primary sort; later keys break ties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub sort: Vec<SortKey>,
    pub limit: Option<u64>,
    pub skip: Option<u64>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort_asc(mut self, field: impl Into<String>) -> Self {
        self.sort.push(SortKey {
            field: field.into(),
            direction: SortDirection::Asc,
        });
        self
    }

    pub fn sort_desc(mut self, field: impl Into<String>) -> Self {
        self.sort.push(SortKey {
            field: field.into(),
            direction: SortDirection::Desc,
        });
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sort.is_empty() && self.limit.is_none() && self.skip.is_none()
    }

    /// Parse options from JSON text
    pub fn parse(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_json(&value)
    }

    /// Build options from `{"sort": {...} | [[field, dir], ...], "limit": n, "skip": n}`.
    ///
    /// Directions are `1`/`-1` or `"asc"`/`"desc"`.
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        let map = match json {
            serde_json::Value::Null => return Ok(Self::default()),
            serde_json::Value::Object(map) => map,
            _ => return Err(Error::InvalidQuery("options must be an object".into())),
        };

        let mut options = Self::default();

        for (key, value) in map {
            match key.as_str() {
                "sort" => options.sort = parse_sort(value)?,
                "limit" => options.limit = Some(parse_count("limit", value)?),
                "skip" => options.skip = Some(parse_count("skip", value)?),
                other => {
                    return Err(Error::InvalidQuery(format!("unknown option '{}'", other)))
                }
            }
        }

        Ok(options)
    }
}

fn parse_sort(value: &serde_json::Value) -> Result<Vec<SortKey>> {
    let pairs: Vec<(&str, &serde_json::Value)> = match value {
        serde_json::Value::Object(map) => map.iter().map(|(k, v)| (k.as_str(), v)).collect(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(|item| match item.as_array().map(Vec::as_slice) {
                Some([serde_json::Value::String(field), dir]) => Ok((field.as_str(), dir)),
                _ => Err(Error::InvalidQuery(
                    "sort entries must be [field, direction] pairs".into(),
                )),
            })
            .collect::<Result<Vec<_>>>()?,
        _ => {
            return Err(Error::InvalidQuery(
                "sort must be an object or an array of pairs".into(),
            ))
        }
    };

    pairs
        .into_iter()
        .map(|(field, dir)| {
            let direction = match dir {
                serde_json::Value::Number(n) if n.as_i64() == Some(1) => SortDirection::Asc,
                serde_json::Value::Number(n) if n.as_i64() == Some(-1) => SortDirection::Desc,
                serde_json::Value::String(s) if s.eq_ignore_ascii_case("asc") => SortDirection::Asc,
                serde_json::Value::String(s) if s.eq_ignore_ascii_case("desc") => SortDirection::Desc,
                other => {
                    return Err(Error::InvalidQuery(format!(
                        "invalid sort direction {} for field '{}'",
                        other, field
                    )))
                }
            };
            Ok(SortKey {
                field: field.to_string(),
                direction,
            })
        })
        .collect()
}

fn parse_count(name: &str, value: &serde_json::Value) -> Result<u64> {
    value
        .as_u64()
        .ok_or_else(|| Error::InvalidQuery(format!("{} must be a non-negative integer", name)))
}

/// Translates query options into trailing SQL clauses
pub struct OptionTranslator;

impl OptionTranslator {
    /// Render `ORDER BY ... LIMIT ? OFFSET ?`. Empty options render "".
    ///
    /// SQLite only accepts OFFSET after a LIMIT, so a skip without a limit
    /// renders `LIMIT -1 OFFSET ?`.
    pub fn translate(options: &QueryOptions, schema: &SchemaCatalog) -> Result<SqlFragment> {
        let mut clauses = Vec::new();
        let mut params = Vec::new();

        if !options.sort.is_empty() {
            let keys: Vec<String> = options
                .sort
                .iter()
                .map(|key| {
                    format!(
                        "{} {}",
                        FieldResolver::resolve(&key.field, schema),
                        key.direction.as_sql()
                    )
                })
                .collect();
            clauses.push(format!("ORDER BY {}", keys.join(", ")));
        }

        match options.limit {
            Some(limit) => {
                clauses.push("LIMIT ?".to_string());
                params.push(count_param("limit", limit)?);
            }
            None if options.skip.is_some() => clauses.push("LIMIT -1".to_string()),
            None => {}
        }

        if let Some(skip) = options.skip {
            clauses.push("OFFSET ?".to_string());
            params.push(count_param("skip", skip)?);
        }

        Ok(SqlFragment::new(clauses.join(" "), params))
    }
}

fn count_param(name: &str, value: u64) -> Result<BindValue> {
    i64::try_from(value)
        .map(BindValue::Integer)
        .map_err(|_| Error::TypeMismatch(format!("{} {} does not fit in a 64-bit integer", name, value)))
}
