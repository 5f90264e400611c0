/// Field resolution: field name + schema metadata -> SQL expression
///
/// A field lives in one of two physical places. Reserved columns and indexed
/// fields are real columns (indexed `foo` is the generated column `_foo`);
/// everything else is extracted from the JSON document in `body`.

use crate::schema::{default_json_path, generated_column_name, SchemaCatalog, BODY_COLUMN, RESERVED_COLUMNS};

/// A resolved reference to a value the SQL engine can read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRef {
    /// Physical or generated column. `json_path` is the path the column is
    /// generated from; reserved columns have none.
    Column {
        name: String,
        json_path: Option<String>,
    },
    /// JSON extraction from a document-valued expression
    Json { doc: String, path: String },
    /// Current row of a `json_each` iteration aliased as `alias`
    Element { alias: String },
}

impl FieldRef {
    /// SQL expression yielding the field's value
    pub fn sql(&self) -> String {
        match self {
            FieldRef::Column { name, .. } => name.clone(),
            FieldRef::Json { doc, path } => {
                format!("jsonb_extract({}, '{}')", doc, escape_literal(path))
            }
            FieldRef::Element { alias } => format!("{}.value", alias),
        }
    }

    /// Expression that is NULL exactly when the field is absent.
    ///
    /// `jsonb_extract` collapses a JSON `null` and a missing key into SQL
    /// NULL; `json_type` returns `'null'` for the former.
    pub fn type_probe(&self) -> String {
        match self {
            FieldRef::Column {
                json_path: Some(path),
                ..
            } => format!("json_type({}, '{}')", BODY_COLUMN, escape_literal(path)),
            FieldRef::Column {
                name,
                json_path: None,
            } => name.clone(),
            FieldRef::Json { doc, path } => {
                format!("json_type({}, '{}')", doc, escape_literal(path))
            }
            FieldRef::Element { alias } => format!("{}.type", alias),
        }
    }

    /// Reference to element `index` of this (array-valued) reference
    pub fn element_at(&self, index: usize) -> FieldRef {
        match self {
            FieldRef::Column {
                json_path: Some(path),
                ..
            } => FieldRef::Json {
                doc: BODY_COLUMN.to_string(),
                path: format!("{}[{}]", path, index),
            },
            FieldRef::Column {
                name,
                json_path: None,
            } => FieldRef::Json {
                doc: name.clone(),
                path: format!("$[{}]", index),
            },
            FieldRef::Json { doc, path } => FieldRef::Json {
                doc: doc.clone(),
                path: format!("{}[{}]", path, index),
            },
            FieldRef::Element { alias } => FieldRef::Json {
                doc: format!("{}.value", alias),
                path: format!("$[{}]", index),
            },
        }
    }

    /// Reference to `field` inside the JSON value this reference points at
    pub fn child(&self, field: &str) -> FieldRef {
        FieldRef::Json {
            doc: self.sql(),
            path: default_json_path(field),
        }
    }
}

/// Maps field names to SQL expressions for one schema
pub struct FieldResolver;

impl FieldResolver {
    /// Resolve a top-level document field to its SQL expression
    pub fn resolve(field: &str, schema: &SchemaCatalog) -> String {
        Self::resolve_ref(field, schema).sql()
    }

    /// Resolve a top-level document field to a structured reference.
    ///
    /// Fields missing from the schema are treated as non-indexed.
    pub fn resolve_ref(field: &str, schema: &SchemaCatalog) -> FieldRef {
        if RESERVED_COLUMNS.contains(&field) {
            return FieldRef::Column {
                name: field.to_string(),
                json_path: None,
            };
        }

        match schema.get(field) {
            Some(fs) if fs.indexed => FieldRef::Column {
                name: generated_column_name(field),
                json_path: Some(fs.json_path()),
            },
            Some(fs) => FieldRef::Json {
                doc: BODY_COLUMN.to_string(),
                path: fs.json_path(),
            },
            None => FieldRef::Json {
                doc: BODY_COLUMN.to_string(),
                path: default_json_path(field),
            },
        }
    }
}

/// Escape text placed inside a single-quoted SQL string literal
fn escape_literal(s: &str) -> String {
    s.replace('\'', "''")
}
