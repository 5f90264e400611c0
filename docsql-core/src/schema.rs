/// Field schema metadata for a collection
///
/// A catalog is produced once per collection by the schema builder and is
/// read-only afterwards. The translator only consults it to decide how a
/// field is physically stored and whether it can be ordered.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Physical columns present on every collection table
pub const RESERVED_COLUMNS: [&str; 3] = ["_id", "createdAt", "updatedAt"];

/// Document body column holding the JSON blob
pub const BODY_COLUMN: &str = "body";

/// Storage type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Integer,
    Real,
    Boolean,
    Blob,
    Timestamp,
    Array,
    Object,
}

impl FieldType {
    /// Whether `$gt`/`$gte`/`$lt`/`$lte` are meaningful for this type
    pub fn is_orderable(&self) -> bool {
        matches!(
            self,
            FieldType::Text | FieldType::Integer | FieldType::Real | FieldType::Timestamp
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Integer => "integer",
            FieldType::Real => "real",
            FieldType::Boolean => "boolean",
            FieldType::Blob => "blob",
            FieldType::Timestamp => "timestamp",
            FieldType::Array => "array",
            FieldType::Object => "object",
        }
    }
}

/// Schema definition for a single field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Field name
    pub name: String,
    /// JSON path inside the document body (None = `$.{name}`)
    #[serde(default)]
    pub path: Option<String>,
    /// Storage type
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Materialized as a generated column
    #[serde(default)]
    pub indexed: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub nullable: bool,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            path: None,
            field_type,
            indexed: false,
            unique: false,
            nullable: false,
        }
    }

    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    /// Unique fields are always backed by an index
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self.indexed = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Configured JSON path, or `$.{name}`
    pub fn json_path(&self) -> String {
        match &self.path {
            Some(path) => path.clone(),
            None => default_json_path(&self.name),
        }
    }

    /// Name of the generated column backing an indexed field
    pub fn generated_column(&self) -> String {
        generated_column_name(&self.name)
    }
}

pub(crate) fn default_json_path(field: &str) -> String {
    format!("$.{}", field)
}

pub(crate) fn generated_column_name(field: &str) -> String {
    format!("_{}", field)
}

/// Ordered, name-unique set of field schemas for one collection
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchemaCatalog {
    fields: Vec<FieldSchema>,
    #[serde(skip)]
    by_name: HashMap<String, usize>,
}

impl SchemaCatalog {
    /// Build a catalog, rejecting duplicate, reserved, or non-identifier names
    pub fn new(mut fields: Vec<FieldSchema>) -> Result<Self> {
        let mut by_name = HashMap::with_capacity(fields.len());

        for (i, field) in fields.iter_mut().enumerate() {
            if field.unique {
                field.indexed = true;
            }

            if field.name.is_empty() {
                return Err(Error::InvalidSchema("field name must not be empty".into()));
            }
            if RESERVED_COLUMNS.contains(&field.name.as_str()) {
                return Err(Error::InvalidSchema(format!(
                    "'{}' is a reserved column name",
                    field.name
                )));
            }
            // Indexed names become SQL identifiers
            if field.indexed && !is_identifier(&field.name) {
                return Err(Error::InvalidSchema(format!(
                    "indexed field '{}' must be a plain identifier",
                    field.name
                )));
            }
            if let Some(path) = &field.path {
                if !path.starts_with('$') {
                    return Err(Error::InvalidSchema(format!(
                        "path '{}' of field '{}' must start with '$'",
                        path, field.name
                    )));
                }
            }
            if by_name.insert(field.name.clone(), i).is_some() {
                return Err(Error::InvalidSchema(format!(
                    "duplicate field '{}'",
                    field.name
                )));
            }
        }

        Ok(Self { fields, by_name })
    }

    /// Catalog with no declared fields: every field is JSON-extracted
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a catalog from `{"fields": [...]}` JSON
    pub fn from_json(json: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct CatalogFile {
            fields: Vec<FieldSchema>,
        }

        let file: CatalogFile = serde_json::from_str(json)?;
        Self::new(file.fields)
    }

    pub fn get(&self, name: &str) -> Option<&FieldSchema> {
        self.by_name.get(name).map(|&i| &self.fields[i])
    }

    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
