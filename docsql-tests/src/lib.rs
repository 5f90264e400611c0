/// Test utilities and helpers for DocSQL testing
///
/// Shared schemas, engines, and filter generators for the integration tests
/// and benchmarks.

use docsql_core::{
    BindValue, FieldSchema, FieldType, Filter, QueryEngine, SchemaCatalog, SqlFragment,
    TranslatorConfig,
};
use std::sync::Arc;

/// Schema used across the integration tests
///
/// `name` and `email` are generated columns, everything else lives in `body`.
pub fn users_schema() -> SchemaCatalog {
    SchemaCatalog::new(vec![
        FieldSchema::new("name", FieldType::Text).indexed(),
        FieldSchema::new("email", FieldType::Text).unique(),
        FieldSchema::new("age", FieldType::Integer),
        FieldSchema::new("score", FieldType::Real),
        FieldSchema::new("active", FieldType::Boolean),
        FieldSchema::new("tags", FieldType::Array),
        FieldSchema::new("address", FieldType::Object),
    ])
    .expect("users schema is valid")
}

/// Engine over `users_schema()` with the default config
pub fn users_engine() -> QueryEngine {
    engine_with(TranslatorConfig::default())
}

pub fn engine_with(config: TranslatorConfig) -> QueryEngine {
    QueryEngine::new(Arc::new(users_schema()), config).expect("Failed to create engine")
}

/// Parse a filter, panicking on invalid input
pub fn filter(json: &str) -> Filter {
    Filter::parse(json).unwrap_or_else(|e| panic!("Invalid filter {}: {}", json, e))
}

/// Translate through the engine, panicking on error
pub fn translate(engine: &QueryEngine, json: &str) -> SqlFragment {
    engine
        .translate(&filter(json))
        .unwrap_or_else(|e| panic!("Failed to translate {}: {}", json, e))
}

/// Generator of structurally distinct filters
pub struct ShapeGenerator {
    counter: u64,
}

impl ShapeGenerator {
    pub fn new() -> Self {
        Self { counter: 0 }
    }

    /// A filter whose shape differs from every other one this generator produced
    pub fn next_filter(&mut self) -> Filter {
        let idx = self.counter;
        self.counter += 1;
        Filter::eq(format!("field{}", idx), idx as i64)
    }
}

impl Default for ShapeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Assert that a fragment has one param per placeholder
pub fn assert_well_formed(fragment: &SqlFragment) {
    assert_eq!(
        fragment.placeholder_count(),
        fragment.params.len(),
        "placeholder/param mismatch in {}",
        fragment.sql
    );
}

/// Assert that a param is text with the expected value
pub fn assert_text_eq(value: &BindValue, expected: &str) {
    match value {
        BindValue::Text(s) => assert_eq!(s, expected),
        _ => panic!("Expected text, got {:?}", value),
    }
}
