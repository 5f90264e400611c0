pub mod error;
pub mod types;
pub mod config;
pub mod schema;
pub mod resolver; // generated column vs JSON extraction
pub mod filter;
pub mod plan;
pub mod translator;
pub mod options;
pub mod fingerprint;
pub mod cache;
pub mod engine;

pub use error::{Error, Result};
pub use types::*;
pub use config::TranslatorConfig;
pub use schema::{FieldSchema, FieldType, SchemaCatalog};
pub use filter::{Condition, ElemMatch, FieldCondition, Filter, LogicalOp, Operator};
pub use options::{QueryOptions, SortDirection, SortKey};
pub use engine::QueryEngine;
