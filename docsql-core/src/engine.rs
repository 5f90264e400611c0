/// Query engine: filter/option translation with a shared plan cache
///
/// One engine serves one collection. It is `Send + Sync`; share it behind an
/// `Arc` and call it from any number of threads.

use crate::cache::{CacheStats, PlanCache};
use crate::fingerprint::Fingerprint;
use crate::options::{OptionTranslator, QueryOptions};
use crate::plan::CachePlanEntry;
use crate::schema::SchemaCatalog;
use crate::translator::FilterTranslator;
use crate::{Filter, Result, SqlFragment, TranslatorConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Filter translator for one collection, with a shared plan cache
///
/// # Examples
///
/// ```
/// use docsql_core::{BindValue, Filter, FieldSchema, FieldType, QueryEngine, SchemaCatalog};
/// use std::sync::Arc;
///
/// let schema = SchemaCatalog::new(vec![FieldSchema::new("name", FieldType::Text).indexed()]).unwrap();
/// let engine = QueryEngine::new(Arc::new(schema), Default::default()).unwrap();
///
/// let fragment = engine.translate(&Filter::parse(r#"{"name": "Alice"}"#).unwrap()).unwrap();
/// assert_eq!(fragment.sql, "_name = ?");
/// assert_eq!(fragment.params, vec![BindValue::from("Alice")]);
/// ```
pub struct QueryEngine {
    schema: Arc<SchemaCatalog>,
    config: TranslatorConfig,
    cache_enabled: AtomicBool,
    cache: PlanCache,
}

impl QueryEngine {
    /// Create an engine for one collection schema
    pub fn new(schema: Arc<SchemaCatalog>, config: TranslatorConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            schema,
            cache_enabled: AtomicBool::new(config.cache_enabled),
            cache: PlanCache::new(config.cache_capacity),
            config,
        })
    }

    pub fn schema(&self) -> &SchemaCatalog {
        &self.schema
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Translate a filter into a WHERE-clause expression and its params.
    ///
    /// Cacheable filters reuse the SQL template of an earlier filter with the
    /// same shape and only re-extract their literals.
    pub fn translate(&self, filter: &Filter) -> Result<SqlFragment> {
        if !self.is_cache_enabled() {
            return self.translate_uncached(filter);
        }

        let Some(fingerprint) = Fingerprint::compute(filter, self.config.max_depth)? else {
            return self.translate_uncached(filter);
        };

        if let Some(plan) = self.cache.get(&fingerprint) {
            return plan.bind(filter);
        }

        let translation = FilterTranslator::new(&self.schema, &self.config).translate(filter)?;
        self.cache.insert(
            fingerprint,
            CachePlanEntry {
                sql_template: translation.fragment.sql.clone(),
                value_paths: translation.value_paths,
            },
        );
        // The cache may have been disabled (and cleared) since the check above
        if !self.is_cache_enabled() && !self.cache.is_empty() {
            self.cache.clear();
        }

        Ok(translation.fragment)
    }

    /// Translate without consulting or populating the plan cache
    pub fn translate_uncached(&self, filter: &Filter) -> Result<SqlFragment> {
        let translation = FilterTranslator::new(&self.schema, &self.config).translate(filter)?;
        Ok(translation.fragment)
    }

    /// Translate sort/limit/skip into trailing clauses
    pub fn translate_options(&self, options: &QueryOptions) -> Result<SqlFragment> {
        OptionTranslator::translate(options, &self.schema)
    }

    /// Translate a find request into `WHERE <filter> [ORDER BY ...] [LIMIT ?] [OFFSET ?]`.
    ///
    /// Filter params come first, then option params, matching placeholder order.
    pub fn translate_find(&self, filter: &Filter, options: &QueryOptions) -> Result<SqlFragment> {
        let mut fragment = self.translate(filter)?;
        let trailer = self.translate_options(options)?;

        fragment.sql = format!("WHERE {}", fragment.sql);
        if !trailer.sql.is_empty() {
            fragment.sql.push(' ');
            fragment.sql.push_str(&trailer.sql);
        }
        fragment.params.extend(trailer.params);

        Ok(fragment)
    }

    /// Structural fingerprint of `filter`, or `None` if it is never cached
    pub fn fingerprint(&self, filter: &Filter) -> Result<Option<Fingerprint>> {
        Fingerprint::compute(filter, self.config.max_depth)
    }

    pub fn is_cache_enabled(&self) -> bool {
        self.cache_enabled.load(Ordering::Acquire)
    }

    /// Enable or disable the plan cache. Disabling also clears it.
    pub fn set_cache_enabled(&self, enabled: bool) {
        let was = self.cache_enabled.swap(enabled, Ordering::AcqRel);
        if was && !enabled {
            self.cache.clear();
            debug!("Plan cache disabled and cleared");
        }
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSchema, FieldType};
    use crate::{BindValue, Error};

    fn engine(config: TranslatorConfig) -> QueryEngine {
        let schema = SchemaCatalog::new(vec![
            FieldSchema::new("name", FieldType::Text).indexed(),
            FieldSchema::new("age", FieldType::Integer),
            FieldSchema::new("active", FieldType::Boolean),
        ])
        .unwrap();
        QueryEngine::new(Arc::new(schema), config).unwrap()
    }

    fn parse(json: &str) -> Filter {
        Filter::parse(json).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let result = QueryEngine::new(
            Arc::new(SchemaCatalog::empty()),
            TranslatorConfig::new().with_cache_capacity(0),
        );
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_same_shape_shares_template() {
        let engine = engine(TranslatorConfig::default());

        let first = engine.translate(&parse(r#"{"age": {"$gt": 10}}"#)).unwrap();
        let second = engine.translate(&parse(r#"{"age": {"$gt": 99}}"#)).unwrap();

        assert_eq!(first.sql, second.sql);
        assert_eq!(first.params, vec![BindValue::Integer(10)]);
        assert_eq!(second.params, vec![BindValue::Integer(99)]);
        assert_eq!(engine.cache_size(), 1);

        let stats = engine.cache_stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_reordered_keys_get_their_own_template() {
        let engine = engine(TranslatorConfig::default());

        let first = engine.translate(&parse(r#"{"name": "a", "age": 1}"#)).unwrap();
        let second = engine.translate(&parse(r#"{"age": 2, "name": "b"}"#)).unwrap();

        assert_eq!(engine.cache_size(), 2);
        assert_eq!(first.sql, "(_name = ? AND jsonb_extract(body, '$.age') = ?)");
        assert_eq!(second.sql, "(jsonb_extract(body, '$.age') = ? AND _name = ?)");
        assert_eq!(second.params, vec![BindValue::Integer(2), BindValue::from("b")]);
    }

    #[test]
    fn test_transformed_literals_are_rebound() {
        let engine = engine(TranslatorConfig::default());

        engine.translate(&parse(r#"{"name": {"$startsWith": "adm"}}"#)).unwrap();
        let hit = engine.translate(&parse(r#"{"name": {"$startsWith": "usr"}}"#)).unwrap();
        assert_eq!(hit.params, vec![BindValue::from("usr%")]);
        assert_eq!(engine.cache_stats().hits, 1);
    }

    #[test]
    fn test_exists_is_not_confused_by_cache() {
        let engine = engine(TranslatorConfig::default());

        let present = engine.translate(&parse(r#"{"name": {"$exists": true}}"#)).unwrap();
        let absent = engine.translate(&parse(r#"{"name": {"$exists": false}}"#)).unwrap();
        assert!(present.sql.ends_with("IS NOT NULL"));
        assert!(absent.sql.ends_with("IS NULL") && !absent.sql.contains("NOT"));
        assert_eq!(engine.cache_size(), 2);
    }

    #[test]
    fn test_dynamic_filters_bypass_cache() {
        let engine = engine(TranslatorConfig::default());

        let frag = engine.translate(&parse(r#"{"tags": {"$all": ["x", "y"]}}"#)).unwrap();
        assert_eq!(frag.params.len(), 2);
        engine.translate(&parse(r#"{"tags": {"$elemMatch": {"$gt": 1}}}"#)).unwrap();
        engine
            .translate(&parse(r#"{"tags": {"$index": {"index": 0, "condition": "a"}}}"#))
            .unwrap();

        assert_eq!(engine.cache_size(), 0);
        assert_eq!(engine.cache_stats().misses, 0);
    }

    #[test]
    fn test_cache_disabled_matches_enabled() {
        let cached = engine(TranslatorConfig::default());
        let uncached = engine(TranslatorConfig::new().without_cache());

        for json in [
            r#"{"age": {"$gte": 18, "$lt": 65}}"#,
            r#"{"age": {"$lt": 30, "$gte": 20}}"#,
            r#"{"$or": [{"name": "a"}, {"age": {"$in": [1, 2]}}]}"#,
            r#"{"$or": [{"name": "b"}, {"age": {"$in": [3, 4]}}]}"#,
        ] {
            let filter = parse(json);
            assert_eq!(cached.translate(&filter).unwrap(), uncached.translate(&filter).unwrap());
        }
        assert_eq!(uncached.cache_size(), 0);
    }

    #[test]
    fn test_errors_are_identical_with_and_without_cache() {
        let cached = engine(TranslatorConfig::default());
        let filter = parse(r#"{"active": {"$gt": true}}"#);

        for _ in 0..2 {
            assert!(matches!(cached.translate(&filter), Err(Error::TypeMismatch(_))));
        }
        assert_eq!(cached.cache_size(), 0);
    }

    #[test]
    fn test_set_cache_enabled_clears() {
        let engine = engine(TranslatorConfig::default());
        engine.translate(&parse(r#"{"age": 1}"#)).unwrap();
        assert_eq!(engine.cache_size(), 1);

        engine.set_cache_enabled(false);
        assert!(!engine.is_cache_enabled());
        assert_eq!(engine.cache_size(), 0);
        engine.translate(&parse(r#"{"age": 1}"#)).unwrap();
        assert_eq!(engine.cache_size(), 0);

        engine.set_cache_enabled(true);
        engine.translate(&parse(r#"{"age": 1}"#)).unwrap();
        assert_eq!(engine.cache_size(), 1);

        engine.clear_cache();
        assert_eq!(engine.cache_size(), 0);
    }

    #[test]
    fn test_disable_during_translation_leaves_cache_empty() {
        let engine = Arc::new(engine(TranslatorConfig::default()));
        let filters: Vec<Filter> = (0..200)
            .map(|i| parse(&format!(r#"{{"f{}": {}}}"#, i, i)))
            .collect();

        for _ in 0..20 {
            engine.set_cache_enabled(true);
            let worker = {
                let engine = Arc::clone(&engine);
                let filters = filters.clone();
                std::thread::spawn(move || {
                    for filter in &filters {
                        engine.translate(filter).unwrap();
                    }
                })
            };
            engine.set_cache_enabled(false);
            worker.join().unwrap();

            assert!(!engine.is_cache_enabled());
            assert_eq!(engine.cache_size(), 0);
        }
    }

    #[test]
    fn test_translate_find() {
        let engine = engine(TranslatorConfig::default());
        let options = QueryOptions::new().sort_desc("age").limit(10).skip(5);

        let frag = engine.translate_find(&parse(r#"{"name": "x"}"#), &options).unwrap();
        assert_eq!(
            frag.sql,
            "WHERE _name = ? ORDER BY jsonb_extract(body, '$.age') DESC LIMIT ? OFFSET ?"
        );
        assert_eq!(
            frag.params,
            vec![BindValue::from("x"), BindValue::Integer(10), BindValue::Integer(5)]
        );

        let frag = engine.translate_find(&Filter::MatchAll, &QueryOptions::new()).unwrap();
        assert_eq!(frag.sql, "WHERE 1=1");
    }

    #[test]
    fn test_engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<QueryEngine>();
    }
}
