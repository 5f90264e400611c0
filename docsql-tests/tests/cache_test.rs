/// Plan cache integration tests
///
/// Cold vs warm translation, eviction, and equivalence with the cache off.

use docsql_core::{BindValue, TranslatorConfig};
use docsql_test_utils::*;

#[test]
fn test_warm_cache_rebinds_params() {
    let engine = users_engine();

    let cold = translate(&engine, r#"{"age": {"$gt": 10}}"#);
    let warm = translate(&engine, r#"{"age": {"$gt": 99}}"#);

    assert_eq!(cold.sql, warm.sql);
    assert_eq!(cold.params, vec![BindValue::Integer(10)]);
    assert_eq!(warm.params, vec![BindValue::Integer(99)]);
    assert_eq!(engine.cache_size(), 1);
    assert_eq!(
        engine.fingerprint(&filter(r#"{"age": {"$gt": 10}}"#)).unwrap(),
        engine.fingerprint(&filter(r#"{"age": {"$gt": 99}}"#)).unwrap()
    );
}

#[test]
fn test_warm_cache_on_nested_shapes() {
    let engine = users_engine();

    let shapes = [
        (
            r#"{"$or": [{"name": {"$in": ["a", "b"]}}, {"email": {"$contains": "x"}}], "active": true}"#,
            r#"{"$or": [{"name": {"$in": ["c", "d"]}}, {"email": {"$contains": "y"}}], "active": false}"#,
        ),
        (
            r#"{"$not": {"score": {"$gte": 1.5, "$lte": 2.5}}}"#,
            r#"{"$not": {"score": {"$gte": 8.5, "$lte": 9.5}}}"#,
        ),
        (
            r#"{"name": {"$ilike": "al%"}, "tags": {"$size": 2}}"#,
            r#"{"name": {"$ilike": "bo_"}, "tags": {"$size": 5}}"#,
        ),
    ];

    for (first, second) in shapes {
        engine.clear_cache();
        let reference = engine_with(TranslatorConfig::new().without_cache());

        let cold = translate(&engine, first);
        let warm = translate(&engine, second);

        assert_eq!(cold.sql, warm.sql, "{} / {}", first, second);
        assert_eq!(cold, reference.translate(&filter(first)).unwrap());
        assert_eq!(warm, reference.translate(&filter(second)).unwrap());
        assert_eq!(engine.cache_size(), 1);
        assert_well_formed(&warm);
    }
}

#[test]
fn test_key_order_is_part_of_shape() {
    let engine = users_engine();
    let reference = engine_with(TranslatorConfig::new().without_cache());

    for json in [r#"{"name": "a", "age": 1}"#, r#"{"age": 2, "name": "b"}"#] {
        assert_eq!(translate(&engine, json), translate(&reference, json));
    }
    assert_eq!(engine.cache_size(), 2);
}

#[test]
fn test_exists_never_shares_template() {
    let engine = users_engine();

    let present = translate(&engine, r#"{"email": {"$exists": true}}"#);
    let absent = translate(&engine, r#"{"email": {"$exists": false}}"#);

    assert_ne!(present.sql, absent.sql);
    assert_eq!(engine.cache_size(), 2);
}

#[test]
fn test_list_length_is_part_of_shape() {
    let engine = users_engine();

    let two = translate(&engine, r#"{"age": {"$in": [1, 2]}}"#);
    let three = translate(&engine, r#"{"age": {"$in": [1, 2, 3]}}"#);

    assert_eq!(two.placeholder_count(), 2);
    assert_eq!(three.placeholder_count(), 3);
    assert_eq!(engine.cache_size(), 2);
}

#[test]
fn test_fifo_eviction_at_capacity() {
    let engine = users_engine();
    let capacity = engine.config().cache_capacity;
    assert_eq!(capacity, 500);

    let mut gen = ShapeGenerator::new();
    let first = gen.next_filter();
    engine.translate(&first).unwrap();

    for _ in 0..capacity {
        engine.translate(&gen.next_filter()).unwrap();
    }
    assert_eq!(engine.cache_size(), capacity);
    assert_eq!(engine.cache_stats().evictions, 1);

    // The first shape was evicted, so this is a miss that evicts the next oldest
    let misses = engine.cache_stats().misses;
    engine.translate(&first).unwrap();
    assert_eq!(engine.cache_stats().misses, misses + 1);
    assert_eq!(engine.cache_size(), capacity);
}

#[test]
fn test_small_capacity() {
    let engine = engine_with(TranslatorConfig::new().with_cache_capacity(2));

    translate(&engine, r#"{"a": 1}"#);
    translate(&engine, r#"{"b": 1}"#);
    translate(&engine, r#"{"c": 1}"#);

    assert_eq!(engine.cache_size(), 2);
    let stats = engine.cache_stats();
    assert_eq!(stats.capacity, 2);
    assert_eq!(stats.evictions, 1);
}

#[test]
fn test_uncacheable_filters_skip_cache() {
    let engine = users_engine();

    translate(&engine, r#"{"tags": {"$all": ["x"]}}"#);
    translate(&engine, r#"{"tags": {"$elemMatch": {"label": "a"}}}"#);
    translate(&engine, r#"{"tags": {"$index": {"index": 1, "condition": {"$gt": 3}}}}"#);

    assert_eq!(engine.cache_size(), 0);
    assert_eq!(engine.cache_stats().hits + engine.cache_stats().misses, 0);
}

#[test]
fn test_toggle_cache() {
    let engine = users_engine();
    translate(&engine, r#"{"name": "a"}"#);

    engine.set_cache_enabled(false);
    assert_eq!(engine.cache_size(), 0);
    let uncached = translate(&engine, r#"{"name": "b"}"#);
    assert_eq!(engine.cache_size(), 0);

    engine.set_cache_enabled(true);
    let cached = translate(&engine, r#"{"name": "b"}"#);
    assert_eq!(uncached, cached);
    assert_eq!(engine.cache_size(), 1);
}
