/// Concurrent access integration tests for DocSQL
///
/// Many threads share one engine and its plan cache. Every thread must get
/// its own literals back, whichever thread populated the template.

use docsql_core::{BindValue, Filter, TranslatorConfig};
use docsql_test_utils::*;
use std::sync::Arc;
use std::thread;

#[test]
fn test_concurrent_same_shape() {
    let engine = Arc::new(users_engine());

    let num_threads = 16;
    let translations_per_thread = 200;

    let mut handles = vec![];

    for thread_id in 0..num_threads {
        let engine = Arc::clone(&engine);
        let handle = thread::spawn(move || {
            for i in 0..translations_per_thread {
                let age = (thread_id * 1000 + i) as i64;
                let name = format!("user-{}-{}", thread_id, i);
                let filter = Filter::document(vec![
                    Filter::eq("name", name.as_str()),
                    Filter::eq("age", age),
                ]);

                let frag = engine.translate(&filter).unwrap();
                assert_eq!(frag.sql, "(_name = ? AND jsonb_extract(body, '$.age') = ?)");
                assert_eq!(frag.params, vec![BindValue::from(name), BindValue::Integer(age)]);
            }
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(engine.cache_size(), 1);
    let stats = engine.cache_stats();
    assert_eq!(stats.hits + stats.misses, (num_threads * translations_per_thread) as u64);
}

#[test]
fn test_concurrent_distinct_shapes_with_eviction() {
    let capacity = 50;
    let engine = Arc::new(engine_with(TranslatorConfig::new().with_cache_capacity(capacity)));

    let num_threads = 8;
    let mut handles = vec![];

    for thread_id in 0..num_threads {
        let engine = Arc::clone(&engine);
        let handle = thread::spawn(move || {
            for i in 0..100i64 {
                let field = format!("f{}_{}", thread_id, i % 20);
                let frag = engine.translate(&Filter::eq(field.as_str(), i)).unwrap();
                assert_eq!(frag.sql, format!("jsonb_extract(body, '$.{}') = ?", field));
                assert_eq!(frag.params, vec![BindValue::Integer(i)]);
            }
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(engine.cache_size() <= capacity);
}

#[test]
fn test_concurrent_toggle() {
    let engine = Arc::new(users_engine());

    let toggler = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for i in 0..100 {
                engine.set_cache_enabled(i % 2 == 0);
            }
            engine.set_cache_enabled(true);
        })
    };

    let mut handles = vec![toggler];
    for thread_id in 0..4i64 {
        let engine = Arc::clone(&engine);
        handles.push(thread::spawn(move || {
            for i in 0..200i64 {
                let frag = engine
                    .translate(&Filter::eq("age", thread_id * 1000 + i))
                    .unwrap();
                assert_eq!(frag.params, vec![BindValue::Integer(thread_id * 1000 + i)]);
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(engine.is_cache_enabled());
}
