/// Performance benchmarks for DocSQL translation
///
/// Run with: cargo bench -p docsql-tests

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use docsql_core::{Filter, QueryOptions, TranslatorConfig};
use docsql_test_utils::{engine_with, filter, users_engine, ShapeGenerator};

const FILTERS: [(&str, &str); 3] = [
    ("simple", r#"{"name": "Alice"}"#),
    ("range", r#"{"age": {"$gte": 18, "$lt": 65}, "active": true}"#),
    (
        "nested",
        r#"{"$or": [
            {"$and": [{"age": {"$gte": 18}}, {"email": {"$endsWith": ".org"}}]},
            {"$nor": [{"name": {"$in": ["a", "b", "c", "d"]}}, {"score": {"$lt": 1.5}}]}
        ]}"#,
    ),
];

fn bench_translate_cold(c: &mut Criterion) {
    let mut group = c.benchmark_group("translate_cold");
    let engine = engine_with(TranslatorConfig::new().without_cache());

    for (name, json) in FILTERS {
        let parsed = filter(json);
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("filter", name), &parsed, |b, parsed| {
            b.iter(|| engine.translate(black_box(parsed)).unwrap());
        });
    }
    group.finish();
}

fn bench_translate_warm(c: &mut Criterion) {
    let mut group = c.benchmark_group("translate_warm");
    let engine = users_engine();

    for (name, json) in FILTERS {
        let parsed = filter(json);
        engine.translate(&parsed).unwrap();

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("filter", name), &parsed, |b, parsed| {
            b.iter(|| engine.translate(black_box(parsed)).unwrap());
        });
    }
    group.finish();
}

fn bench_cache_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_churn");

    for capacity in [10, 100, 500] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::new("capacity", capacity),
            &capacity,
            |b, &capacity| {
                let engine = engine_with(TranslatorConfig::new().with_cache_capacity(capacity));
                let mut gen = ShapeGenerator::new();
                let shapes: Vec<Filter> = (0..capacity * 2).map(|_| gen.next_filter()).collect();

                let mut i = 0;
                b.iter(|| {
                    engine.translate(black_box(&shapes[i % shapes.len()])).unwrap();
                    i += 1;
                });
            },
        );
    }
    group.finish();
}

fn bench_parse_and_find(c: &mut Criterion) {
    let engine = users_engine();
    let options = QueryOptions::new().sort_desc("age").limit(50).skip(100);

    c.bench_function("parse_and_find", |b| {
        b.iter(|| {
            let parsed = Filter::parse(black_box(FILTERS[2].1)).unwrap();
            engine.translate_find(&parsed, &options).unwrap()
        });
    });
}

criterion_group!(
    benches,
    bench_translate_cold,
    bench_translate_warm,
    bench_cache_churn,
    bench_parse_and_find
);
criterion_main!(benches);
