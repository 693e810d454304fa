//! Criterion benchmarks for the key-value store.
//!
//! # Benchmark Categories
//!
//! - **Codec**: encode/decode of raw and structured values
//! - **Records**: single-key set and get on a file-backed store
//! - **Batch**: multi-set transaction size scaling
//! - **Queries**: pattern listing and counting
//!
//! # Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench --bench store_bench
//!
//! # Run specific benchmark group
//! cargo bench --bench store_bench -- batch
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use keystash::{Entry, KvStore, Value, codec};
use serde_json::json;
use std::hint::black_box;
use tempfile::TempDir;

fn file_store() -> (TempDir, KvStore) {
    let tmp = TempDir::new().unwrap();
    let store = KvStore::open(tmp.path().join("bench.db")).unwrap();
    (tmp, store)
}

// =============================================================================
// Codec Benchmarks
// =============================================================================

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    let raw = Value::Raw(vec![7u8; 1024]);
    let doc = Value::structured(json!({
        "id": 42,
        "name": "alice",
        "roles": ["admin", "ops"],
        "limits": {"rps": 100, "burst": 2.5}
    }));

    for (name, value) in [("raw_1k", &raw), ("structured", &doc)] {
        let encoded = codec::encode(value).unwrap();
        group.throughput(Throughput::Bytes(encoded.len() as u64));
        group.bench_function(BenchmarkId::new("encode", name), |b| {
            b.iter(|| codec::encode(black_box(value)).unwrap());
        });
        group.bench_function(BenchmarkId::new("decode", name), |b| {
            b.iter(|| codec::decode(black_box(&encoded)).unwrap());
        });
    }

    group.finish();
}

// =============================================================================
// Record Benchmarks
// =============================================================================

fn bench_records(c: &mut Criterion) {
    let mut group = c.benchmark_group("records");
    let (_tmp, store) = file_store();

    group.bench_function("set", |b| {
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            store.set(&format!("key:{}", i % 1024), "value", None).unwrap();
        });
    });

    store.set("hot", json!({"a": 1}), None).unwrap();
    group.bench_function("get_hit", |b| {
        b.iter(|| store.get(black_box("hot")).unwrap());
    });
    group.bench_function("get_miss", |b| {
        b.iter(|| store.get(black_box("missing")).unwrap());
    });

    group.finish();
}

// =============================================================================
// Batch Benchmarks
// =============================================================================

fn bench_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch");
    let (_tmp, store) = file_store();

    for size in [10usize, 100, 1000] {
        let entries: Vec<Entry> = (0..size)
            .map(|i| Entry::new(format!("batch:{i}"), i as i64))
            .collect();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("multi_set", size), &entries, |b, entries| {
            b.iter(|| store.multi_set(black_box(entries)).unwrap());
        });
    }

    group.finish();
}

// =============================================================================
// Query Benchmarks
// =============================================================================

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("queries");
    let (_tmp, store) = file_store();

    let entries: Vec<Entry> = (0..5000)
        .map(|i| Entry::new(format!("{}:{i:05}", if i % 2 == 0 { "user" } else { "session" }), i))
        .collect();
    store.multi_set(&entries).unwrap();

    group.bench_function("keys_prefix", |b| {
        b.iter(|| store.keys(black_box("user:%")).unwrap());
    });
    group.bench_function("pagination", |b| {
        b.iter(|| store.pagination(50, black_box(10), "session:%").unwrap());
    });
    group.bench_function("count", |b| {
        b.iter(|| store.count(black_box("%")).unwrap());
    });
    group.bench_function("count_expired", |b| {
        b.iter(|| store.count_expired(black_box("%")).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_codec, bench_records, bench_batch, bench_queries);
criterion_main!(benches);
