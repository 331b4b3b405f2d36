//! Benchmarks for journal writes using criterion.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use strata_core::schema::{Schema, TableBuilder};
use strata_core::{DataType, Value};
use strata_storage::{Journal, Store};

fn schema() -> Schema {
    let table = TableBuilder::new("Quote")
        .unwrap()
        .add_column("id", DataType::Int64)
        .unwrap()
        .add_column("price", DataType::Float64)
        .unwrap()
        .add_column("symbol", DataType::String)
        .unwrap()
        .add_primary_key(&["id"], false)
        .unwrap()
        .add_index("idxPrice", &["price"], false)
        .unwrap()
        .add_index("idxSymbol", &["symbol"], false)
        .unwrap()
        .build()
        .unwrap();
    Schema::new().add_table(table).unwrap()
}

fn insert_commit_benchmark(c: &mut Criterion) {
    let schema = schema();
    let mut group = c.benchmark_group("journal_insert_commit");
    for size in [100i64, 1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let mut store = Store::new(&schema);
                let mut j = Journal::new(&schema, &mut store, &["Quote"]).unwrap();
                let rows = (0..size)
                    .map(|i| {
                        j.create_row(vec![
                            Value::Int64(i),
                            Value::Float64(i as f64 * 0.5),
                            Value::String(format!("S{}", i % 50)),
                        ])
                    })
                    .collect();
                j.insert("Quote", rows).unwrap();
                j.commit().unwrap();
                black_box(store.cache().count("Quote"))
            });
        });
    }
    group.finish();
}

fn rollback_benchmark(c: &mut Criterion) {
    let schema = schema();
    c.bench_function("journal_rollback_1000", |b| {
        b.iter(|| {
            let mut store = Store::new(&schema);
            let mut j = Journal::new(&schema, &mut store, &["Quote"]).unwrap();
            let rows = (0..1000i64)
                .map(|i| j.create_row(vec![Value::Int64(i), Value::Float64(1.0), Value::from("S")]))
                .collect();
            j.insert("Quote", rows).unwrap();
            j.rollback().unwrap();
            black_box(store.cache().count("Quote"))
        });
    });
}

criterion_group!(benches, insert_commit_benchmark, rollback_benchmark);
criterion_main!(benches);
