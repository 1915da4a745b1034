use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use docvalues::core::types::{DocId, Document};
use docvalues::table::{MemTable, Table};
use docvalues::values::manager::ValueManager;
use rand::Rng;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Helper to create a document with `slots` random byte-string values
fn create_test_document(id: u64, slots: u32, value_size: usize) -> Document {
    let mut rng = rand::thread_rng();
    let mut doc = Document::new(DocId(id));
    for slot in 0..slots {
        let value: Vec<u8> = (0..value_size).map(|_| rng.gen_range(b'a'..=b'z')).collect();
        doc.add_value(slot, value).unwrap();
    }
    doc
}

fn new_manager() -> ValueManager {
    let postlist: Arc<dyn Table> = Arc::new(MemTable::new());
    let termlist: Arc<dyn Table> = Arc::new(MemTable::new());
    ValueManager::new(postlist, termlist)
}

/// Benchmark adding documents and merging the batch
fn bench_add_and_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_and_merge");
    for &batch_size in &[100u64, 1000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            &batch_size,
            |b, &batch_size| {
                b.iter(|| {
                    let mut manager = new_manager();
                    let mut stats = BTreeMap::new();
                    for id in 1..=batch_size {
                        let doc = create_test_document(id, 3, 16);
                        manager.add_document(DocId(id), &doc, &mut stats).unwrap();
                    }
                    manager.set_value_stats(&mut stats).unwrap();
                    manager.merge_changes().unwrap();
                    black_box(manager)
                });
            },
        );
    }
    group.finish();
}

/// Benchmark point reads against a populated manager
fn bench_get_value(c: &mut Criterion) {
    let mut manager = new_manager();
    let mut stats = BTreeMap::new();
    for id in 1..=1000u64 {
        let doc = create_test_document(id, 3, 16);
        manager.add_document(DocId(id), &doc, &mut stats).unwrap();
    }
    manager.set_value_stats(&mut stats).unwrap();
    manager.merge_changes().unwrap();

    let mut rng = rand::thread_rng();
    c.bench_function("get_value", |b| {
        b.iter(|| {
            let did = rng.gen_range(1..=1000u64);
            let slot = rng.gen_range(0..3u32);
            black_box(manager.get_value(DocId(did), slot).unwrap())
        });
    });
}

criterion_group!(benches, bench_add_and_merge, bench_get_value);
criterion_main!(benches);
