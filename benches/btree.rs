//! B+tree benchmarks over the in-memory page store.
//!
//! These isolate the tree algorithms (descent, copy-on-write rebuild,
//! split, merge) from file I/O.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mossdb::btree::BTree;
use mossdb::storage::MemStore;
use rand::prelude::*;

fn populated(count: usize) -> BTree<MemStore> {
    let mut tree = BTree::new(MemStore::new());
    for i in 0..count {
        let key = format!("key{:08}", i);
        let value = format!("value{:08}", i);
        tree.insert(key.as_bytes(), value.as_bytes()).unwrap();
    }
    tree
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("btree_insert");

    for count in [100usize, 1000].iter() {
        group.throughput(Throughput::Elements(*count as u64));

        group.bench_with_input(BenchmarkId::new("sequential", count), count, |b, &count| {
            b.iter(|| {
                let mut tree = BTree::new(MemStore::new());
                for i in 0..count {
                    let key = format!("key{:08}", i);
                    let value = format!("value{:08}", i);
                    tree.insert(key.as_bytes(), value.as_bytes()).unwrap();
                }
                black_box(tree.root())
            });
        });

        group.bench_with_input(BenchmarkId::new("random", count), count, |b, &count| {
            let mut rng = StdRng::seed_from_u64(42);
            let mut order: Vec<usize> = (0..count).collect();
            order.shuffle(&mut rng);

            b.iter(|| {
                let mut tree = BTree::new(MemStore::new());
                for &i in &order {
                    let key = format!("key{:08}", i);
                    let value = format!("value{:08}", i);
                    tree.insert(key.as_bytes(), value.as_bytes()).unwrap();
                }
                black_box(tree.root())
            });
        });
    }

    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("btree_get");

    for count in [100usize, 1000].iter() {
        let tree = populated(*count);

        group.bench_with_input(BenchmarkId::new("existing_key", count), count, |b, &count| {
            let mut i = 0usize;
            b.iter(|| {
                let key = format!("key{:08}", i % count);
                i += 1;
                black_box(tree.search(key.as_bytes()).unwrap())
            });
        });

        group.bench_with_input(BenchmarkId::new("missing_key", count), count, |b, _| {
            b.iter(|| black_box(tree.search(b"key-none").unwrap()));
        });
    }

    group.finish();
}

fn bench_traverse(c: &mut Criterion) {
    let mut group = c.benchmark_group("btree_traverse");

    for count in [1000usize].iter() {
        let tree = populated(*count);
        group.throughput(Throughput::Elements(*count as u64));

        group.bench_with_input(BenchmarkId::new("full_scan", count), count, |b, _| {
            b.iter(|| {
                let mut total = 0usize;
                tree.traverse(|key, value| total += key.len() + value.len())
                    .unwrap();
                black_box(total)
            });
        });
    }

    group.finish();
}

fn bench_delete(c: &mut Criterion) {
    let mut group = c.benchmark_group("btree_delete");

    for count in [1000usize].iter() {
        group.throughput(Throughput::Elements(*count as u64));

        group.bench_with_input(BenchmarkId::new("drain", count), count, |b, &count| {
            b.iter_with_setup(
                || populated(count),
                |mut tree| {
                    for i in 0..count {
                        let key = format!("key{:08}", i);
                        tree.delete(key.as_bytes()).unwrap();
                    }
                    black_box(tree.root())
                },
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_insert, bench_get, bench_traverse, bench_delete);
criterion_main!(benches);
