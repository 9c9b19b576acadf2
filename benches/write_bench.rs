// Write performance benchmarks for blockstore

use blockstore::{create, hash256, BlockStore, DataKind, FileBlockStore, Hash256, Options};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use std::hint::black_box;
use tempfile::TempDir;

fn random_blocks(count: usize, len: usize) -> Vec<(Hash256, Vec<u8>)> {
    let mut rng = rand::rng();
    (0..count)
        .map(|_| {
            let mut data = vec![0u8; len];
            rng.fill(&mut data[..]);
            (hash256(&data[..80]), data)
        })
        .collect()
}

fn benchmark_block_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("block_write");

    for len in [1_000usize, 100_000, 1_000_000].iter() {
        let blocks = random_blocks(50, *len);
        group.throughput(Throughput::Bytes((*len * blocks.len()) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), len, |b, _| {
            b.iter(|| {
                let temp_dir = TempDir::new().unwrap();
                let mut store = FileBlockStore::new(Options::new(temp_dir.path())).unwrap();
                store.ensure().unwrap();
                store.open().unwrap();

                for (hash, data) in &blocks {
                    store.write(DataKind::Block, hash, data).unwrap();
                }

                black_box(&store);
            });
        });
    }

    group.finish();
}

fn benchmark_rotation(c: &mut Criterion) {
    let mut group = c.benchmark_group("rotation");
    let blocks = random_blocks(200, 10_000);

    for max in [64 * 1024u64, 1024 * 1024].iter() {
        group.throughput(Throughput::Elements(blocks.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(max), max, |b, &max| {
            b.iter(|| {
                let temp_dir = TempDir::new().unwrap();
                let options = Options::new(temp_dir.path()).max_file_length(max);
                let mut store = FileBlockStore::new(options).unwrap();
                store.ensure().unwrap();
                store.open().unwrap();

                for (hash, data) in &blocks {
                    store.write_block(hash, data).unwrap();
                }

                black_box(store.latest_file(DataKind::Block).unwrap());
            });
        });
    }

    group.finish();
}

fn benchmark_backends(c: &mut Criterion) {
    let mut group = c.benchmark_group("backend_undo_write");
    let undo = random_blocks(500, 2_000);
    group.throughput(Throughput::Elements(undo.len() as u64));

    for (name, memory) in [("file", false), ("kv", true)] {
        group.bench_function(name, |b| {
            b.iter(|| {
                let temp_dir = TempDir::new().unwrap();
                let mut store = create(Options::new(temp_dir.path()).memory(memory)).unwrap();
                store.ensure().unwrap();
                store.open().unwrap();

                for (hash, data) in &undo {
                    store.write_undo(hash, data).unwrap();
                }

                black_box(&store);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_block_write, benchmark_rotation, benchmark_backends);
criterion_main!(benches);
