//! Buffer pool and page table benchmarks.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use vesper_storage::buffer::{BufferPool, BufferPoolConfig, ExtendibleHashTable, LruReplacer};
use vesper_storage::buffer::FrameId;
use vesper_storage::disk::MemDiskManager;

const PAGE_SIZE: usize = 4096;

fn fetch_hit_benchmark(c: &mut Criterion) {
    let config = BufferPoolConfig::new(64).with_page_size(PAGE_SIZE);
    let pool = BufferPool::new(config, Arc::new(MemDiskManager::new(PAGE_SIZE))).unwrap();
    let (page_id, _) = pool.new_page().unwrap();
    pool.unpin_page(page_id, false).unwrap();

    c.bench_function("fetch_hit", |b| {
        b.iter(|| {
            let frame = pool.fetch_page(black_box(page_id)).unwrap();
            black_box(frame.frame_id());
            pool.unpin_page(page_id, false).unwrap();
        })
    });
}

fn fetch_evict_benchmark(c: &mut Criterion) {
    // A pool much smaller than the page set, so every fetch evicts.
    let config = BufferPoolConfig::new(8).with_page_size(PAGE_SIZE);
    let pool = BufferPool::new(config, Arc::new(MemDiskManager::new(PAGE_SIZE))).unwrap();
    let mut ids = Vec::new();
    for _ in 0..64 {
        let (page_id, _) = pool.new_page().unwrap();
        pool.unpin_page(page_id, false).unwrap();
        ids.push(page_id);
    }

    c.bench_function("fetch_evict_64_pages", |b| {
        b.iter(|| {
            for &page_id in &ids {
                let frame = pool.fetch_page(page_id).unwrap();
                black_box(frame.frame_id());
                pool.unpin_page(page_id, false).unwrap();
            }
        })
    });
}

fn page_table_insert_benchmark(c: &mut Criterion) {
    c.bench_function("page_table_insert_1000", |b| {
        b.iter(|| {
            let table: ExtendibleHashTable<u64, u64> = ExtendibleHashTable::new(32);
            for i in 0..1000 {
                table.insert(i, i * 2);
            }
            black_box(table.len())
        })
    });
}

fn page_table_get_benchmark(c: &mut Criterion) {
    let table: ExtendibleHashTable<u64, u64> = ExtendibleHashTable::new(32);
    for i in 0..1000 {
        table.insert(i, i * 2);
    }

    c.bench_function("page_table_get_1000", |b| {
        b.iter(|| {
            for i in 0..1000 {
                black_box(table.get(&i));
            }
        })
    });
}

fn replacer_benchmark(c: &mut Criterion) {
    c.bench_function("replacer_churn_1000", |b| {
        b.iter(|| {
            let mut replacer = LruReplacer::new(1000);
            for i in 0..1000 {
                replacer.insert(FrameId::new(i));
            }
            while let Some(victim) = replacer.victim() {
                black_box(victim);
            }
        })
    });
}

criterion_group!(
    benches,
    fetch_hit_benchmark,
    fetch_evict_benchmark,
    page_table_insert_benchmark,
    page_table_get_benchmark,
    replacer_benchmark
);
criterion_main!(benches);
