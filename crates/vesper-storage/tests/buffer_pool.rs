//! End-to-end buffer pool behavior: pool exhaustion, eviction
//! round-trips, flush accounting, the log-durability hook, and a
//! multi-threaded smoke test.

use std::sync::Arc;

use rand::Rng;
use vesper_common::types::{Lsn, PageId};
use vesper_storage::buffer::{BufferError, BufferPool, BufferPoolConfig};
use vesper_storage::disk::{DiskManager, FileDiskManager, MemDiskManager};
use vesper_storage::wal::{LogManager, StubLogManager};

const PAGE_SIZE: usize = 4096;

fn mem_pool(pool_size: usize) -> (BufferPool, Arc<MemDiskManager>) {
    let disk = Arc::new(MemDiskManager::new(PAGE_SIZE));
    let config = BufferPoolConfig::new(pool_size)
        .with_page_size(PAGE_SIZE)
        .with_bucket_size(2);
    let pool = BufferPool::new(config, Arc::clone(&disk) as Arc<dyn DiskManager>).unwrap();
    (pool, disk)
}

#[test]
fn pool_exhaustion_and_frame_reuse() {
    let (pool, _disk) = mem_pool(10);

    // Fill every frame with a pinned page.
    let mut pages = Vec::new();
    for i in 0..10u64 {
        let (page_id, frame) = pool.new_page().unwrap();
        assert_eq!(page_id, PageId::new(i));
        pages.push((page_id, frame));
    }

    // All frames pinned: no page can be created.
    assert!(matches!(pool.new_page(), Err(BufferError::NoFreeFrames)));

    // Unpinning page 0 makes exactly its frame reusable.
    let (page0, frame0) = &pages[0];
    pool.unpin_page(*page0, false).unwrap();

    let (page10, frame) = pool.new_page().unwrap();
    assert_eq!(page10, PageId::new(10));
    assert_eq!(frame.frame_id(), frame0.frame_id());
    assert!(!pool.contains(*page0));
}

#[test]
fn dirty_page_survives_eviction() {
    let (pool, _disk) = mem_pool(3);

    // Allocate four pages so one of them must always be on disk.
    let mut ids = Vec::new();
    for _ in 0..4 {
        let (page_id, _) = pool.new_page().unwrap();
        pool.unpin_page(page_id, false).unwrap();
        ids.push(page_id);
    }

    // Modify the first page and release it dirty.
    let target = ids[0];
    let frame = pool.fetch_page(target).unwrap();
    frame.write_data()[100..108].copy_from_slice(b"vesperdb");
    pool.unpin_page(target, true).unwrap();

    // Cycle the other pages through the pool until the target is gone.
    for &other in &ids[1..] {
        let _ = pool.fetch_page(other).unwrap();
        pool.unpin_page(other, false).unwrap();
    }
    assert!(!pool.contains(target));

    // The modification must come back from disk byte-for-byte.
    let frame = pool.fetch_page(target).unwrap();
    assert_eq!(&frame.read_data()[100..108], b"vesperdb");
    pool.unpin_page(target, false).unwrap();
}

#[test]
fn dirty_page_survives_eviction_through_a_real_file() {
    let dir = tempfile::tempdir().unwrap();
    let disk = Arc::new(FileDiskManager::open(dir.path().join("data.vdb"), PAGE_SIZE).unwrap());
    let config = BufferPoolConfig::new(2).with_page_size(PAGE_SIZE);
    let pool = BufferPool::new(config, disk).unwrap();

    let (target, frame) = pool.new_page().unwrap();
    frame.write_data()[0..4].copy_from_slice(&[9, 9, 9, 9]);
    pool.unpin_page(target, true).unwrap();

    for _ in 0..4 {
        let (page_id, _) = pool.new_page().unwrap();
        pool.unpin_page(page_id, false).unwrap();
    }
    assert!(!pool.contains(target));

    let frame = pool.fetch_page(target).unwrap();
    assert_eq!(&frame.read_data()[0..4], &[9, 9, 9, 9]);
    pool.unpin_page(target, false).unwrap();
}

#[test]
fn flush_issues_exactly_one_write() {
    let (pool, disk) = mem_pool(4);

    let (page_id, frame) = pool.new_page().unwrap();
    frame.write_data()[0] = 1;
    pool.unpin_page(page_id, true).unwrap();
    assert_eq!(disk.writes(), 0);

    pool.flush_page(page_id).unwrap();
    assert_eq!(disk.writes(), 1);

    // A non-resident id fails without touching the disk.
    let before = disk.writes();
    assert!(pool.flush_page(PageId::new(999)).is_err());
    assert_eq!(disk.writes(), before);
}

#[test]
fn fetch_miss_reads_disk_once() {
    let (pool, disk) = mem_pool(4);

    let (page_id, _) = pool.new_page().unwrap();
    pool.unpin_page(page_id, false).unwrap();
    pool.delete_page(page_id).unwrap();

    // Recreate the page on disk so the fetch has something to load.
    disk.write_page(page_id, &vec![7u8; PAGE_SIZE]).unwrap();
    let reads_before = disk.reads();

    let frame = pool.fetch_page(page_id).unwrap();
    assert_eq!(disk.reads(), reads_before + 1);

    // A second fetch is a hit and performs no further read.
    let _again = pool.fetch_page(page_id).unwrap();
    assert_eq!(disk.reads(), reads_before + 1);
    assert_eq!(frame.read_data()[0], 7);

    pool.unpin_page(page_id, false).unwrap();
    pool.unpin_page(page_id, false).unwrap();
}

#[test]
fn unpin_failures_are_reported() {
    let (pool, _disk) = mem_pool(4);

    assert!(matches!(
        pool.unpin_page(PageId::new(3), true),
        Err(BufferError::PageNotResident { .. })
    ));

    let (page_id, _) = pool.new_page().unwrap();
    pool.unpin_page(page_id, false).unwrap();
    assert!(matches!(
        pool.unpin_page(page_id, false),
        Err(BufferError::PageNotPinned { .. })
    ));
}

#[test]
fn log_is_forced_before_write_back() {
    let disk = Arc::new(MemDiskManager::new(PAGE_SIZE));
    let log = Arc::new(StubLogManager::new());
    let config = BufferPoolConfig::new(1).with_page_size(PAGE_SIZE);
    let pool = BufferPool::new(config, Arc::clone(&disk) as Arc<dyn DiskManager>)
        .unwrap()
        .with_log_manager(Arc::clone(&log) as Arc<dyn LogManager>);

    let (page_id, frame) = pool.new_page().unwrap();
    frame.write_data()[0] = 1;
    frame.set_lsn(Lsn::new(42));
    pool.unpin_page(page_id, true).unwrap();

    // Evicting the dirty page must force the log up to its LSN before
    // the data write lands.
    let (other, _) = pool.new_page().unwrap();
    assert_eq!(disk.writes(), 1);
    assert!(log.flushed_lsn() >= Lsn::new(42));
    assert!(log.flush_calls() >= 1);
    pool.unpin_page(other, false).unwrap();
}

#[test]
fn flush_forces_log_too() {
    let disk = Arc::new(MemDiskManager::new(PAGE_SIZE));
    let log = Arc::new(StubLogManager::new());
    let config = BufferPoolConfig::new(4).with_page_size(PAGE_SIZE);
    let pool = BufferPool::new(config, Arc::clone(&disk) as Arc<dyn DiskManager>)
        .unwrap()
        .with_log_manager(Arc::clone(&log) as Arc<dyn LogManager>);

    let (page_id, frame) = pool.new_page().unwrap();
    frame.write_data()[0] = 1;
    frame.set_lsn(Lsn::new(7));
    pool.unpin_page(page_id, true).unwrap();

    pool.flush_page(page_id).unwrap();
    assert_eq!(log.flushed_lsn(), Lsn::new(7));
}

#[test]
fn delete_pinned_page_is_rejected() {
    let (pool, disk) = mem_pool(4);

    let (page_id, _frame) = pool.new_page().unwrap();
    assert!(matches!(
        pool.delete_page(page_id),
        Err(BufferError::PagePinned { .. })
    ));

    // The rejected delete must leave the page resident and the disk
    // allocation alone.
    assert!(pool.contains(page_id));
    assert_eq!(disk.deallocations(), 0);

    // Releasing the pin makes the same call succeed.
    pool.unpin_page(page_id, false).unwrap();
    pool.delete_page(page_id).unwrap();
    assert!(!pool.contains(page_id));
    assert_eq!(disk.deallocations(), 1);
}

#[test]
fn delete_page_deallocates_on_disk() {
    let (pool, disk) = mem_pool(4);

    let (page_id, _) = pool.new_page().unwrap();
    pool.unpin_page(page_id, false).unwrap();
    pool.delete_page(page_id).unwrap();
    assert_eq!(disk.deallocations(), 1);

    // Non-resident deletion still deallocates.
    pool.delete_page(PageId::new(555)).unwrap();
    assert_eq!(disk.deallocations(), 2);
}

#[test]
fn concurrent_fetch_and_unpin_stress() {
    const POOL_FRAMES: usize = 8;
    const PAGES: u64 = 32;
    const THREADS: usize = 4;
    const OPS_PER_THREAD: usize = 500;

    let (pool, _disk) = mem_pool(POOL_FRAMES);
    let pool = Arc::new(pool);

    // Seed the pages; each starts zeroed.
    for _ in 0..PAGES {
        let (page_id, _) = pool.new_page().unwrap();
        pool.unpin_page(page_id, false).unwrap();
    }

    let mut handles = Vec::new();
    for _ in 0..THREADS {
        let pool = Arc::clone(&pool);
        handles.push(std::thread::spawn(move || {
            let mut rng = rand::thread_rng();
            for _ in 0..OPS_PER_THREAD {
                let page_id = PageId::new(rng.gen_range(0..PAGES));
                // Every frame may be pinned by the other threads for a
                // moment; that failure is transient by contract.
                match pool.fetch_page(page_id) {
                    Ok(frame) => {
                        let write = rng.gen_bool(0.5);
                        if write {
                            frame.write_data()[0..8]
                                .copy_from_slice(&page_id.as_u64().to_be_bytes());
                        }
                        pool.unpin_page(page_id, write).unwrap();
                    }
                    Err(e) => assert!(e.is_retryable()),
                }
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    // Quiescent state: nothing pinned, and every page holds either its
    // id stamp or its initial zeroes.
    assert_eq!(pool.stats().pinned_frames, 0);
    for i in 0..PAGES {
        let page_id = PageId::new(i);
        let frame = pool.fetch_page(page_id).unwrap();
        let first = u64::from_be_bytes(frame.read_data()[0..8].try_into().unwrap());
        assert!(first == i || first == 0, "page {i} holds foreign data {first}");
        pool.unpin_page(page_id, false).unwrap();
    }
}
