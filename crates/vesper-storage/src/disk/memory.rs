//! In-memory disk manager for tests.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use vesper_common::types::PageId;

use super::DiskManager;

/// Keeps pages in a hash map and counts every operation, so tests can
/// assert exactly how the buffer pool drove its disk.
pub struct MemDiskManager {
    pages: Mutex<HashMap<PageId, Box<[u8]>>>,
    page_size: usize,
    next_page_id: AtomicU64,
    reads: AtomicU64,
    writes: AtomicU64,
    deallocations: AtomicU64,
}

impl MemDiskManager {
    /// Creates an empty in-memory disk.
    pub fn new(page_size: usize) -> Self {
        Self {
            pages: Mutex::new(HashMap::new()),
            page_size,
            next_page_id: AtomicU64::new(0),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            deallocations: AtomicU64::new(0),
        }
    }

    /// Number of `read_page` calls observed.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of `write_page` calls observed.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of `deallocate_page` calls observed.
    pub fn deallocations(&self) -> u64 {
        self.deallocations.load(Ordering::SeqCst)
    }
}

impl DiskManager for MemDiskManager {
    fn allocate_page(&self) -> PageId {
        PageId::new(self.next_page_id.fetch_add(1, Ordering::SeqCst))
    }

    fn deallocate_page(&self, page_id: PageId) {
        self.deallocations.fetch_add(1, Ordering::SeqCst);
        self.pages.lock().remove(&page_id);
    }

    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> io::Result<()> {
        debug_assert_eq!(buf.len(), self.page_size);
        self.reads.fetch_add(1, Ordering::SeqCst);
        match self.pages.lock().get(&page_id) {
            Some(page) => buf.copy_from_slice(page),
            // Allocated but never written.
            None => buf.fill(0),
        }
        Ok(())
    }

    fn write_page(&self, page_id: PageId, buf: &[u8]) -> io::Result<()> {
        debug_assert_eq!(buf.len(), self.page_size);
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.pages.lock().insert(page_id, buf.to_vec().into_boxed_slice());
        Ok(())
    }
}

impl std::fmt::Debug for MemDiskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemDiskManager")
            .field("page_size", &self.page_size)
            .field("pages", &self.pages.lock().len())
            .field("reads", &self.reads())
            .field("writes", &self.writes())
            .finish()
    }
}
