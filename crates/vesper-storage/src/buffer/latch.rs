//! RAII page guards.
//!
//! A pin must be released with exactly one matching unpin on every exit
//! path. These guards encode that contract: they hold the pin for their
//! lifetime and release it on drop, the write guard carrying the dirty
//! bit it accumulated into the unpin.

use std::sync::Arc;

use vesper_common::types::{Lsn, PageId};

use super::frame::Frame;
use super::pool::BufferPool;

/// Read guard for a pinned page.
///
/// Provides shared access to the payload and unpins (clean) on drop.
pub struct PageReadGuard<'a> {
    pool: &'a BufferPool,
    frame: Arc<Frame>,
    page_id: PageId,
}

impl<'a> PageReadGuard<'a> {
    pub(crate) fn new(pool: &'a BufferPool, frame: Arc<Frame>) -> Self {
        let page_id = frame.page_id();
        Self {
            pool,
            frame,
            page_id,
        }
    }

    /// Returns the page ID.
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Returns a read lock on the page payload.
    #[inline]
    pub fn data(&self) -> parking_lot::RwLockReadGuard<'_, Box<[u8]>> {
        self.frame.read_data()
    }
}

impl Drop for PageReadGuard<'_> {
    fn drop(&mut self) {
        let _ = self.pool.unpin_page(self.page_id, false);
    }
}

impl std::fmt::Debug for PageReadGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageReadGuard")
            .field("page_id", &self.page_id)
            .finish()
    }
}

/// Write guard for a pinned page.
///
/// Provides exclusive access to the payload; taking a mutable reference
/// marks the page dirty, and the drop passes the accumulated dirty bit
/// to the unpin.
pub struct PageWriteGuard<'a> {
    pool: &'a BufferPool,
    frame: Arc<Frame>,
    page_id: PageId,
    dirty: bool,
}

impl<'a> PageWriteGuard<'a> {
    pub(crate) fn new(pool: &'a BufferPool, frame: Arc<Frame>) -> Self {
        let page_id = frame.page_id();
        Self {
            pool,
            frame,
            page_id,
            dirty: false,
        }
    }

    /// Returns the page ID.
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Returns a read lock on the page payload.
    #[inline]
    pub fn data(&self) -> parking_lot::RwLockReadGuard<'_, Box<[u8]>> {
        self.frame.read_data()
    }

    /// Returns a write lock on the page payload, marking the page
    /// dirty.
    #[inline]
    pub fn data_mut(&mut self) -> parking_lot::RwLockWriteGuard<'_, Box<[u8]>> {
        self.dirty = true;
        self.frame.write_data()
    }

    /// Marks the page dirty without touching the payload.
    #[inline]
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Records the LSN of the modification this guard covers, for the
    /// write-ahead-log hook.
    #[inline]
    pub fn set_lsn(&self, lsn: Lsn) {
        self.frame.set_lsn(lsn);
    }

    /// Returns true if the payload was modified through this guard.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

impl Drop for PageWriteGuard<'_> {
    fn drop(&mut self) {
        let _ = self.pool.unpin_page(self.page_id, self.dirty);
    }
}

impl std::fmt::Debug for PageWriteGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageWriteGuard")
            .field("page_id", &self.page_id)
            .field("dirty", &self.dirty)
            .finish()
    }
}
