//! Buffer pool implementation.
//!
//! The pool owns the frame array and orchestrates every page movement
//! between memory and the disk manager: fetching, allocation, pinning,
//! write-back, and deletion.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};
use vesper_common::types::{Lsn, PageId};

use super::config::BufferPoolConfig;
use super::error::{BufferError, BufferResult};
use super::frame::{Frame, FrameId};
use super::latch::{PageReadGuard, PageWriteGuard};
use super::page_table::ExtendibleHashTable;
use super::replacer::LruReplacer;
use super::BufferPoolStats;
use crate::disk::DiskManager;
use crate::wal::LogManager;

/// Frame bookkeeping guarded by the pool mutex.
///
/// A frame is in exactly one of three places: the free list (never
/// loaded), the replacer (loaded, unpinned), or pinned in use (in
/// neither).
struct PoolState {
    free_list: VecDeque<FrameId>,
    replacer: LruReplacer,
}

/// The buffer pool mediates page access between the access methods and
/// the disk manager.
///
/// All operations are thread-safe: a single pool mutex serializes the
/// bookkeeping (free list, replacer, frame metadata transitions), and
/// the page table additionally guards itself. Clients gain the right to
/// read or mutate a frame's payload by holding a pin obtained from
/// [`BufferPool::fetch_page`] or [`BufferPool::new_page`], and must
/// release it with exactly one matching [`BufferPool::unpin_page`] —
/// or use the RAII guards, which do so automatically.
pub struct BufferPool {
    /// Configuration.
    config: BufferPoolConfig,
    /// Pre-allocated frame array; addresses are stable for the pool's
    /// lifetime.
    frames: Vec<Arc<Frame>>,
    /// Free list and replacer.
    state: Mutex<PoolState>,
    /// Page table: maps PageId -> FrameId.
    page_table: ExtendibleHashTable<PageId, FrameId>,
    /// Disk manager for physical page I/O.
    disk: Arc<dyn DiskManager>,
    /// Optional log manager; when attached, the log is forced up to a
    /// dirty page's LSN before that page is written back.
    log: Option<Arc<dyn LogManager>>,
    /// Fetch counter for statistics.
    fetches: AtomicU64,
    /// Hit counter for statistics.
    hits: AtomicU64,
    /// Miss counter for statistics.
    misses: AtomicU64,
    /// Eviction counter for statistics.
    evictions: AtomicU64,
    /// Flush counter for statistics.
    flushes: AtomicU64,
}

impl BufferPool {
    /// Creates a buffer pool with the given configuration and disk
    /// manager. Every frame starts on the free list.
    pub fn new(config: BufferPoolConfig, disk: Arc<dyn DiskManager>) -> BufferResult<Self> {
        config
            .validate()
            .map_err(|e| BufferError::config(e.to_string()))?;

        let frames: Vec<Arc<Frame>> = (0..config.pool_size)
            .map(|i| Arc::new(Frame::new(FrameId::new(i), config.page_size)))
            .collect();
        let free_list: VecDeque<FrameId> = (0..config.pool_size).map(FrameId::new).collect();

        Ok(Self {
            page_table: ExtendibleHashTable::new(config.bucket_size),
            state: Mutex::new(PoolState {
                free_list,
                replacer: LruReplacer::new(config.pool_size),
            }),
            frames,
            config,
            disk,
            log: None,
            fetches: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
        })
    }

    /// Attaches a log manager. Dirty pages will not be written back
    /// until the log is durable up to their recorded LSN.
    pub fn with_log_manager(mut self, log: Arc<dyn LogManager>) -> Self {
        self.log = Some(log);
        self
    }

    /// Fetches a page, pinning its frame.
    ///
    /// On a hit the resident frame is pinned and returned. On a miss a
    /// landing frame is taken from the free list, or evicted from the
    /// replacer (writing it back first if dirty); the page is then read
    /// from disk. Fails with [`BufferError::NoFreeFrames`] when every
    /// frame is pinned.
    pub fn fetch_page(&self, page_id: PageId) -> BufferResult<Arc<Frame>> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state.lock();

        if let Some(frame_id) = self.page_table.get(&page_id) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            let frame = &self.frames[frame_id.index()];
            state.replacer.erase(frame_id);
            frame.pin();
            return Ok(Arc::clone(frame));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let frame_id = self.take_landing_frame(&mut state)?;
        let frame = &self.frames[frame_id.index()];

        self.page_table.insert(page_id, frame_id);
        state.replacer.erase(frame_id);
        frame.set_page_id(page_id);
        frame.set_dirty(false);
        frame.set_lsn(Lsn::INVALID);
        frame.pin();

        let read = {
            let mut data = frame.write_data();
            data.fill(0);
            self.disk.read_page(page_id, &mut data)
        };
        if let Err(e) = read {
            // Undo the placement so the frame is not left mapped with
            // garbage; the error itself is the caller's problem.
            self.page_table.remove(&page_id);
            frame.reset();
            state.free_list.push_front(frame_id);
            return Err(e.into());
        }

        Ok(Arc::clone(frame))
    }

    /// Allocates a fresh page on disk and pins a zeroed frame for it.
    ///
    /// The disk manager hands out the page id before a frame is
    /// secured; if every frame is pinned the id is abandoned and
    /// [`BufferError::NoFreeFrames`] is returned.
    pub fn new_page(&self) -> BufferResult<(PageId, Arc<Frame>)> {
        let page_id = self.disk.allocate_page();
        let mut state = self.state.lock();

        let frame_id = self.take_landing_frame(&mut state)?;
        let frame = &self.frames[frame_id.index()];

        self.page_table.insert(page_id, frame_id);
        state.replacer.erase(frame_id);
        frame.set_page_id(page_id);
        frame.set_dirty(false);
        frame.set_lsn(Lsn::INVALID);
        frame.pin();
        frame.write_data().fill(0);

        Ok((page_id, Arc::clone(frame)))
    }

    /// Releases one pin on `page_id`.
    ///
    /// `is_dirty` is OR-ed into the frame's dirty flag: a caller
    /// claiming clean never erases a prior dirty state. When the pin
    /// count reaches zero the frame becomes evictable.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> BufferResult<()> {
        let mut state = self.state.lock();
        let frame_id = self
            .page_table
            .get(&page_id)
            .ok_or(BufferError::PageNotResident { page_id })?;
        let frame = &self.frames[frame_id.index()];

        if frame.pin_count() == 0 {
            return Err(BufferError::PageNotPinned { page_id });
        }
        if is_dirty {
            frame.set_dirty(true);
        }
        if frame.unpin() == 0 {
            state.replacer.insert(frame_id);
        }
        Ok(())
    }

    /// Writes the resident copy of `page_id` to disk.
    ///
    /// The dirty flag is left untouched: flushing is advisory, and
    /// clearing the flag belongs to a checkpoint protocol this
    /// subsystem does not define.
    pub fn flush_page(&self, page_id: PageId) -> BufferResult<()> {
        let _state = self.state.lock();
        let frame_id = self
            .page_table
            .get(&page_id)
            .ok_or(BufferError::PageNotResident { page_id })?;
        self.write_back(&self.frames[frame_id.index()])?;
        self.flushes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Writes every resident dirty page to disk. Returns the number of
    /// pages written. Dirty flags are left untouched, as in
    /// [`BufferPool::flush_page`].
    pub fn flush_all_pages(&self) -> BufferResult<usize> {
        let _state = self.state.lock();
        let mut flushed = 0;
        for frame in &self.frames {
            if frame.page_id().is_valid() && frame.is_dirty() {
                self.write_back(frame)?;
                flushed += 1;
            }
        }
        self.flushes.fetch_add(flushed as u64, Ordering::Relaxed);
        debug!(flushed, "flushed all dirty pages");
        Ok(flushed)
    }

    /// Deletes `page_id`, releasing its frame and disk allocation.
    ///
    /// Fails with [`BufferError::PagePinned`] if the page is resident
    /// and pinned. A page that is not resident is still deallocated on
    /// disk and the call succeeds.
    pub fn delete_page(&self, page_id: PageId) -> BufferResult<()> {
        let mut state = self.state.lock();
        if let Some(frame_id) = self.page_table.get(&page_id) {
            let frame = &self.frames[frame_id.index()];
            if frame.is_pinned() {
                return Err(BufferError::PagePinned { page_id });
            }
            self.page_table.remove(&page_id);
            state.replacer.erase(frame_id);
            frame.reset();
            state.free_list.push_back(frame_id);
        }
        self.disk.deallocate_page(page_id);
        Ok(())
    }

    /// Fetches a page for reading behind an RAII guard that unpins on
    /// drop.
    pub fn fetch_page_read(&self, page_id: PageId) -> BufferResult<PageReadGuard<'_>> {
        let frame = self.fetch_page(page_id)?;
        Ok(PageReadGuard::new(self, frame))
    }

    /// Fetches a page for writing behind an RAII guard that unpins on
    /// drop, carrying the dirty bit with it.
    pub fn fetch_page_write(&self, page_id: PageId) -> BufferResult<PageWriteGuard<'_>> {
        let frame = self.fetch_page(page_id)?;
        Ok(PageWriteGuard::new(self, frame))
    }

    /// Allocates a fresh page behind a write guard.
    pub fn new_page_write(&self) -> BufferResult<PageWriteGuard<'_>> {
        let (_page_id, frame) = self.new_page()?;
        Ok(PageWriteGuard::new(self, frame))
    }

    /// Returns true if `page_id` is resident.
    pub fn contains(&self, page_id: PageId) -> bool {
        self.page_table.get(&page_id).is_some()
    }

    /// Returns the number of frames in the pool.
    pub fn pool_size(&self) -> usize {
        self.config.pool_size
    }

    /// Returns the page size in bytes.
    pub fn page_size(&self) -> usize {
        self.config.page_size
    }

    /// Returns the number of frames that have never held a page.
    pub fn free_frames(&self) -> usize {
        self.state.lock().free_list.len()
    }

    /// Returns a snapshot of the pool statistics.
    pub fn stats(&self) -> BufferPoolStats {
        let mut pinned = 0;
        let mut dirty = 0;
        for frame in &self.frames {
            if frame.is_pinned() {
                pinned += 1;
            }
            if frame.is_dirty() {
                dirty += 1;
            }
        }
        BufferPoolStats {
            fetches: self.fetches.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            pinned_frames: pinned,
            dirty_frames: dirty,
        }
    }

    // -------------------------------------------------------------------------
    // Private helpers
    // -------------------------------------------------------------------------

    /// Secures a frame for an incoming page: the free list first, then a
    /// victim from the replacer. A dirty victim is written back and its
    /// old mapping removed.
    fn take_landing_frame(&self, state: &mut PoolState) -> BufferResult<FrameId> {
        if let Some(frame_id) = state.free_list.pop_front() {
            return Ok(frame_id);
        }

        let Some(frame_id) = state.replacer.victim() else {
            warn!("no evictable frames, all pages are pinned");
            return Err(BufferError::NoFreeFrames);
        };
        let frame = &self.frames[frame_id.index()];

        if frame.is_dirty() {
            if let Err(e) = self.write_back(frame) {
                // Put the victim back so it stays tracked; the caller
                // sees the fatal I/O error.
                state.replacer.insert(frame_id);
                return Err(e);
            }
        }
        let old_page_id = frame.page_id();
        if old_page_id.is_valid() {
            self.page_table.remove(&old_page_id);
        }
        self.evictions.fetch_add(1, Ordering::Relaxed);
        debug!(victim = %old_page_id, "evicted page");
        Ok(frame_id)
    }

    /// Writes a frame's payload to disk under its current page id,
    /// forcing the log first when a log manager is attached.
    fn write_back(&self, frame: &Frame) -> BufferResult<()> {
        if let Some(log) = &self.log {
            let lsn = frame.lsn();
            if lsn.is_valid() {
                log.flush_until(lsn)?;
            }
        }
        let data = frame.read_data();
        self.disk.write_page(frame.page_id(), &data)?;
        Ok(())
    }
}

impl std::fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPool")
            .field("pool_size", &self.config.pool_size)
            .field("page_size", &self.config.page_size)
            .field("free_frames", &self.free_frames())
            .field("stats", &self.stats())
            .finish()
    }
}
