//! Buffer pool manager for VesperDB.
//!
//! The buffer pool manages a fixed-size pool of in-memory page frames,
//! providing:
//!
//! - **Page Caching**: keep hot pages in memory
//! - **Pin/Unpin**: reference counting for safe concurrent access
//! - **Dirty Tracking**: modified pages are written back before reuse
//! - **Eviction Policy**: least-recently-used replacement
//! - **Page Table**: an extendible hash directory from page id to frame
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                       BufferPool                          │
//! │  ┌─────────────────────────────────────────────────────┐  │
//! │  │        Page Table (extendible hashing)              │  │
//! │  │           PageId -> FrameId                         │  │
//! │  └─────────────────────────────────────────────────────┘  │
//! │                            │                              │
//! │                            ▼                              │
//! │  ┌─────────────────────────────────────────────────────┐  │
//! │  │                  Frame Array                        │  │
//! │  │  ┌─────────┐ ┌─────────┐       ┌─────────┐          │  │
//! │  │  │ Frame 0 │ │ Frame 1 │  ...  │ Frame N │          │  │
//! │  │  │ page_id │ │ page_id │       │ page_id │          │  │
//! │  │  │ data[]  │ │ data[]  │       │ data[]  │          │  │
//! │  │  │ dirty   │ │ dirty   │       │ dirty   │          │  │
//! │  │  │ pin_cnt │ │ pin_cnt │       │ pin_cnt │          │  │
//! │  │  └─────────┘ └─────────┘       └─────────┘          │  │
//! │  └─────────────────────────────────────────────────────┘  │
//! │                            │                              │
//! │                            ▼                              │
//! │  ┌──────────────────────┐  ┌──────────────────────────┐   │
//! │  │     Free List        │  │      LRU Replacer        │   │
//! │  │  (never-used frames) │  │  (evictable frames)      │   │
//! │  └──────────────────────┘  └──────────────────────────┘   │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vesper_storage::buffer::{BufferPool, BufferPoolConfig};
//! use vesper_storage::disk::MemDiskManager;
//!
//! fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BufferPoolConfig::new(64);
//!     let disk = Arc::new(MemDiskManager::new(config.page_size));
//!     let pool = BufferPool::new(config, disk)?;
//!
//!     let (page_id, _frame) = pool.new_page()?;
//!     pool.unpin_page(page_id, true)?;
//!     pool.flush_page(page_id)?;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod frame;
mod latch;
mod page_table;
mod pool;
mod replacer;

pub use config::BufferPoolConfig;
pub use error::{BufferError, BufferResult};
pub use frame::{Frame, FrameId};
pub use latch::{PageReadGuard, PageWriteGuard};
pub use page_table::ExtendibleHashTable;
pub use pool::BufferPool;
pub use replacer::LruReplacer;

/// Statistics for buffer pool monitoring.
#[derive(Debug, Clone, Default)]
pub struct BufferPoolStats {
    /// Total number of page fetches.
    pub fetches: u64,
    /// Number of fetches served from memory.
    pub hits: u64,
    /// Number of fetches that required a disk read.
    pub misses: u64,
    /// Number of pages evicted to make room.
    pub evictions: u64,
    /// Number of explicit page flushes.
    pub flushes: u64,
    /// Current number of pinned frames.
    pub pinned_frames: usize,
    /// Current number of dirty frames.
    pub dirty_frames: usize,
}

impl BufferPoolStats {
    /// Returns the cache hit ratio (0.0 to 1.0).
    pub fn hit_ratio(&self) -> f64 {
        if self.fetches == 0 {
            0.0
        } else {
            self.hits as f64 / self.fetches as f64
        }
    }
}
