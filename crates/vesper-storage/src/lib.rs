//! # vesper-storage
//!
//! The VesperDB page cache: the subsystem that mediates every read and
//! write between the access methods (heaps, indexes) and the disk.
//!
//! Three components compose bottom-up:
//!
//! - [`buffer::LruReplacer`] tracks evictable frames in
//!   least-recently-used order
//! - [`buffer::ExtendibleHashTable`] maps logical page ids to frames
//! - [`buffer::BufferPool`] owns the frames and orchestrates
//!   fetch / new / unpin / flush / delete against the disk manager
//!
//! The [`disk`] and [`wal`] modules define the collaborator interfaces
//! the pool drives (physical page I/O and log durability).

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Buffer pool, page table, and replacement policy
pub mod buffer;

/// Disk manager interface and implementations
pub mod disk;

/// Write-ahead-log interface
pub mod wal;
