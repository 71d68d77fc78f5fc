//! System-wide constants for VesperDB.

// =============================================================================
// Page and Memory Constants
// =============================================================================

/// Default page size in bytes (8 KB).
///
/// This balances I/O efficiency with memory usage and matches the typical
/// SSD block size.
pub const DEFAULT_PAGE_SIZE: usize = 8 * 1024;

/// Minimum page size in bytes (512 B).
pub const MIN_PAGE_SIZE: usize = 512;

/// Maximum page size in bytes (64 KB).
pub const MAX_PAGE_SIZE: usize = 64 * 1024;

// =============================================================================
// Buffer Pool Constants
// =============================================================================

/// Default number of frames in the buffer pool.
pub const DEFAULT_POOL_FRAMES: usize = 128;

/// Minimum number of frames for a usable buffer pool.
pub const MIN_POOL_FRAMES: usize = 1;

// =============================================================================
// Page Table Constants
// =============================================================================

/// Default number of entries a page-table hash bucket holds before it
/// splits.
pub const DEFAULT_BUCKET_SIZE: usize = 32;

/// Initial global depth of the page-table directory.
pub const INITIAL_GLOBAL_DEPTH: u32 = 1;
