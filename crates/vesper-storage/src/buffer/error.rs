//! Buffer pool errors.

use std::io;

use thiserror::Error;
use vesper_common::types::PageId;

/// Result type for buffer pool operations.
pub type BufferResult<T> = Result<T, BufferError>;

/// Errors that can occur during buffer pool operations.
#[derive(Debug, Error)]
pub enum BufferError {
    /// Every frame is pinned; neither the free list nor the replacer can
    /// supply one.
    #[error("no free frames available, all pages are pinned")]
    NoFreeFrames,

    /// The page is not resident in the buffer pool.
    #[error("page {page_id} is not resident in the buffer pool")]
    PageNotResident {
        /// The page that was requested.
        page_id: PageId,
    },

    /// `unpin_page` was called on a page whose pin count is already zero.
    #[error("page {page_id} is not pinned")]
    PageNotPinned {
        /// The page that was unpinned.
        page_id: PageId,
    },

    /// `delete_page` was called on a page that is still pinned.
    #[error("page {page_id} is pinned and cannot be deleted")]
    PagePinned {
        /// The page that was to be deleted.
        page_id: PageId,
    },

    /// I/O error from the disk or log manager. These are fatal: the pool
    /// does not retry, the caller decides.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: io::Error,
    },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config {
        /// What was wrong with the configuration.
        message: String,
    },
}

impl BufferError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a page-not-resident error.
    pub fn not_resident(page_id: PageId) -> Self {
        Self::PageNotResident { page_id }
    }

    /// Returns true if this is a transient error that can be retried
    /// once pins are released.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NoFreeFrames)
    }
}
