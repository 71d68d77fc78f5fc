//! Write-ahead-log interface.
//!
//! The buffer pool never writes a dirty page back to disk before the
//! log covering that page's last modification is durable. The pool only
//! needs the flush hook defined here; the log itself lives elsewhere.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};

use vesper_common::types::Lsn;

/// Log durability hook driven by the buffer pool.
pub trait LogManager: Send + Sync {
    /// Blocks until the log is durable up to and including `lsn`.
    fn flush_until(&self, lsn: Lsn) -> io::Result<()>;

    /// Returns the highest LSN known to be durable.
    fn flushed_lsn(&self) -> Lsn;
}

/// Test double: records the durability high-water mark without keeping
/// any log records.
#[derive(Debug, Default)]
pub struct StubLogManager {
    flushed: AtomicU64,
    flush_calls: AtomicU64,
}

impl StubLogManager {
    /// Creates a stub with nothing flushed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `flush_until` calls observed.
    pub fn flush_calls(&self) -> u64 {
        self.flush_calls.load(Ordering::SeqCst)
    }
}

impl LogManager for StubLogManager {
    fn flush_until(&self, lsn: Lsn) -> io::Result<()> {
        self.flush_calls.fetch_add(1, Ordering::SeqCst);
        self.flushed.fetch_max(lsn.as_u64(), Ordering::SeqCst);
        Ok(())
    }

    fn flushed_lsn(&self) -> Lsn {
        Lsn::new(self.flushed.load(Ordering::SeqCst))
    }
}
