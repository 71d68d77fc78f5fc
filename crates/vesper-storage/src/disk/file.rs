//! File-backed disk manager.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use vesper_common::types::PageId;

use super::DiskManager;

/// Stores pages in a single data file at `page_id * page_size` offsets.
///
/// Page identifiers are allocated monotonically starting from the
/// page count implied by the existing file length, so reopening a file
/// continues where the previous run stopped. Deallocation is a no-op:
/// free-space management belongs to a higher layer.
pub struct FileDiskManager {
    file: Mutex<File>,
    page_size: usize,
    next_page_id: AtomicU64,
}

impl FileDiskManager {
    /// Opens (or creates) the data file at `path`.
    pub fn open(path: impl AsRef<Path>, page_size: usize) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        let len = file.metadata()?.len();
        let next = len / page_size as u64;
        Ok(Self {
            file: Mutex::new(file),
            page_size,
            next_page_id: AtomicU64::new(next),
        })
    }

    /// Returns the page size this manager was opened with.
    pub fn page_size(&self) -> usize {
        self.page_size
    }
}

impl DiskManager for FileDiskManager {
    fn allocate_page(&self) -> PageId {
        PageId::new(self.next_page_id.fetch_add(1, Ordering::SeqCst))
    }

    fn deallocate_page(&self, _page_id: PageId) {}

    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> io::Result<()> {
        debug_assert_eq!(buf.len(), self.page_size);
        let offset = page_id.as_u64() * self.page_size as u64;
        let mut file = self.file.lock();
        let len = file.metadata()?.len();

        // A page allocated but never written reads back as zeroes.
        buf.fill(0);
        if offset < len {
            let avail = (len - offset).min(buf.len() as u64) as usize;
            file.seek(SeekFrom::Start(offset))?;
            file.read_exact(&mut buf[..avail])?;
        }
        Ok(())
    }

    fn write_page(&self, page_id: PageId, buf: &[u8]) -> io::Result<()> {
        debug_assert_eq!(buf.len(), self.page_size);
        let offset = page_id.as_u64() * self.page_size as u64;
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(buf)
    }
}

impl std::fmt::Debug for FileDiskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDiskManager")
            .field("page_size", &self.page_size)
            .field("next_page_id", &self.next_page_id.load(Ordering::SeqCst))
            .finish()
    }
}
