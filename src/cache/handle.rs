//! File handles over cached entries
//!
//! A [`CacheFile`] is a user-visible view over one entry carrying a
//! mode, a cursor, and a dirty flag. Reads and writes go against the
//! entry's in-memory buffer; dirty data is written back to disk when
//! the handle is flushed or dropped.

use std::fmt;
use std::io::{self, SeekFrom};
use std::path::PathBuf;
use std::sync::Weak;
use std::time::SystemTime;

use crate::cache::engine::{write_back, CacheShared, EntryCell};
use crate::mode::OpenMode;
use crate::score::priority_score;
use crate::status::Status;

/// A user-visible view over one cache entry
///
/// Created by [`ContentAwareCache::open`]. Dropping the handle writes
/// dirty data back to disk and updates the entry's access statistics,
/// which feed the priority scorer. Handles must not be shared across
/// threads for the same path concurrently with writes; distinct-path
/// handles are independent.
///
/// The handle holds only a weak reference to the engine: if the cache
/// is dropped first, the final write-back still lands on disk but the
/// stats update becomes a no-op.
///
/// [`ContentAwareCache::open`]: crate::cache::ContentAwareCache::open
pub struct CacheFile {
    entry: EntryCell,
    cache: Weak<CacheShared>,
    mode: OpenMode,
    cursor: u64,
    dirty: bool,
}

impl CacheFile {
    pub(crate) fn new(entry: EntryCell, cache: Weak<CacheShared>, mode: OpenMode) -> Self {
        Self {
            entry,
            cache,
            mode,
            cursor: 0,
            dirty: false,
        }
    }

    /// The backing path of the entry this handle views
    pub fn path(&self) -> PathBuf {
        self.entry.read().metadata.path.clone()
    }

    /// The parsed mode the handle was opened with
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Read up to `count` items of `item_size` bytes at the cursor
    ///
    /// Returns the number of whole items read (`bytes_copied /
    /// item_size`); a short final item is not counted. Returns 0 when
    /// the mode does not permit reading, when `item_size` is 0, or at
    /// end of data. At most `buf.len()` bytes are copied.
    pub fn read(&mut self, buf: &mut [u8], item_size: usize, count: usize) -> usize {
        if !self.mode.can_read() || item_size == 0 {
            return 0;
        }

        let requested = item_size.saturating_mul(count).min(buf.len());
        let entry = self.entry.read();
        let start = (self.cursor as usize).min(entry.data.len());
        let to_copy = requested.min(entry.data.len() - start);

        buf[..to_copy].copy_from_slice(&entry.data[start..start + to_copy]);
        drop(entry);

        self.cursor = (start + to_copy) as u64;
        to_copy / item_size
    }

    /// Write `count` items of `item_size` bytes at the cursor
    ///
    /// Returns `count` on success and 0 when the mode does not permit
    /// writing or `buf` is shorter than `item_size * count`. In append
    /// mode the cursor snaps to the end of the buffer first. Growing
    /// past the current buffer length reserves room in the cache,
    /// evicting lower-priority entries if needed.
    pub fn write(&mut self, buf: &[u8], item_size: usize, count: usize) -> usize {
        if !self.mode.can_write() {
            return 0;
        }
        let Some(bytes) = item_size.checked_mul(count) else {
            return 0;
        };
        if bytes == 0 {
            return count;
        }
        if buf.len() < bytes {
            return 0;
        }

        if self.mode.appends() {
            self.cursor = self.entry.read().data.len() as u64;
        }

        let start = self.cursor as usize;
        let end = start + bytes;
        if end > self.entry.read().data.len() {
            if let Some(shared) = self.cache.upgrade() {
                shared.inner.lock().grow_entry(&self.entry, end);
            } else {
                // Engine gone; grow locally so the write still lands.
                self.entry.write().resize_data(end);
            }
        }

        {
            let mut entry = self.entry.write();
            entry.data[start..end].copy_from_slice(&buf[..bytes]);
            entry.dirty = true;
        }

        self.cursor = end as u64;
        self.dirty = true;
        count
    }

    /// Move the cursor
    ///
    /// Fails with [`Status::InvalidArgument`] if the resulting
    /// position is negative or past the end of the buffer; the buffer
    /// cannot be sparsely extended by seeking.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64, Status> {
        let len = self.entry.read().data.len() as i128;
        let target: i128 = match pos {
            SeekFrom::Start(offset) => offset as i128,
            SeekFrom::Current(delta) => self.cursor as i128 + delta as i128,
            SeekFrom::End(delta) => len + delta as i128,
        };

        if target < 0 || target > len {
            return Err(Status::InvalidArgument);
        }
        self.cursor = target as u64;
        Ok(self.cursor)
    }

    /// Current cursor position in bytes
    pub fn tell(&self) -> u64 {
        self.cursor
    }

    /// Write the entry's buffer to its backing path
    ///
    /// A clean handle is a no-op. On success the disk-write counter is
    /// incremented and the dirty flags cleared.
    pub fn flush(&mut self) -> Result<(), Status> {
        if !self.dirty {
            return Ok(());
        }

        let result = {
            let entry = self.entry.read();
            write_back(&entry)
        };

        match result {
            Ok(()) => {
                if let Some(shared) = self.cache.upgrade() {
                    shared.inner.lock().disk_writes += 1;
                }
                self.entry.write().dirty = false;
                self.dirty = false;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "handle flush failed");
                Err(Status::IoError)
            }
        }
    }
}

impl fmt::Debug for CacheFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheFile")
            .field("path", &self.entry.read().metadata.path)
            .field("mode", &self.mode)
            .field("cursor", &self.cursor)
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl Drop for CacheFile {
    fn drop(&mut self) {
        if self.dirty {
            // Destruction cannot refuse; failures are logged inside flush.
            let _ = self.flush();
        }

        if let Some(shared) = self.cache.upgrade() {
            let inner = shared.inner.lock();
            let now = SystemTime::now();
            let mut entry = self.entry.write();
            entry.stats.touch(now);
            entry.priority_score = priority_score(&entry, &inner.priorities, now);
        }
    }
}

impl io::Read for CacheFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(CacheFile::read(self, buf, 1, buf.len()))
    }
}

impl io::Write for CacheFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(CacheFile::write(self, buf, 1, buf.len()))
    }

    fn flush(&mut self) -> io::Result<()> {
        CacheFile::flush(self).map_err(|status| io::Error::other(status.as_str()))
    }
}

impl io::Seek for CacheFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        CacheFile::seek(self, pos)
            .map_err(|status| io::Error::new(io::ErrorKind::InvalidInput, status.as_str()))
    }
}
