//! Cache engine: admission, eviction, and write-back
//!
//! The engine owns every resident entry. One mutex guards the entry
//! map, the LRU index, the type-priority table, the size bounds, and
//! the counters; every engine operation holds it for its whole
//! duration, including the synchronous whole-file disk I/O performed
//! by admission and flush.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::{Mutex, RwLock};

use crate::cache::handle::CacheFile;
use crate::cache::stats::CacheStats;
use crate::entry::CacheEntry;
use crate::lru::LruIndex;
use crate::metadata::FileMetadata;
use crate::mode::OpenMode;
use crate::score::{priority_score, TypePriorities};
use crate::status::Status;

/// Default cache size bound: 64 MiB
pub const DEFAULT_MAX_SIZE: u64 = 64 * 1024 * 1024;

pub(crate) type EntryCell = Arc<RwLock<CacheEntry>>;

/// State shared between the engine facade and open handles
pub(crate) struct CacheShared {
    pub(crate) inner: Mutex<CacheInner>,
}

/// Everything the engine mutex guards
pub(crate) struct CacheInner {
    map: HashMap<PathBuf, EntryCell>,
    lru: LruIndex,
    pub(crate) priorities: TypePriorities,
    max_size: u64,
    current_size: u64,
    hits: u64,
    misses: u64,
    disk_reads: u64,
    pub(crate) disk_writes: u64,
}

/// Content-aware file cache engine
///
/// Holds recently or importantly used file contents in memory and
/// serves reads and writes out of RAM. Eviction picks the entry with
/// the lowest priority score, combining file-type importance, size,
/// access frequency, and recency. Dropping the cache flushes every
/// buffer to its backing path.
///
/// Share across threads behind an [`Arc`]; every operation takes
/// `&self`.
pub struct ContentAwareCache {
    shared: Arc<CacheShared>,
}

impl ContentAwareCache {
    /// Create a cache with the default 64 MiB bound
    pub fn new() -> Self {
        Self::with_max_size(DEFAULT_MAX_SIZE)
    }

    /// Create a cache with an explicit size bound in bytes
    pub fn with_max_size(max_size: u64) -> Self {
        Self {
            shared: Arc::new(CacheShared {
                inner: Mutex::new(CacheInner {
                    map: HashMap::new(),
                    lru: LruIndex::new(),
                    priorities: TypePriorities::new(),
                    max_size,
                    current_size: 0,
                    hits: 0,
                    misses: 0,
                    disk_reads: 0,
                    disk_writes: 0,
                }),
            }),
        }
    }

    /// Open a file through the cache
    ///
    /// A resident path is served without disk I/O. On a miss, the base
    /// `r` letter requires the backing file to exist, the base `w`
    /// letter creates an empty entry (truncating whatever the path
    /// held), and any other mode loads the whole file into a fresh
    /// entry, evicting lower-priority entries first if room is needed.
    pub fn open(&self, path: impl AsRef<Path>, mode: &str) -> Result<CacheFile, Status> {
        let path = path.as_ref();
        let mode = OpenMode::parse(mode);
        let mut inner = self.shared.inner.lock();

        if let Some(entry) = inner.map.get(path).cloned() {
            inner.hits += 1;
            inner.lru.touch(path);
            return Ok(CacheFile::new(entry, Arc::downgrade(&self.shared), mode));
        }
        inner.misses += 1;

        if mode.requires_existing() && !path.exists() {
            return Err(Status::NotFound);
        }

        if mode.truncates() {
            let entry: EntryCell =
                Arc::new(RwLock::new(CacheEntry::new(FileMetadata::empty(path))));
            inner.map.insert(path.to_path_buf(), Arc::clone(&entry));
            inner.lru.touch(path);
            return Ok(CacheFile::new(entry, Arc::downgrade(&self.shared), mode));
        }

        let entry = inner.load(path)?;
        Ok(CacheFile::new(entry, Arc::downgrade(&self.shared), mode))
    }

    /// Close a handle, flushing dirty data and updating access stats
    ///
    /// Dropping the handle is equivalent.
    pub fn close(&self, handle: CacheFile) {
        drop(handle);
    }

    /// Write every entry's buffer to its backing path
    ///
    /// Each successful write increments the disk-write counter;
    /// failures are logged and skipped.
    pub fn flush(&self) {
        self.shared.inner.lock().flush_all();
    }

    /// Flush, then drop every entry and reset the current size to zero
    pub fn clear(&self) {
        let mut inner = self.shared.inner.lock();
        inner.flush_all();
        inner.map.clear();
        inner.lru.clear();
        inner.current_size = 0;
    }

    /// Change the size bound, evicting entries if it shrank
    pub fn resize(&self, new_max: u64) {
        let mut inner = self.shared.inner.lock();
        if new_max < inner.max_size {
            let excess = inner.max_size - new_max;
            inner.make_room(excess);
        }
        inner.max_size = new_max;
    }

    /// Set the priority bias for a file extension
    ///
    /// The extension is normalized to leading-dot lowercase and the
    /// value clamped to [0, 1]; scores of resident entries with that
    /// extension are recomputed immediately.
    pub fn set_type_priority(&self, extension: &str, priority: f64) {
        let mut inner = self.shared.inner.lock();
        let ext = inner.priorities.set(extension, priority);
        let now = SystemTime::now();
        for cell in inner.map.values() {
            let mut entry = cell.write();
            if entry.metadata.extension == ext {
                entry.priority_score = priority_score(&entry, &inner.priorities, now);
            }
        }
    }

    /// Fraction of opens served from memory
    pub fn hit_rate(&self) -> f64 {
        self.stats().hit_rate()
    }

    /// Whole files read from disk so far
    pub fn disk_read_count(&self) -> u64 {
        self.shared.inner.lock().disk_reads
    }

    /// Whole buffers written back to disk so far
    pub fn disk_write_count(&self) -> u64 {
        self.shared.inner.lock().disk_writes
    }

    /// Sum of resident buffer lengths in bytes
    pub fn cache_size(&self) -> u64 {
        self.shared.inner.lock().current_size
    }

    /// Number of resident entries
    pub fn entry_count(&self) -> usize {
        self.shared.inner.lock().map.len()
    }

    /// Snapshot of all counters
    pub fn stats(&self) -> CacheStats {
        let inner = self.shared.inner.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            disk_reads: inner.disk_reads,
            disk_writes: inner.disk_writes,
            current_size: inner.current_size,
            max_size: inner.max_size,
            entries: inner.map.len(),
        }
    }

    /// Print a human-readable statistics report to stdout
    pub fn print_stats(&self) {
        println!("{}", self.stats());
    }
}

impl Default for ContentAwareCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ContentAwareCache {
    fn drop(&mut self) {
        self.shared.inner.lock().flush_all();
    }
}

impl CacheInner {
    /// Load a file from disk into a fresh entry
    fn load(&mut self, path: &Path) -> Result<EntryCell, Status> {
        let metadata = match FileMetadata::probe(path) {
            Ok(metadata) => metadata,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "metadata probe failed");
                return Err(Status::IoError);
            }
        };
        if metadata.size == 0 {
            return Err(Status::IoError);
        }

        self.make_room(metadata.size);

        let data = match fs::read(path) {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "disk read failed");
                return Err(Status::IoError);
            }
        };

        let mut entry = CacheEntry::new(metadata);
        entry.set_data(data);
        entry.priority_score = priority_score(&entry, &self.priorities, SystemTime::now());

        self.disk_reads += 1;
        self.current_size += entry.memory_usage();

        let cell = Arc::new(RwLock::new(entry));
        self.map.insert(path.to_path_buf(), Arc::clone(&cell));
        self.lru.touch(path);
        Ok(cell)
    }

    /// Evict entries until `required` more bytes fit under the bound
    ///
    /// Scores are recomputed first so victim selection sees current
    /// recency. If eviction cannot free enough, the bound is enlarged
    /// instead of failing the operation (soft bound).
    pub(crate) fn make_room(&mut self, required: u64) {
        if self.current_size + required <= self.max_size {
            return;
        }

        self.update_all_scores();

        while self.current_size + required > self.max_size && !self.map.is_empty() {
            let Some(victim) = self.select_victim() else {
                break;
            };
            self.evict(&victim);
        }

        if self.current_size + required > self.max_size {
            self.max_size = self.current_size + required;
        }
    }

    /// Grow an entry's buffer to `new_len`, evicting others as needed
    ///
    /// Called from a handle's write path with the engine lock held by
    /// the caller's `lock()` on this inner state.
    pub(crate) fn grow_entry(&mut self, cell: &EntryCell, new_len: usize) {
        let (old_len, path) = {
            let entry = cell.read();
            (entry.data.len(), entry.metadata.path.clone())
        };
        if new_len <= old_len {
            return;
        }
        let delta = (new_len - old_len) as u64;

        self.make_room(delta);

        // The sweep may have evicted this very entry; only resident
        // buffers count toward the cache total.
        let resident = self
            .map
            .get(&path)
            .is_some_and(|resident| Arc::ptr_eq(resident, cell));

        let mut entry = cell.write();
        entry.resize_data(new_len);
        if resident {
            self.current_size += delta;
        }
    }

    fn update_all_scores(&mut self) {
        let now = SystemTime::now();
        for cell in self.map.values() {
            let mut entry = cell.write();
            entry.priority_score = priority_score(&entry, &self.priorities, now);
        }
    }

    /// Pick the entry with the lowest score; ties resolve to the least
    /// recently touched path
    fn select_victim(&self) -> Option<PathBuf> {
        if self.map.is_empty() {
            return None;
        }

        let mut lowest = f64::INFINITY;
        for cell in self.map.values() {
            let score = cell.read().priority_score;
            if score < lowest {
                lowest = score;
            }
        }

        // The walk starts at the least recently touched path, so a
        // score tie resolves in LRU order.
        self.lru
            .iter_from_tail()
            .find(|path| {
                self.map
                    .get(*path)
                    .is_some_and(|cell| cell.read().priority_score <= lowest)
            })
            .map(Path::to_path_buf)
    }

    /// Remove an entry from the map and the LRU index
    ///
    /// A dirty victim is written back first; write-back failure is
    /// logged and the eviction proceeds.
    fn evict(&mut self, path: &Path) {
        let Some(cell) = self.map.remove(path) else {
            return;
        };
        self.lru.remove(path);

        let mut entry = cell.write();
        self.current_size = self.current_size.saturating_sub(entry.memory_usage());

        if entry.dirty {
            match write_back(&entry) {
                Ok(()) => {
                    self.disk_writes += 1;
                    entry.dirty = false;
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "write-back of evicted entry failed");
                }
            }
        }

        tracing::debug!(path = %path.display(), score = entry.priority_score, "evicted entry");
    }

    /// Write every entry's buffer to its backing path
    pub(crate) fn flush_all(&mut self) {
        let mut written = 0;
        for (path, cell) in &self.map {
            let mut entry = cell.write();
            match write_back(&entry) {
                Ok(()) => {
                    written += 1;
                    entry.dirty = false;
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "flush failed");
                }
            }
        }
        self.disk_writes += written;
    }
}

/// Write an entry's buffer to its backing path in full
pub(crate) fn write_back(entry: &CacheEntry) -> io::Result<()> {
    fs::write(&entry.metadata.path, &entry.data)
}
